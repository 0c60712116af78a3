// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections.

mod database;
mod gaming;
mod logging;
mod output;
mod peering;
mod registry;
mod ssh;

pub use database::{DatabaseConfig, DatabaseConfigLayer};
pub use gaming::{GamingConfig, GamingConfigLayer};
pub use logging::{LoggingConfig, LoggingConfigLayer};
pub use output::{OutputConfig, OutputConfigLayer};
pub use peering::{PeeringConfig, PeeringConfigLayer};
pub use registry::{RegistryConfig, RegistryConfigLayer};
pub use ssh::{SshConfig, SshConfigLayer};
