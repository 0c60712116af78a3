// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Peering link allocation and authorization.

pub mod allocator;
pub mod endpoint;
pub mod error;
pub mod service;

pub use allocator::LinkAllocator;
pub use error::{PeeringError, Result};
pub use service::{LinkSummary, PeeringService};
