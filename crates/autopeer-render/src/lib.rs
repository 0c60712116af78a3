// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration rendering for peering links.

pub mod bird;
pub mod context;
pub mod error;
pub mod latency;
pub mod materializer;
pub mod renderer;
pub mod wireguard;

pub use context::LinkContext;
pub use error::{RenderError, Result};
pub use materializer::{timestamp_version, LatencyMode, MaterializeReport, Materializer};
pub use renderer::ConfigRenderer;
