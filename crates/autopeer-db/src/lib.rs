// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Durable storage for peering links.

pub mod allocation;
pub mod error;
pub mod links;
pub mod pool;
pub mod schema;
pub mod testing;
pub mod types;

pub use allocation::first_free_id;
pub use error::{DbError, Result};
pub use links::{LinkStore, PeeringLinkRepository};
pub use pool::create_pool;
pub use schema::run_migrations;
pub use types::{NewPeeringLink, PeeringLink};
