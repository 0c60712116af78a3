// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! dn42 registry access.
//!
//! Authentication matches an offered SSH key against the `auth:` lines of
//! `data/mntner/<NAME>-MNT`. Authorization checks the `mnt-by:` lines of
//! `data/aut-num/AS<n>`. The two are independent: a granted login says
//! nothing about which AS numbers the maintainer may touch.

pub mod error;
pub mod identity;
pub mod object;
pub mod ownership;
pub mod source;
pub mod testing;

pub use error::{RegistryError, Result};
pub use identity::{
	normalize_username, AnonymousResolver, AuthResult, Authority, IdentityResolver, KeyAlgorithm,
	MaintainerIdentity, OfferedKey, RegistryResolver,
};
pub use object::RegistryObject;
pub use ownership::{OwnershipCheck, RegistryOwnership};
pub use source::{FsRegistry, RegistrySource};
