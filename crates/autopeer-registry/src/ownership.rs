// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! AS-number ownership, decided from `aut-num` objects.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::identity::MaintainerIdentity;
use crate::object::RegistryObject;
use crate::source::RegistrySource;

#[async_trait]
pub trait OwnershipCheck: Send + Sync {
	/// Whether `maintainer` appears in the `mnt-by` of `AS<as_num>`.
	async fn owns(&self, maintainer: &MaintainerIdentity, as_num: u32) -> Result<bool>;

	/// All AS numbers whose `aut-num` object lists `maintainer`.
	async fn maintained_asns(&self, maintainer: &MaintainerIdentity) -> Result<Vec<u32>>;
}

fn maintained_by(object: &RegistryObject, handle: &str) -> bool {
	object
		.values("mnt-by")
		.any(|m| m.trim().eq_ignore_ascii_case(handle))
}

#[derive(Clone)]
pub struct RegistryOwnership {
	source: Arc<dyn RegistrySource>,
}

impl RegistryOwnership {
	pub fn new(source: Arc<dyn RegistrySource>) -> Self {
		Self { source }
	}
}

#[async_trait]
impl OwnershipCheck for RegistryOwnership {
	#[tracing::instrument(skip(self, maintainer), fields(maintainer = %maintainer.username))]
	async fn owns(&self, maintainer: &MaintainerIdentity, as_num: u32) -> Result<bool> {
		if maintainer.is_anonymous() {
			return Ok(false);
		}
		let handle = maintainer.handle();
		Ok(self
			.source
			.aut_num(as_num)
			.await?
			.is_some_and(|object| maintained_by(&object, &handle)))
	}

	#[tracing::instrument(skip(self, maintainer), fields(maintainer = %maintainer.username))]
	async fn maintained_asns(&self, maintainer: &MaintainerIdentity) -> Result<Vec<u32>> {
		if maintainer.is_anonymous() {
			return Ok(Vec::new());
		}
		let handle = maintainer.handle();
		let mut owned = Vec::new();
		for as_num in self.source.aut_nums().await? {
			// Objects that vanish or fail to parse mid-scan are skipped.
			if let Ok(Some(object)) = self.source.aut_num(as_num).await {
				if maintained_by(&object, &handle) {
					owned.push(as_num);
				}
			}
		}
		tracing::debug!(count = owned.len(), "resolved maintained AS numbers");
		Ok(owned)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::identity::Authority;
	use crate::source::FsRegistry;
	use crate::testing::RegistryFixture;

	fn identity(name: &str) -> MaintainerIdentity {
		MaintainerIdentity {
			username: name.to_string(),
			keys: Vec::new(),
			authority: Authority::Registry,
		}
	}

	fn ownership(dir: &std::path::Path) -> RegistryOwnership {
		RegistryOwnership::new(Arc::new(FsRegistry::new(dir)))
	}

	#[tokio::test]
	async fn test_owner_is_recognized_case_insensitively() {
		let dir = tempfile::tempdir().unwrap();
		RegistryFixture::new(dir.path())
			.aut_num(4242421111, "Alice")
			.unwrap();

		let check = ownership(dir.path());
		assert!(check.owns(&identity("alice"), 4242421111).await.unwrap());
		assert!(!check.owns(&identity("bob"), 4242421111).await.unwrap());
	}

	#[tokio::test]
	async fn test_unknown_as_is_not_owned() {
		let dir = tempfile::tempdir().unwrap();
		let check = ownership(dir.path());
		assert!(!check.owns(&identity("alice"), 4242429999).await.unwrap());
	}

	#[tokio::test]
	async fn test_anonymous_owns_nothing() {
		let dir = tempfile::tempdir().unwrap();
		RegistryFixture::new(dir.path())
			.aut_num(4242421111, "guest")
			.unwrap();
		let check = ownership(dir.path());
		let guest = MaintainerIdentity::anonymous("guest");
		assert!(!check.owns(&guest, 4242421111).await.unwrap());
		assert!(check.maintained_asns(&guest).await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_maintained_asns_scan() {
		let dir = tempfile::tempdir().unwrap();
		let fixture = RegistryFixture::new(dir.path());
		fixture.aut_num(4242421111, "alice").unwrap();
		fixture.aut_num(4242421112, "alice").unwrap();
		fixture.aut_num(4242422222, "bob").unwrap();

		let owned = ownership(dir.path())
			.maintained_asns(&identity("alice"))
			.await
			.unwrap();
		assert_eq!(owned, vec![4242421111, 4242421112]);
	}
}
