// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Access to a dn42 registry checkout on disk.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{RegistryError, Result};
use crate::object::RegistryObject;

/// Read-only view of registry objects.
///
/// `Ok(None)` means the object does not exist. Any other failure is an
/// error and callers treat it as "registry unavailable".
#[async_trait]
pub trait RegistrySource: Send + Sync {
	/// Maintainer object for `name` (without the `-MNT` suffix).
	async fn maintainer(&self, name: &str) -> Result<Option<RegistryObject>>;

	async fn aut_num(&self, as_num: u32) -> Result<Option<RegistryObject>>;

	/// Every AS number that has an `aut-num` object.
	async fn aut_nums(&self) -> Result<Vec<u32>>;
}

/// Registry backed by a git checkout laid out as `data/<class>/<object>`.
#[derive(Debug, Clone)]
pub struct FsRegistry {
	root: PathBuf,
}

impl FsRegistry {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	pub fn maintainer_path(&self, name: &str) -> PathBuf {
		self.root
			.join("data")
			.join("mntner")
			.join(format!("{}-MNT", name.to_ascii_uppercase()))
	}

	pub fn aut_num_path(&self, as_num: u32) -> PathBuf {
		self.root
			.join("data")
			.join("aut-num")
			.join(format!("AS{as_num}"))
	}

	fn aut_num_dir(&self) -> PathBuf {
		self.root.join("data").join("aut-num")
	}
}

/// Read and parse one object with a single read, so each lookup sees a
/// consistent snapshot of the file.
fn read_object(path: &Path) -> Result<Option<RegistryObject>> {
	let text = match std::fs::read_to_string(path) {
		Ok(text) => text,
		Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
		Err(e) => {
			return Err(RegistryError::Io {
				path: path.to_path_buf(),
				source: e,
			})
		}
	};

	RegistryObject::parse(&text)
		.map(Some)
		.map_err(|e| RegistryError::Malformed {
			path: path.to_path_buf(),
			line: e.line,
		})
}

fn list_aut_nums(dir: &Path) -> Result<Vec<u32>> {
	let entries = match std::fs::read_dir(dir) {
		Ok(entries) => entries,
		Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
		Err(e) => {
			return Err(RegistryError::Io {
				path: dir.to_path_buf(),
				source: e,
			})
		}
	};

	let mut asns = Vec::new();
	for entry in entries {
		let entry = entry.map_err(|e| RegistryError::Io {
			path: dir.to_path_buf(),
			source: e,
		})?;
		let name = entry.file_name();
		let Some(name) = name.to_str() else { continue };
		if let Some(num) = name.strip_prefix("AS").and_then(|n| n.parse::<u32>().ok()) {
			asns.push(num);
		}
	}
	asns.sort_unstable();
	Ok(asns)
}

async fn blocking<T, F>(f: F) -> Result<T>
where
	T: Send + 'static,
	F: FnOnce() -> Result<T> + Send + 'static,
{
	tokio::task::spawn_blocking(f)
		.await
		.map_err(|e| RegistryError::Task(e.to_string()))?
}

#[async_trait]
impl RegistrySource for FsRegistry {
	#[tracing::instrument(skip(self), fields(root = %self.root.display()))]
	async fn maintainer(&self, name: &str) -> Result<Option<RegistryObject>> {
		let path = self.maintainer_path(name);
		blocking(move || read_object(&path)).await
	}

	#[tracing::instrument(skip(self), fields(root = %self.root.display()))]
	async fn aut_num(&self, as_num: u32) -> Result<Option<RegistryObject>> {
		let path = self.aut_num_path(as_num);
		blocking(move || read_object(&path)).await
	}

	#[tracing::instrument(skip(self), fields(root = %self.root.display()))]
	async fn aut_nums(&self) -> Result<Vec<u32>> {
		let dir = self.aut_num_dir();
		blocking(move || list_aut_nums(&dir)).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::RegistryFixture;

	#[tokio::test]
	async fn test_missing_maintainer_is_none() {
		let dir = tempfile::tempdir().unwrap();
		let registry = FsRegistry::new(dir.path());
		assert!(registry.maintainer("ghost").await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_maintainer_file_name_is_uppercased() {
		let dir = tempfile::tempdir().unwrap();
		RegistryFixture::new(dir.path())
			.maintainer("alice", &["ssh-ed25519 AAAAC3NzaC1lZDI1NTE5"])
			.unwrap();
		let registry = FsRegistry::new(dir.path());

		let obj = registry.maintainer("alice").await.unwrap().unwrap();
		assert_eq!(obj.first("mntner"), Some("ALICE-MNT"));
	}

	#[tokio::test]
	async fn test_malformed_object_is_an_error() {
		let dir = tempfile::tempdir().unwrap();
		let fixture = RegistryFixture::new(dir.path());
		fixture.raw_maintainer("broken", "no colon here\n").unwrap();
		let registry = FsRegistry::new(dir.path());

		let err = registry.maintainer("broken").await.unwrap_err();
		assert!(matches!(err, RegistryError::Malformed { line: 1, .. }));
	}

	#[tokio::test]
	async fn test_aut_nums_sorted_and_filtered() {
		let dir = tempfile::tempdir().unwrap();
		let fixture = RegistryFixture::new(dir.path());
		fixture.aut_num(4242422222, "BOB").unwrap();
		fixture.aut_num(4242421111, "ALICE").unwrap();
		std::fs::write(dir.path().join("data/aut-num/README"), "x").unwrap();

		let registry = FsRegistry::new(dir.path());
		assert_eq!(
			registry.aut_nums().await.unwrap(),
			vec![4242421111, 4242422222]
		);
	}

	#[tokio::test]
	async fn test_aut_nums_without_directory() {
		let dir = tempfile::tempdir().unwrap();
		let registry = FsRegistry::new(dir.path());
		assert!(registry.aut_nums().await.unwrap().is_empty());
	}
}
