// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Link store configuration.

use std::path::PathBuf;

use serde::Deserialize;

const DEFAULT_PATH: &str = "./peering.db";

/// Database configuration (runtime, fully resolved).
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
	pub path: PathBuf,
}

impl Default for DatabaseConfig {
	fn default() -> Self {
		Self {
			path: PathBuf::from(DEFAULT_PATH),
		}
	}
}

/// Database configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfigLayer {
	#[serde(default)]
	pub path: Option<PathBuf>,
}

impl DatabaseConfigLayer {
	pub fn merge(&mut self, other: DatabaseConfigLayer) {
		if other.path.is_some() {
			self.path = other.path;
		}
	}

	pub fn finalize(self) -> DatabaseConfig {
		DatabaseConfig {
			path: self.path.unwrap_or_else(|| PathBuf::from(DEFAULT_PATH)),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_path() {
		let config = DatabaseConfigLayer::default().finalize();
		assert_eq!(config.path, PathBuf::from("./peering.db"));
	}

	#[test]
	fn test_merge_overrides() {
		let mut base = DatabaseConfigLayer::default();
		base.merge(DatabaseConfigLayer {
			path: Some(PathBuf::from("/var/lib/autopeer/links.db")),
		});
		assert_eq!(
			base.finalize().path,
			PathBuf::from("/var/lib/autopeer/links.db")
		);
	}
}
