// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Registry checkout location.

use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct RegistryConfig {
	/// Root of a dn42 registry checkout (the directory containing `data/`).
	pub path: PathBuf,
}

impl Default for RegistryConfig {
	fn default() -> Self {
		Self {
			path: PathBuf::from("./registry"),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistryConfigLayer {
	#[serde(default)]
	pub path: Option<PathBuf>,
}

impl RegistryConfigLayer {
	pub fn merge(&mut self, other: RegistryConfigLayer) {
		if other.path.is_some() {
			self.path = other.path;
		}
	}

	pub fn finalize(self) -> RegistryConfig {
		let defaults = RegistryConfig::default();
		RegistryConfig {
			path: self.path.unwrap_or(defaults.path),
		}
	}
}
