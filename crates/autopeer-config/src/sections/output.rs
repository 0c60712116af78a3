// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Where generated WireGuard and BIRD files are written.

use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct OutputConfig {
	pub wireguard_dir: PathBuf,
	pub bird_dir: PathBuf,
}

impl Default for OutputConfig {
	fn default() -> Self {
		Self {
			wireguard_dir: PathBuf::from("/etc/wireguard/dn42"),
			bird_dir: PathBuf::from("/etc/bird/peers"),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfigLayer {
	#[serde(default)]
	pub wireguard_dir: Option<PathBuf>,
	#[serde(default)]
	pub bird_dir: Option<PathBuf>,
}

impl OutputConfigLayer {
	pub fn merge(&mut self, other: OutputConfigLayer) {
		if other.wireguard_dir.is_some() {
			self.wireguard_dir = other.wireguard_dir;
		}
		if other.bird_dir.is_some() {
			self.bird_dir = other.bird_dir;
		}
	}

	pub fn finalize(self) -> OutputConfig {
		let defaults = OutputConfig::default();
		OutputConfig {
			wireguard_dir: self.wireguard_dir.unwrap_or(defaults.wireguard_dir),
			bird_dir: self.bird_dir.unwrap_or(defaults.bird_dir),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_partial_override() {
		let layer = OutputConfigLayer {
			wireguard_dir: Some(PathBuf::from("/tmp/wg")),
			bird_dir: None,
		};
		let config = layer.finalize();
		assert_eq!(config.wireguard_dir, PathBuf::from("/tmp/wg"));
		assert_eq!(config.bird_dir, PathBuf::from("/etc/bird/peers"));
	}
}
