// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Settings for the command-pipe ("gaming") server.

use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct GamingConfig {
	/// Shell command whose stdio is bridged to each SSH channel.
	pub command: String,
	pub motd_path: Option<PathBuf>,
}

impl Default for GamingConfig {
	fn default() -> Self {
		Self {
			command: "advent".to_string(),
			motd_path: None,
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GamingConfigLayer {
	#[serde(default)]
	pub command: Option<String>,
	#[serde(default)]
	pub motd_path: Option<PathBuf>,
}

impl GamingConfigLayer {
	pub fn merge(&mut self, other: GamingConfigLayer) {
		if other.command.is_some() {
			self.command = other.command;
		}
		if other.motd_path.is_some() {
			self.motd_path = other.motd_path;
		}
	}

	pub fn finalize(self) -> GamingConfig {
		let defaults = GamingConfig::default();
		GamingConfig {
			command: self.command.unwrap_or(defaults.command),
			motd_path: self.motd_path.or(defaults.motd_path),
		}
	}
}
