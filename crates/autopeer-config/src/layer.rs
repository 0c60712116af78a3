// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration layer for merging from multiple sources.

use serde::Deserialize;

use crate::sections::{
	DatabaseConfigLayer, GamingConfigLayer, LoggingConfigLayer, OutputConfigLayer,
	PeeringConfigLayer, RegistryConfigLayer, SshConfigLayer,
};

/// Service configuration layer - all fields are Option for merging.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AutopeerConfigLayer {
	#[serde(default)]
	pub ssh: Option<SshConfigLayer>,
	#[serde(default)]
	pub database: Option<DatabaseConfigLayer>,
	#[serde(default)]
	pub registry: Option<RegistryConfigLayer>,
	#[serde(default)]
	pub peering: Option<PeeringConfigLayer>,
	#[serde(default)]
	pub output: Option<OutputConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
	#[serde(default)]
	pub gaming: Option<GamingConfigLayer>,
}

impl AutopeerConfigLayer {
	/// Merge another layer into this one. Other layer takes precedence.
	pub fn merge(&mut self, other: AutopeerConfigLayer) {
		merge_option(&mut self.ssh, other.ssh, SshConfigLayer::merge);
		merge_option(
			&mut self.database,
			other.database,
			DatabaseConfigLayer::merge,
		);
		merge_option(
			&mut self.registry,
			other.registry,
			RegistryConfigLayer::merge,
		);
		merge_option(&mut self.peering, other.peering, PeeringConfigLayer::merge);
		merge_option(&mut self.output, other.output, OutputConfigLayer::merge);
		merge_option(&mut self.logging, other.logging, LoggingConfigLayer::merge);
		merge_option(&mut self.gaming, other.gaming, GamingConfigLayer::merge);
	}
}

fn merge_option<T>(target: &mut Option<T>, other: Option<T>, merge: fn(&mut T, T)) {
	match (target.as_mut(), other) {
		(Some(existing), Some(incoming)) => merge(existing, incoming),
		(None, Some(incoming)) => *target = Some(incoming),
		(_, None) => {}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::path::PathBuf;

	#[test]
	fn test_later_layer_wins() {
		let mut base: AutopeerConfigLayer = toml::from_str(
			r#"
			[ssh]
			port = 2222

			[database]
			path = "/a.db"
			"#,
		)
		.unwrap();

		let env = AutopeerConfigLayer {
			database: Some(DatabaseConfigLayer {
				path: Some(PathBuf::from("/b.db")),
			}),
			..Default::default()
		};
		base.merge(env);

		assert_eq!(base.ssh.as_ref().and_then(|s| s.port), Some(2222));
		assert_eq!(
			base.database.and_then(|d| d.path),
			Some(PathBuf::from("/b.db"))
		);
	}

	#[test]
	fn test_missing_sections_stay_none() {
		let mut base = AutopeerConfigLayer::default();
		base.merge(AutopeerConfigLayer::default());
		assert!(base.ssh.is_none());
		assert!(base.peering.is_none());
	}
}
