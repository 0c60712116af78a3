// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for the dn42 auto-peering service.
//!
//! Values are layered from built-in defaults, an optional TOML file and
//! `DN42_*` environment variables, in that order of precedence. The result
//! is resolved once at startup and shared read-only afterwards.
//!
//! ```ignore
//! use autopeer_config::load_config;
//!
//! let config = load_config()?;
//! println!("listening on {}", config.ssh.socket_addr());
//! ```

pub mod error;
pub mod layer;
pub mod secret;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::AutopeerConfigLayer;
pub use secret::{Secret, SecretString};
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use std::path::PathBuf;

use tracing::{debug, info};

/// Fully resolved service configuration.
#[derive(Debug, Clone, Default)]
pub struct AutopeerConfig {
	pub ssh: SshConfig,
	pub database: DatabaseConfig,
	pub registry: RegistryConfig,
	pub peering: PeeringConfig,
	pub output: OutputConfig,
	pub logging: LoggingConfig,
	pub gaming: GamingConfig,
}

/// Load configuration with the system config file
/// (`/etc/dn42-autopeer/config.toml`).
pub fn load_config() -> Result<AutopeerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<PathBuf>,
) -> Result<AutopeerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<AutopeerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = AutopeerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Resolve a merged layer, applying defaults and validation.
pub fn finalize(layer: AutopeerConfigLayer) -> Result<AutopeerConfig, ConfigError> {
	let ssh = layer.ssh.unwrap_or_default().finalize();
	let database = layer.database.unwrap_or_default().finalize();
	let registry = layer.registry.unwrap_or_default().finalize();
	let peering = layer.peering.unwrap_or_default().finalize()?;
	let output = layer.output.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();
	let gaming = layer.gaming.unwrap_or_default().finalize();

	info!(
		listen = %ssh.socket_addr(),
		database = %database.path.display(),
		registry = %registry.path.display(),
		local_asn = peering.local_asn,
		base_port = peering.base_port,
		reserved_networks = peering.reserved_networks.len(),
		"configuration loaded"
	);

	Ok(AutopeerConfig {
		ssh,
		database,
		registry,
		peering,
		output,
		logging,
		gaming,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_finalize_empty_layer_uses_defaults() {
		let config = finalize(AutopeerConfigLayer::default()).unwrap();
		assert_eq!(config.ssh.port, 4242);
		assert_eq!(config.peering.local_asn, 4242420263);
		assert_eq!(config.gaming.command, "advent");
	}

	#[test]
	fn test_finalize_full_toml() {
		let layer: AutopeerConfigLayer = toml::from_str(
			r#"
			[ssh]
			listen_address = "::"
			port = 22

			[registry]
			path = "/srv/registry"

			[peering]
			local_asn = 4242421234
			domain_name = "peer.example.dn42"
			link_local_base = "fe80:1234::"
			base_port = 40000
			reserved_networks = ["198.51.100.0/24"]

			[output]
			wireguard_dir = "/tmp/wg"
			bird_dir = "/tmp/bird"
			"#,
		)
		.unwrap();

		let config = finalize(layer).unwrap();
		assert_eq!(config.ssh.socket_addr().to_string(), "[::]:22");
		assert_eq!(config.registry.path, PathBuf::from("/srv/registry"));
		assert_eq!(config.peering.domain_name, "peer.example.dn42");
		assert_eq!(config.peering.base_port, 40000);
		assert_eq!(config.output.bird_dir, PathBuf::from("/tmp/bird"));
	}

	#[test]
	fn test_finalize_propagates_validation() {
		let layer: AutopeerConfigLayer =
			toml::from_str("[peering]\nlink_local_base = \"fd00::\"\n").unwrap();
		assert!(matches!(finalize(layer), Err(ConfigError::Validation(_))));
	}
}
