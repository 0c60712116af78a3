// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::net::{IpAddr, Ipv6Addr};
use std::path::PathBuf;
use std::str::FromStr;

use ipnet::IpNet;
use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::AutopeerConfigLayer;
use crate::secret::load_secret_env;
use crate::sections::{
	DatabaseConfigLayer, GamingConfigLayer, LoggingConfigLayer, OutputConfigLayer,
	PeeringConfigLayer, RegistryConfigLayer, SshConfigLayer,
};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<AutopeerConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<AutopeerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(AutopeerConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file is not an error.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/dn42-autopeer/config.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<AutopeerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(AutopeerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: AutopeerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Variable names match the ones dn42 operators already use for this
/// service (`DN42_*`).
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<AutopeerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(AutopeerConfigLayer {
			ssh: Some(load_ssh_from_env()?),
			database: Some(DatabaseConfigLayer {
				path: env_var("DN42_DB_PATH").map(PathBuf::from),
			}),
			registry: Some(RegistryConfigLayer {
				path: env_var("DN42_REGISTRY_DIRECTORY").map(PathBuf::from),
			}),
			peering: Some(load_peering_from_env()?),
			output: Some(OutputConfigLayer {
				wireguard_dir: env_var("DN42_WG_CONFIG_DIR").map(PathBuf::from),
				bird_dir: env_var("DN42_BIRD_CONFIG_DIR").map(PathBuf::from),
			}),
			logging: Some(LoggingConfigLayer {
				level: env_var("DN42_LOG_LEVEL"),
			}),
			gaming: Some(GamingConfigLayer {
				command: env_var("DN42_GAMING_COMMAND"),
				motd_path: env_var("DN42_GAMING_MOTD_PATH").map(PathBuf::from),
			}),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_parse<T: FromStr>(name: &str, what: &str) -> Result<Option<T>, ConfigError> {
	match env_var(name) {
		Some(v) => parse_value(name, what, &v).map(Some),
		None => Ok(None),
	}
}

fn parse_value<T: FromStr>(key: &str, what: &str, value: &str) -> Result<T, ConfigError> {
	value.trim().parse().map_err(|_| ConfigError::InvalidValue {
		key: key.to_string(),
		message: format!("invalid {what} '{value}'"),
	})
}

/// Parse a comma separated list of CIDR networks. Empty entries are skipped.
pub fn parse_network_list(key: &str, value: &str) -> Result<Vec<IpNet>, ConfigError> {
	value
		.split(',')
		.map(str::trim)
		.filter(|s| !s.is_empty())
		.map(|s| parse_value(key, "network", s))
		.collect()
}

fn load_ssh_from_env() -> Result<SshConfigLayer, ConfigError> {
	Ok(SshConfigLayer {
		listen_address: env_parse::<IpAddr>("DN42_SSH_LISTEN_ADDRESS", "IP address")?,
		port: env_parse::<u16>("DN42_SSH_PORT", "u16 value")?,
		host_key_path: env_var("DN42_SSH_HOST_KEY").map(PathBuf::from),
		motd_path: env_var("DN42_SSH_MOTD_PATH").map(PathBuf::from),
		inactivity_timeout_secs: env_parse::<u64>("DN42_SSH_INACTIVITY_TIMEOUT_SECS", "u64 value")?,
	})
}

fn load_peering_from_env() -> Result<PeeringConfigLayer, ConfigError> {
	let reserved_networks = match env_var("DN42_RESERVED_NETWORK") {
		Some(v) => Some(parse_network_list("DN42_RESERVED_NETWORK", &v)?),
		None => None,
	};

	Ok(PeeringConfigLayer {
		local_asn: env_parse::<u32>("DN42_ASN", "AS number")?,
		domain_name: env_var("DN42_SERVER"),
		wg_public_key: env_var("DN42_WG_PUB_KEY"),
		wg_private_key: load_secret_env("DN42_WG_PRIV_KEY")?,
		link_local_base: env_parse::<Ipv6Addr>("DN42_WG_LINK_LOCAL", "IPv6 address")?,
		base_port: env_parse::<u16>("DN42_WG_BASE_PORT", "u16 value")?,
		reserved_networks,
	})
}
