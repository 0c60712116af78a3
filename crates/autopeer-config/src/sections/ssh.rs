// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SSH listener configuration.

use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct SshConfig {
	pub listen_address: IpAddr,
	pub port: u16,
	/// OpenSSH-format private host key.
	pub host_key_path: PathBuf,
	/// Sent as the SSH authentication banner when present.
	pub motd_path: Option<PathBuf>,
	/// Idle connections are dropped after this many seconds.
	pub inactivity_timeout_secs: u64,
}

impl SshConfig {
	pub fn socket_addr(&self) -> SocketAddr {
		SocketAddr::new(self.listen_address, self.port)
	}
}

impl Default for SshConfig {
	fn default() -> Self {
		Self {
			listen_address: IpAddr::V6(Ipv6Addr::LOCALHOST),
			port: 4242,
			host_key_path: PathBuf::from("/etc/dn42-autopeer/ssh_host_ed25519_key"),
			motd_path: None,
			inactivity_timeout_secs: 900,
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SshConfigLayer {
	#[serde(default)]
	pub listen_address: Option<IpAddr>,
	#[serde(default)]
	pub port: Option<u16>,
	#[serde(default)]
	pub host_key_path: Option<PathBuf>,
	#[serde(default)]
	pub motd_path: Option<PathBuf>,
	#[serde(default)]
	pub inactivity_timeout_secs: Option<u64>,
}

impl SshConfigLayer {
	pub fn merge(&mut self, other: SshConfigLayer) {
		if other.listen_address.is_some() {
			self.listen_address = other.listen_address;
		}
		if other.port.is_some() {
			self.port = other.port;
		}
		if other.host_key_path.is_some() {
			self.host_key_path = other.host_key_path;
		}
		if other.motd_path.is_some() {
			self.motd_path = other.motd_path;
		}
		if other.inactivity_timeout_secs.is_some() {
			self.inactivity_timeout_secs = other.inactivity_timeout_secs;
		}
	}

	pub fn finalize(self) -> SshConfig {
		let defaults = SshConfig::default();
		SshConfig {
			listen_address: self.listen_address.unwrap_or(defaults.listen_address),
			port: self.port.unwrap_or(defaults.port),
			host_key_path: self.host_key_path.unwrap_or(defaults.host_key_path),
			motd_path: self.motd_path.or(defaults.motd_path),
			inactivity_timeout_secs: self
				.inactivity_timeout_secs
				.unwrap_or(defaults.inactivity_timeout_secs),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_socket_addr() {
		let config = SshConfigLayer::default().finalize();
		assert_eq!(config.socket_addr().to_string(), "[::1]:4242");
	}

	#[test]
	fn test_toml_layer() {
		let layer: SshConfigLayer =
			toml::from_str("listen_address = \"0.0.0.0\"\nport = 2222\n").unwrap();
		let config = layer.finalize();
		assert_eq!(config.socket_addr().to_string(), "0.0.0.0:2222");
		assert!(config.motd_path.is_none());
	}
}
