// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Static parameters of the local side of every peering.

use std::net::Ipv6Addr;

use ipnet::IpNet;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::secret::SecretString;

pub const DEFAULT_LOCAL_ASN: u32 = 4242420263;
pub const DEFAULT_BASE_PORT: u16 = 52000;
pub const DEFAULT_LINK_LOCAL_BASE: Ipv6Addr = Ipv6Addr::new(0xfe80, 0x0263, 0, 0, 0, 0, 0, 0);

/// Immutable peering parameters shared by every session.
#[derive(Debug, Clone)]
pub struct PeeringConfig {
	pub local_asn: u32,
	/// Public host name peers put in their WireGuard `Endpoint`.
	pub domain_name: String,
	pub wg_public_key: String,
	pub wg_private_key: Option<SecretString>,
	/// Tunnel addresses are carved from the low 32 bits of this prefix.
	pub link_local_base: Ipv6Addr,
	/// Link `id` listens on `base_port + id`.
	pub base_port: u16,
	pub reserved_networks: Vec<IpNet>,
}

impl Default for PeeringConfig {
	fn default() -> Self {
		Self {
			local_asn: DEFAULT_LOCAL_ASN,
			domain_name: "localhost".to_string(),
			wg_public_key: String::new(),
			wg_private_key: None,
			link_local_base: DEFAULT_LINK_LOCAL_BASE,
			base_port: DEFAULT_BASE_PORT,
			reserved_networks: Vec::new(),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PeeringConfigLayer {
	#[serde(default)]
	pub local_asn: Option<u32>,
	#[serde(default)]
	pub domain_name: Option<String>,
	#[serde(default)]
	pub wg_public_key: Option<String>,
	#[serde(default)]
	pub wg_private_key: Option<SecretString>,
	#[serde(default)]
	pub link_local_base: Option<Ipv6Addr>,
	#[serde(default)]
	pub base_port: Option<u16>,
	#[serde(default)]
	pub reserved_networks: Option<Vec<IpNet>>,
}

impl PeeringConfigLayer {
	pub fn merge(&mut self, other: PeeringConfigLayer) {
		if other.local_asn.is_some() {
			self.local_asn = other.local_asn;
		}
		if other.domain_name.is_some() {
			self.domain_name = other.domain_name;
		}
		if other.wg_public_key.is_some() {
			self.wg_public_key = other.wg_public_key;
		}
		if other.wg_private_key.is_some() {
			self.wg_private_key = other.wg_private_key;
		}
		if other.link_local_base.is_some() {
			self.link_local_base = other.link_local_base;
		}
		if other.base_port.is_some() {
			self.base_port = other.base_port;
		}
		if other.reserved_networks.is_some() {
			self.reserved_networks = other.reserved_networks;
		}
	}

	pub fn finalize(self) -> Result<PeeringConfig, ConfigError> {
		let defaults = PeeringConfig::default();
		let config = PeeringConfig {
			local_asn: self.local_asn.unwrap_or(defaults.local_asn),
			domain_name: self.domain_name.unwrap_or(defaults.domain_name),
			wg_public_key: self.wg_public_key.unwrap_or(defaults.wg_public_key),
			wg_private_key: self.wg_private_key,
			link_local_base: self.link_local_base.unwrap_or(defaults.link_local_base),
			base_port: self.base_port.unwrap_or(defaults.base_port),
			reserved_networks: self.reserved_networks.unwrap_or_default(),
		};
		config.validate()?;
		Ok(config)
	}
}

impl PeeringConfig {
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.local_asn == 0 {
			return Err(ConfigError::Validation(
				"peering.local_asn must be non-zero".to_string(),
			));
		}

		let segments = self.link_local_base.segments();
		if segments[0] & 0xffc0 != 0xfe80 {
			return Err(ConfigError::Validation(format!(
				"peering.link_local_base {} is not inside fe80::/10",
				self.link_local_base
			)));
		}
		if segments[6] != 0 || segments[7] != 0 {
			return Err(ConfigError::Validation(format!(
				"peering.link_local_base {} must have its low 32 bits zero",
				self.link_local_base
			)));
		}

		if self.base_port == u16::MAX {
			return Err(ConfigError::Validation(
				"peering.base_port leaves no room for link ports".to_string(),
			));
		}

		Ok(())
	}
}
