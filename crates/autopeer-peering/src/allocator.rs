// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Link id to tunnel address/port mapping, and endpoint screening.
//!
//! For base `fe80:263::` and link id `0x0a`:
//! - local tunnel address `fe80:263::1:a`
//! - default peer tunnel address `fe80:263::2:a`
//! - local listen port `base_port + 10`

use std::net::{IpAddr, Ipv6Addr};

use autopeer_config::PeeringConfig;
use autopeer_db::{first_free_id, LinkStore};
use ipnet::IpNet;

use crate::error::{PeeringError, Result};

const HOST_MASK: u128 = 0xFFFF_FFFF;
const ROLE_SHIFT: u32 = 16;
const ROLE_LOCAL: u128 = 1;
const ROLE_PEER: u128 = 2;
const ID_MASK: u128 = 0xFFFF;

/// Networks that can never carry a tunnel endpoint.
const NON_ROUTABLE: &[&str] = &[
	"0.0.0.0/8",
	"10.0.0.0/8",
	"127.0.0.0/8",
	"169.254.0.0/16",
	"172.16.0.0/12",
	"192.168.0.0/16",
	"224.0.0.0/4",
	"240.0.0.0/4",
	"::/128",
	"::1/128",
	"fc00::/7",
	"fe80::/10",
	"ff00::/8",
];

#[derive(Debug, Clone)]
pub struct LinkAllocator {
	link_local_base: Ipv6Addr,
	base_port: u16,
	reserved: Vec<IpNet>,
	non_routable: Vec<IpNet>,
	local_addrs: Vec<IpAddr>,
}

impl LinkAllocator {
	pub fn new(link_local_base: Ipv6Addr, base_port: u16, reserved: Vec<IpNet>) -> Self {
		let non_routable = NON_ROUTABLE
			.iter()
			.filter_map(|net| net.parse().ok())
			.collect();
		Self {
			link_local_base,
			base_port,
			reserved,
			non_routable,
			local_addrs: interface_addrs(),
		}
	}

	/// Replace the addresses treated as belonging to this node.
	pub fn with_local_addrs(mut self, addrs: Vec<IpAddr>) -> Self {
		self.local_addrs = addrs;
		self
	}

	pub fn from_config(config: &PeeringConfig) -> Self {
		Self::new(
			config.link_local_base,
			config.base_port,
			config.reserved_networks.clone(),
		)
	}

	/// Largest id whose derived port still fits in a `u16`.
	pub fn max_id(&self) -> u16 {
		u16::MAX - self.base_port
	}

	fn compose(&self, role: u128, id: u16) -> Ipv6Addr {
		let base = u128::from(self.link_local_base) & !HOST_MASK;
		Ipv6Addr::from(base | (role << ROLE_SHIFT) | u128::from(id))
	}

	/// Local end of the tunnel for link `id`.
	pub fn derive_address(&self, id: u16) -> Ipv6Addr {
		self.compose(ROLE_LOCAL, id)
	}

	/// Peer end of the tunnel for link `id`, used when the peer did not
	/// choose its own.
	pub fn derive_peer_address(&self, id: u16) -> Ipv6Addr {
		self.compose(ROLE_PEER, id)
	}

	/// Local listen port for link `id`. `None` past [`Self::max_id`].
	pub fn derive_port(&self, id: u16) -> Option<u16> {
		self.base_port.checked_add(id)
	}

	pub fn id_from_address(&self, addr: Ipv6Addr) -> Option<u16> {
		let bits = u128::from(addr);
		let base = u128::from(self.link_local_base) & !HOST_MASK;
		if bits & !HOST_MASK != base || (bits >> ROLE_SHIFT) & ID_MASK != ROLE_LOCAL {
			return None;
		}
		let id = (bits & ID_MASK) as u16;
		(id != 0).then_some(id)
	}

	pub fn id_from_port(&self, port: u16) -> Option<u16> {
		port.checked_sub(self.base_port).filter(|id| *id != 0)
	}

	/// Smallest id not used by any stored link.
	pub async fn next_id(&self, store: &dyn LinkStore) -> Result<u16> {
		let used = store.used_ids().await?;
		first_free_id(&used, self.max_id()).ok_or(PeeringError::PoolExhausted {
			max_id: self.max_id(),
		})
	}

	/// The configured reserved network containing `addr`, if any.
	pub fn reserved_network(&self, addr: IpAddr) -> Option<IpNet> {
		let addr = canonical(addr);
		self.reserved.iter().find(|net| net.contains(&addr)).copied()
	}

	pub fn check_reserved(&self, addr: IpAddr) -> bool {
		self.reserved_network(addr).is_some()
	}

	pub fn is_non_routable(&self, addr: IpAddr) -> bool {
		let addr = canonical(addr);
		self.non_routable.iter().any(|net| net.contains(&addr))
	}

	pub fn is_local(&self, addr: IpAddr) -> bool {
		let addr = canonical(addr);
		self.local_addrs.iter().any(|local| canonical(*local) == addr)
	}

	/// Resolve a peer-supplied endpoint and refuse it if any address it
	/// maps to is reserved, not publicly routable, or one of our own.
	#[tracing::instrument(skip(self))]
	pub async fn screen_endpoint(&self, host: &str, port: u16) -> Result<Vec<IpAddr>> {
		let addrs = resolve(host, port).await?;
		for addr in &addrs {
			if let Some(network) = self.reserved_network(*addr) {
				tracing::info!(%addr, %network, "endpoint rejected: reserved network");
				return Err(PeeringError::ReservedNetwork {
					addr: *addr,
					network,
				});
			}
			if self.is_non_routable(*addr) {
				return Err(PeeringError::Validation(format!(
					"endpoint {addr} is not a public address"
				)));
			}
			if self.is_local(*addr) {
				tracing::info!(%addr, "endpoint rejected: address of this node");
				return Err(PeeringError::Validation(format!(
					"endpoint {addr} is an address of this node"
				)));
			}
		}
		Ok(addrs)
	}
}

/// Addresses configured on this host's interfaces. Empty if they cannot be
/// enumerated.
fn interface_addrs() -> Vec<IpAddr> {
	match if_addrs::get_if_addrs() {
		Ok(interfaces) => interfaces.iter().map(|iface| iface.ip()).collect(),
		Err(e) => {
			tracing::warn!(error = %e, "cannot list local interface addresses");
			Vec::new()
		}
	}
}

/// IPv4-mapped IPv6 addresses are checked as IPv4.
fn canonical(addr: IpAddr) -> IpAddr {
	match addr {
		IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
			Some(v4) => IpAddr::V4(v4),
			None => IpAddr::V6(v6),
		},
		v4 => v4,
	}
}

async fn resolve(host: &str, port: u16) -> Result<Vec<IpAddr>> {
	let literal = host.trim_start_matches('[').trim_end_matches(']');
	if let Ok(addr) = literal.parse::<IpAddr>() {
		return Ok(vec![addr]);
	}

	let addrs: Vec<IpAddr> = tokio::net::lookup_host((host, port))
		.await
		.map_err(|e| PeeringError::Validation(format!("cannot resolve {host}: {e}")))?
		.map(|sa| sa.ip())
		.collect();

	if addrs.is_empty() {
		return Err(PeeringError::Validation(format!(
			"{host} does not resolve to any address"
		)));
	}
	Ok(addrs)
}
