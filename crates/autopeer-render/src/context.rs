// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::net::{IpAddr, Ipv6Addr};

use autopeer_config::PeeringConfig;
use autopeer_db::PeeringLink;
use autopeer_peering::LinkAllocator;

use crate::error::{RenderError, Result};

/// Both ends of one link, resolved from the stored row and static
/// parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkContext {
	pub id: u16,
	pub peer_asn: u32,
	pub local_asn: u32,
	pub local_address: Ipv6Addr,
	pub peer_address: Ipv6Addr,
	pub local_port: u16,
	pub peer_public_key: String,
	/// `host:port`, with IPv6 literals bracketed.
	pub peer_endpoint: String,
	pub peer_port: u16,
}

impl LinkContext {
	pub fn new(link: &PeeringLink, config: &PeeringConfig, allocator: &LinkAllocator) -> Result<Self> {
		let local_port = allocator
			.derive_port(link.id)
			.ok_or(RenderError::PortOverflow { id: link.id })?;

		Ok(Self {
			id: link.id,
			peer_asn: link.as_num,
			local_asn: config.local_asn,
			local_address: allocator.derive_address(link.id),
			peer_address: link
				.peer_link_local
				.unwrap_or_else(|| allocator.derive_peer_address(link.id)),
			local_port,
			peer_public_key: link.wg_pub_key.clone(),
			peer_endpoint: join_host_port(&link.wg_endpoint_addr, link.wg_endpoint_port),
			peer_port: link.wg_endpoint_port,
		})
	}

	/// Interface name on this side, also the WireGuard file stem.
	pub fn interface(&self) -> String {
		format!("wg-as{}", self.peer_asn)
	}
}

pub fn join_host_port(host: &str, port: u16) -> String {
	match host.parse::<IpAddr>() {
		Ok(IpAddr::V6(v6)) => format!("[{v6}]:{port}"),
		_ => format!("{host}:{port}"),
	}
}
