// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! WireGuard `wg-quick` files for both ends of a link.

use crate::context::{join_host_port, LinkContext};

const ALLOWED_IPS: &str = "172.16.0.0/12, 10.0.0.0/8, fd00::/8, fe80::/10";
const KEEPALIVE_SECS: u16 = 30;

/// Placeholder the remote operator replaces with their own key.
pub const PEER_PRIVATE_KEY_PLACEHOLDER: &str = "**REPLACEME**";

/// Our side: listens on the derived port and dials the peer's endpoint.
pub fn render_local(ctx: &LinkContext, private_key: &str) -> String {
	format!(
		"[Interface]
PrivateKey = {private_key}
ListenPort = {port}
PostUp = /sbin/ip addr add dev %i {local}/128 peer {peer}/128
Table = off

[Peer]
PublicKey = {peer_key}
Endpoint = {endpoint}
PersistentKeepalive = {KEEPALIVE_SECS}
AllowedIPs = {ALLOWED_IPS}
",
		port = ctx.local_port,
		local = ctx.local_address,
		peer = ctx.peer_address,
		peer_key = ctx.peer_public_key,
		endpoint = ctx.peer_endpoint,
	)
}

/// Suggested file for the remote operator, pointing back at this server.
pub fn render_peer(ctx: &LinkContext, local_public_key: &str, domain_name: &str) -> String {
	format!(
		"[Interface]
PrivateKey = {PEER_PRIVATE_KEY_PLACEHOLDER}
ListenPort = {port}
PostUp = /sbin/ip addr add dev %i {peer}/128 peer {local}/128
Table = off

[Peer]
PublicKey = {local_public_key}
Endpoint = {endpoint}
PersistentKeepalive = {KEEPALIVE_SECS}
AllowedIPs = {ALLOWED_IPS}
",
		port = ctx.peer_port,
		peer = ctx.peer_address,
		local = ctx.local_address,
		endpoint = join_host_port(domain_name, ctx.local_port),
	)
}
