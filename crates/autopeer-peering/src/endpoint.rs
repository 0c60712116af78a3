// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Parsing of the fields a peer types in while requesting a link.
//!
//! Each parser returns [`PeeringError::Validation`] with a message fit to
//! show the user before asking again.

use std::net::{IpAddr, Ipv6Addr};

use crate::error::{PeeringError, Result};

fn invalid(message: impl Into<String>) -> PeeringError {
	PeeringError::Validation(message.into())
}

/// `4242421111` or `AS4242421111`.
pub fn parse_as_number(input: &str) -> Result<u32> {
	let trimmed = input.trim();
	let digits = trimmed
		.strip_prefix("AS")
		.or_else(|| trimmed.strip_prefix("as"))
		.unwrap_or(trimmed);
	match digits.parse::<u32>() {
		Ok(0) | Err(_) => Err(invalid(format!("{trimmed:?} is not an AS number"))),
		Ok(n) => Ok(n),
	}
}

/// An IP literal (IPv6 optionally in brackets) or a DNS host name.
/// Returns the canonical form that gets stored.
pub fn parse_endpoint_address(input: &str) -> Result<String> {
	let trimmed = input.trim();
	if trimmed.is_empty() {
		return Err(invalid("endpoint address must not be empty"));
	}

	let literal = trimmed
		.strip_prefix('[')
		.and_then(|s| s.strip_suffix(']'))
		.unwrap_or(trimmed);
	if let Ok(addr) = literal.parse::<IpAddr>() {
		return Ok(addr.to_string());
	}

	if is_hostname(trimmed) {
		Ok(trimmed.trim_end_matches('.').to_ascii_lowercase())
	} else {
		Err(invalid(format!(
			"{trimmed:?} is neither an IP address nor a host name"
		)))
	}
}

fn is_hostname(name: &str) -> bool {
	let name = name.strip_suffix('.').unwrap_or(name);
	if name.is_empty() || name.len() > 253 {
		return false;
	}
	let labels: Vec<&str> = name.split('.').collect();
	// A bare number is more likely a mistyped address than a host.
	if labels
		.last()
		.is_some_and(|tld| tld.chars().all(|c| c.is_ascii_digit()))
	{
		return false;
	}
	labels.iter().all(|label| {
		!label.is_empty()
			&& label.len() <= 63
			&& !label.starts_with('-')
			&& !label.ends_with('-')
			&& label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
	})
}

pub fn parse_port(input: &str) -> Result<u16> {
	match input.trim().parse::<u16>() {
		Ok(0) | Err(_) => Err(invalid(format!(
			"{:?} is not a port between 1 and 65535",
			input.trim()
		))),
		Ok(port) => Ok(port),
	}
}

/// A WireGuard public key. Treated as opaque beyond being a single
/// base64 token.
pub fn parse_public_key(input: &str) -> Result<String> {
	let key = input.trim();
	if key.is_empty() {
		return Err(invalid("public key must not be empty"));
	}
	if !key
		.chars()
		.all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '=')
	{
		return Err(invalid("public key must be base64"));
	}
	Ok(key.to_string())
}

/// Optional peer tunnel address. Empty input keeps the derived default.
pub fn parse_link_local(input: &str) -> Result<Option<Ipv6Addr>> {
	let trimmed = input.trim();
	if trimmed.is_empty() {
		return Ok(None);
	}
	let addr: Ipv6Addr = trimmed
		.parse()
		.map_err(|_| invalid(format!("{trimmed:?} is not an IPv6 address")))?;
	if addr.segments()[0] & 0xffc0 != 0xfe80 {
		return Err(invalid(format!("{addr} is not a link-local address")));
	}
	Ok(Some(addr))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_as_number_forms() {
		assert_eq!(parse_as_number("4242421111").unwrap(), 4242421111);
		assert_eq!(parse_as_number(" AS4242421111 ").unwrap(), 4242421111);
		assert_eq!(parse_as_number("as64512").unwrap(), 64512);
		assert!(parse_as_number("0").is_err());
		assert!(parse_as_number("AS").is_err());
		assert!(parse_as_number("99999999999").is_err());
	}

	#[test]
	fn test_endpoint_address_forms() {
		assert_eq!(parse_endpoint_address("203.0.113.5").unwrap(), "203.0.113.5");
		assert_eq!(
			parse_endpoint_address("[2001:DB8::1]").unwrap(),
			"2001:db8::1"
		);
		assert_eq!(
			parse_endpoint_address("Peer.Example.NET.").unwrap(),
			"peer.example.net"
		);
		assert!(parse_endpoint_address("").is_err());
		assert!(parse_endpoint_address("300.1.1.1").is_err());
		assert!(parse_endpoint_address("bad_host!").is_err());
		assert!(parse_endpoint_address("-lead.example").is_err());
	}

	#[test]
	fn test_port_range() {
		assert_eq!(parse_port("51820").unwrap(), 51820);
		assert!(parse_port("0").is_err());
		assert!(parse_port("65536").is_err());
		assert!(parse_port("http").is_err());
	}

	#[test]
	fn test_public_key() {
		let key = "qGYUFW0wX3sTn1LqPJYh2mC8pVp0nJ0z2Ch8x5xq6HM=";
		assert_eq!(parse_public_key(&format!(" {key} ")).unwrap(), key);
		assert!(parse_public_key("").is_err());
		assert!(parse_public_key("two words").is_err());
	}

	#[test]
	fn test_link_local() {
		assert_eq!(parse_link_local("").unwrap(), None);
		assert_eq!(
			parse_link_local("fe80::1234").unwrap(),
			Some("fe80::1234".parse().unwrap())
		);
		assert!(parse_link_local("2001:db8::1").is_err());
		assert!(parse_link_local("192.0.2.1").is_err());
	}
}
