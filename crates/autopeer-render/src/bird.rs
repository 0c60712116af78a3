// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! BIRD 2 protocol snippets.
//!
//! The local snippet relies on the `dnpeers` template and the
//! `dn42_import_filter`/`dn42_export_filter` functions (plus their `_v6`
//! variants) and the `BANDWIDTH`/`LINKTYPE` constants from the main BIRD
//! config.

use crate::context::LinkContext;

/// Protocol name on our side, e.g. `ebgp_as4242421111_v6`.
pub fn protocol_name(peer_asn: u32) -> String {
	format!("ebgp_as{peer_asn}_v6")
}

pub fn render_local(ctx: &LinkContext, latency_community: u8) -> String {
	let asn = ctx.peer_asn;
	format!(
		"define AS{asn}_LATENCY = {latency_community};

protocol bgp {name} from dnpeers {{
    neighbor {peer} as {asn};
    interface \"{iface}\";

    ipv4 {{
        import where dn42_import_filter(AS{asn}_LATENCY, BANDWIDTH, LINKTYPE);
        export where dn42_export_filter(AS{asn}_LATENCY, BANDWIDTH, LINKTYPE);
        extended next hop on;
    }};

    ipv6 {{
        import where dn42_import_filter_v6(AS{asn}_LATENCY, BANDWIDTH, LINKTYPE);
        export where dn42_export_filter_v6(AS{asn}_LATENCY, BANDWIDTH, LINKTYPE);
        extended next hop off;
    }};
}}
",
		name = protocol_name(asn),
		peer = ctx.peer_address,
		iface = ctx.interface(),
	)
}

/// Suggested snippet for the remote operator.
pub fn render_peer(ctx: &LinkContext) -> String {
	format!(
		"protocol bgp dn42_as{local_asn} {{
    local as {peer_asn};
    neighbor {local} as {local_asn};
    path metric 1;
    interface \"wg-as{local_asn}\";

    ipv4 {{
        extended next hop on;
        import limit 9000 action block;
        import table;
    }};

    ipv6 {{
        extended next hop off;
        import limit 9000 action block;
        import table;
    }};
}}
",
		local_asn = ctx.local_asn,
		peer_asn = ctx.peer_asn,
		local = ctx.local_address,
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn ctx() -> LinkContext {
		LinkContext {
			id: 10,
			peer_asn: 4242421111,
			local_asn: 4242420263,
			local_address: "fe80:263::1:a".parse().unwrap(),
			peer_address: "fe80:263::2:a".parse().unwrap(),
			local_port: 52010,
			peer_public_key: "k".into(),
			peer_endpoint: "203.0.113.5:51820".into(),
			peer_port: 51820,
		}
	}

	#[test]
	fn test_local_snippet() {
		let text = render_local(&ctx(), 3);
		assert!(text.starts_with("define AS4242421111_LATENCY = 3;\n"));
		assert!(text.contains("protocol bgp ebgp_as4242421111_v6 from dnpeers {"));
		assert!(text.contains("neighbor fe80:263::2:a as 4242421111;"));
		assert!(text.contains("interface \"wg-as4242421111\";"));
		assert!(text.contains("dn42_export_filter_v6(AS4242421111_LATENCY, BANDWIDTH, LINKTYPE)"));
	}

	#[test]
	fn test_peer_snippet() {
		let text = render_peer(&ctx());
		assert!(text.contains("local as 4242421111;"));
		assert!(text.contains("neighbor fe80:263::1:a as 4242420263;"));
		assert!(text.contains("import limit 9000 action block;"));
	}
}
