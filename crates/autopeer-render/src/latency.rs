// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! dn42 latency BGP community (64511, 1..=9).

use std::time::Duration;

use tokio::process::Command;

/// Community used when latency is unknown.
pub const UNKNOWN_LATENCY_COMMUNITY: u8 = 9;

/// Upper bounds (ms, inclusive) for communities 1 through 8.
const THRESHOLDS_MS: [f64; 8] = [2.7, 7.3, 20.0, 55.0, 148.0, 403.0, 1097.0, 2981.0];

pub fn latency_community(latency_ms: Option<f64>) -> u8 {
	let Some(ms) = latency_ms.filter(|ms| ms.is_finite() && *ms >= 0.0) else {
		return UNKNOWN_LATENCY_COMMUNITY;
	};
	THRESHOLDS_MS
		.iter()
		.position(|bound| ms <= *bound)
		.map(|idx| idx as u8 + 1)
		.unwrap_or(UNKNOWN_LATENCY_COMMUNITY)
}

/// Average round trip from `ping -c 4`, or `None` if the host does not
/// answer in time.
#[tracing::instrument]
pub async fn probe_latency(host: &str) -> Option<f64> {
	let run = Command::new("ping")
		.args(["-c", "4", "-q", host])
		.kill_on_drop(true)
		.output();

	let output = match tokio::time::timeout(Duration::from_secs(15), run).await {
		Ok(Ok(output)) if output.status.success() => output,
		Ok(Ok(_)) => return None,
		Ok(Err(e)) => {
			tracing::warn!(error = %e, "failed to run ping");
			return None;
		}
		Err(_) => {
			tracing::debug!("ping timed out");
			return None;
		}
	};

	parse_ping_average(&String::from_utf8_lossy(&output.stdout))
}

/// Extract `avg` from a `rtt min/avg/max/mdev = a/b/c/d ms` summary line.
pub fn parse_ping_average(stdout: &str) -> Option<f64> {
	let line = stdout
		.lines()
		.find(|l| l.contains("min/avg/max"))?;
	let values = line.split('=').nth(1)?.trim();
	values.split('/').nth(1)?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_community_buckets() {
		assert_eq!(latency_community(None), 9);
		assert_eq!(latency_community(Some(0.4)), 1);
		assert_eq!(latency_community(Some(2.7)), 1);
		assert_eq!(latency_community(Some(2.71)), 2);
		assert_eq!(latency_community(Some(19.9)), 3);
		assert_eq!(latency_community(Some(55.0)), 4);
		assert_eq!(latency_community(Some(100.0)), 5);
		assert_eq!(latency_community(Some(403.0)), 6);
		assert_eq!(latency_community(Some(1000.0)), 7);
		assert_eq!(latency_community(Some(2981.0)), 8);
		assert_eq!(latency_community(Some(5000.0)), 9);
		assert_eq!(latency_community(Some(f64::NAN)), 9);
	}

	#[test]
	fn test_parse_ping_average() {
		let linux = "--- 203.0.113.5 ping statistics ---\n4 packets transmitted, 4 received, 0% packet loss, time 3004ms\nrtt min/avg/max/mdev = 10.100/12.345/15.000/1.000 ms\n";
		assert_eq!(parse_ping_average(linux), Some(12.345));

		let bsd = "round-trip min/avg/max/stddev = 1.0/2.5/4.0/0.5 ms\n";
		assert_eq!(parse_ping_average(bsd), Some(2.5));

		assert_eq!(parse_ping_average("100% packet loss\n"), None);
	}
}
