// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Build information for `dn42-autopeer version`.

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Format version info for display.
pub fn format_version_info() -> String {
	format!(
		"dn42-autopeer version: {}\n\
         Platform:              {}-{}",
		VERSION,
		std::env::consts::OS,
		std::env::consts::ARCH,
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_version_info_mentions_package_version() {
		let info = format_version_info();
		assert!(info.starts_with("dn42-autopeer version: "));
		assert!(info.contains(VERSION));
		assert_eq!(info.lines().count(), 2);
	}
}
