// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Parser for registry text objects.
//!
//! Objects are `key: value` lines. A line starting with whitespace or `+`
//! continues the previous value. Blank lines and `#`/`%` comments are
//! ignored.

/// One parsed registry object, attributes kept in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryObject {
	attributes: Vec<(String, String)>,
}

/// Line number (1-based) of the first line that is neither an attribute
/// nor a continuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseError {
	pub line: usize,
}

impl RegistryObject {
	pub fn parse(text: &str) -> Result<Self, ParseError> {
		let mut attributes: Vec<(String, String)> = Vec::new();

		for (idx, raw) in text.lines().enumerate() {
			let line = raw.trim_end();
			if line.trim().is_empty() || line.starts_with('#') || line.starts_with('%') {
				continue;
			}

			if line.starts_with(' ') || line.starts_with('\t') || line.starts_with('+') {
				let Some((_, value)) = attributes.last_mut() else {
					return Err(ParseError { line: idx + 1 });
				};
				let extra = line.trim_start_matches('+').trim();
				if !extra.is_empty() {
					if !value.is_empty() {
						value.push(' ');
					}
					value.push_str(extra);
				}
				continue;
			}

			let Some((key, value)) = line.split_once(':') else {
				return Err(ParseError { line: idx + 1 });
			};
			let key = key.trim();
			if key.is_empty() || key.contains(char::is_whitespace) {
				return Err(ParseError { line: idx + 1 });
			}
			attributes.push((key.to_ascii_lowercase(), value.trim().to_string()));
		}

		Ok(Self { attributes })
	}

	/// All values of `key`, in file order.
	pub fn values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
		self.attributes
			.iter()
			.filter(move |(k, _)| k.eq_ignore_ascii_case(key))
			.map(|(_, v)| v.as_str())
	}

	pub fn first<'a>(&'a self, key: &'a str) -> Option<&'a str> {
		self.values(key).next()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const MNTNER: &str = "\
mntner:             ALICE-MNT
admin-c:            ALICE-DN42
auth:               ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIHVhbGljZQ
auth:               pgp-fingerprint 0123456789ABCDEF
remarks:            first line
                    second line
+                   third line
source:             DN42
";

	#[test]
	fn test_parses_repeated_attributes() {
		let obj = RegistryObject::parse(MNTNER).unwrap();
		assert_eq!(obj.first("mntner"), Some("ALICE-MNT"));
		assert_eq!(obj.values("auth").count(), 2);
	}

	#[test]
	fn test_continuation_lines_are_joined() {
		let obj = RegistryObject::parse(MNTNER).unwrap();
		assert_eq!(
			obj.first("remarks"),
			Some("first line second line third line")
		);
	}

	#[test]
	fn test_keys_are_case_insensitive() {
		let obj = RegistryObject::parse("Mnt-By: BOB-MNT\n").unwrap();
		assert_eq!(obj.first("mnt-by"), Some("BOB-MNT"));
	}

	#[test]
	fn test_garbage_line_is_reported() {
		let err = RegistryObject::parse("aut-num: AS1\nthis is not an attribute\n").unwrap_err();
		assert_eq!(err.line, 2);
	}

	#[test]
	fn test_leading_continuation_is_rejected() {
		assert!(RegistryObject::parse("   dangling\n").is_err());
	}
}
