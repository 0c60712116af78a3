// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::Path;

use crate::error::{Result, SshdError};

/// Line endings normalised to CRLF, as terminals expect from a banner.
pub fn format_banner(text: &str) -> String {
	let mut out = String::with_capacity(text.len() + 16);
	for line in text.lines() {
		out.push_str(line);
		out.push_str("\r\n");
	}
	out
}

/// Read the message of the day once at startup. The text lives for the
/// rest of the process because `russh` wants a `&'static str`.
pub fn load_banner(path: Option<&Path>) -> Result<Option<&'static str>> {
	let Some(path) = path else {
		return Ok(None);
	};
	let text = std::fs::read_to_string(path).map_err(|source| SshdError::Banner {
		path: path.to_path_buf(),
		source,
	})?;
	Ok(Some(Box::leak(format_banner(&text).into_boxed_str())))
}
