// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Helpers that write a minimal registry layout for tests.

use std::io;
use std::path::{Path, PathBuf};

pub struct RegistryFixture {
	root: PathBuf,
}

impl RegistryFixture {
	pub fn new(root: impl AsRef<Path>) -> Self {
		Self {
			root: root.as_ref().to_path_buf(),
		}
	}

	/// Write `data/mntner/<NAME>-MNT` with one `auth:` line per key.
	pub fn maintainer(&self, name: &str, keys: &[&str]) -> io::Result<()> {
		let handle = format!("{}-MNT", name.to_ascii_uppercase());
		let mut text = format!("mntner:             {handle}\n");
		for key in keys {
			text.push_str(&format!("auth:               {key}\n"));
		}
		text.push_str("source:             DN42\n");
		self.raw_maintainer(name, &text)
	}

	pub fn raw_maintainer(&self, name: &str, text: &str) -> io::Result<()> {
		let dir = self.root.join("data").join("mntner");
		std::fs::create_dir_all(&dir)?;
		std::fs::write(
			dir.join(format!("{}-MNT", name.to_ascii_uppercase())),
			text,
		)
	}

	/// Write `data/aut-num/AS<n>` maintained by `<MAINTAINER>-MNT`.
	pub fn aut_num(&self, as_num: u32, maintainer: &str) -> io::Result<()> {
		let dir = self.root.join("data").join("aut-num");
		std::fs::create_dir_all(&dir)?;
		let text = format!(
			"aut-num:            AS{as_num}\nas-name:            TEST-AS\nmnt-by:             {}-MNT\nsource:             DN42\n",
			maintainer.to_ascii_uppercase()
		);
		std::fs::write(dir.join(format!("AS{as_num}")), text)
	}
}
