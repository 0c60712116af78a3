// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
	#[error("invalid maintainer name: {0:?}")]
	InvalidName(String),

	#[error("failed to read registry object {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("malformed registry object {path} at line {line}")]
	Malformed { path: PathBuf, line: usize },

	#[error("registry task failed: {0}")]
	Task(String),
}

pub type Result<T> = std::result::Result<T, RegistryError>;
