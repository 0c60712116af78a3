// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
	#[error("local WireGuard private key is not configured")]
	MissingPrivateKey,

	#[error("link id {id} has no port below 65536 with the configured base port")]
	PortOverflow { id: u16 },

	#[error("invalid version name {0:?}")]
	InvalidVersion(String),

	#[error("I/O error on {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
}

pub type Result<T> = std::result::Result<T, RenderError>;

pub(crate) fn io_err(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> RenderError {
	let path = path.into();
	move |source| RenderError::Io { path, source }
}
