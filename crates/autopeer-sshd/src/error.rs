// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::net::SocketAddr;
use std::path::PathBuf;

use autopeer_shell::ShellError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SshdError {
	#[error("cannot load host key {path}: {message}")]
	HostKey { path: PathBuf, message: String },

	#[error("cannot read banner {path}: {source}")]
	Banner {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("cannot listen on {addr}: {source}")]
	Bind {
		addr: SocketAddr,
		#[source]
		source: std::io::Error,
	},

	#[error("SSH protocol error: {0}")]
	Ssh(#[from] russh::Error),

	#[error("channel I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("shell error: {0}")]
	Shell(#[from] ShellError),

	#[error("command pipe error: {0}")]
	Pipe(String),
}

pub type Result<T> = std::result::Result<T, SshdError>;
