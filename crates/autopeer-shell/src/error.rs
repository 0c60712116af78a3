// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

#[derive(Debug, thiserror::Error)]
pub enum ShellError {
	#[error("terminal I/O failed: {0}")]
	Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ShellError>;
