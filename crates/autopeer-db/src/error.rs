// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

#[derive(Debug, thiserror::Error)]
pub enum DbError {
	#[error("Database error: {0}")]
	Sqlx(#[from] sqlx::Error),

	#[error("link id {0} is already in use")]
	DuplicateId(u16),

	#[error("AS{0} already has a peering link")]
	DuplicateAsNum(u32),

	#[error("{field} out of range: {value}")]
	OutOfRange { field: &'static str, value: i64 },

	#[error("no peering link for AS{0}")]
	NotFound(u32),

	#[error("all link ids up to {max_id} are in use")]
	PoolExhausted { max_id: u16 },

	#[error("Internal: {0}")]
	Internal(String),
}

pub type Result<T> = std::result::Result<T, DbError>;
