// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use sqlx::sqlite::SqlitePool;

use crate::error::DbError;

/// Create the link table. Safe to run on every start.
#[tracing::instrument(skip(pool))]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS peering_links (
			id INTEGER PRIMARY KEY CHECK (id BETWEEN 1 AND 65535),
			as_num INTEGER UNIQUE NOT NULL CHECK (as_num > 0),
			wg_pub_key TEXT NOT NULL CHECK (wg_pub_key <> ''),
			wg_endpoint_addr TEXT NOT NULL CHECK (wg_endpoint_addr <> ''),
			wg_endpoint_port INTEGER NOT NULL CHECK (wg_endpoint_port BETWEEN 1 AND 65535),
			peer_link_local TEXT
		)
		"#,
	)
	.execute(pool)
	.await?;

	tracing::debug!("migrations applied");
	Ok(())
}
