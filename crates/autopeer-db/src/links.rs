// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Peering link repository.
//!
//! All writes take a process-wide lock and run inside a transaction, so an
//! id is chosen and claimed in one step. The table's UNIQUE and CHECK
//! constraints enforce the same invariants for writers outside this
//! process.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::sqlite::{Sqlite, SqlitePool};
use sqlx::Transaction;
use tokio::sync::Mutex;

use crate::allocation::first_free_id;
use crate::error::{DbError, Result};
use crate::types::{LinkRow, NewPeeringLink, PeeringLink};

const SELECT_COLUMNS: &str =
	"SELECT id, as_num, wg_pub_key, wg_endpoint_addr, wg_endpoint_port, peer_link_local FROM peering_links";

#[async_trait]
pub trait LinkStore: Send + Sync {
	/// Insert a link with a caller-chosen id.
	async fn create(&self, link: &PeeringLink) -> Result<()>;

	/// Insert a link under the smallest free id in `1..=max_id`.
	async fn create_next(&self, link: &NewPeeringLink, max_id: u16) -> Result<PeeringLink>;

	/// Remove the link for `as_num` and return it.
	async fn delete(&self, as_num: u32) -> Result<PeeringLink>;

	/// Every link, ordered by id.
	async fn list(&self) -> Result<Vec<PeeringLink>>;

	async fn get(&self, as_num: u32) -> Result<Option<PeeringLink>>;

	/// Ids in use, ascending.
	async fn used_ids(&self) -> Result<Vec<u16>>;
}

#[derive(Clone)]
pub struct PeeringLinkRepository {
	pool: SqlitePool,
	write_lock: Arc<Mutex<()>>,
}

impl PeeringLinkRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self {
			pool,
			write_lock: Arc::new(Mutex::new(())),
		}
	}

	async fn find_by_as_num(
		tx: &mut Transaction<'_, Sqlite>,
		as_num: u32,
	) -> Result<Option<PeeringLink>> {
		let row: Option<LinkRow> = sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE as_num = ?"))
			.bind(i64::from(as_num))
			.fetch_optional(&mut **tx)
			.await?;
		row.map(PeeringLink::try_from).transpose()
	}

	async fn id_taken(tx: &mut Transaction<'_, Sqlite>, id: u16) -> Result<bool> {
		let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM peering_links WHERE id = ?")
			.bind(i64::from(id))
			.fetch_optional(&mut **tx)
			.await?;
		Ok(row.is_some())
	}

	async fn insert(tx: &mut Transaction<'_, Sqlite>, link: &PeeringLink) -> Result<()> {
		sqlx::query(
			"INSERT INTO peering_links (id, as_num, wg_pub_key, wg_endpoint_addr, wg_endpoint_port, peer_link_local)
			 VALUES (?, ?, ?, ?, ?, ?)",
		)
		.bind(i64::from(link.id))
		.bind(i64::from(link.as_num))
		.bind(&link.wg_pub_key)
		.bind(&link.wg_endpoint_addr)
		.bind(i64::from(link.wg_endpoint_port))
		.bind(link.peer_link_local.map(|a| a.to_string()))
		.execute(&mut **tx)
		.await
		.map_err(|e| map_constraint_error(e, link))?;
		Ok(())
	}
}

/// Translate constraint failures raised by SQLite itself.
fn map_constraint_error(err: sqlx::Error, link: &PeeringLink) -> DbError {
	if let Some(db_err) = err.as_database_error() {
		if db_err.is_unique_violation() {
			return if db_err.message().contains("as_num") {
				DbError::DuplicateAsNum(link.as_num)
			} else {
				DbError::DuplicateId(link.id)
			};
		}
		if db_err.is_check_violation() {
			return DbError::Internal(format!("constraint rejected link: {}", db_err.message()));
		}
	}
	DbError::Sqlx(err)
}

#[async_trait]
impl LinkStore for PeeringLinkRepository {
	#[tracing::instrument(skip(self, link), fields(id = link.id, as_num = link.as_num))]
	async fn create(&self, link: &PeeringLink) -> Result<()> {
		link.validate()?;
		let _guard = self.write_lock.lock().await;
		let mut tx = self.pool.begin().await?;

		if Self::find_by_as_num(&mut tx, link.as_num).await?.is_some() {
			return Err(DbError::DuplicateAsNum(link.as_num));
		}
		if Self::id_taken(&mut tx, link.id).await? {
			return Err(DbError::DuplicateId(link.id));
		}
		Self::insert(&mut tx, link).await?;
		tx.commit().await?;

		tracing::info!("peering link created");
		Ok(())
	}

	#[tracing::instrument(skip(self, link), fields(as_num = link.as_num, max_id))]
	async fn create_next(&self, link: &NewPeeringLink, max_id: u16) -> Result<PeeringLink> {
		// Validate with a placeholder id so field errors surface before allocation.
		link.clone().with_id(1).validate()?;

		let _guard = self.write_lock.lock().await;
		let mut tx = self.pool.begin().await?;

		if Self::find_by_as_num(&mut tx, link.as_num).await?.is_some() {
			return Err(DbError::DuplicateAsNum(link.as_num));
		}

		let used: Vec<(i64,)> = sqlx::query_as("SELECT id FROM peering_links ORDER BY id")
			.fetch_all(&mut *tx)
			.await?;
		let used: Vec<u16> = used
			.into_iter()
			.filter_map(|(id,)| u16::try_from(id).ok())
			.collect();

		let id = first_free_id(&used, max_id).ok_or(DbError::PoolExhausted { max_id })?;
		let created = link.clone().with_id(id);
		Self::insert(&mut tx, &created).await?;
		tx.commit().await?;

		tracing::info!(id, "peering link allocated");
		Ok(created)
	}

	#[tracing::instrument(skip(self))]
	async fn delete(&self, as_num: u32) -> Result<PeeringLink> {
		let _guard = self.write_lock.lock().await;
		let mut tx = self.pool.begin().await?;

		let link = Self::find_by_as_num(&mut tx, as_num)
			.await?
			.ok_or(DbError::NotFound(as_num))?;

		sqlx::query("DELETE FROM peering_links WHERE as_num = ?")
			.bind(i64::from(as_num))
			.execute(&mut *tx)
			.await?;
		tx.commit().await?;

		tracing::info!(id = link.id, "peering link removed");
		Ok(link)
	}

	#[tracing::instrument(skip(self))]
	async fn list(&self) -> Result<Vec<PeeringLink>> {
		let rows: Vec<LinkRow> = sqlx::query_as(&format!("{SELECT_COLUMNS} ORDER BY id"))
			.fetch_all(&self.pool)
			.await?;
		rows.into_iter().map(PeeringLink::try_from).collect()
	}

	#[tracing::instrument(skip(self))]
	async fn get(&self, as_num: u32) -> Result<Option<PeeringLink>> {
		let row: Option<LinkRow> = sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE as_num = ?"))
			.bind(i64::from(as_num))
			.fetch_optional(&self.pool)
			.await?;
		row.map(PeeringLink::try_from).transpose()
	}

	#[tracing::instrument(skip(self))]
	async fn used_ids(&self) -> Result<Vec<u16>> {
		let rows: Vec<(i64,)> = sqlx::query_as("SELECT id FROM peering_links ORDER BY id")
			.fetch_all(&self.pool)
			.await?;
		Ok(rows
			.into_iter()
			.filter_map(|(id,)| u16::try_from(id).ok())
			.collect())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::pool::create_pool;
	use crate::schema::run_migrations;
	use crate::testing::create_test_pool;
	use tokio_test::assert_ok;

	fn new_link(as_num: u32) -> NewPeeringLink {
		NewPeeringLink {
			as_num,
			wg_pub_key: "qGYUFW0wX3sTn1LqPJYh2mC8pVp0nJ0z2Ch8x5xq6HM=".to_string(),
			wg_endpoint_addr: "203.0.113.5".to_string(),
			wg_endpoint_port: 51820,
			peer_link_local: None,
		}
	}

	async fn repo() -> PeeringLinkRepository {
		PeeringLinkRepository::new(create_test_pool().await)
	}

	#[tokio::test]
	async fn test_create_next_allocates_smallest_free_id() {
		let repo = repo().await;
		for as_num in [4242421111, 4242421112, 4242421113] {
			repo.create_next(&new_link(as_num), 65535).await.unwrap();
		}
		repo.delete(4242421112).await.unwrap();

		let link = repo.create_next(&new_link(4242421114), 65535).await.unwrap();
		assert_eq!(link.id, 2);
		assert_eq!(repo.used_ids().await.unwrap(), vec![1, 2, 3]);
	}

	#[tokio::test]
	async fn test_duplicate_as_num_rejected() {
		let repo = repo().await;
		assert_ok!(repo.create_next(&new_link(4242421111), 65535).await);
		let err = repo
			.create_next(&new_link(4242421111), 65535)
			.await
			.unwrap_err();
		assert!(matches!(err, DbError::DuplicateAsNum(4242421111)));
		assert_eq!(repo.list().await.unwrap().len(), 1);
	}

	#[tokio::test]
	async fn test_create_with_explicit_id() {
		let repo = repo().await;
		assert_ok!(repo.create(&new_link(4242421111).with_id(7)).await);

		let err = repo
			.create(&new_link(4242421112).with_id(7))
			.await
			.unwrap_err();
		assert!(matches!(err, DbError::DuplicateId(7)));

		let err = repo
			.create(&new_link(4242421111).with_id(8))
			.await
			.unwrap_err();
		assert!(matches!(err, DbError::DuplicateAsNum(4242421111)));
	}

	#[tokio::test]
	async fn test_out_of_range_fields_rejected() {
		let repo = repo().await;
		let err = repo.create(&new_link(4242421111).with_id(0)).await.unwrap_err();
		assert!(matches!(err, DbError::OutOfRange { field: "id", .. }));

		let mut link = new_link(4242421111);
		link.wg_endpoint_port = 0;
		let err = repo.create_next(&link, 65535).await.unwrap_err();
		assert!(matches!(
			err,
			DbError::OutOfRange {
				field: "wg_endpoint_port",
				..
			}
		));
		assert!(repo.list().await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_delete_missing_is_not_found() {
		let repo = repo().await;
		let err = repo.delete(4242429999).await.unwrap_err();
		assert!(matches!(err, DbError::NotFound(4242429999)));
	}

	#[tokio::test]
	async fn test_delete_returns_removed_row() {
		let repo = repo().await;
		let mut link = new_link(4242421111);
		link.peer_link_local = Some("fe80::abcd".parse().unwrap());
		let created = repo.create_next(&link, 65535).await.unwrap();

		let removed = repo.delete(4242421111).await.unwrap();
		assert_eq!(removed, created);
		assert!(repo.get(4242421111).await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_list_is_ordered_by_id() {
		let repo = repo().await;
		repo.create(&new_link(4242421113).with_id(9)).await.unwrap();
		repo.create(&new_link(4242421111).with_id(2)).await.unwrap();
		repo.create_next(&new_link(4242421112), 65535).await.unwrap();

		let ids: Vec<u16> = repo.list().await.unwrap().iter().map(|l| l.id).collect();
		assert_eq!(ids, vec![1, 2, 9]);
	}

	#[tokio::test]
	async fn test_pool_exhausted_leaves_store_unchanged() {
		let repo = repo().await;
		for as_num in 1..=3u32 {
			repo.create_next(&new_link(as_num), 3).await.unwrap();
		}
		let before = repo.list().await.unwrap();

		let err = repo.create_next(&new_link(99), 3).await.unwrap_err();
		assert!(matches!(err, DbError::PoolExhausted { max_id: 3 }));
		assert_eq!(repo.list().await.unwrap(), before);
	}

	#[tokio::test]
	async fn test_full_id_space_is_exhausted() {
		let pool = create_test_pool().await;
		sqlx::query(
			r#"
			WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n WHERE i < 65535)
			INSERT INTO peering_links (id, as_num, wg_pub_key, wg_endpoint_addr, wg_endpoint_port)
			SELECT i, 4200000000 + i, 'k', 'a', 1 FROM n
			"#,
		)
		.execute(&pool)
		.await
		.unwrap();

		let repo = PeeringLinkRepository::new(pool);
		let err = repo.create_next(&new_link(42), u16::MAX).await.unwrap_err();
		assert!(matches!(err, DbError::PoolExhausted { max_id: 65535 }));
	}

	#[tokio::test]
	async fn test_concurrent_creates_for_same_as_num() {
		let dir = tempfile::tempdir().unwrap();
		let pool = create_pool(&dir.path().join("links.db")).await.unwrap();
		run_migrations(&pool).await.unwrap();
		let repo = PeeringLinkRepository::new(pool);

		let attempts = (0..8).map(|_| {
			let repo = repo.clone();
			tokio::spawn(async move { repo.create_next(&new_link(4242421111), 65535).await })
		});
		let results: Vec<_> = futures::future::join_all(attempts)
			.await
			.into_iter()
			.map(|r| r.unwrap())
			.collect();

		let wins = results.iter().filter(|r| r.is_ok()).count();
		let dupes = results
			.iter()
			.filter(|r| matches!(r, Err(DbError::DuplicateAsNum(4242421111))))
			.count();
		assert_eq!(wins, 1);
		assert_eq!(dupes, 7);
	}

	#[tokio::test]
	async fn test_concurrent_creates_get_distinct_ids() {
		let dir = tempfile::tempdir().unwrap();
		let pool = create_pool(&dir.path().join("links.db")).await.unwrap();
		run_migrations(&pool).await.unwrap();
		let repo = PeeringLinkRepository::new(pool);

		let attempts = (0..10u32).map(|i| {
			let repo = repo.clone();
			tokio::spawn(async move { repo.create_next(&new_link(4242421100 + i), 65535).await })
		});
		for result in futures::future::join_all(attempts).await {
			assert_ok!(result.unwrap());
		}

		let ids = repo.used_ids().await.unwrap();
		assert_eq!(ids, (1..=10).collect::<Vec<u16>>());
	}

	#[tokio::test]
	async fn test_rows_survive_reopen() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("links.db");
		{
			let pool = create_pool(&path).await.unwrap();
			run_migrations(&pool).await.unwrap();
			let repo = PeeringLinkRepository::new(pool.clone());
			repo.create_next(&new_link(4242421111), 65535).await.unwrap();
			pool.close().await;
		}

		let pool = create_pool(&path).await.unwrap();
		run_migrations(&pool).await.unwrap();
		let repo = PeeringLinkRepository::new(pool);
		let link = repo.get(4242421111).await.unwrap().unwrap();
		assert_eq!(link.id, 1);
	}
}
