// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Peering operations available to an authenticated maintainer.
//!
//! Every write runs the same sequence: ownership check, endpoint screening,
//! then allocation and insert in the store.

use std::collections::BTreeSet;
use std::sync::Arc;

use autopeer_db::{LinkStore, NewPeeringLink, PeeringLink};
use autopeer_registry::{MaintainerIdentity, OwnershipCheck};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::allocator::LinkAllocator;
use crate::error::{PeeringError, Result};

/// Public view of a link owned by someone else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkSummary {
	pub id: u16,
	pub as_num: u32,
}

#[derive(Clone)]
pub struct PeeringService {
	store: Arc<dyn LinkStore>,
	ownership: Arc<dyn OwnershipCheck>,
	allocator: Arc<LinkAllocator>,
}

impl PeeringService {
	pub fn new(
		store: Arc<dyn LinkStore>,
		ownership: Arc<dyn OwnershipCheck>,
		allocator: Arc<LinkAllocator>,
	) -> Self {
		Self {
			store,
			ownership,
			allocator,
		}
	}

	pub fn allocator(&self) -> &LinkAllocator {
		&self.allocator
	}

	/// Fails unless `who` maintains `as_num` in the registry.
	#[tracing::instrument(skip(self, who), fields(maintainer = %who.username))]
	pub async fn authorize(&self, who: &MaintainerIdentity, as_num: u32) -> Result<()> {
		if !who.is_anonymous() && self.ownership.owns(who, as_num).await? {
			return Ok(());
		}
		warn!(as_num, "unauthorized peering operation");
		Err(PeeringError::AuthorizationFailure {
			maintainer: who.handle(),
			as_num,
		})
	}

	pub async fn owned_asns(&self, who: &MaintainerIdentity) -> Result<Vec<u32>> {
		Ok(self.ownership.maintained_asns(who).await?)
	}

	/// Links whose AS is maintained by `who`.
	#[tracing::instrument(skip(self, who), fields(maintainer = %who.username))]
	pub async fn list_own(&self, who: &MaintainerIdentity) -> Result<Vec<PeeringLink>> {
		let owned: BTreeSet<u32> = self.owned_asns(who).await?.into_iter().collect();
		if owned.is_empty() {
			return Ok(Vec::new());
		}
		Ok(self
			.store
			.list()
			.await?
			.into_iter()
			.filter(|link| owned.contains(&link.as_num))
			.collect())
	}

	/// Every link, without endpoints or keys.
	pub async fn list_all(&self) -> Result<Vec<LinkSummary>> {
		Ok(self
			.store
			.list()
			.await?
			.into_iter()
			.map(|link| LinkSummary {
				id: link.id,
				as_num: link.as_num,
			})
			.collect())
	}

	pub async fn get_owned(&self, who: &MaintainerIdentity, as_num: u32) -> Result<PeeringLink> {
		self.authorize(who, as_num).await?;
		self.store
			.get(as_num)
			.await?
			.ok_or(PeeringError::NotFound(as_num))
	}

	#[tracing::instrument(skip(self, who, request), fields(maintainer = %who.username, as_num = request.as_num))]
	pub async fn create(
		&self,
		who: &MaintainerIdentity,
		request: NewPeeringLink,
	) -> Result<PeeringLink> {
		self.authorize(who, request.as_num).await?;
		// No room means no point resolving the endpoint. The id itself is
		// taken atomically by `create_next`.
		let candidate = self.allocator.next_id(self.store.as_ref()).await?;
		debug!(candidate, "free link id available");
		self.allocator
			.screen_endpoint(&request.wg_endpoint_addr, request.wg_endpoint_port)
			.await?;

		let link = self
			.store
			.create_next(&request, self.allocator.max_id())
			.await?;

		info!(
			id = link.id,
			endpoint = %link.wg_endpoint_addr,
			port = link.wg_endpoint_port,
			"peering created"
		);
		Ok(link)
	}

	#[tracing::instrument(skip(self, who), fields(maintainer = %who.username))]
	pub async fn remove(&self, who: &MaintainerIdentity, as_num: u32) -> Result<PeeringLink> {
		self.authorize(who, as_num).await?;
		let link = self.store.delete(as_num).await?;
		info!(id = link.id, "peering removed");
		Ok(link)
	}

	/// Administrative removal that skips ownership checks.
	pub async fn force_remove(&self, as_num: u32) -> Result<PeeringLink> {
		let link = self.store.delete(as_num).await?;
		info!(id = link.id, as_num, "peering removed by operator");
		Ok(link)
	}

	pub async fn all_links(&self) -> Result<Vec<PeeringLink>> {
		Ok(self.store.list().await?)
	}
}
