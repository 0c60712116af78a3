// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use autopeer_config::PeeringConfig;
use autopeer_db::PeeringLink;
use autopeer_peering::LinkAllocator;

use crate::context::LinkContext;
use crate::error::{RenderError, Result};
use crate::{bird, wireguard};

/// Renders configuration for either end of a link from static parameters.
#[derive(Debug, Clone)]
pub struct ConfigRenderer {
	config: PeeringConfig,
	allocator: LinkAllocator,
}

impl ConfigRenderer {
	pub fn new(config: PeeringConfig) -> Self {
		let allocator = LinkAllocator::from_config(&config);
		Self { config, allocator }
	}

	pub fn context(&self, link: &PeeringLink) -> Result<LinkContext> {
		LinkContext::new(link, &self.config, &self.allocator)
	}

	pub fn local_wireguard(&self, link: &PeeringLink) -> Result<String> {
		let key = self
			.config
			.wg_private_key
			.as_ref()
			.ok_or(RenderError::MissingPrivateKey)?;
		Ok(wireguard::render_local(&self.context(link)?, key.expose()))
	}

	pub fn local_bird(&self, link: &PeeringLink, latency_community: u8) -> Result<String> {
		Ok(bird::render_local(&self.context(link)?, latency_community))
	}

	pub fn peer_wireguard(&self, link: &PeeringLink) -> Result<String> {
		Ok(wireguard::render_peer(
			&self.context(link)?,
			&self.config.wg_public_key,
			&self.config.domain_name,
		))
	}

	pub fn peer_bird(&self, link: &PeeringLink) -> Result<String> {
		Ok(bird::render_peer(&self.context(link)?))
	}
}
