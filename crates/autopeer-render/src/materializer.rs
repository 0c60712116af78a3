// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Batch generation of the files the WireGuard and BIRD daemons load.
//!
//! Each run writes a complete version directory under both output roots and
//! then repoints `<root>/current` at it. The symlink is replaced with a
//! rename, so readers see either the old or the new version. Reloading the
//! daemons is left to the operator.

use std::path::{Path, PathBuf};

use autopeer_db::PeeringLink;
use tracing::{debug, info};

use crate::error::{io_err, RenderError, Result};
use crate::latency::{latency_community, probe_latency, UNKNOWN_LATENCY_COMMUNITY};
use crate::renderer::ConfigRenderer;

pub const CURRENT_LINK: &str = "current";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LatencyMode {
	/// Every link gets the "unknown" community, so output is reproducible.
	#[default]
	Fixed,
	/// Ping each endpoint. Output then depends on network conditions.
	Probe,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializeReport {
	pub version: String,
	pub links: usize,
	pub wireguard_dir: PathBuf,
	pub bird_dir: PathBuf,
}

pub struct Materializer {
	renderer: ConfigRenderer,
	wireguard_root: PathBuf,
	bird_root: PathBuf,
	latency: LatencyMode,
}

/// Version name derived from local time, e.g. `20250314093000`.
pub fn timestamp_version() -> String {
	chrono::Local::now().format("%Y%m%d%H%M%S").to_string()
}

fn check_version(version: &str) -> Result<()> {
	let ok = !version.is_empty()
		&& version != CURRENT_LINK
		&& !version.starts_with('.')
		&& version
			.chars()
			.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
	if ok {
		Ok(())
	} else {
		Err(RenderError::InvalidVersion(version.to_string()))
	}
}

impl Materializer {
	pub fn new(
		renderer: ConfigRenderer,
		wireguard_root: impl Into<PathBuf>,
		bird_root: impl Into<PathBuf>,
	) -> Self {
		Self {
			renderer,
			wireguard_root: wireguard_root.into(),
			bird_root: bird_root.into(),
			latency: LatencyMode::Fixed,
		}
	}

	pub fn with_latency(mut self, latency: LatencyMode) -> Self {
		self.latency = latency;
		self
	}

	async fn community_for(&self, link: &PeeringLink) -> u8 {
		match self.latency {
			LatencyMode::Fixed => UNKNOWN_LATENCY_COMMUNITY,
			LatencyMode::Probe => latency_community(probe_latency(&link.wg_endpoint_addr).await),
		}
	}

	/// Render every link and publish the result as `version`.
	///
	/// Nothing is written if any link fails to render.
	#[tracing::instrument(skip(self, links), fields(links = links.len()))]
	pub async fn materialize(&self, links: &[PeeringLink], version: &str) -> Result<MaterializeReport> {
		check_version(version)?;

		let mut wireguard_files = Vec::with_capacity(links.len());
		let mut bird_files = Vec::with_capacity(links.len());
		for link in links {
			wireguard_files.push((
				format!("wg-as{}.conf", link.as_num),
				self.renderer.local_wireguard(link)?,
			));
			let community = self.community_for(link).await;
			bird_files.push((
				format!("ebgp_as{}", link.as_num),
				self.renderer.local_bird(link, community)?,
			));
		}

		let wireguard_dir = publish(&self.wireguard_root, version, &wireguard_files).await?;
		let bird_dir = publish(&self.bird_root, version, &bird_files).await?;

		info!(
			wireguard = %wireguard_dir.display(),
			bird = %bird_dir.display(),
			"configuration published"
		);

		Ok(MaterializeReport {
			version: version.to_string(),
			links: links.len(),
			wireguard_dir,
			bird_dir,
		})
	}
}

/// Write `files` into `<root>/<version>` via a staging directory, then swap
/// the `current` link.
async fn publish(root: &Path, version: &str, files: &[(String, String)]) -> Result<PathBuf> {
	tokio::fs::create_dir_all(root)
		.await
		.map_err(io_err(root))?;

	let staging = root.join(format!(".{version}.partial"));
	if tokio::fs::try_exists(&staging).await.map_err(io_err(&staging))? {
		tokio::fs::remove_dir_all(&staging)
			.await
			.map_err(io_err(&staging))?;
	}
	tokio::fs::create_dir(&staging)
		.await
		.map_err(io_err(&staging))?;

	for (name, contents) in files {
		let path = staging.join(name);
		tokio::fs::write(&path, contents)
			.await
			.map_err(io_err(&path))?;
		debug!(path = %path.display(), "wrote config file");
	}

	let target = root.join(version);
	if tokio::fs::try_exists(&target).await.map_err(io_err(&target))? {
		tokio::fs::remove_dir_all(&target)
			.await
			.map_err(io_err(&target))?;
	}
	tokio::fs::rename(&staging, &target)
		.await
		.map_err(io_err(&target))?;

	swap_current(root, version).await?;
	Ok(target)
}

async fn swap_current(root: &Path, version: &str) -> Result<()> {
	let temp_link = root.join(format!(".{CURRENT_LINK}.{version}.tmp"));
	if tokio::fs::symlink_metadata(&temp_link).await.is_ok() {
		tokio::fs::remove_file(&temp_link)
			.await
			.map_err(io_err(&temp_link))?;
	}
	tokio::fs::symlink(version, &temp_link)
		.await
		.map_err(io_err(&temp_link))?;

	let current = root.join(CURRENT_LINK);
	tokio::fs::rename(&temp_link, &current)
		.await
		.map_err(io_err(&current))
}
