// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! One function per subcommand. Each builds what it needs from the resolved
//! configuration and returns plain values so `main` only prints.

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use autopeer_config::{AutopeerConfig, DatabaseConfig};
use autopeer_db::{create_pool, run_migrations, LinkStore, PeeringLink, PeeringLinkRepository};
use autopeer_peering::{LinkAllocator, PeeringService};
use autopeer_registry::{AnonymousResolver, FsRegistry, RegistryOwnership, RegistryResolver, RegistrySource};
use autopeer_render::{timestamp_version, ConfigRenderer, LatencyMode, MaterializeReport, Materializer};
use autopeer_shell::output::{self, Painter};
use autopeer_shell::SessionContext;
use autopeer_sshd::{server_config, Dispatcher, PipeService, ShellService};
use tracing::info;

/// Output shape for `links list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkFormat {
	Table { colors: bool },
	Json,
}

/// Open the link store, creating the file and schema when missing.
pub async fn open_store(database: &DatabaseConfig) -> anyhow::Result<Arc<PeeringLinkRepository>> {
	if let Some(parent) = database.path.parent().filter(|p| !p.as_os_str().is_empty()) {
		tokio::fs::create_dir_all(parent)
			.await
			.with_context(|| format!("cannot create {}", parent.display()))?;
	}
	let pool = create_pool(&database.path)
		.await
		.with_context(|| format!("cannot open database {}", database.path.display()))?;
	run_migrations(&pool)
		.await
		.context("failed to run database migrations")?;
	Ok(Arc::new(PeeringLinkRepository::new(pool)))
}

fn registry(config: &AutopeerConfig) -> Arc<dyn RegistrySource> {
	Arc::new(FsRegistry::new(&config.registry.path))
}

pub async fn peering_service(config: &AutopeerConfig) -> anyhow::Result<PeeringService> {
	let store = open_store(&config.database).await?;
	Ok(PeeringService::new(
		store,
		Arc::new(RegistryOwnership::new(registry(config))),
		Arc::new(LinkAllocator::from_config(&config.peering)),
	))
}

/// Run the peering shell until `shutdown` resolves.
pub async fn serve<F>(config: &AutopeerConfig, shutdown: F) -> anyhow::Result<()>
where
	F: Future<Output = ()>,
{
	let service = peering_service(config).await?;
	let context = Arc::new(SessionContext::new(service, &config.peering));
	let ssh = server_config(&config.ssh, None).context("invalid SSH configuration")?;

	let listener = Dispatcher::bind(config.ssh.socket_addr()).await?;
	let dispatcher = Dispatcher::new(
		ssh,
		Arc::new(RegistryResolver::new(registry(config))),
		Arc::new(ShellService::new(context)),
	);
	dispatcher.serve(listener, shutdown).await?;
	Ok(())
}

/// Run the command pipe until `shutdown` resolves. Anyone may connect.
pub async fn gaming<F>(config: &AutopeerConfig, shutdown: F) -> anyhow::Result<()>
where
	F: Future<Output = ()>,
{
	let ssh = server_config(&config.ssh, config.gaming.motd_path.as_deref())
		.context("invalid SSH configuration")?;

	info!(command = %config.gaming.command, "starting gaming pipe");
	let listener = Dispatcher::bind(config.ssh.socket_addr()).await?;
	let dispatcher = Dispatcher::new(
		ssh,
		Arc::new(AnonymousResolver),
		Arc::new(PipeService::new(config.gaming.command.clone())),
	);
	dispatcher.serve(listener, shutdown).await?;
	Ok(())
}

/// Render every stored link into a new version directory. `version`
/// defaults to the current local time.
pub async fn genconfig(
	config: &AutopeerConfig,
	latency: LatencyMode,
	version: Option<String>,
) -> anyhow::Result<MaterializeReport> {
	let store = open_store(&config.database).await?;
	let links = store
		.list()
		.await
		.context("cannot read peering links")?;

	let version = version.unwrap_or_else(timestamp_version);
	let materializer = Materializer::new(
		ConfigRenderer::new(config.peering.clone()),
		&config.output.wireguard_dir,
		&config.output.bird_dir,
	)
	.with_latency(latency);

	let report = materializer
		.materialize(&links, &version)
		.await
		.with_context(|| format!("cannot generate configuration version {version}"))?;
	Ok(report)
}

pub async fn list_links(config: &AutopeerConfig, format: LinkFormat) -> anyhow::Result<String> {
	let service = peering_service(config).await?;
	let links = service.all_links().await.context("cannot read peering links")?;
	render_links(&links, service.allocator(), format)
}

fn render_links(
	links: &[PeeringLink],
	allocator: &LinkAllocator,
	format: LinkFormat,
) -> anyhow::Result<String> {
	match format {
		LinkFormat::Json => Ok(serde_json::to_string_pretty(links)?),
		LinkFormat::Table { colors } => Ok(output::own_links(&Painter::new(colors), links, allocator)),
	}
}

/// Administrative removal, bypassing the ownership check.
pub async fn remove_link(config: &AutopeerConfig, as_num: u32) -> anyhow::Result<PeeringLink> {
	let service = peering_service(config).await?;
	let link = service
		.force_remove(as_num)
		.await
		.map_err(|e| anyhow::anyhow!(e.user_message()))?;
	info!(as_num, id = link.id, "peering link removed by operator");
	Ok(link)
}

#[cfg(test)]
mod tests {
	use super::*;
	use autopeer_config::SecretString;
	use autopeer_db::NewPeeringLink;
	use tempfile::TempDir;

	fn config(dir: &TempDir) -> AutopeerConfig {
		let mut config = AutopeerConfig::default();
		config.database.path = dir.path().join("state").join("peering.db");
		config.registry.path = dir.path().join("registry");
		config.output.wireguard_dir = dir.path().join("wireguard");
		config.output.bird_dir = dir.path().join("bird");
		config.peering.domain_name = "node.example.net".into();
		config.peering.wg_public_key = "LOCALPUB=".into();
		config.peering.wg_private_key = Some(SecretString::new("LOCALPRIV=".to_string()));
		config
	}

	async fn seed(config: &AutopeerConfig, as_num: u32) -> PeeringLink {
		let store = open_store(&config.database).await.unwrap();
		store
			.create_next(
				&NewPeeringLink {
					as_num,
					wg_pub_key: "qGYUFW0wX3sTn1LqPJYh2mC8pVp0nJ0z2Ch8x5xq6HM=".into(),
					wg_endpoint_addr: "203.0.113.5".into(),
					wg_endpoint_port: 51820,
					peer_link_local: None,
				},
				1000,
			)
			.await
			.unwrap()
	}

	#[tokio::test]
	async fn test_open_store_creates_parent_directory() {
		let dir = tempfile::tempdir().unwrap();
		let config = config(&dir);
		let store = open_store(&config.database).await.unwrap();
		assert!(config.database.path.exists());
		assert!(store.list().await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_list_links_table_and_json() {
		let dir = tempfile::tempdir().unwrap();
		let config = config(&dir);
		seed(&config, 4242421111).await;

		let table = list_links(&config, LinkFormat::Table { colors: false })
			.await
			.unwrap();
		let lines: Vec<&str> = table.lines().collect();
		assert_eq!(lines.len(), 2);
		assert!(lines[1].starts_with("1   AS4242421111"));

		let json = list_links(&config, LinkFormat::Json).await.unwrap();
		let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
		assert_eq!(parsed[0]["id"], 1);
		assert_eq!(parsed[0]["as_num"], 4242421111u32);
		assert_eq!(parsed[0]["wg_endpoint_port"], 51820);
	}

	#[tokio::test]
	async fn test_remove_link_frees_row() {
		let dir = tempfile::tempdir().unwrap();
		let config = config(&dir);
		seed(&config, 4242421111).await;

		let removed = remove_link(&config, 4242421111).await.unwrap();
		assert_eq!(removed.id, 1);
		let json = list_links(&config, LinkFormat::Json).await.unwrap();
		assert_eq!(json.trim(), "[]");

		let err = remove_link(&config, 4242421111).await.unwrap_err();
		assert!(err.to_string().contains("4242421111"), "{err}");
	}

	#[tokio::test]
	async fn test_genconfig_publishes_current_version() {
		let dir = tempfile::tempdir().unwrap();
		let config = config(&dir);
		seed(&config, 4242421111).await;

		let report = genconfig(&config, LatencyMode::Fixed, Some("v1".into()))
			.await
			.unwrap();
		assert_eq!(report.links, 1);
		assert_eq!(report.version, "v1");

		let current = config.output.wireguard_dir.join("current").join("wg-as4242421111.conf");
		let text = std::fs::read_to_string(current).unwrap();
		assert!(text.contains("PrivateKey = LOCALPRIV="));
		assert!(config
			.output
			.bird_dir
			.join("current")
			.join("ebgp_as4242421111")
			.exists());
	}

	#[tokio::test]
	async fn test_serve_fails_without_host_key() {
		let dir = tempfile::tempdir().unwrap();
		let mut config = config(&dir);
		config.ssh.host_key_path = dir.path().join("missing_host_key");
		let err = serve(&config, std::future::pending()).await.unwrap_err();
		assert!(format!("{err:#}").contains("missing_host_key"), "{err:#}");
	}
}
