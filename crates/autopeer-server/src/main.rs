// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! dn42 auto-peering service binary.

use std::path::PathBuf;

use anyhow::Context;
use autopeer_render::LatencyMode;
use autopeer_server::app::{self, LinkFormat};
use autopeer_server::version;
use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// dn42-autopeer - self-service peering over SSH.
#[derive(Parser, Debug)]
#[command(
	name = "dn42-autopeer",
	about = "dn42 auto-peering SSH service",
	version
)]
struct Args {
	/// Config file (default: /etc/dn42-autopeer/config.toml)
	#[arg(short, long, global = true, env = "DN42_CONFIG")]
	config: Option<PathBuf>,

	/// Defaults to `serve`
	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Run the peering shell over SSH
	Serve,
	/// Run the anonymous command pipe over SSH
	Gaming,
	/// Write WireGuard and BIRD configuration for every stored link
	Genconfig {
		/// Ping each endpoint to pick the BGP latency community
		#[arg(long)]
		probe_latency: bool,
		/// Version directory name (default: current local time)
		#[arg(long, value_name = "NAME")]
		version_name: Option<String>,
	},
	/// Inspect or clean up stored links
	Links {
		#[command(subcommand)]
		command: LinksCommand,
	},
	/// Show version and build information
	Version,
}

#[derive(Subcommand, Debug)]
enum LinksCommand {
	/// Print every stored link
	List {
		#[arg(long)]
		json: bool,
	},
	/// Delete the link for an AS regardless of ownership
	Remove {
		/// AS number, with or without the AS prefix
		#[arg(value_parser = parse_as)]
		as_num: u32,
	},
}

fn parse_as(raw: &str) -> Result<u32, String> {
	autopeer_peering::endpoint::parse_as_number(raw).map_err(|e| e.to_string())
}

async fn shutdown_signal() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		tracing::warn!(error = %e, "cannot listen for ctrl-c, running until killed");
		std::future::pending::<()>().await;
	}
	tracing::info!("Received shutdown signal");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	let command = args.command.unwrap_or(Command::Serve);
	if let Command::Version = command {
		println!("{}", version::format_version_info());
		return Ok(());
	}

	dotenvy::dotenv().ok();

	let config = match &args.config {
		Some(path) => autopeer_config::load_config_with_file(path),
		None => autopeer_config::load_config(),
	}
	.context("invalid configuration")?;

	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| config.logging.level.clone().into()),
		)
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.init();

	match command {
		Command::Serve => {
			tracing::info!(
				listen = %config.ssh.socket_addr(),
				local_asn = config.peering.local_asn,
				"starting dn42-autopeer"
			);
			app::serve(&config, shutdown_signal()).await?;
			tracing::info!("Server shutdown complete");
		}
		Command::Gaming => {
			app::gaming(&config, shutdown_signal()).await?;
			tracing::info!("Server shutdown complete");
		}
		Command::Genconfig {
			probe_latency,
			version_name,
		} => {
			let latency = if probe_latency {
				LatencyMode::Probe
			} else {
				LatencyMode::Fixed
			};
			let report = app::genconfig(&config, latency, version_name).await?;
			println!(
				"{} Generated version {} for {} link(s)",
				style("✓").green().bold(),
				style(&report.version).cyan(),
				report.links
			);
			println!("  WireGuard: {}", report.wireguard_dir.display());
			println!("  BIRD:      {}", report.bird_dir.display());
			println!("{}", style("Reload wg-quick and birdc to apply.").dim());
		}
		Command::Links { command } => match command {
			LinksCommand::List { json } => {
				let format = if json {
					LinkFormat::Json
				} else {
					LinkFormat::Table {
						colors: console::colors_enabled(),
					}
				};
				println!("{}", app::list_links(&config, format).await?);
			}
			LinksCommand::Remove { as_num } => {
				let link = app::remove_link(&config, as_num).await?;
				println!(
					"{} Removed peering with AS{} (link id {} released)",
					style("✓").green().bold(),
					link.as_num,
					link.id
				);
			}
		},
		Command::Version => {}
	}

	Ok(())
}
