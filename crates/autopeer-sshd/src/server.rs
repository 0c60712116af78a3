// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Accept loop: one task per TCP connection.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use autopeer_config::SshConfig;
use autopeer_registry::IdentityResolver;
use russh::server::{run_stream, Config};
use russh::MethodSet;
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, info_span, warn, Instrument};

use crate::banner::load_banner;
use crate::error::{Result, SshdError};
use crate::handler::ConnectionHandler;
use crate::keys::load_host_key;
use crate::service::ChannelService;

const AUTH_REJECTION_DELAY: Duration = Duration::from_secs(1);

/// Build the `russh` server settings from the listener configuration.
/// `motd` overrides `ssh.motd_path` when given.
pub fn server_config(
	ssh: &SshConfig,
	motd: Option<&std::path::Path>,
) -> Result<Config> {
	let key = load_host_key(&ssh.host_key_path)?;
	let banner = load_banner(motd.or(ssh.motd_path.as_deref()))?;
	Ok(Config {
		keys: vec![key],
		methods: MethodSet::PUBLICKEY | MethodSet::NONE,
		auth_banner: banner,
		auth_rejection_time: AUTH_REJECTION_DELAY,
		auth_rejection_time_initial: Some(Duration::ZERO),
		inactivity_timeout: Some(Duration::from_secs(ssh.inactivity_timeout_secs)),
		..Default::default()
	})
}

pub struct Dispatcher {
	config: Arc<Config>,
	resolver: Arc<dyn IdentityResolver>,
	service: Arc<dyn ChannelService>,
}

impl Dispatcher {
	pub fn new(
		config: Config,
		resolver: Arc<dyn IdentityResolver>,
		service: Arc<dyn ChannelService>,
	) -> Self {
		Self {
			config: Arc::new(config),
			resolver,
			service,
		}
	}

	pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
		TcpListener::bind(addr)
			.await
			.map_err(|source| SshdError::Bind { addr, source })
	}

	/// Accept until `shutdown` resolves. Sessions already running are left
	/// to finish on their own tasks.
	pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
	where
		F: Future<Output = ()>,
	{
		let local = listener.local_addr()?;
		info!(
			%local,
			authority = ?self.resolver.authority(),
			"accepting SSH connections"
		);
		tokio::pin!(shutdown);

		loop {
			tokio::select! {
				biased;

				_ = &mut shutdown => {
					info!("shutdown requested, no longer accepting");
					break;
				}

				accepted = listener.accept() => match accepted {
					Ok((stream, peer)) => self.spawn(stream, peer),
					Err(e) => {
						// Usually fd exhaustion; back off instead of spinning.
						warn!(error = %e, "accept failed");
						tokio::time::sleep(Duration::from_millis(100)).await;
					}
				},
			}
		}
		Ok(())
	}

	fn spawn(&self, stream: TcpStream, peer: SocketAddr) {
		let config = Arc::clone(&self.config);
		let handler = ConnectionHandler::new(
			peer,
			Arc::clone(&self.resolver),
			Arc::clone(&self.service),
		);
		let _ = stream.set_nodelay(true);

		tokio::spawn(
			async move {
				info!("connection accepted");
				match run_stream(config, stream, handler).await {
					Ok(session) => {
						if let Err(e) = session.await {
							warn!(error = %e, "connection ended with error");
						}
					}
					Err(e) => error!(error = %e, "SSH handshake failed"),
				}
				info!("connection closed");
			}
			.instrument(info_span!("connection", %peer)),
		);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use autopeer_registry::AnonymousResolver;
	use std::path::PathBuf;

	use crate::pipe::PipeService;

	#[test]
	fn test_server_config_requires_host_key() {
		let ssh = SshConfig {
			host_key_path: PathBuf::from("/nonexistent/ssh_host_ed25519_key"),
			..SshConfig::default()
		};
		assert!(matches!(
			server_config(&ssh, None),
			Err(SshdError::HostKey { .. })
		));
	}

	#[tokio::test]
	async fn test_serve_stops_on_shutdown() {
		let listener = Dispatcher::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
		let dispatcher = Dispatcher::new(
			Config::default(),
			Arc::new(AnonymousResolver),
			Arc::new(PipeService::new("true")),
		);
		dispatcher.serve(listener, async {}).await.unwrap();
	}

	#[tokio::test]
	async fn test_bind_conflict_is_reported() {
		let first = Dispatcher::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
		let addr = first.local_addr().unwrap();
		assert!(matches!(
			Dispatcher::bind(addr).await,
			Err(SshdError::Bind { .. })
		));
	}
}
