// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-connection SSH callbacks.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use autopeer_registry::{AuthResult, IdentityResolver, MaintainerIdentity};
use russh::server::{Auth, Handler, Msg, Session};
use russh::{Channel, ChannelId, Pty};
use russh_keys::key::PublicKey;
use tracing::{debug, info, warn, Instrument};

use crate::error::SshdError;
use crate::keys::offered_key;
use crate::service::{BoxedIo, ChannelRequest, ChannelService};

struct OpenChannel {
	channel: Option<Channel<Msg>>,
	pty: bool,
}

pub struct ConnectionHandler {
	peer: SocketAddr,
	resolver: Arc<dyn IdentityResolver>,
	service: Arc<dyn ChannelService>,
	identity: Option<MaintainerIdentity>,
	channels: HashMap<ChannelId, OpenChannel>,
}

impl ConnectionHandler {
	pub fn new(
		peer: SocketAddr,
		resolver: Arc<dyn IdentityResolver>,
		service: Arc<dyn ChannelService>,
	) -> Self {
		Self {
			peer,
			resolver,
			service,
			identity: None,
			channels: HashMap::new(),
		}
	}

	fn decide(&mut self, user: &str, method: &str, result: AuthResult) -> Auth {
		match result.identity {
			Some(identity) if result.granted => {
				info!(peer = %self.peer, user, method, maintainer = %identity.username, "authentication granted");
				self.identity = Some(identity);
				Auth::Accept
			}
			_ => {
				info!(
					peer = %self.peer,
					user,
					method,
					reason = result.reason.as_deref().unwrap_or("denied"),
					"authentication refused"
				);
				Auth::Reject {
					proceed_with_methods: None,
				}
			}
		}
	}

	/// Hand the channel to the service on its own task.
	fn start(&mut self, id: ChannelId, command: Option<String>, session: &mut Session) {
		let (Some(identity), Some(open)) = (self.identity.clone(), self.channels.get_mut(&id)) else {
			session.channel_failure(id);
			return;
		};
		let Some(channel) = open.channel.take() else {
			// Only one shell or exec per channel.
			session.channel_failure(id);
			return;
		};

		let request = match command {
			Some(command) => ChannelRequest::Exec {
				command,
				pty: open.pty,
			},
			None => ChannelRequest::Shell { pty: open.pty },
		};
		info!(peer = %self.peer, channel = ?id, ?request, "channel started");

		let handle = session.handle();
		let service = Arc::clone(&self.service);
		let io: BoxedIo = Box::pin(channel.into_stream());
		tokio::spawn(
			async move {
				let status = match service.serve(identity, io, request).await {
					Ok(status) => status,
					Err(e) => {
						warn!(error = %e, "channel failed");
						1
					}
				};
				// Each send fails only once the client has disconnected.
				if handle.exit_status_request(id, status).await.is_err() {
					debug!(status, "client gone before exit status");
				} else if handle.eof(id).await.is_err() || handle.close(id).await.is_err() {
					debug!("client gone before channel close");
				}
				info!(status, "channel finished");
			}
			.in_current_span(),
		);
		session.channel_success(id);
	}
}

#[async_trait]
impl Handler for ConnectionHandler {
	type Error = SshdError;

	async fn auth_none(&mut self, user: &str) -> Result<Auth, Self::Error> {
		let result = self.resolver.authenticate_none(user).await;
		Ok(self.decide(user, "none", result))
	}

	async fn auth_publickey(
		&mut self,
		user: &str,
		public_key: &PublicKey,
	) -> Result<Auth, Self::Error> {
		let Some(offered) = offered_key(public_key) else {
			let result = AuthResult::denied(format!("unsupported key type {}", public_key.name()));
			return Ok(self.decide(user, "publickey", result));
		};
		let result = self.resolver.authenticate(user, &offered).await;
		Ok(self.decide(user, "publickey", result))
	}

	async fn channel_open_session(
		&mut self,
		channel: Channel<Msg>,
		_session: &mut Session,
	) -> Result<bool, Self::Error> {
		if self.identity.is_none() {
			return Ok(false);
		}
		self.channels.insert(
			channel.id(),
			OpenChannel {
				channel: Some(channel),
				pty: false,
			},
		);
		Ok(true)
	}

	#[allow(clippy::too_many_arguments)]
	async fn pty_request(
		&mut self,
		channel: ChannelId,
		term: &str,
		_col_width: u32,
		_row_height: u32,
		_pix_width: u32,
		_pix_height: u32,
		_modes: &[(Pty, u32)],
		session: &mut Session,
	) -> Result<(), Self::Error> {
		match self.channels.get_mut(&channel) {
			Some(open) => {
				open.pty = true;
				tracing::debug!(peer = %self.peer, term, "pty allocated");
				session.channel_success(channel);
			}
			None => session.channel_failure(channel),
		}
		Ok(())
	}

	async fn shell_request(
		&mut self,
		channel: ChannelId,
		session: &mut Session,
	) -> Result<(), Self::Error> {
		self.start(channel, None, session);
		Ok(())
	}

	async fn exec_request(
		&mut self,
		channel: ChannelId,
		data: &[u8],
		session: &mut Session,
	) -> Result<(), Self::Error> {
		let command = String::from_utf8_lossy(data).trim().to_string();
		self.start(channel, Some(command), session);
		Ok(())
	}

	async fn channel_close(
		&mut self,
		channel: ChannelId,
		_session: &mut Session,
	) -> Result<(), Self::Error> {
		self.channels.remove(&channel);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use autopeer_registry::AnonymousResolver;
	use russh::client;
	use russh::{ChannelMsg, Disconnect, MethodSet};

	use super::*;
	use crate::keys::{load_host_key, TEST_HOST_KEY};
	use crate::pipe::PipeService;
	use crate::server::Dispatcher;

	struct TrustingClient;

	#[async_trait]
	impl client::Handler for TrustingClient {
		type Error = russh::Error;

		async fn check_server_key(&mut self, _key: &PublicKey) -> Result<bool, Self::Error> {
			Ok(true)
		}
	}

	async fn pipe_server(dir: &tempfile::TempDir, command: &str) -> SocketAddr {
		let path = dir.path().join("ssh_host_ed25519_key");
		std::fs::write(&path, TEST_HOST_KEY).unwrap();
		let config = russh::server::Config {
			keys: vec![load_host_key(&path).unwrap()],
			methods: MethodSet::NONE,
			auth_rejection_time: Duration::ZERO,
			..Default::default()
		};
		let listener = Dispatcher::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
		let addr = listener.local_addr().unwrap();
		let dispatcher = Dispatcher::new(
			config,
			Arc::new(AnonymousResolver),
			Arc::new(PipeService::new(command)),
		);
		tokio::spawn(dispatcher.serve(listener, std::future::pending()));
		addr
	}

	async fn connect(addr: SocketAddr) -> client::Handle<TrustingClient> {
		let config = Arc::new(client::Config::default());
		let mut handle = client::connect(config, addr, TrustingClient).await.unwrap();
		assert!(handle.authenticate_none("guest").await.unwrap());
		handle
	}

	#[tokio::test]
	async fn test_client_leaving_early_does_not_disturb_others() {
		let dir = tempfile::tempdir().unwrap();
		let addr = pipe_server(&dir, "sleep 0.2; echo done").await;

		let early = connect(addr).await;
		let channel = early.channel_open_session().await.unwrap();
		channel.exec(true, "").await.unwrap();
		early
			.disconnect(Disconnect::ByApplication, "", "en")
			.await
			.unwrap();
		// Let the first command finish and find its client gone.
		tokio::time::sleep(Duration::from_millis(500)).await;

		let late = connect(addr).await;
		let mut channel = late.channel_open_session().await.unwrap();
		channel.exec(true, "").await.unwrap();
		let mut out = Vec::new();
		let mut exit = None;
		while let Some(msg) = channel.wait().await {
			match msg {
				ChannelMsg::Data { data } => out.extend_from_slice(&data),
				ChannelMsg::ExitStatus { exit_status } => exit = Some(exit_status),
				_ => {}
			}
		}
		assert_eq!(String::from_utf8_lossy(&out), "done\n");
		assert_eq!(exit, Some(0));
	}
}
