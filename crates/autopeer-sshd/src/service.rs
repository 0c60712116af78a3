// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! What runs on an accepted session channel.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use autopeer_registry::MaintainerIdentity;
use autopeer_shell::{SessionContext, ShellSession};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::Result;

/// A bidirectional byte stream bound to one SSH channel.
pub trait ChannelIo: AsyncRead + AsyncWrite + Send + Sync {}

impl<T: AsyncRead + AsyncWrite + Send + Sync> ChannelIo for T {}

pub type BoxedIo = Pin<Box<dyn ChannelIo>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelRequest {
	Shell { pty: bool },
	Exec { command: String, pty: bool },
}

impl ChannelRequest {
	pub fn pty(&self) -> bool {
		match self {
			Self::Shell { pty } | Self::Exec { pty, .. } => *pty,
		}
	}
}

/// Serves one channel and returns its exit status.
#[async_trait]
pub trait ChannelService: Send + Sync {
	async fn serve(
		&self,
		identity: MaintainerIdentity,
		io: BoxedIo,
		request: ChannelRequest,
	) -> Result<u32>;
}

/// The peering shell.
pub struct ShellService {
	context: Arc<SessionContext>,
}

impl ShellService {
	pub fn new(context: Arc<SessionContext>) -> Self {
		Self { context }
	}
}

#[async_trait]
impl ChannelService for ShellService {
	async fn serve(
		&self,
		identity: MaintainerIdentity,
		io: BoxedIo,
		request: ChannelRequest,
	) -> Result<u32> {
		let (reader, writer) = tokio::io::split(io);
		let session = ShellSession::new(
			Arc::clone(&self.context),
			identity,
			reader,
			writer,
			request.pty(),
		);
		match request {
			ChannelRequest::Exec { command, .. } if !command.trim().is_empty() => {
				session.run_command(&command).await?
			}
			_ => session.run().await?,
		}
		Ok(0)
	}
}
