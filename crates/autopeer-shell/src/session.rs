// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Async driver that runs a [`Machine`] against a byte stream.

use std::collections::VecDeque;
use std::sync::Arc;

use autopeer_config::PeeringConfig;
use autopeer_peering::{PeeringError, PeeringService};
use autopeer_registry::MaintainerIdentity;
use autopeer_render::ConfigRenderer;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::line::{Input, LineEditor};
use crate::machine::{Action, Event, Machine, Mode};
use crate::output::{self, Painter};

/// Everything a session needs beyond its own connection. Shared by all
/// sessions.
pub struct SessionContext {
	pub service: PeeringService,
	pub renderer: ConfigRenderer,
	pub local_asn: u32,
	pub domain_name: String,
}

impl SessionContext {
	pub fn new(service: PeeringService, config: &PeeringConfig) -> Self {
		Self {
			service,
			renderer: ConfigRenderer::new(config.clone()),
			local_asn: config.local_asn,
			domain_name: config.domain_name.clone(),
		}
	}
}

pub struct ShellSession<R, W> {
	context: Arc<SessionContext>,
	identity: MaintainerIdentity,
	editor: LineEditor<R, W>,
	painter: Painter,
}

impl<R, W> ShellSession<R, W>
where
	R: AsyncRead + Unpin,
	W: AsyncWrite + Unpin,
{
	/// `terminal` is true when the client allocated a PTY; it turns on
	/// echo and colours.
	pub fn new(
		context: Arc<SessionContext>,
		identity: MaintainerIdentity,
		reader: R,
		writer: W,
		terminal: bool,
	) -> Self {
		Self {
			context,
			identity,
			editor: LineEditor::new(reader, writer, terminal),
			painter: Painter::new(terminal),
		}
	}

	/// Interactive loop until `quit`, EOF or an I/O error.
	pub async fn run(self) -> Result<()> {
		let machine = Machine::new(self.context.local_asn, Mode::Interactive);
		self.drive(machine, None).await
	}

	/// Run a single command, as for `ssh host list`.
	pub async fn run_command(self, command: &str) -> Result<()> {
		let machine = Machine::new(self.context.local_asn, Mode::Exec);
		self.drive(machine, Some(command.to_string())).await
	}

	async fn authenticate(&self) -> Event {
		match self.context.service.owned_asns(&self.identity).await {
			Ok(owned_asns) => Event::Authenticated {
				maintainer: self.identity.username.clone(),
				owned_asns,
			},
			Err(err) => {
				warn!(maintainer = %self.identity.username, error = %err, "cannot load maintained AS numbers");
				Event::AuthFailed(err.user_message())
			}
		}
	}

	#[tracing::instrument(skip_all, fields(maintainer = %self.identity.username))]
	async fn drive(mut self, mut machine: Machine, mut exec_line: Option<String>) -> Result<()> {
		info!("session started");
		let first = self.authenticate().await;
		let mut pending: VecDeque<Action> = machine.step(first).into();

		loop {
			while let Some(action) = pending.pop_front() {
				if action == Action::Close {
					pending.clear();
					break;
				}
				let task = action.is_task();
				self.perform(action).await?;
				if task {
					pending.extend(machine.step(Event::Completed));
				}
			}
			if machine.is_closed() {
				break;
			}

			let event = match exec_line.take() {
				Some(line) => Event::Line(line),
				None => match self.editor.read_input().await? {
					Input::Line(line) => Event::Line(line),
					Input::Interrupt => Event::Interrupt,
					Input::Eof => Event::Eof,
				},
			};
			if let Event::Line(line) = &event {
				debug!(state = ?machine.state(), input = %line, "input");
			}
			pending.extend(machine.step(event));
		}

		info!("session closed");
		self.editor.shutdown().await
	}

	async fn perform(&mut self, action: Action) -> Result<()> {
		let ctx = Arc::clone(&self.context);
		let service = &ctx.service;
		let allocator = service.allocator();

		match action {
			Action::Say(text) => self.editor.write_line(&text).await,
			Action::Warn(text) => self.editor.write_line(&self.painter.warn(&text)).await,
			Action::Prompt(text) => self.editor.prompt(&text).await,
			Action::Close => Ok(()),

			Action::ListOwn => match service.list_own(&self.identity).await {
				Ok(links) => {
					let text = output::own_links(&self.painter, &links, allocator);
					self.editor.write_line(&text).await
				}
				Err(err) => self.fail(err).await,
			},
			Action::ListAll => match service.list_all().await {
				Ok(links) => {
					let text = output::all_links(&self.painter, &links);
					self.editor.write_line(&text).await
				}
				Err(err) => self.fail(err).await,
			},
			Action::Show(as_num) => match service.get_owned(&self.identity, as_num).await {
				Ok(link) => {
					let rendered = ctx
						.renderer
						.peer_wireguard(&link)
						.and_then(|wg| Ok((wg, ctx.renderer.peer_bird(&link)?)));
					match rendered {
						Ok((wireguard, bird)) => {
							let text = format!(
								"{}\n{}\n{}\n{}",
								self.painter.heading(&format!(
									"# WireGuard: wg-as{}.conf (fill in your private key)",
									ctx.local_asn
								)),
								wireguard.trim_end(),
								self.painter.heading("# BIRD"),
								bird.trim_end(),
							);
							self.editor.write_line(&text).await
						}
						Err(err) => {
							warn!(as_num, error = %err, "cannot render peer configuration");
							let text = self.painter.warn(&err.to_string());
							self.editor.write_line(&text).await
						}
					}
				}
				Err(err) => self.fail(err).await,
			},
			Action::Commit(request) => match service.create(&self.identity, request).await {
				Ok(link) => {
					let text = output::created(&self.painter, &link, allocator, &ctx.domain_name);
					self.editor.write_line(&text).await
				}
				Err(err) => self.fail(err).await,
			},
			Action::Remove(as_num) => match service.remove(&self.identity, as_num).await {
				Ok(link) => {
					let text = self.painter.ok(&format!(
						"Peering with AS{} removed (link id {} released)",
						link.as_num, link.id
					));
					self.editor.write_line(&text).await
				}
				Err(err) => self.fail(err).await,
			},
		}
	}

	async fn fail(&mut self, err: PeeringError) -> Result<()> {
		match &err {
			PeeringError::StoreUnavailable(_) | PeeringError::RegistryUnavailable(_) => {
				warn!(error = ?err, "request failed")
			}
			_ => info!(error = %err, "request refused"),
		}
		let text = self.painter.warn(&err.user_message());
		self.editor.write_line(&text).await
	}
}
