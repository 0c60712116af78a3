// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session protocol as an explicit state machine.
//!
//! [`Machine::step`] is pure: it consumes one [`Event`] and returns the
//! [`Action`]s the driver must perform. Actions that touch the store end
//! with the driver feeding [`Event::Completed`] back in.
//!
//! ```text
//! Unauthenticated --Authenticated--> Idle --list/show--> Listing --Completed--> Idle
//!                                     |  --peer-->   Creating(step) --yes--> Creating(Committing) --Completed--> Idle
//!                                     |  --unpeer--> Deleting(step) --yes--> Deleting(Removing)   --Completed--> Idle
//!                                     +--quit/EOF--> Closed
//! ```

use std::net::Ipv6Addr;

use autopeer_db::NewPeeringLink;
use autopeer_peering::endpoint::{
	parse_as_number, parse_endpoint_address, parse_link_local, parse_port, parse_public_key,
};

use crate::command::{self, Command, CommandKind, HELP};

pub const FAREWELL: &str = "See You, Space Cowboy!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateStep {
	AsNumber,
	EndpointAddress,
	EndpointPort,
	PublicKey,
	LinkLocal,
	Confirm,
	Committing,
}

/// Fields collected so far while creating a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDraft {
	pub step: CreateStep,
	pub as_num: Option<u32>,
	pub endpoint_addr: Option<String>,
	pub endpoint_port: Option<u16>,
	pub public_key: Option<String>,
	pub link_local: Option<Ipv6Addr>,
}

impl CreateDraft {
	fn new(as_num: Option<u32>) -> Self {
		Self {
			step: if as_num.is_some() {
				CreateStep::EndpointAddress
			} else {
				CreateStep::AsNumber
			},
			as_num,
			endpoint_addr: None,
			endpoint_port: None,
			public_key: None,
			link_local: None,
		}
	}

	fn request(&self) -> Option<NewPeeringLink> {
		Some(NewPeeringLink {
			as_num: self.as_num?,
			wg_pub_key: self.public_key.clone()?,
			wg_endpoint_addr: self.endpoint_addr.clone()?,
			wg_endpoint_port: self.endpoint_port?,
			peer_link_local: self.link_local,
		})
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteStep {
	AsNumber,
	Confirm(u32),
	Removing(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
	Unauthenticated,
	Idle,
	/// A read-only request (`list`, `show`) is running.
	Listing,
	Creating(CreateDraft),
	Deleting(DeleteStep),
	Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
	Authenticated {
		maintainer: String,
		owned_asns: Vec<u32>,
	},
	AuthFailed(String),
	Line(String),
	Interrupt,
	/// The driver finished the last store action, successfully or not.
	Completed,
	Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
	Say(String),
	Warn(String),
	Prompt(String),
	ListOwn,
	ListAll,
	Show(u32),
	Commit(NewPeeringLink),
	Remove(u32),
	Close,
}

impl Action {
	/// Whether the driver must answer this action with [`Event::Completed`].
	pub fn is_task(&self) -> bool {
		matches!(
			self,
			Self::ListOwn | Self::ListAll | Self::Show(_) | Self::Commit(_) | Self::Remove(_)
		)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
	Interactive,
	/// One command from `ssh host <command>`, then close.
	Exec,
}

pub struct Machine {
	state: State,
	mode: Mode,
	local_asn: u32,
	maintainer: String,
	owned: Vec<u32>,
}

impl Machine {
	pub fn new(local_asn: u32, mode: Mode) -> Self {
		Self {
			state: State::Unauthenticated,
			mode,
			local_asn,
			maintainer: String::new(),
			owned: Vec::new(),
		}
	}

	pub fn state(&self) -> &State {
		&self.state
	}

	pub fn is_closed(&self) -> bool {
		self.state == State::Closed
	}

	pub fn idle_prompt(&self) -> String {
		format!("\nAS{}> ", self.local_asn)
	}

	/// Commands accepted as commands in the current state. Any other line
	/// in an input state is treated as a field value.
	pub fn permitted(&self) -> &'static [CommandKind] {
		Self::permitted_in(&self.state, self.mode)
	}

	fn permitted_in(state: &State, mode: Mode) -> &'static [CommandKind] {
		use CommandKind::*;
		match (state, mode) {
			(State::Idle, Mode::Interactive) => &[Empty, List, Peer, Unpeer, Show, Help, Quit],
			(State::Idle, Mode::Exec) => &[List, Show, Help, Quit],
			(State::Creating(d), _) if d.step != CreateStep::Committing => &[Cancel],
			(State::Deleting(DeleteStep::AsNumber | DeleteStep::Confirm(_)), _) => &[Cancel],
			_ => &[],
		}
	}

	pub fn step(&mut self, event: Event) -> Vec<Action> {
		let state = std::mem::replace(&mut self.state, State::Closed);
		let (next, actions) = match (state, event) {
			(State::Closed, _) => (State::Closed, Vec::new()),
			(_, Event::Eof) => (State::Closed, vec![Action::Close]),

			(State::Unauthenticated, Event::Authenticated { maintainer, owned_asns }) => {
				self.maintainer = maintainer;
				self.owned = owned_asns;
				self.owned.sort_unstable();
				self.owned.dedup();
				match self.mode {
					Mode::Interactive => (
						State::Idle,
						vec![
							Action::Say(format!(
								"AS{} SSH Shell. Type help or ? to list commands.",
								self.local_asn
							)),
							Action::Prompt(self.idle_prompt()),
						],
					),
					Mode::Exec => (State::Idle, Vec::new()),
				}
			}
			(State::Unauthenticated, Event::AuthFailed(reason)) => (
				State::Closed,
				vec![
					Action::Warn(format!("authentication failed: {reason}")),
					Action::Close,
				],
			),
			(State::Unauthenticated, _) => (State::Unauthenticated, Vec::new()),

			(State::Idle, Event::Line(line)) => self.on_command(&line),
			(State::Idle, Event::Interrupt) => self.idle(Vec::new()),

			(State::Creating(draft), Event::Line(line)) => self.on_create_input(draft, &line),
			(State::Deleting(step), Event::Line(line)) => self.on_delete_input(step, &line),
			(
				State::Creating(CreateDraft {
					step: CreateStep::Committing,
					..
				})
				| State::Deleting(DeleteStep::Removing(_))
				| State::Listing,
				Event::Completed,
			) => self.idle(Vec::new()),
			(State::Creating(_) | State::Deleting(_), Event::Interrupt) => {
				self.idle(vec![Action::Say("Cancelled.".into())])
			}

			// Input while a task runs, or a stray completion.
			(state, _) => (state, Vec::new()),
		};
		self.state = next;
		actions
	}

	/// Back to `Idle`: prompt again, or close after a single exec command.
	fn idle(&self, mut actions: Vec<Action>) -> (State, Vec<Action>) {
		match self.mode {
			Mode::Interactive => {
				actions.push(Action::Prompt(self.idle_prompt()));
				(State::Idle, actions)
			}
			Mode::Exec => {
				actions.push(Action::Close);
				(State::Closed, actions)
			}
		}
	}

	fn reject(&self, message: String) -> (State, Vec<Action>) {
		self.idle(vec![Action::Warn(message)])
	}

	fn owns(&self, as_num: u32) -> bool {
		self.owned.binary_search(&as_num).is_ok()
	}

	fn owned_list(&self) -> String {
		self.owned
			.iter()
			.map(|n| format!("AS{n}"))
			.collect::<Vec<_>>()
			.join(", ")
	}

	fn not_maintained(&self, as_num: u32) -> String {
		format!(
			"AS{as_num} is not maintained by {}-MNT",
			self.maintainer.to_ascii_uppercase()
		)
	}

	/// Explicit AS, else the only owned AS, else `None`.
	fn target_as(&self, given: Option<u32>) -> Option<u32> {
		given.or(match self.owned.as_slice() {
			[only] => Some(*only),
			_ => None,
		})
	}

	fn on_command(&self, line: &str) -> (State, Vec<Action>) {
		let command = match command::parse(line) {
			Ok(command) => command,
			Err(message) => return self.reject(message),
		};
		// `step` has already taken the state out of `self`.
		if !Self::permitted_in(&State::Idle, self.mode).contains(&command.kind()) {
			return match command.kind() {
				CommandKind::Peer | CommandKind::Unpeer => self.reject(
					"peer and unpeer ask questions; connect with an interactive session (ssh -t)"
						.into(),
				),
				CommandKind::Cancel => self.reject("nothing to cancel".into()),
				_ => self.reject(format!("{line:?} is not available here")),
			};
		}

		match command {
			Command::Empty => self.idle(Vec::new()),
			Command::Help => self.idle(vec![Action::Say(HELP.into())]),
			Command::Quit => (
				State::Closed,
				vec![Action::Say(FAREWELL.into()), Action::Close],
			),
			Command::List { all: false } => (State::Listing, vec![Action::ListOwn]),
			Command::List { all: true } => (State::Listing, vec![Action::ListAll]),
			Command::Show { as_num } => match self.target_as(as_num) {
				Some(as_num) if self.owns(as_num) => (State::Listing, vec![Action::Show(as_num)]),
				Some(as_num) => self.reject(self.not_maintained(as_num)),
				None => self.reject("usage: show <AS>".into()),
			},
			Command::Peer { as_num } => self.start_create(as_num),
			Command::Unpeer { as_num } => self.start_delete(as_num),
			Command::Cancel => self.idle(Vec::new()),
		}
	}

	fn start_create(&self, given: Option<u32>) -> (State, Vec<Action>) {
		if self.owned.is_empty() {
			return self.reject(format!(
				"no AS numbers are maintained by {}-MNT",
				self.maintainer.to_ascii_uppercase()
			));
		}
		let as_num = self.target_as(given);
		if let Some(as_num) = as_num {
			if !self.owns(as_num) {
				return self.reject(self.not_maintained(as_num));
			}
		}

		let draft = CreateDraft::new(as_num);
		let mut actions = vec![Action::Say(
			"Creating a new peering. Type cancel at any prompt to stop.".into(),
		)];
		if given.is_none() {
			if let Some(as_num) = as_num {
				actions.push(Action::Say(format!("Using AS{as_num}.")));
			}
		}
		actions.push(self.create_prompt(&draft));
		(State::Creating(draft), actions)
	}

	fn create_prompt(&self, draft: &CreateDraft) -> Action {
		Action::Prompt(match draft.step {
			CreateStep::AsNumber => format!("AS number [{}]: ", self.owned_list()),
			CreateStep::EndpointAddress => "Your WireGuard endpoint (IP or host name): ".into(),
			CreateStep::EndpointPort => "Your WireGuard port: ".into(),
			CreateStep::PublicKey => "Your WireGuard public key: ".into(),
			CreateStep::LinkLocal => "Your link-local address (empty for automatic): ".into(),
			CreateStep::Confirm => "Create this peering? [yes/no]: ".into(),
			CreateStep::Committing => String::new(),
		})
	}

	fn is_cancel(line: &str) -> bool {
		line.trim().eq_ignore_ascii_case("cancel")
	}

	fn on_create_input(&self, mut draft: CreateDraft, line: &str) -> (State, Vec<Action>) {
		if Self::is_cancel(line) {
			return self.idle(vec![Action::Say("Cancelled.".into())]);
		}

		let parsed: Result<(), String> = match draft.step {
			CreateStep::AsNumber => match parse_as_number(line) {
				Ok(n) if self.owns(n) => {
					draft.as_num = Some(n);
					draft.step = CreateStep::EndpointAddress;
					Ok(())
				}
				Ok(n) => Err(self.not_maintained(n)),
				Err(e) => Err(e.user_message()),
			},
			CreateStep::EndpointAddress => parse_endpoint_address(line)
				.map(|addr| {
					draft.endpoint_addr = Some(addr);
					draft.step = CreateStep::EndpointPort;
				})
				.map_err(|e| e.user_message()),
			CreateStep::EndpointPort => parse_port(line)
				.map(|port| {
					draft.endpoint_port = Some(port);
					draft.step = CreateStep::PublicKey;
				})
				.map_err(|e| e.user_message()),
			CreateStep::PublicKey => parse_public_key(line)
				.map(|key| {
					draft.public_key = Some(key);
					draft.step = CreateStep::LinkLocal;
				})
				.map_err(|e| e.user_message()),
			CreateStep::LinkLocal => parse_link_local(line)
				.map(|addr| {
					draft.link_local = addr;
					draft.step = CreateStep::Confirm;
				})
				.map_err(|e| e.user_message()),
			CreateStep::Confirm => {
				return match line.trim().to_ascii_lowercase().as_str() {
					"yes" | "y" => match draft.request() {
						Some(request) => {
							draft.step = CreateStep::Committing;
							(State::Creating(draft), vec![Action::Commit(request)])
						}
						None => self.reject("incomplete peering request".into()),
					},
					"no" | "n" => self.idle(vec![Action::Say("Peering request discarded.".into())]),
					_ => {
						let prompt = self.create_prompt(&draft);
						(
							State::Creating(draft),
							vec![Action::Warn("please answer yes or no".into()), prompt],
						)
					}
				};
			}
			CreateStep::Committing => return (State::Creating(draft), Vec::new()),
		};

		let mut actions = Vec::new();
		if let Err(message) = parsed {
			actions.push(Action::Warn(message));
		}
		if draft.step == CreateStep::Confirm {
			actions.push(Action::Say(summary(&draft)));
		}
		actions.push(self.create_prompt(&draft));
		(State::Creating(draft), actions)
	}

	fn start_delete(&self, given: Option<u32>) -> (State, Vec<Action>) {
		match self.target_as(given) {
			Some(as_num) if self.owns(as_num) => (
				State::Deleting(DeleteStep::Confirm(as_num)),
				vec![self.delete_prompt(DeleteStep::Confirm(as_num))],
			),
			Some(as_num) => self.reject(self.not_maintained(as_num)),
			None if self.owned.is_empty() => self.reject(format!(
				"no AS numbers are maintained by {}-MNT",
				self.maintainer.to_ascii_uppercase()
			)),
			None => (
				State::Deleting(DeleteStep::AsNumber),
				vec![self.delete_prompt(DeleteStep::AsNumber)],
			),
		}
	}

	fn delete_prompt(&self, step: DeleteStep) -> Action {
		Action::Prompt(match step {
			DeleteStep::AsNumber => format!("AS number to unpeer [{}]: ", self.owned_list()),
			DeleteStep::Confirm(as_num) => format!("Remove the peering with AS{as_num}? [yes/no]: "),
			DeleteStep::Removing(_) => String::new(),
		})
	}

	fn on_delete_input(&self, step: DeleteStep, line: &str) -> (State, Vec<Action>) {
		if Self::is_cancel(line) {
			return self.idle(vec![Action::Say("Cancelled.".into())]);
		}
		match step {
			DeleteStep::AsNumber => match parse_as_number(line) {
				Ok(n) if self.owns(n) => {
					let next = DeleteStep::Confirm(n);
					(State::Deleting(next), vec![self.delete_prompt(next)])
				}
				Ok(n) => (
					State::Deleting(step),
					vec![Action::Warn(self.not_maintained(n)), self.delete_prompt(step)],
				),
				Err(e) => (
					State::Deleting(step),
					vec![Action::Warn(e.user_message()), self.delete_prompt(step)],
				),
			},
			DeleteStep::Confirm(as_num) => match line.trim().to_ascii_lowercase().as_str() {
				"yes" | "y" => (
					State::Deleting(DeleteStep::Removing(as_num)),
					vec![Action::Remove(as_num)],
				),
				"no" | "n" => self.idle(vec![Action::Say("Nothing removed.".into())]),
				_ => (
					State::Deleting(step),
					vec![
						Action::Warn("please answer yes or no".into()),
						self.delete_prompt(step),
					],
				),
			},
			DeleteStep::Removing(_) => (State::Deleting(step), Vec::new()),
		}
	}
}

fn summary(draft: &CreateDraft) -> String {
	let field = |value: Option<String>| value.unwrap_or_else(|| "-".into());
	format!(
		"  AS number:   {}\n  Endpoint:    {} port {}\n  Public key:  {}\n  Link-local:  {}",
		field(draft.as_num.map(|n| format!("AS{n}"))),
		field(draft.endpoint_addr.clone()),
		field(draft.endpoint_port.map(|p| p.to_string())),
		field(draft.public_key.clone()),
		draft
			.link_local
			.map(|a| a.to_string())
			.unwrap_or_else(|| "automatic".into()),
	)
}
