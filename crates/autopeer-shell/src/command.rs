// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Command words accepted at the idle prompt.

use autopeer_peering::endpoint::parse_as_number;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
	Empty,
	List { all: bool },
	Peer { as_num: Option<u32> },
	Unpeer { as_num: Option<u32> },
	Show { as_num: Option<u32> },
	Help,
	Quit,
	Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
	Empty,
	List,
	Peer,
	Unpeer,
	Show,
	Help,
	Quit,
	Cancel,
}

impl Command {
	pub fn kind(&self) -> CommandKind {
		match self {
			Self::Empty => CommandKind::Empty,
			Self::List { .. } => CommandKind::List,
			Self::Peer { .. } => CommandKind::Peer,
			Self::Unpeer { .. } => CommandKind::Unpeer,
			Self::Show { .. } => CommandKind::Show,
			Self::Help => CommandKind::Help,
			Self::Quit => CommandKind::Quit,
			Self::Cancel => CommandKind::Cancel,
		}
	}
}

pub const HELP: &str = "\
Commands:
  list            show peerings for the AS numbers you maintain
  list all        show every peering on this node (id and AS only)
  peer [AS]       request a new peering
  unpeer [AS]     remove a peering
  show [AS]       print the WireGuard and BIRD config for your side
  help, ?         this text
  quit            disconnect";

fn optional_as(word: Option<&str>) -> Result<Option<u32>, String> {
	word.map(|w| parse_as_number(w).map_err(|e| e.to_string()))
		.transpose()
}

/// Parse one input line. Errors are one-line messages for the user.
pub fn parse(line: &str) -> Result<Command, String> {
	let mut words = line.split_whitespace();
	let Some(head) = words.next() else {
		return Ok(Command::Empty);
	};
	let arg = words.next();
	if words.next().is_some() {
		return Err(format!("too many arguments for {head:?}, try 'help'"));
	}

	match head.to_ascii_lowercase().as_str() {
		"list" | "ls" => match arg.map(str::to_ascii_lowercase).as_deref() {
			None => Ok(Command::List { all: false }),
			Some("all") => Ok(Command::List { all: true }),
			Some(other) => Err(format!("unknown list filter {other:?}, try 'list all'")),
		},
		"peer" | "create" => Ok(Command::Peer {
			as_num: optional_as(arg)?,
		}),
		"unpeer" | "remove" => Ok(Command::Unpeer {
			as_num: optional_as(arg)?,
		}),
		"show" => Ok(Command::Show {
			as_num: optional_as(arg)?,
		}),
		"help" | "?" if arg.is_none() => Ok(Command::Help),
		"quit" | "exit" | "bye" | "logout" if arg.is_none() => Ok(Command::Quit),
		"cancel" if arg.is_none() => Ok(Command::Cancel),
		other => Err(format!("unknown command {other:?}, try 'help'")),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_commands() {
		assert_eq!(parse("  ").unwrap(), Command::Empty);
		assert_eq!(parse("list").unwrap(), Command::List { all: false });
		assert_eq!(parse("LIST All").unwrap(), Command::List { all: true });
		assert_eq!(parse("peer").unwrap(), Command::Peer { as_num: None });
		assert_eq!(
			parse("peer AS4242421111").unwrap(),
			Command::Peer {
				as_num: Some(4242421111)
			}
		);
		assert_eq!(
			parse("unpeer 4242421111").unwrap(),
			Command::Unpeer {
				as_num: Some(4242421111)
			}
		);
		assert_eq!(parse("?").unwrap(), Command::Help);
		assert_eq!(parse("bye").unwrap(), Command::Quit);
	}

	#[test]
	fn test_parse_errors() {
		assert!(parse("frobnicate").unwrap_err().contains("unknown command"));
		assert!(parse("peer notanumber").is_err());
		assert!(parse("list everything").is_err());
		assert!(parse("unpeer 1 2").unwrap_err().contains("too many"));
		assert!(parse("quit now").is_err());
	}
}
