// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The interactive peering shell.
//!
//! [`machine`] holds the protocol as a pure state machine, [`session`]
//! drives it over any async byte stream. The SSH layer hands each channel
//! to a [`ShellSession`].

pub mod command;
pub mod error;
pub mod line;
pub mod machine;
pub mod output;
pub mod session;

pub use error::{Result, ShellError};
pub use machine::{Action, Event, Machine, Mode, State};
pub use session::{SessionContext, ShellSession};
