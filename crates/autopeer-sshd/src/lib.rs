// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SSH front end.
//!
//! [`Dispatcher`] accepts TCP connections and runs each one on its own
//! task. Authentication is delegated to an
//! [`IdentityResolver`](autopeer_registry::IdentityResolver); accepted
//! channels go to a [`ChannelService`], either the peering shell or a
//! command pipe.

pub mod banner;
pub mod error;
pub mod handler;
pub mod keys;
pub mod pipe;
pub mod server;
pub mod service;

pub use error::{Result, SshdError};
pub use handler::ConnectionHandler;
pub use pipe::PipeService;
pub use server::{server_config, Dispatcher};
pub use service::{BoxedIo, ChannelRequest, ChannelService, ShellService};
