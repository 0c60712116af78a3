// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Command pipe: bridges a fixed command's stdio to the channel.
//!
//! Used by the `gaming` server, which lets anyone in and runs the same
//! program for every connection.

use std::process::Stdio;

use async_trait::async_trait;
use autopeer_registry::MaintainerIdentity;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{Result, SshdError};
use crate::service::{BoxedIo, ChannelRequest, ChannelService};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Newlines {
	Keep,
	/// Client terminal to program: CR becomes LF.
	FromTerminal,
	/// Program to client terminal: LF becomes CRLF.
	ToTerminal,
}

fn translate(chunk: &[u8], mode: Newlines) -> Vec<u8> {
	match mode {
		Newlines::Keep => chunk.to_vec(),
		Newlines::FromTerminal => chunk
			.iter()
			.map(|&b| if b == b'\r' { b'\n' } else { b })
			.collect(),
		Newlines::ToTerminal => {
			let mut out = Vec::with_capacity(chunk.len() + 8);
			for &b in chunk {
				if b == b'\n' {
					out.push(b'\r');
				}
				out.push(b);
			}
			out
		}
	}
}

async fn pump<R, W>(mut from: R, mut to: W, mode: Newlines) -> std::io::Result<u64>
where
	R: AsyncRead + Unpin,
	W: AsyncWrite + Unpin,
{
	let mut buf = [0u8; 1024];
	let mut total = 0u64;
	loop {
		let n = from.read(&mut buf).await?;
		if n == 0 {
			break;
		}
		to.write_all(&translate(&buf[..n], mode)).await?;
		to.flush().await?;
		total += n as u64;
	}
	to.shutdown().await?;
	Ok(total)
}

pub struct PipeService {
	command: String,
}

impl PipeService {
	pub fn new(command: impl Into<String>) -> Self {
		Self {
			command: command.into(),
		}
	}
}

#[async_trait]
impl ChannelService for PipeService {
	#[tracing::instrument(skip_all, fields(user = %identity.username, command = %self.command))]
	async fn serve(
		&self,
		identity: MaintainerIdentity,
		io: BoxedIo,
		request: ChannelRequest,
	) -> Result<u32> {
		let pty = request.pty();
		// Merge stderr so the client sees error output too.
		let script = format!("exec 2>&1\n{}", self.command);
		let mut child = Command::new("sh")
			.arg("-c")
			.arg(&script)
			.env("SSH_USER", &identity.username)
			.stdin(Stdio::piped())
			.stdout(Stdio::piped())
			.stderr(Stdio::inherit())
			.kill_on_drop(true)
			.spawn()?;
		info!(pid = child.id(), "command started");

		let stdin = child
			.stdin
			.take()
			.ok_or_else(|| SshdError::Pipe("child stdin unavailable".into()))?;
		let stdout = child
			.stdout
			.take()
			.ok_or_else(|| SshdError::Pipe("child stdout unavailable".into()))?;

		let (reader, writer) = tokio::io::split(io);
		let (to_child, to_client) = if pty {
			(Newlines::FromTerminal, Newlines::ToTerminal)
		} else {
			(Newlines::Keep, Newlines::Keep)
		};

		let input = tokio::spawn(pump(reader, stdin, to_child));
		let output = pump(stdout, writer, to_client).await;
		input.abort();

		let status = match output {
			Ok(bytes) => {
				debug!(bytes, "command output finished");
				child.wait().await?
			}
			Err(e) => {
				warn!(error = %e, "client went away, stopping command");
				child.kill().await?;
				child.wait().await?
			}
		};
		let code = status.code().map_or(1, |c| c as u32);
		info!(code, "command exited");
		Ok(code)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use autopeer_registry::MaintainerIdentity;
	use tokio::io::duplex;

	#[test]
	fn test_translate() {
		assert_eq!(translate(b"a\nb", Newlines::ToTerminal), b"a\r\nb");
		assert_eq!(translate(b"go\r", Newlines::FromTerminal), b"go\n");
		assert_eq!(translate(b"x\r\n", Newlines::Keep), b"x\r\n");
	}

	async fn run(command: &str, input: &[u8], pty: bool) -> (u32, String) {
		let (mut client, server) = duplex(16 * 1024);
		let service = PipeService::new(command);
		let request = if pty {
			ChannelRequest::Shell { pty: true }
		} else {
			ChannelRequest::Exec {
				command: String::new(),
				pty: false,
			}
		};
		let task = tokio::spawn(async move {
			service
				.serve(MaintainerIdentity::anonymous("guest"), Box::pin(server), request)
				.await
		});

		client.write_all(input).await.unwrap();
		let mut out = String::new();
		client.read_to_string(&mut out).await.unwrap();
		(task.await.unwrap().unwrap(), out)
	}

	#[tokio::test]
	async fn test_pipes_stdin_to_stdout() {
		let (code, out) = run("head -n 1", b"hello\nignored\n", false).await;
		assert_eq!(code, 0);
		assert_eq!(out, "hello\n");
	}

	#[tokio::test]
	async fn test_terminal_newlines_and_stderr() {
		let (code, out) = run("echo out; echo err >&2; exit 3", b"", true).await;
		assert_eq!(code, 3);
		assert_eq!(out, "out\r\nerr\r\n");
	}

	#[tokio::test]
	async fn test_user_is_exported() {
		let (_, out) = run("echo \"$SSH_USER\"", b"", false).await;
		assert_eq!(out, "guest\n");
	}
}
