// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Minimal raw-mode line editor.
//!
//! SSH clients with a PTY send keystrokes one at a time and expect the
//! server to echo them. Supported editing is deliberately small: printable
//! ASCII, backspace, Enter (CR, LF or CRLF), Ctrl-C and Ctrl-D. Cursor and
//! function key escape sequences are swallowed.

use std::collections::VecDeque;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::Result;

const MAX_LINE: usize = 512;

const CTRL_C: u8 = 0x03;
const CTRL_D: u8 = 0x04;
const BACKSPACE: u8 = 0x08;
const ESC: u8 = 0x1b;
const DEL: u8 = 0x7f;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
	Line(String),
	Interrupt,
	Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Escape {
	None,
	Start,
	Sequence,
}

pub struct LineEditor<R, W> {
	reader: R,
	writer: W,
	echo: bool,
	pending: VecDeque<u8>,
	skip_lf: bool,
}

impl<R, W> LineEditor<R, W>
where
	R: AsyncRead + Unpin,
	W: AsyncWrite + Unpin,
{
	pub fn new(reader: R, writer: W, echo: bool) -> Self {
		Self {
			reader,
			writer,
			echo,
			pending: VecDeque::new(),
			skip_lf: false,
		}
	}

	async fn next_byte(&mut self) -> Result<Option<u8>> {
		if let Some(b) = self.pending.pop_front() {
			return Ok(Some(b));
		}
		let mut buf = [0u8; 256];
		let n = self.reader.read(&mut buf).await?;
		if n == 0 {
			return Ok(None);
		}
		self.pending.extend(&buf[..n]);
		Ok(self.pending.pop_front())
	}

	async fn echo_bytes(&mut self, bytes: &[u8]) -> Result<()> {
		if self.echo {
			self.writer.write_all(bytes).await?;
			self.writer.flush().await?;
		}
		Ok(())
	}

	pub async fn read_input(&mut self) -> Result<Input> {
		let mut line = String::new();
		let mut escape = Escape::None;

		loop {
			let Some(byte) = self.next_byte().await? else {
				return Ok(if line.is_empty() {
					Input::Eof
				} else {
					Input::Line(line)
				});
			};

			if self.skip_lf {
				self.skip_lf = false;
				if byte == b'\n' {
					continue;
				}
			}

			match escape {
				Escape::Start => {
					escape = if byte == b'[' || byte == b'O' {
						Escape::Sequence
					} else {
						Escape::None
					};
					continue;
				}
				Escape::Sequence => {
					if (0x40..=0x7e).contains(&byte) {
						escape = Escape::None;
					}
					continue;
				}
				Escape::None => {}
			}

			match byte {
				b'\r' | b'\n' => {
					self.skip_lf = byte == b'\r';
					self.echo_bytes(b"\r\n").await?;
					return Ok(Input::Line(line));
				}
				BACKSPACE | DEL => {
					if line.pop().is_some() {
						self.echo_bytes(b"\x08 \x08").await?;
					}
				}
				CTRL_C => {
					self.echo_bytes(b"^C\r\n").await?;
					return Ok(Input::Interrupt);
				}
				CTRL_D if line.is_empty() => return Ok(Input::Eof),
				ESC => escape = Escape::Start,
				0x20..=0x7e if line.len() < MAX_LINE => {
					line.push(byte as char);
					self.echo_bytes(&[byte]).await?;
				}
				_ => {}
			}
		}
	}

	/// Write text, translating `\n` to `\r\n`, followed by a line break.
	pub async fn write_line(&mut self, text: &str) -> Result<()> {
		self.write_raw(text).await?;
		self.writer.write_all(b"\r\n").await?;
		self.writer.flush().await?;
		Ok(())
	}

	/// Write text with no trailing line break and flush.
	pub async fn prompt(&mut self, text: &str) -> Result<()> {
		self.write_raw(text).await?;
		self.writer.flush().await?;
		Ok(())
	}

	async fn write_raw(&mut self, text: &str) -> Result<()> {
		let mut first = true;
		for part in text.split('\n') {
			if !first {
				self.writer.write_all(b"\r\n").await?;
			}
			first = false;
			self.writer
				.write_all(part.strip_suffix('\r').unwrap_or(part).as_bytes())
				.await?;
		}
		Ok(())
	}

	pub async fn shutdown(&mut self) -> Result<()> {
		self.writer.flush().await?;
		self.writer.shutdown().await?;
		Ok(())
	}
}
