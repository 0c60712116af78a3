// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Text rendering for session output.

use autopeer_db::PeeringLink;
use autopeer_peering::{LinkAllocator, LinkSummary};
use console::Style;

/// Applies terminal colours only when the client asked for a PTY.
#[derive(Debug, Clone, Copy)]
pub struct Painter {
	colors: bool,
}

impl Painter {
	pub fn new(colors: bool) -> Self {
		Self { colors }
	}

	fn paint(&self, style: Style, text: &str) -> String {
		style.force_styling(self.colors).apply_to(text).to_string()
	}

	pub fn ok(&self, message: &str) -> String {
		format!("{} {message}", self.paint(Style::new().green().bold(), "✓"))
	}

	pub fn warn(&self, message: &str) -> String {
		format!("{} {message}", self.paint(Style::new().red().bold(), "✗"))
	}

	pub fn accent(&self, text: &str) -> String {
		self.paint(Style::new().cyan(), text)
	}

	pub fn heading(&self, text: &str) -> String {
		self.paint(Style::new().bold(), text)
	}

	pub fn dim(&self, text: &str) -> String {
		self.paint(Style::new().dim(), text)
	}
}

/// Left-aligned columns. Widths come from the plain text so styling
/// does not skew alignment.
fn table(painter: &Painter, header: &[&str], rows: &[Vec<String>]) -> String {
	let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
	for row in rows {
		for (width, cell) in widths.iter_mut().zip(row) {
			*width = (*width).max(cell.chars().count());
		}
	}

	let render = |cells: Vec<String>| -> String {
		cells
			.iter()
			.zip(&widths)
			.map(|(cell, &width)| format!("{cell:<width$}"))
			.collect::<Vec<_>>()
			.join("  ")
			.trim_end()
			.to_string()
	};

	let mut lines = vec![painter.heading(&render(header.iter().map(|h| h.to_string()).collect()))];
	lines.extend(rows.iter().map(|row| render(row.clone())));
	lines.join("\n")
}

pub fn own_links(painter: &Painter, links: &[PeeringLink], allocator: &LinkAllocator) -> String {
	if links.is_empty() {
		return painter.dim("No peerings yet. Use 'peer' to create one.");
	}
	let rows: Vec<Vec<String>> = links
		.iter()
		.map(|link| {
			vec![
				link.id.to_string(),
				format!("AS{}", link.as_num),
				link.wg_endpoint_addr.clone(),
				link.wg_endpoint_port.to_string(),
				allocator
					.derive_port(link.id)
					.map(|p| p.to_string())
					.unwrap_or_else(|| "-".into()),
				allocator.derive_address(link.id).to_string(),
			]
		})
		.collect();
	table(
		painter,
		&["ID", "AS", "YOUR ENDPOINT", "YOUR PORT", "OUR PORT", "OUR ADDRESS"],
		&rows,
	)
}

pub fn all_links(painter: &Painter, links: &[LinkSummary]) -> String {
	if links.is_empty() {
		return painter.dim("No peerings on this node.");
	}
	let rows: Vec<Vec<String>> = links
		.iter()
		.map(|link| vec![link.id.to_string(), format!("AS{}", link.as_num)])
		.collect();
	table(painter, &["ID", "AS"], &rows)
}

pub fn created(
	painter: &Painter,
	link: &PeeringLink,
	allocator: &LinkAllocator,
	domain_name: &str,
) -> String {
	let port = allocator
		.derive_port(link.id)
		.map(|p| p.to_string())
		.unwrap_or_else(|| "-".into());
	format!(
		"{}\n  Our endpoint: {}\n  Our address:  {}\n  Your address: {}\nRun 'show AS{}' for ready-to-use configuration.",
		painter.ok(&format!(
			"Peering with AS{} created (link id {})",
			link.as_num, link.id
		)),
		painter.accent(&format!("{domain_name}:{port}")),
		painter.accent(&allocator.derive_address(link.id).to_string()),
		painter.accent(
			&link
				.peer_link_local
				.unwrap_or_else(|| allocator.derive_peer_address(link.id))
				.to_string()
		),
		link.as_num,
	)
}
