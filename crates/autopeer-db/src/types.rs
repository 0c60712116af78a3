// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::net::Ipv6Addr;

use serde::Serialize;

use crate::error::DbError;

/// One row of `peering_links`: a tunnel to a single remote AS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeeringLink {
	pub id: u16,
	pub as_num: u32,
	pub wg_pub_key: String,
	pub wg_endpoint_addr: String,
	pub wg_endpoint_port: u16,
	/// Peer-chosen tunnel address; the derived one is used when absent.
	pub peer_link_local: Option<Ipv6Addr>,
}

/// A link request before an id has been assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPeeringLink {
	pub as_num: u32,
	pub wg_pub_key: String,
	pub wg_endpoint_addr: String,
	pub wg_endpoint_port: u16,
	pub peer_link_local: Option<Ipv6Addr>,
}

impl NewPeeringLink {
	pub fn with_id(self, id: u16) -> PeeringLink {
		PeeringLink {
			id,
			as_num: self.as_num,
			wg_pub_key: self.wg_pub_key,
			wg_endpoint_addr: self.wg_endpoint_addr,
			wg_endpoint_port: self.wg_endpoint_port,
			peer_link_local: self.peer_link_local,
		}
	}
}

impl PeeringLink {
	/// Range checks applied before every write.
	pub fn validate(&self) -> Result<(), DbError> {
		if self.id == 0 {
			return Err(DbError::OutOfRange {
				field: "id",
				value: 0,
			});
		}
		if self.as_num == 0 {
			return Err(DbError::OutOfRange {
				field: "as_num",
				value: 0,
			});
		}
		if self.wg_endpoint_port == 0 {
			return Err(DbError::OutOfRange {
				field: "wg_endpoint_port",
				value: 0,
			});
		}
		if self.wg_pub_key.trim().is_empty() {
			return Err(DbError::OutOfRange {
				field: "wg_pub_key",
				value: 0,
			});
		}
		if self.wg_endpoint_addr.trim().is_empty() {
			return Err(DbError::OutOfRange {
				field: "wg_endpoint_addr",
				value: 0,
			});
		}
		Ok(())
	}
}

pub(crate) type LinkRow = (i64, i64, String, String, i64, Option<String>);

fn in_range<T: TryFrom<i64>>(field: &'static str, value: i64) -> Result<T, DbError> {
	T::try_from(value).map_err(|_| DbError::OutOfRange { field, value })
}

impl TryFrom<LinkRow> for PeeringLink {
	type Error = DbError;

	fn try_from(row: LinkRow) -> Result<Self, Self::Error> {
		let (id, as_num, wg_pub_key, wg_endpoint_addr, wg_endpoint_port, peer_link_local) = row;
		let peer_link_local = peer_link_local
			.map(|s| {
				s.parse::<Ipv6Addr>()
					.map_err(|e| DbError::Internal(format!("invalid peer_link_local {s:?}: {e}")))
			})
			.transpose()?;

		Ok(PeeringLink {
			id: in_range("id", id)?,
			as_num: in_range("as_num", as_num)?,
			wg_pub_key,
			wg_endpoint_addr,
			wg_endpoint_port: in_range("wg_endpoint_port", wg_endpoint_port)?,
			peer_link_local,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn link() -> PeeringLink {
		PeeringLink {
			id: 1,
			as_num: 4242421111,
			wg_pub_key: "key".to_string(),
			wg_endpoint_addr: "203.0.113.5".to_string(),
			wg_endpoint_port: 51820,
			peer_link_local: None,
		}
	}

	#[test]
	fn test_validate_accepts_well_formed_link() {
		assert!(link().validate().is_ok());
	}

	#[test]
	fn test_validate_rejects_zero_fields() {
		let mut l = link();
		l.id = 0;
		assert!(matches!(l.validate(), Err(DbError::OutOfRange { field: "id", .. })));

		let mut l = link();
		l.wg_endpoint_port = 0;
		assert!(matches!(
			l.validate(),
			Err(DbError::OutOfRange {
				field: "wg_endpoint_port",
				..
			})
		));

		let mut l = link();
		l.wg_pub_key = " ".to_string();
		assert!(l.validate().is_err());
	}

	#[test]
	fn test_row_conversion_checks_ranges() {
		let row: LinkRow = (70000, 1, "k".into(), "a".into(), 1, None);
		assert!(matches!(
			PeeringLink::try_from(row),
			Err(DbError::OutOfRange { field: "id", value: 70000 })
		));

		let row: LinkRow = (3, 4242421111, "k".into(), "a".into(), 51820, Some("fe80::2:3".into()));
		let link = PeeringLink::try_from(row).unwrap();
		assert_eq!(link.id, 3);
		assert_eq!(link.peer_link_local, Some("fe80::2:3".parse().unwrap()));
	}
}
