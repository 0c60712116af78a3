// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::net::IpAddr;

use autopeer_db::DbError;
use autopeer_registry::RegistryError;
use ipnet::IpNet;

/// Every way a peering operation can be refused.
#[derive(Debug, thiserror::Error)]
pub enum PeeringError {
	#[error("AS{as_num} is not maintained by {maintainer}")]
	AuthorizationFailure { maintainer: String, as_num: u32 },

	#[error("{0}")]
	Validation(String),

	#[error("{0}")]
	AllocationConflict(String),

	#[error("no free link ids left (limit {max_id})")]
	PoolExhausted { max_id: u16 },

	#[error("endpoint {addr} is inside reserved network {network}")]
	ReservedNetwork { addr: IpAddr, network: IpNet },

	#[error("no peering link for AS{0}")]
	NotFound(u32),

	#[error("link store unavailable")]
	StoreUnavailable(#[source] DbError),

	#[error("registry unavailable")]
	RegistryUnavailable(#[source] RegistryError),
}

impl PeeringError {
	/// The single line shown to a session user.
	pub fn user_message(&self) -> String {
		match self {
			Self::StoreUnavailable(_) => "link store unavailable, try again later".to_string(),
			Self::RegistryUnavailable(_) => "registry unavailable, try again later".to_string(),
			other => other.to_string(),
		}
	}
}

impl From<DbError> for PeeringError {
	fn from(err: DbError) -> Self {
		match err {
			DbError::DuplicateAsNum(as_num) => {
				Self::AllocationConflict(format!("AS{as_num} already has a peering link"))
			}
			DbError::DuplicateId(id) => {
				Self::AllocationConflict(format!("link id {id} is already in use"))
			}
			DbError::OutOfRange { field, value } => {
				Self::Validation(format!("{field} out of range: {value}"))
			}
			DbError::NotFound(as_num) => Self::NotFound(as_num),
			DbError::PoolExhausted { max_id } => Self::PoolExhausted { max_id },
			other => Self::StoreUnavailable(other),
		}
	}
}

impl From<RegistryError> for PeeringError {
	fn from(err: RegistryError) -> Self {
		Self::RegistryUnavailable(err)
	}
}

pub type Result<T> = std::result::Result<T, PeeringError>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_db_errors_map_to_taxonomy() {
		assert!(matches!(
			PeeringError::from(DbError::DuplicateAsNum(4242421111)),
			PeeringError::AllocationConflict(_)
		));
		assert!(matches!(
			PeeringError::from(DbError::PoolExhausted { max_id: 3 }),
			PeeringError::PoolExhausted { max_id: 3 }
		));
		assert!(matches!(
			PeeringError::from(DbError::Internal("disk".into())),
			PeeringError::StoreUnavailable(_)
		));
	}

	#[test]
	fn test_user_message_hides_internals() {
		let err = PeeringError::from(DbError::Internal("/var/lib/secret path".into()));
		assert_eq!(err.user_message(), "link store unavailable, try again later");
		assert!(!err.user_message().contains('\n'));
	}
}
