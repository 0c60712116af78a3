// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Maintainer identities and the resolvers that grant them.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{debug, warn};

use crate::error::RegistryError;
use crate::object::RegistryObject;
use crate::source::RegistrySource;

/// SSH public key algorithms accepted in maintainer `auth:` lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAlgorithm {
	Ed25519,
	Rsa,
}

impl KeyAlgorithm {
	pub fn from_ssh_name(name: &str) -> Option<Self> {
		match name {
			"ssh-ed25519" => Some(Self::Ed25519),
			"ssh-rsa" => Some(Self::Rsa),
			_ => None,
		}
	}

	pub fn ssh_name(&self) -> &'static str {
		match self {
			Self::Ed25519 => "ssh-ed25519",
			Self::Rsa => "ssh-rsa",
		}
	}
}

impl fmt::Display for KeyAlgorithm {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.ssh_name())
	}
}

/// A public key, as offered by a client or declared in the registry.
///
/// `material` is the base64 of the SSH wire encoding, exactly as it appears
/// in an `authorized_keys` line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OfferedKey {
	pub algorithm: KeyAlgorithm,
	pub material: String,
}

impl OfferedKey {
	pub fn new(algorithm: KeyAlgorithm, material: impl Into<String>) -> Self {
		Self {
			algorithm,
			material: material.into(),
		}
	}

	/// Build a key from its SSH wire encoding. The algorithm is read from
	/// the blob's leading name field, so RSA keys negotiated with
	/// `rsa-sha2-*` signatures still map to `ssh-rsa`.
	pub fn from_wire(blob: &[u8]) -> Option<Self> {
		let len_bytes: [u8; 4] = blob.get(..4)?.try_into().ok()?;
		let len = u32::from_be_bytes(len_bytes) as usize;
		let name = blob.get(4..4usize.checked_add(len)?)?;
		let algorithm = KeyAlgorithm::from_ssh_name(std::str::from_utf8(name).ok()?)?;
		Some(Self::new(algorithm, STANDARD.encode(blob)))
	}

	/// Parse `"<type> <base64> [comment]"`. Unsupported types yield `None`.
	pub fn from_openssh(line: &str) -> Option<Self> {
		let mut parts = line.split_whitespace();
		let algorithm = KeyAlgorithm::from_ssh_name(parts.next()?)?;
		let material = parts.next()?;
		Some(Self::new(algorithm, material))
	}

	/// Short form for logs.
	pub fn fingerprint_hint(&self) -> String {
		let tail: String = self
			.material
			.chars()
			.rev()
			.take(12)
			.collect::<Vec<_>>()
			.into_iter()
			.rev()
			.collect();
		format!("{} ...{}", self.algorithm, tail)
	}
}

/// Who vouched for an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
	Registry,
	Anonymous,
}

/// A maintainer known to the service. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaintainerIdentity {
	/// Lowercase name without the `-mnt` suffix.
	pub username: String,
	pub keys: Vec<OfferedKey>,
	pub authority: Authority,
}

impl MaintainerIdentity {
	/// Registry handle, e.g. `ALICE-MNT`.
	pub fn handle(&self) -> String {
		format!("{}-MNT", self.username.to_ascii_uppercase())
	}

	pub fn is_anonymous(&self) -> bool {
		self.authority == Authority::Anonymous
	}

	pub fn anonymous(username: &str) -> Self {
		Self {
			username: username.to_ascii_lowercase(),
			keys: Vec::new(),
			authority: Authority::Anonymous,
		}
	}
}

#[derive(Debug, Clone)]
pub struct AuthResult {
	pub granted: bool,
	pub identity: Option<MaintainerIdentity>,
	pub reason: Option<String>,
}

impl AuthResult {
	pub fn granted(identity: MaintainerIdentity) -> Self {
		Self {
			granted: true,
			identity: Some(identity),
			reason: None,
		}
	}

	pub fn denied(reason: impl Into<String>) -> Self {
		Self {
			granted: false,
			identity: None,
			reason: Some(reason.into()),
		}
	}
}

/// Validate and canonicalize a login name.
///
/// Only ASCII letters, digits and `-` are allowed. The result is lowercase
/// with any `-mnt` suffix removed, so `ALICE-MNT`, `alice-mnt` and `Alice`
/// all name the same maintainer.
pub fn normalize_username(raw: &str) -> Result<String, RegistryError> {
	if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
		return Err(RegistryError::InvalidName(raw.to_string()));
	}

	let lower = raw.to_ascii_lowercase();
	let name = lower.strip_suffix("-mnt").unwrap_or(&lower);
	if name.is_empty() || name.starts_with('-') {
		return Err(RegistryError::InvalidName(raw.to_string()));
	}
	Ok(name.to_string())
}

/// Keys declared by a maintainer object. Unsupported `auth:` methods are skipped.
pub fn declared_keys(object: &RegistryObject) -> Vec<OfferedKey> {
	object.values("auth").filter_map(OfferedKey::from_openssh).collect()
}

/// Decides whether a login is granted.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
	async fn authenticate(&self, username: &str, key: &OfferedKey) -> AuthResult;

	/// Login without any credential. Refused unless the resolver is anonymous.
	async fn authenticate_none(&self, _username: &str) -> AuthResult {
		AuthResult::denied("public key authentication required")
	}

	fn authority(&self) -> Authority;
}

/// Grants logins whose key appears in the maintainer's registry object.
#[derive(Clone)]
pub struct RegistryResolver {
	source: Arc<dyn RegistrySource>,
}

impl RegistryResolver {
	pub fn new(source: Arc<dyn RegistrySource>) -> Self {
		Self { source }
	}
}

#[async_trait]
impl IdentityResolver for RegistryResolver {
	#[tracing::instrument(skip(self, key), fields(key = %key.fingerprint_hint()))]
	async fn authenticate(&self, username: &str, key: &OfferedKey) -> AuthResult {
		let name = match normalize_username(username) {
			Ok(name) => name,
			Err(e) => return AuthResult::denied(e.to_string()),
		};

		let object = match self.source.maintainer(&name).await {
			Ok(Some(object)) => object,
			Ok(None) => return AuthResult::denied(format!("no maintainer object for {name}")),
			Err(e) => {
				warn!(maintainer = %name, error = %e, "registry lookup failed");
				return AuthResult::denied("registry unavailable");
			}
		};

		let keys = declared_keys(&object);
		if !keys.iter().any(|k| k == key) {
			debug!(maintainer = %name, declared = keys.len(), "offered key not declared");
			return AuthResult::denied("key not listed in maintainer object");
		}

		AuthResult::granted(MaintainerIdentity {
			username: name,
			keys,
			authority: Authority::Registry,
		})
	}

	fn authority(&self) -> Authority {
		Authority::Registry
	}
}

/// Grants every login. Identities it produces cannot modify links.
#[derive(Debug, Clone, Default)]
pub struct AnonymousResolver;

#[async_trait]
impl IdentityResolver for AnonymousResolver {
	async fn authenticate(&self, username: &str, _key: &OfferedKey) -> AuthResult {
		AuthResult::granted(MaintainerIdentity::anonymous(username))
	}

	async fn authenticate_none(&self, username: &str) -> AuthResult {
		AuthResult::granted(MaintainerIdentity::anonymous(username))
	}

	fn authority(&self) -> Authority {
		Authority::Anonymous
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::source::FsRegistry;
	use crate::testing::RegistryFixture;

	const ALICE_KEY: &str = "AAAAC3NzaC1lZDI1NTE5AAAAIGFsaWNlLWtleS1tYXRlcmlhbC0wMDAwMDAwMA";
	const MALLORY_KEY: &str = "AAAAC3NzaC1lZDI1NTE5AAAAIG1hbGxvcnkta2V5LW1hdGVyaWFsLTAwMDAwMA";

	fn resolver(dir: &std::path::Path) -> RegistryResolver {
		RegistryResolver::new(Arc::new(FsRegistry::new(dir)))
	}

	#[test]
	fn test_normalize_username() {
		assert_eq!(normalize_username("ALICE-MNT").unwrap(), "alice");
		assert_eq!(normalize_username("alice").unwrap(), "alice");
		assert_eq!(normalize_username("foo-bar-mnt").unwrap(), "foo-bar");
		assert!(normalize_username("").is_err());
		assert!(normalize_username("-mnt").is_err());
		assert!(normalize_username("../etc").is_err());
		assert!(normalize_username("alice bob").is_err());
	}

	#[test]
	fn test_from_wire_reads_algorithm_from_blob() {
		let mut blob = Vec::new();
		blob.extend_from_slice(&7u32.to_be_bytes());
		blob.extend_from_slice(b"ssh-rsa");
		blob.extend_from_slice(&[0, 0, 0, 1, 3]);
		let key = OfferedKey::from_wire(&blob).unwrap();
		assert_eq!(key.algorithm, KeyAlgorithm::Rsa);
		assert_eq!(key.material, STANDARD.encode(&blob));
	}

	#[test]
	fn test_from_wire_rejects_truncated_and_unknown() {
		assert!(OfferedKey::from_wire(&[0, 0, 0, 20, b's']).is_none());
		let mut blob = Vec::new();
		blob.extend_from_slice(&19u32.to_be_bytes());
		blob.extend_from_slice(b"ecdsa-sha2-nistp256");
		assert!(OfferedKey::from_wire(&blob).is_none());
	}

	#[test]
	fn test_declared_keys_skip_other_methods() {
		let obj = RegistryObject::parse(&format!(
			"mntner: ALICE-MNT\nauth: pgp-fingerprint ABCD\nauth: ssh-ed25519 {ALICE_KEY} alice@laptop\n"
		))
		.unwrap();
		let keys = declared_keys(&obj);
		assert_eq!(keys, vec![OfferedKey::new(KeyAlgorithm::Ed25519, ALICE_KEY)]);
	}

	#[tokio::test]
	async fn test_registered_key_is_granted() {
		let dir = tempfile::tempdir().unwrap();
		RegistryFixture::new(dir.path())
			.maintainer("alice", &[&format!("ssh-ed25519 {ALICE_KEY}")])
			.unwrap();

		let result = resolver(dir.path())
			.authenticate("ALICE-MNT", &OfferedKey::new(KeyAlgorithm::Ed25519, ALICE_KEY))
			.await;
		assert!(result.granted);
		let identity = result.identity.unwrap();
		assert_eq!(identity.username, "alice");
		assert_eq!(identity.handle(), "ALICE-MNT");
		assert_eq!(identity.authority, Authority::Registry);
	}

	#[tokio::test]
	async fn test_unknown_key_is_denied() {
		let dir = tempfile::tempdir().unwrap();
		RegistryFixture::new(dir.path())
			.maintainer("alice", &[&format!("ssh-ed25519 {ALICE_KEY}")])
			.unwrap();

		let result = resolver(dir.path())
			.authenticate("alice", &OfferedKey::new(KeyAlgorithm::Ed25519, MALLORY_KEY))
			.await;
		assert!(!result.granted);
		assert!(result.identity.is_none());
	}

	#[tokio::test]
	async fn test_algorithm_must_match() {
		let dir = tempfile::tempdir().unwrap();
		RegistryFixture::new(dir.path())
			.maintainer("alice", &[&format!("ssh-ed25519 {ALICE_KEY}")])
			.unwrap();

		let result = resolver(dir.path())
			.authenticate("alice", &OfferedKey::new(KeyAlgorithm::Rsa, ALICE_KEY))
			.await;
		assert!(!result.granted);
	}

	#[tokio::test]
	async fn test_missing_or_corrupt_record_is_denied() {
		let dir = tempfile::tempdir().unwrap();
		RegistryFixture::new(dir.path())
			.raw_maintainer("broken", "garbage without colon\n")
			.unwrap();
		let resolver = resolver(dir.path());
		let key = OfferedKey::new(KeyAlgorithm::Ed25519, ALICE_KEY);

		assert!(!resolver.authenticate("nobody", &key).await.granted);
		let corrupt = resolver.authenticate("broken", &key).await;
		assert!(!corrupt.granted);
		assert_eq!(corrupt.reason.as_deref(), Some("registry unavailable"));
	}

	#[tokio::test]
	async fn test_registry_resolver_refuses_none_auth() {
		let dir = tempfile::tempdir().unwrap();
		assert!(!resolver(dir.path()).authenticate_none("alice").await.granted);
	}

	#[tokio::test]
	async fn test_anonymous_resolver_grants_everyone() {
		let resolver = AnonymousResolver;
		let result = resolver.authenticate_none("Guest").await;
		assert!(result.granted);
		let identity = result.identity.unwrap();
		assert!(identity.is_anonymous());
		assert_eq!(identity.username, "guest");
		assert_eq!(resolver.authority(), Authority::Anonymous);
	}
}
