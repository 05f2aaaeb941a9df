//! The lock record: one access-control entry bound to one world location.
//!
//! A [`Lock`] is pure data plus self-contained invariants (allow-list
//! hygiene, password digests). All authorization decisions live in
//! [`crate::policy`]; all storage and concurrency live in
//! [`crate::registry`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::types::{ActorId, BlockKind};

// ---------------------------------------------------------------------------
// Lock Types
// ---------------------------------------------------------------------------

/// How a lock treats actors that are neither the owner nor allow-listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockType {
    /// Anyone may view and use; only the owner side may change or remove.
    Public,
    /// Owner and allow-list only.
    Private,
    /// Anyone may view, use, and deposit; taking contents out is restricted.
    Donation,
    /// Requires the password on every new session.
    PasswordAlways,
    /// Requires the password once; a correct entry becomes a durable grant.
    PasswordOnce,
}

impl LockType {
    /// All lock types, in declaration order.
    pub const ALL: [LockType; 5] = [
        LockType::Public,
        LockType::Private,
        LockType::Donation,
        LockType::PasswordAlways,
        LockType::PasswordOnce,
    ];

    /// Whether creating a lock of this type requires a password.
    #[must_use]
    pub fn requires_password(self) -> bool {
        matches!(self, LockType::PasswordAlways | LockType::PasswordOnce)
    }

    /// Stable lowercase identifier, matching the configuration keys.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LockType::Public => "public",
            LockType::Private => "private",
            LockType::Donation => "donation",
            LockType::PasswordAlways => "password_always",
            LockType::PasswordOnce => "password_once",
        }
    }
}

impl fmt::Display for LockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Allow-list
// ---------------------------------------------------------------------------

/// What an allow-list entry lets the holder do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantLevel {
    /// View, use, and withdraw.
    Access,
    /// Everything, including lock management and removal.
    Manage,
}

/// One allow-list entry: an actor and the rights granted to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGrant {
    /// Who the grant is for.
    pub actor: ActorId,
    /// What they may do.
    pub level: GrantLevel,
}

// ---------------------------------------------------------------------------
// Password digests
// ---------------------------------------------------------------------------

/// Salted SHA-256 digest of a lock password.
///
/// The plaintext never persists; only the hex-encoded salt and digest do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordDigest {
    salt: String,
    digest: String,
}

impl PasswordDigest {
    /// Hash `plaintext` under a fresh random 16-byte salt.
    #[must_use]
    pub fn new(plaintext: &str) -> Self {
        let salt: [u8; 16] = rand::random();
        let digest = Self::hash(&salt, plaintext);
        Self {
            salt: hex::encode(salt),
            digest,
        }
    }

    /// Check `attempt` against the stored digest.
    ///
    /// Returns `false` for a wrong password or a corrupted salt.
    #[must_use]
    pub fn verify(&self, attempt: &str) -> bool {
        let Ok(salt) = hex::decode(&self.salt) else {
            return false;
        };
        Self::hash(&salt, attempt) == self.digest
    }

    fn hash(salt: &[u8], plaintext: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(salt);
        hasher.update(plaintext.as_bytes());
        hex::encode(hasher.finalize())
    }
}

// ---------------------------------------------------------------------------
// Lock
// ---------------------------------------------------------------------------

/// An access-control record for exactly one [`crate::Location`].
///
/// The registry is the sole long-lived owner of `Lock` values; everything
/// handed out by lookups is a clone, and mutations go back through
/// [`crate::registry::LockRegistry::update`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lock {
    /// The actor that created the lock.
    pub owner: ActorId,
    /// Default accessibility rule.
    pub kind: LockType,
    /// Optional display label. Pure metadata, never part of authorization.
    #[serde(default)]
    pub name: Option<String>,
    /// The block kind the lock was placed on, kept for inspection output.
    pub block_kind: BlockKind,
    /// When the lock was created. Audit metadata, not enforced.
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    access: Vec<AccessGrant>,
    #[serde(default)]
    password: Option<PasswordDigest>,
}

impl Lock {
    /// Create a lock owned by `owner`, with an empty allow-list and no
    /// password.
    #[must_use]
    pub fn new(owner: ActorId, kind: LockType, block_kind: BlockKind) -> Self {
        Self {
            owner,
            kind,
            name: None,
            block_kind,
            created_at: Utc::now(),
            access: Vec::new(),
            password: None,
        }
    }

    /// Whether `actor` owns this lock.
    #[must_use]
    pub fn is_owner(&self, actor: ActorId) -> bool {
        self.owner == actor
    }

    /// The grant level held by `actor`, if any.
    #[must_use]
    pub fn grant_level(&self, actor: ActorId) -> Option<GrantLevel> {
        self.access
            .iter()
            .find(|g| g.actor == actor)
            .map(|g| g.level)
    }

    /// Add or replace the allow-list entry for `actor`.
    ///
    /// Granting to the owner is a no-op; the owner already holds every
    /// right.
    pub fn grant(&mut self, actor: ActorId, level: GrantLevel) {
        if actor == self.owner {
            return;
        }
        if let Some(existing) = self.access.iter_mut().find(|g| g.actor == actor) {
            existing.level = level;
        } else {
            self.access.push(AccessGrant { actor, level });
        }
    }

    /// Remove the allow-list entry for `actor`. Returns whether one existed.
    pub fn revoke(&mut self, actor: ActorId) -> bool {
        let before = self.access.len();
        self.access.retain(|g| g.actor != actor);
        self.access.len() < before
    }

    /// The full allow-list, in insertion order.
    #[must_use]
    pub fn grants(&self) -> &[AccessGrant] {
        &self.access
    }

    /// Whether this lock carries a password digest.
    #[must_use]
    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    /// Replace the password digest with a freshly salted hash of
    /// `plaintext`.
    pub fn set_password(&mut self, plaintext: &str) {
        self.password = Some(PasswordDigest::new(plaintext));
    }

    /// Check an attempt against the stored password.
    ///
    /// A lock without a password rejects every attempt.
    #[must_use]
    pub fn verify_password(&self, attempt: &str) -> bool {
        self.password.as_ref().is_some_and(|p| p.verify(attempt))
    }

    /// Drop every ACCESS-level grant, keeping MANAGE grants.
    ///
    /// Used after a password change: actors that got in by password must
    /// unlock again, appointed managers stay.
    pub fn revoke_access_grants(&mut self) {
        self.access.retain(|g| g.level == GrantLevel::Manage);
    }
}
