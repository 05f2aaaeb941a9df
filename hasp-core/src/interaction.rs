//! Pending interactions: per-actor armed actions awaiting the actor's
//! next qualifying click.
//!
//! A command arms one of these ("the next lockable block you click will
//! be locked as PRIVATE"); the interaction handler applies it against the
//! block the actor actually targets. A closed enum keeps dispatch static:
//! the handler calls [`PendingInteraction::apply`] and never inspects the
//! variant itself.
//!
//! Validation happens at construction. A password-type create without a
//! password, or a plain create with one, is a contract violation by the
//! arming command and is rejected before the interaction ever reaches the
//! state machine.

use tracing::debug;

use crate::error::{HaspError, Result};
use crate::lock::{GrantLevel, Lock, LockType};
use crate::policy::{self, AccessKind};
use crate::registry::LockRegistry;
use crate::types::{ActorId, BlockKind, Location};

// ---------------------------------------------------------------------------
// Deny reasons
// ---------------------------------------------------------------------------

/// Why an interaction or access check was denied.
///
/// Rides on [`ApplyOutcome`] and [`crate::handler::Verdict`] so the
/// adapter can render a user-facing message; the core never formats chat
/// text itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// A lock already exists at the target location.
    AlreadyLocked,
    /// No lock exists at the target location.
    NotLocked,
    /// The actor lacks permission for the attempted access.
    NotAuthorized,
    /// The owner is at the configured ceiling for this lock type.
    LockLimitReached,
    /// The supplied password did not match the lock's digest.
    WrongPassword,
    /// The target lock is not password-protected.
    NotPasswordProtected,
}

// ---------------------------------------------------------------------------
// Apply outcome
// ---------------------------------------------------------------------------

/// The result of applying a pending interaction to one target.
#[derive(Debug, Clone)]
pub struct ApplyOutcome {
    /// Whether the underlying world action may proceed.
    pub allowed: bool,
    /// Whether the interaction is spent and should be cleared.
    pub consume: bool,
    /// Why the action was denied, when it was.
    pub denial: Option<DenyReason>,
    /// A clone of the lock, for [`PendingInteraction::Inspect`] on success.
    pub inspected: Option<Lock>,
    /// A session pass to install, from a correct PASSWORD_ALWAYS unlock.
    pub session_grant: Option<Location>,
}

impl ApplyOutcome {
    fn allowed(consume: bool) -> Self {
        Self {
            allowed: true,
            consume,
            denial: None,
            inspected: None,
            session_grant: None,
        }
    }

    fn denied(consume: bool, reason: DenyReason) -> Self {
        Self {
            allowed: false,
            consume,
            denial: Some(reason),
            inspected: None,
            session_grant: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Management operations
// ---------------------------------------------------------------------------

/// What a [`PendingInteraction::Manage`] does to its target lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManageOp {
    /// Add or replace an allow-list entry.
    AddMember {
        /// Who to grant access to.
        actor: ActorId,
        /// What they may do.
        level: GrantLevel,
    },
    /// Remove an allow-list entry.
    RemoveMember {
        /// Whose grant to revoke.
        actor: ActorId,
    },
    /// Set or clear the display name.
    Rename {
        /// The new name, or `None` to clear it.
        name: Option<String>,
    },
    /// Replace the password on a password-type lock.
    ///
    /// Existing ACCESS-level grants are dropped so password holders must
    /// unlock again; MANAGE grants survive.
    ChangePassword {
        /// The new plaintext password. Hashed before it touches a lock.
        password: String,
    },
}

// ---------------------------------------------------------------------------
// Pending interaction
// ---------------------------------------------------------------------------

/// A per-actor armed action, applied to the actor's next qualifying
/// target.
///
/// Every variant carries `persist`: a persisting interaction stays armed
/// after being applied so the actor can repeat it across many blocks
/// without reissuing the command.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingInteraction {
    /// Lock the next target.
    Create {
        /// The lock type to create.
        kind: LockType,
        /// Optional display name for the new lock.
        name: Option<String>,
        /// Password, present iff `kind` is a password type.
        password: Option<String>,
        /// Stay armed after applying.
        persist: bool,
    },
    /// Remove the lock on the next target.
    Remove {
        /// Stay armed after applying.
        persist: bool,
    },
    /// Mutate the lock on the next target.
    Manage {
        /// The mutation to apply.
        op: ManageOp,
        /// Stay armed after applying.
        persist: bool,
    },
    /// Try a password against the lock on the next target.
    Unlock {
        /// The attempted plaintext password.
        password: String,
        /// Stay armed after applying.
        persist: bool,
    },
    /// Report the lock on the next target back to the adapter.
    Inspect {
        /// Stay armed after applying.
        persist: bool,
    },
}

impl PendingInteraction {
    /// Arm a lock creation.
    ///
    /// # Errors
    /// Fails with [`HaspError::InvalidInteraction`] if a password type is
    /// requested without a password, or a plain type with one.
    pub fn create(
        kind: LockType,
        name: Option<String>,
        password: Option<String>,
        persist: bool,
    ) -> Result<Self> {
        let has_password = password.as_deref().is_some_and(|p| !p.is_empty());
        if kind.requires_password() && !has_password {
            return Err(HaspError::InvalidInteraction {
                reason: format!("{kind} locks require a password"),
            });
        }
        if !kind.requires_password() && password.is_some() {
            return Err(HaspError::InvalidInteraction {
                reason: format!("{kind} locks do not take a password"),
            });
        }
        Ok(Self::Create {
            kind,
            name,
            password,
            persist,
        })
    }

    /// Arm a lock removal.
    #[must_use]
    pub fn remove(persist: bool) -> Self {
        Self::Remove { persist }
    }

    /// Arm a lock mutation.
    ///
    /// # Errors
    /// Fails with [`HaspError::InvalidInteraction`] on an empty
    /// replacement password.
    pub fn manage(op: ManageOp, persist: bool) -> Result<Self> {
        if let ManageOp::ChangePassword { password } = &op {
            if password.is_empty() {
                return Err(HaspError::InvalidInteraction {
                    reason: "replacement password must not be empty".to_string(),
                });
            }
        }
        Ok(Self::Manage { op, persist })
    }

    /// Arm a password attempt.
    ///
    /// # Errors
    /// Fails with [`HaspError::InvalidInteraction`] on an empty password.
    pub fn unlock(password: impl Into<String>, persist: bool) -> Result<Self> {
        let password = password.into();
        if password.is_empty() {
            return Err(HaspError::InvalidInteraction {
                reason: "password attempt must not be empty".to_string(),
            });
        }
        Ok(Self::Unlock { password, persist })
    }

    /// Arm a lock inspection.
    #[must_use]
    pub fn inspect(persist: bool) -> Self {
        Self::Inspect { persist }
    }

    /// Whether this interaction stays armed after being applied.
    #[must_use]
    pub fn persist(&self) -> bool {
        match self {
            Self::Create { persist, .. }
            | Self::Remove { persist }
            | Self::Manage { persist, .. }
            | Self::Unlock { persist, .. }
            | Self::Inspect { persist } => *persist,
        }
    }

    /// Apply this interaction on behalf of `actor` against the block at
    /// `location`.
    ///
    /// The caller has already established that the target is lockable; a
    /// non-qualifying target never reaches this method, which is what
    /// keeps a one-shot interaction armed across misses.
    #[must_use]
    pub fn apply(
        &self,
        actor: ActorId,
        location: Location,
        block: &BlockKind,
        registry: &LockRegistry,
    ) -> ApplyOutcome {
        let consume = !self.persist();
        match self {
            Self::Create {
                kind,
                name,
                password,
                ..
            } => {
                let mut lock = Lock::new(actor, *kind, block.clone());
                lock.name = name.clone();
                if let Some(password) = password {
                    lock.set_password(password);
                }
                match registry.create(location, lock) {
                    Ok(_) => {
                        debug!(actor = %actor, location = %location, kind = %kind, "Create interaction applied");
                        ApplyOutcome::allowed(consume)
                    }
                    Err(HaspError::AlreadyLocked { .. }) => {
                        ApplyOutcome::denied(consume, DenyReason::AlreadyLocked)
                    }
                    Err(HaspError::LockLimitReached { .. }) => {
                        ApplyOutcome::denied(consume, DenyReason::LockLimitReached)
                    }
                    Err(_) => ApplyOutcome::denied(consume, DenyReason::NotAuthorized),
                }
            }

            Self::Remove { .. } => match registry.remove(location, actor) {
                Ok(_) => {
                    debug!(actor = %actor, location = %location, "Remove interaction applied");
                    ApplyOutcome::allowed(consume)
                }
                Err(HaspError::NotLocked { .. }) => {
                    ApplyOutcome::denied(consume, DenyReason::NotLocked)
                }
                Err(_) => ApplyOutcome::denied(consume, DenyReason::NotAuthorized),
            },

            Self::Manage { op, .. } => Self::apply_manage(op, actor, location, registry, consume),

            Self::Unlock { password, .. } => {
                Self::apply_unlock(password, actor, location, registry, consume)
            }

            Self::Inspect { .. } => match registry.get(location) {
                // Nothing to show; the click itself proceeds.
                None => ApplyOutcome {
                    denial: Some(DenyReason::NotLocked),
                    ..ApplyOutcome::allowed(consume)
                },
                Some(lock) => {
                    if policy::evaluate(Some(&lock), actor, AccessKind::View).is_allow() {
                        ApplyOutcome {
                            inspected: Some(lock),
                            ..ApplyOutcome::allowed(consume)
                        }
                    } else {
                        ApplyOutcome::denied(consume, DenyReason::NotAuthorized)
                    }
                }
            },
        }
    }

    fn apply_manage(
        op: &ManageOp,
        actor: ActorId,
        location: Location,
        registry: &LockRegistry,
        consume: bool,
    ) -> ApplyOutcome {
        let Some(lock) = registry.get(location) else {
            return ApplyOutcome::denied(consume, DenyReason::NotLocked);
        };
        if !policy::evaluate(Some(&lock), actor, AccessKind::Modify).is_allow() {
            return ApplyOutcome::denied(consume, DenyReason::NotAuthorized);
        }
        if matches!(op, ManageOp::ChangePassword { .. }) && !lock.kind.requires_password() {
            return ApplyOutcome::denied(consume, DenyReason::NotPasswordProtected);
        }

        let op = op.clone();
        match registry.update(location, move |lock| match op {
            ManageOp::AddMember { actor, level } => lock.grant(actor, level),
            ManageOp::RemoveMember { actor } => {
                lock.revoke(actor);
            }
            ManageOp::Rename { name } => lock.name = name,
            ManageOp::ChangePassword { password } => {
                lock.set_password(&password);
                lock.revoke_access_grants();
            }
        }) {
            Ok(_) => {
                debug!(actor = %actor, location = %location, "Manage interaction applied");
                ApplyOutcome::allowed(consume)
            }
            // The lock vanished between the check and the update.
            Err(_) => ApplyOutcome::denied(consume, DenyReason::NotLocked),
        }
    }

    fn apply_unlock(
        password: &str,
        actor: ActorId,
        location: Location,
        registry: &LockRegistry,
        consume: bool,
    ) -> ApplyOutcome {
        let Some(lock) = registry.get(location) else {
            // Nothing to unlock: a non-event that leaves the attempt armed.
            return ApplyOutcome::allowed(false);
        };
        if !lock.kind.requires_password() {
            return ApplyOutcome::denied(consume, DenyReason::NotPasswordProtected);
        }
        if !lock.verify_password(password) {
            return ApplyOutcome::denied(consume, DenyReason::WrongPassword);
        }

        match lock.kind {
            LockType::PasswordOnce => {
                // A correct entry becomes a durable grant.
                let outcome = registry.update(location, |lock| {
                    lock.grant(actor, GrantLevel::Access);
                });
                match outcome {
                    Ok(_) => {
                        debug!(actor = %actor, location = %location, "Password accepted, durable grant installed");
                        ApplyOutcome::allowed(consume)
                    }
                    Err(_) => ApplyOutcome::denied(consume, DenyReason::NotLocked),
                }
            }
            LockType::PasswordAlways => {
                debug!(actor = %actor, location = %location, "Password accepted for this session");
                ApplyOutcome {
                    session_grant: Some(location),
                    ..ApplyOutcome::allowed(consume)
                }
            }
            // Unreachable given requires_password above; deny rather than
            // panic if a non-password lock ever slips through.
            _ => ApplyOutcome::denied(consume, DenyReason::NotPasswordProtected),
        }
    }
}
