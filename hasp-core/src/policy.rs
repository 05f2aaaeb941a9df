//! The access policy: a pure decision function over lock, actor, and
//! access kind.
//!
//! Rules, first match wins:
//! 1. No lock → allow everything.
//! 2. Owner → allow everything.
//! 3. Allow-listed → allow view/use/withdraw; modify/remove only with a
//!    MANAGE grant.
//! 4. PUBLIC → allow view/use, deny the rest.
//! 5. DONATION → allow view/use, deny the rest. Deposits never reach this
//!    function as WITHDRAW; the caller classifies them upstream.
//! 6. PRIVATE and both password types → deny. Password entry works by
//!    mutating the allow-list or granting a session pass, never by feeding
//!    the password into this function.
//!
//! No hidden state and no side effects, so every rule is independently
//! testable.

use serde::{Deserialize, Serialize};

use crate::lock::{GrantLevel, Lock, LockType};
use crate::types::ActorId;

/// The category of interaction being authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessKind {
    /// Look at the lock or its contents.
    View,
    /// Plain interaction: open the container, use the door.
    Use,
    /// Take contents out (a net decrease, classified by the caller).
    Withdraw,
    /// Change lock attributes: allow-list, name, password.
    Modify,
    /// Delete the lock (or break the block carrying it).
    Remove,
}

impl AccessKind {
    /// All access kinds, in declaration order.
    pub const ALL: [AccessKind; 5] = [
        AccessKind::View,
        AccessKind::Use,
        AccessKind::Withdraw,
        AccessKind::Modify,
        AccessKind::Remove,
    ];
}

/// The policy's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The actor may proceed.
    Allow,
    /// The actor may not. A normal outcome, never an error.
    Deny,
}

impl Decision {
    /// Whether this decision permits the action.
    #[must_use]
    pub fn is_allow(self) -> bool {
        self == Decision::Allow
    }
}

/// Decide whether `actor` may perform `kind` against the lock at a
/// location, or against no lock at all.
#[must_use]
pub fn evaluate(lock: Option<&Lock>, actor: ActorId, kind: AccessKind) -> Decision {
    let Some(lock) = lock else {
        return Decision::Allow;
    };

    if lock.is_owner(actor) {
        return Decision::Allow;
    }

    if let Some(level) = lock.grant_level(actor) {
        return match kind {
            AccessKind::View | AccessKind::Use | AccessKind::Withdraw => Decision::Allow,
            AccessKind::Modify | AccessKind::Remove => match level {
                GrantLevel::Manage => Decision::Allow,
                GrantLevel::Access => Decision::Deny,
            },
        };
    }

    match lock.kind {
        LockType::Public | LockType::Donation => match kind {
            AccessKind::View | AccessKind::Use => Decision::Allow,
            AccessKind::Withdraw | AccessKind::Modify | AccessKind::Remove => Decision::Deny,
        },
        LockType::Private | LockType::PasswordAlways | LockType::PasswordOnce => Decision::Deny,
    }
}
