//! The interaction handler: one entry point per classified world event.
//!
//! Order of checks for a targeted click:
//! 1. Non-lockable target → no opinion, and a pending interaction stays
//!    untouched (a miss never consumes a one-shot).
//! 2. Pending interaction → apply it, install any session grant, consume
//!    or keep it per the outcome.
//! 3. Otherwise the passive path: bypass, then lock lookup, then session
//!    pass, then the USE policy check. A DONATION lock passes a plain
//!    click; its protection lives in the withdrawal path.
//!
//! Every entry point answers with a [`Verdict`]; the adapter cancels the
//! underlying world action iff `verdict.cancel` and renders the deny
//! reason itself.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tracing::debug;

use crate::events::WorldEvent;
use crate::interaction::{ApplyOutcome, DenyReason};
use crate::lock::Lock;
use crate::policy::{self, AccessKind};
use crate::registry::LockRegistry;
use crate::state::InteractionStateMachine;
use crate::types::{ActorId, BlockKind, Location};

/// The handler's answer to one world event.
#[derive(Debug, Clone)]
pub struct Verdict {
    /// Whether the adapter should cancel the underlying world action.
    pub cancel: bool,
    /// Why, when the answer is a denial.
    pub reason: Option<DenyReason>,
    /// A clone of the lock, for a successful inspect interaction.
    pub inspected: Option<Lock>,
}

impl Verdict {
    /// Let the world action proceed.
    #[must_use]
    pub fn allow() -> Self {
        Self {
            cancel: false,
            reason: None,
            inspected: None,
        }
    }

    /// Cancel the world action for `reason`.
    #[must_use]
    pub fn deny(reason: DenyReason) -> Self {
        Self {
            cancel: true,
            reason: Some(reason),
            inspected: None,
        }
    }
}

impl From<ApplyOutcome> for Verdict {
    fn from(outcome: ApplyOutcome) -> Self {
        Self {
            cancel: !outcome.allowed,
            reason: outcome.denial,
            inspected: outcome.inspected,
        }
    }
}

/// Orchestrates the registry, the policy, and per-actor pending state.
#[derive(Debug, Clone)]
pub struct InteractionHandler {
    registry: Arc<LockRegistry>,
    state: Arc<InteractionStateMachine>,
}

impl InteractionHandler {
    /// Create a handler over shared registry and state-machine handles.
    #[must_use]
    pub fn new(registry: Arc<LockRegistry>, state: Arc<InteractionStateMachine>) -> Self {
        Self { registry, state }
    }

    /// The registry this handler consults.
    #[must_use]
    pub fn registry(&self) -> &Arc<LockRegistry> {
        &self.registry
    }

    /// The per-actor state this handler consults.
    #[must_use]
    pub fn state(&self) -> &Arc<InteractionStateMachine> {
        &self.state
    }

    /// Handle an actor clicking the block at `location`.
    #[must_use]
    pub fn handle_targeted(&self, actor: ActorId, location: Location, block: &BlockKind) -> Verdict {
        if !self.registry.is_lockable(block) {
            return Verdict::allow();
        }

        if self.state.has(actor) {
            return self.apply_pending(actor, location, block);
        }

        self.passive_check(actor, location, AccessKind::Use)
    }

    /// Handle an actor moving items in the container at `location`.
    ///
    /// `is_net_decrease` is the adapter's classification: true for a
    /// withdrawal, false for a deposit. Deposits are never authorized as
    /// WITHDRAW, so they always pass.
    #[must_use]
    pub fn handle_withdrawal(
        &self,
        actor: ActorId,
        location: Location,
        is_net_decrease: bool,
    ) -> Verdict {
        if !is_net_decrease {
            return Verdict::allow();
        }
        let verdict = self.passive_check(actor, location, AccessKind::Withdraw);
        if verdict.cancel {
            self.registry
                .counters()
                .withdrawals_blocked
                .fetch_add(1, Ordering::Relaxed);
        }
        verdict
    }

    /// Handle an actor placing a block.
    ///
    /// A pending interaction also fires on a block the actor just placed,
    /// so "lock the next block" covers place-and-lock in one gesture. With
    /// nothing pending the core has no opinion on placement.
    #[must_use]
    pub fn handle_block_placed(
        &self,
        actor: ActorId,
        location: Location,
        block: &BlockKind,
    ) -> Verdict {
        if !self.registry.is_lockable(block) || !self.state.has(actor) {
            return Verdict::allow();
        }
        self.apply_pending(actor, location, block)
    }

    /// Handle an actor breaking the block at `location`.
    ///
    /// Breaking a locked block requires REMOVE permission; an authorized
    /// break deletes the lock along with the block.
    #[must_use]
    pub fn handle_block_broken(&self, actor: ActorId, location: Location) -> Verdict {
        if self.state.is_bypassing(actor) {
            return Verdict::allow();
        }
        match self.registry.remove(location, actor) {
            Ok(_) => {
                debug!(actor = %actor, location = %location, "Lock removed by block break");
                Verdict::allow()
            }
            Err(crate::HaspError::NotLocked { .. }) => Verdict::allow(),
            Err(_) => {
                self.count_denial();
                Verdict::deny(DenyReason::NotAuthorized)
            }
        }
    }

    /// Dispatch one normalized event to the matching entry point.
    #[must_use]
    pub fn handle_event(&self, event: &WorldEvent) -> Verdict {
        match event {
            WorldEvent::Targeted {
                actor,
                location,
                block,
                ..
            } => self.handle_targeted(*actor, *location, block),
            WorldEvent::InventoryMutation {
                actor,
                location,
                is_net_decrease,
            } => self.handle_withdrawal(*actor, *location, *is_net_decrease),
            WorldEvent::BlockPlaced {
                actor,
                location,
                block,
            } => self.handle_block_placed(*actor, *location, block),
            WorldEvent::BlockBroken { actor, location } => {
                self.handle_block_broken(*actor, *location)
            }
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn apply_pending(&self, actor: ActorId, location: Location, block: &BlockKind) -> Verdict {
        let Some(pending) = self.state.get(actor) else {
            // Cleared between has() and get(); fall back to the passive path.
            return self.passive_check(actor, location, AccessKind::Use);
        };

        let outcome = pending.apply(actor, location, block, &self.registry);

        let counters = self.registry.counters();
        counters.interactions_applied.fetch_add(1, Ordering::Relaxed);

        if let Some(granted) = outcome.session_grant {
            self.state.grant_session_pass(actor, granted);
        }
        if outcome.consume {
            self.state.clear(actor);
            counters.interactions_consumed.fetch_add(1, Ordering::Relaxed);
        }
        if !outcome.allowed {
            counters.access_denied.fetch_add(1, Ordering::Relaxed);
        }

        outcome.into()
    }

    // The passive path: no pending interaction, just "may this actor
    // touch this block right now".
    fn passive_check(&self, actor: ActorId, location: Location, kind: AccessKind) -> Verdict {
        if self.state.is_bypassing(actor) {
            return Verdict::allow();
        }
        let Some(lock) = self.registry.get(location) else {
            return Verdict::allow();
        };
        if self.state.has_session_pass(actor, location) {
            return Verdict::allow();
        }
        if policy::evaluate(Some(&lock), actor, kind).is_allow() {
            Verdict::allow()
        } else {
            self.count_denial();
            debug!(actor = %actor, location = %location, kind = ?kind, "Access denied");
            Verdict::deny(DenyReason::NotAuthorized)
        }
    }

    fn count_denial(&self) {
        self.registry
            .counters()
            .access_denied
            .fetch_add(1, Ordering::Relaxed);
    }
}
