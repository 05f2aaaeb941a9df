//! Per-actor transient state: the pending interaction, session-scoped
//! unlock passes, and the admin bypass flag.
//!
//! At most one pending interaction per actor. Arming a new one silently
//! replaces the old one — starting a new lock command cancels a
//! half-finished one. All three kinds of state are dropped together by
//! [`InteractionStateMachine::end_session`] when the actor disconnects.
//!
//! Keyed on actor id in sharded maps, so actors never contend with each
//! other; one actor's events arrive serially from the host session.

use std::collections::HashSet;

use dashmap::{DashMap, DashSet};
use tracing::debug;

use crate::interaction::PendingInteraction;
use crate::types::{ActorId, Location};

/// The shared actor→pending-interaction map plus session state.
#[derive(Debug, Default)]
pub struct InteractionStateMachine {
    pending: DashMap<ActorId, PendingInteraction>,
    session_passes: DashMap<ActorId, HashSet<Location>>,
    bypassing: DashSet<ActorId>,
}

impl InteractionStateMachine {
    /// Create an empty state machine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Pending interactions
    // ------------------------------------------------------------------

    /// Arm `interaction` for `actor`, replacing any existing one.
    pub fn set(&self, actor: ActorId, interaction: PendingInteraction) {
        debug!(actor = %actor, ?interaction, "Pending interaction armed");
        self.pending.insert(actor, interaction);
    }

    /// The pending interaction for `actor`, if any. Returns a clone.
    #[must_use]
    pub fn get(&self, actor: ActorId) -> Option<PendingInteraction> {
        self.pending.get(&actor).map(|entry| entry.clone())
    }

    /// Drop the pending interaction for `actor`, if any. Idempotent.
    pub fn clear(&self, actor: ActorId) {
        self.pending.remove(&actor);
    }

    /// Whether `actor` has a pending interaction.
    #[must_use]
    pub fn has(&self, actor: ActorId) -> bool {
        self.pending.contains_key(&actor)
    }

    // ------------------------------------------------------------------
    // Session passes
    // ------------------------------------------------------------------

    /// Grant `actor` session access to the lock at `location`.
    ///
    /// Installed after a correct PASSWORD_ALWAYS unlock; survives until
    /// [`Self::end_session`].
    pub fn grant_session_pass(&self, actor: ActorId, location: Location) {
        self.session_passes.entry(actor).or_default().insert(location);
    }

    /// Whether `actor` holds a session pass for `location`.
    #[must_use]
    pub fn has_session_pass(&self, actor: ActorId, location: Location) -> bool {
        self.session_passes
            .get(&actor)
            .is_some_and(|passes| passes.contains(&location))
    }

    // ------------------------------------------------------------------
    // Admin bypass
    // ------------------------------------------------------------------

    /// Suppress lock enforcement for `actor`'s world interactions.
    pub fn set_bypass(&self, actor: ActorId) {
        self.bypassing.insert(actor);
        debug!(actor = %actor, "Bypass enabled");
    }

    /// Restore normal enforcement for `actor`. Idempotent.
    pub fn clear_bypass(&self, actor: ActorId) {
        self.bypassing.remove(&actor);
    }

    /// Whether `actor` is currently bypassing lock enforcement.
    #[must_use]
    pub fn is_bypassing(&self, actor: ActorId) -> bool {
        self.bypassing.contains(&actor)
    }

    // ------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------

    /// Drop all per-actor state: pending interaction, session passes,
    /// and bypass flag. Called by the adapter on disconnect.
    pub fn end_session(&self, actor: ActorId) {
        self.pending.remove(&actor);
        self.session_passes.remove(&actor);
        self.bypassing.remove(&actor);
        debug!(actor = %actor, "Session state dropped");
    }
}
