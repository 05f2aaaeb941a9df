//! Normalized world events consumed by the interaction handler.
//!
//! The host adapter classifies raw runtime events (clicks, inventory
//! transactions, block changes) into these variants before calling into
//! the core. Everything host-specific — slot diffing, sneak-placement
//! detection, hand types — stays on the adapter's side of this enum.

use crate::types::{ActorId, BlockKind, Location};

/// Which mouse button (or equivalent) produced a targeted click.
///
/// Carried for the adapter's benefit; the core treats both the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickKind {
    /// Attack / break-style click.
    Primary,
    /// Use / open-style click.
    Secondary,
}

/// One classified world-interaction event.
#[derive(Debug, Clone)]
pub enum WorldEvent {
    /// An actor clicked a block.
    Targeted {
        /// Who clicked.
        actor: ActorId,
        /// The block's position.
        location: Location,
        /// What kind of block sits there.
        block: BlockKind,
        /// Which click it was.
        click: ClickKind,
    },

    /// An actor moved items in an open container.
    ///
    /// `is_net_decrease` is the adapter's verdict on whether stored
    /// contents shrank (a withdrawal) or grew (a deposit).
    InventoryMutation {
        /// Who moved items.
        actor: ActorId,
        /// The container's position.
        location: Location,
        /// True for a withdrawal, false for a deposit.
        is_net_decrease: bool,
    },

    /// An actor placed a block.
    BlockPlaced {
        /// Who placed it.
        actor: ActorId,
        /// Where it landed.
        location: Location,
        /// What was placed.
        block: BlockKind,
    },

    /// An actor broke a block.
    BlockBroken {
        /// Who broke it.
        actor: ActorId,
        /// Where it was.
        location: Location,
    },
}

impl WorldEvent {
    /// The actor that caused this event.
    #[must_use]
    pub fn actor(&self) -> ActorId {
        match self {
            Self::Targeted { actor, .. }
            | Self::InventoryMutation { actor, .. }
            | Self::BlockPlaced { actor, .. }
            | Self::BlockBroken { actor, .. } => *actor,
        }
    }

    /// The location this event happened at.
    #[must_use]
    pub fn location(&self) -> Location {
        match self {
            Self::Targeted { location, .. }
            | Self::InventoryMutation { location, .. }
            | Self::BlockPlaced { location, .. }
            | Self::BlockBroken { location, .. } => *location,
        }
    }
}
