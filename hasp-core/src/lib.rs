//! # Hasp Core Library
//!
//! Host-agnostic block-locking for shared voxel worlds. Players protect
//! containers and doors with access-control records ("locks") keyed by
//! block position, and arm pending interactions ("the next block you
//! click gets locked as PRIVATE") through commands.
//!
//! The crate is the decision core only. A host adapter classifies raw
//! runtime events into [`WorldEvent`] values, feeds them to
//! [`InteractionHandler`], and cancels the underlying action when the
//! returned [`Verdict`] says so. Slot diffing, chat output, and the rest
//! of the host surface stay in the adapter.
//!
//! ## Concurrency Contract
//!
//! All entry points are synchronous and safe to call from many event
//! threads at once. Registry and state-machine operations are atomic per
//! key (per location, per actor); operations on different keys never
//! block each other.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod events;
pub mod handler;
pub mod interaction;
pub mod lock;
pub mod metrics;
pub mod policy;
pub mod registry;
pub mod state;
pub mod storage;
pub mod types;

pub use config::HaspConfig;
pub use error::{HaspError, Result};
pub use events::{ClickKind, WorldEvent};
pub use handler::{InteractionHandler, Verdict};
pub use interaction::{ApplyOutcome, DenyReason, ManageOp, PendingInteraction};
pub use lock::{AccessGrant, GrantLevel, Lock, LockType};
pub use metrics::{CountersSnapshot, LockCounters};
pub use policy::{evaluate, AccessKind, Decision};
pub use registry::LockRegistry;
pub use state::InteractionStateMachine;
pub use storage::{LockStore, SqliteLockStore};
pub use types::*;
