//! Integration tests — end-to-end lock flows.
//!
//! These tests drive the public surface the way a host adapter would:
//! arm a pending interaction, feed classified world events to the
//! handler, and check both the verdicts and the registry state left
//! behind.

use std::sync::Arc;

use hasp_core::config::HaspConfig;
use hasp_core::interaction::{ManageOp, PendingInteraction};
use hasp_core::lock::{GrantLevel, Lock, LockType};
use hasp_core::storage::{LockStore, SqliteLockStore};
use hasp_core::types::{ActorId, BlockKind, Location, WorldId};
use hasp_core::{DenyReason, HaspError, InteractionHandler, InteractionStateMachine, LockRegistry};

fn handler() -> InteractionHandler {
    handler_with_config(&HaspConfig::default())
}

fn handler_with_config(config: &HaspConfig) -> InteractionHandler {
    InteractionHandler::new(
        Arc::new(LockRegistry::new(config)),
        Arc::new(InteractionStateMachine::new()),
    )
}

fn loc(x: i32) -> Location {
    Location::new(WorldId(uuid::Uuid::nil()), x, 64, 0)
}

fn chest() -> BlockKind {
    BlockKind::from("chest")
}

// ---------------------------------------------------------------------------
// Scenario: one-shot create arms, fires once, and is gone
// ---------------------------------------------------------------------------

#[test]
fn one_shot_create_locks_exactly_one_block() {
    let handler = handler();
    let actor = ActorId::new();

    handler.state().set(
        actor,
        PendingInteraction::create(LockType::Public, None, None, false).expect("arm"),
    );

    let verdict = handler.handle_targeted(actor, loc(1), &chest());
    assert!(!verdict.cancel);

    let lock = handler.registry().get(loc(1)).expect("lock created");
    assert_eq!(lock.owner, actor);
    assert_eq!(lock.kind, LockType::Public);
    assert!(!handler.state().has(actor), "one-shot consumed");

    // A second click is just a plain use of the new public lock.
    let verdict = handler.handle_targeted(actor, loc(1), &chest());
    assert!(!verdict.cancel);
    assert_eq!(handler.registry().len(), 1);
}

// ---------------------------------------------------------------------------
// Scenario: persisting create locks every block the actor touches
// ---------------------------------------------------------------------------

#[test]
fn persisting_create_locks_block_after_block() {
    let handler = handler();
    let actor = ActorId::new();

    handler.state().set(
        actor,
        PendingInteraction::create(LockType::Public, None, None, true).expect("arm"),
    );

    assert!(!handler.handle_targeted(actor, loc(1), &chest()).cancel);
    assert!(!handler.handle_targeted(actor, loc(2), &chest()).cancel);

    for x in [1, 2] {
        let lock = handler.registry().get(loc(x)).expect("lock");
        assert_eq!(lock.owner, actor);
        assert_eq!(lock.kind, LockType::Public);
    }
    assert!(handler.state().has(actor), "persisting interaction stays armed");

    // Cancelling the command disarms it.
    handler.state().clear(actor);
    assert!(!handler.handle_targeted(actor, loc(3), &chest()).cancel);
    assert!(handler.registry().get(loc(3)).is_none());
}

// ---------------------------------------------------------------------------
// Scenario: a miss against a non-lockable block keeps the one-shot armed
// ---------------------------------------------------------------------------

#[test]
fn clicking_dirt_does_not_spend_the_interaction() {
    let handler = handler();
    let actor = ActorId::new();

    handler.state().set(
        actor,
        PendingInteraction::create(LockType::Private, None, None, false).expect("arm"),
    );

    assert!(!handler.handle_targeted(actor, loc(1), &BlockKind::from("dirt")).cancel);
    assert!(handler.state().has(actor));

    assert!(!handler.handle_targeted(actor, loc(2), &chest()).cancel);
    assert!(handler.registry().get(loc(2)).is_some());
    assert!(!handler.state().has(actor));
}

// ---------------------------------------------------------------------------
// Scenario: strangers bounce off a private lock
// ---------------------------------------------------------------------------

#[test]
fn private_lock_cancels_stranger_clicks() {
    let handler = handler();
    let owner = ActorId::new();
    let stranger = ActorId::new();
    let location = loc(1);

    handler
        .registry()
        .create(location, Lock::new(owner, LockType::Private, chest()))
        .expect("seed");

    let verdict = handler.handle_targeted(stranger, location, &chest());
    assert!(verdict.cancel);
    assert_eq!(verdict.reason, Some(DenyReason::NotAuthorized));

    assert!(!handler.handle_targeted(owner, location, &chest()).cancel);
}

// ---------------------------------------------------------------------------
// Scenario: donation locks take deposits from anyone, withdrawals from few
// ---------------------------------------------------------------------------

#[test]
fn donation_lock_deposit_and_withdrawal_paths() {
    let handler = handler();
    let owner = ActorId::new();
    let donor = ActorId::new();
    let location = loc(1);

    handler
        .registry()
        .create(location, Lock::new(owner, LockType::Donation, chest()))
        .expect("seed");

    // Anyone can open and deposit.
    assert!(!handler.handle_targeted(donor, location, &chest()).cancel);
    assert!(!handler.handle_withdrawal(donor, location, false).cancel);

    // Only the owner side can take things back out.
    assert!(handler.handle_withdrawal(donor, location, true).cancel);
    assert!(!handler.handle_withdrawal(owner, location, true).cancel);

    // An allow-listed actor withdraws too.
    handler
        .registry()
        .update(location, |lock| lock.grant(donor, GrantLevel::Access))
        .expect("grant");
    assert!(!handler.handle_withdrawal(donor, location, true).cancel);
}

// ---------------------------------------------------------------------------
// Scenario: removing someone else's lock fails and changes nothing
// ---------------------------------------------------------------------------

#[test]
fn remove_interaction_against_foreign_lock_denies() {
    let handler = handler();
    let owner = ActorId::new();
    let intruder = ActorId::new();
    let location = loc(1);

    handler
        .registry()
        .create(location, Lock::new(owner, LockType::Public, chest()))
        .expect("seed");

    handler
        .state()
        .set(intruder, PendingInteraction::remove(false));
    let verdict = handler.handle_targeted(intruder, location, &chest());

    assert!(verdict.cancel);
    assert_eq!(verdict.reason, Some(DenyReason::NotAuthorized));
    let still_there = handler.registry().get(location).expect("lock remains");
    assert_eq!(still_there.owner, owner);

    // The same denial surfaces as a typed error at the registry level.
    let err = handler
        .registry()
        .remove(location, intruder)
        .expect_err("stranger cannot remove");
    assert!(matches!(err, HaspError::NotAuthorized));
}

// ---------------------------------------------------------------------------
// Scenario: manage interactions grow and shrink the allow-list
// ---------------------------------------------------------------------------

#[test]
fn manage_interaction_end_to_end() {
    let handler = handler();
    let owner = ActorId::new();
    let friend = ActorId::new();
    let location = loc(1);

    handler
        .registry()
        .create(location, Lock::new(owner, LockType::Private, chest()))
        .expect("seed");

    assert!(handler.handle_targeted(friend, location, &chest()).cancel);

    handler.state().set(
        owner,
        PendingInteraction::manage(
            ManageOp::AddMember {
                actor: friend,
                level: GrantLevel::Access,
            },
            false,
        )
        .expect("arm"),
    );
    assert!(!handler.handle_targeted(owner, location, &chest()).cancel);
    assert!(!handler.handle_targeted(friend, location, &chest()).cancel);

    handler.state().set(
        owner,
        PendingInteraction::manage(ManageOp::RemoveMember { actor: friend }, false).expect("arm"),
    );
    assert!(!handler.handle_targeted(owner, location, &chest()).cancel);
    assert!(handler.handle_targeted(friend, location, &chest()).cancel);
}

// ---------------------------------------------------------------------------
// Scenario: PASSWORD_ONCE unlock becomes a durable grant
// ---------------------------------------------------------------------------

#[test]
fn password_once_unlock_survives_reconnect() {
    let handler = handler();
    let owner = ActorId::new();
    let visitor = ActorId::new();
    let location = loc(1);

    handler.state().set(
        owner,
        PendingInteraction::create(
            LockType::PasswordOnce,
            Some("vault".to_string()),
            Some("sesame".to_string()),
            false,
        )
        .expect("arm"),
    );
    assert!(!handler.handle_targeted(owner, location, &chest()).cancel);

    assert!(handler.handle_targeted(visitor, location, &chest()).cancel);

    handler
        .state()
        .set(visitor, PendingInteraction::unlock("sesame", false).expect("arm"));
    assert!(!handler.handle_targeted(visitor, location, &chest()).cancel);

    // The grant is on the lock itself, so it survives a disconnect.
    handler.state().end_session(visitor);
    assert!(!handler.handle_targeted(visitor, location, &chest()).cancel);
    assert_eq!(
        handler.registry().get(location).expect("lock").grant_level(visitor),
        Some(GrantLevel::Access)
    );
}

// ---------------------------------------------------------------------------
// Scenario: PASSWORD_ALWAYS unlock evaporates on disconnect
// ---------------------------------------------------------------------------

#[test]
fn password_always_unlock_is_session_scoped() {
    let handler = handler();
    let owner = ActorId::new();
    let visitor = ActorId::new();
    let location = loc(1);

    let mut lock = Lock::new(owner, LockType::PasswordAlways, chest());
    lock.set_password("sesame");
    handler.registry().create(location, lock).expect("seed");

    handler
        .state()
        .set(visitor, PendingInteraction::unlock("wrong", false).expect("arm"));
    let verdict = handler.handle_targeted(visitor, location, &chest());
    assert!(verdict.cancel);
    assert_eq!(verdict.reason, Some(DenyReason::WrongPassword));
    assert!(!handler.state().has(visitor), "failed attempt consumed the one-shot");

    handler
        .state()
        .set(visitor, PendingInteraction::unlock("sesame", false).expect("arm"));
    assert!(!handler.handle_targeted(visitor, location, &chest()).cancel);
    assert!(!handler.handle_targeted(visitor, location, &chest()).cancel);

    handler.state().end_session(visitor);
    assert!(handler.handle_targeted(visitor, location, &chest()).cancel);
    assert_eq!(
        handler.registry().get(location).expect("lock").grant_level(visitor),
        None,
        "no durable grant for PASSWORD_ALWAYS"
    );
}

// ---------------------------------------------------------------------------
// Scenario: inspect reports the lock to an authorized viewer
// ---------------------------------------------------------------------------

#[test]
fn inspect_interaction_reports_lock_details() {
    let handler = handler();
    let owner = ActorId::new();
    let stranger = ActorId::new();
    let location = loc(1);

    let mut lock = Lock::new(owner, LockType::Public, chest());
    lock.name = Some("town storage".to_string());
    handler.registry().create(location, lock).expect("seed");

    handler.state().set(owner, PendingInteraction::inspect(false));
    let verdict = handler.handle_targeted(owner, location, &chest());
    assert!(!verdict.cancel);
    let inspected = verdict.inspected.expect("lock details");
    assert_eq!(inspected.name.as_deref(), Some("town storage"));

    // Public locks are viewable by anyone, so inspection works too.
    handler.state().set(stranger, PendingInteraction::inspect(false));
    let verdict = handler.handle_targeted(stranger, location, &chest());
    assert!(!verdict.cancel);
    assert!(verdict.inspected.is_some());

    // Against an unlocked block it reports NotLocked but lets the click run.
    handler.state().set(owner, PendingInteraction::inspect(false));
    let verdict = handler.handle_targeted(owner, loc(2), &chest());
    assert!(!verdict.cancel);
    assert_eq!(verdict.reason, Some(DenyReason::NotLocked));
    assert!(verdict.inspected.is_none());
}

// ---------------------------------------------------------------------------
// Scenario: per-type limits stop a hoarder
// ---------------------------------------------------------------------------

#[test]
fn lock_limit_denies_and_keeps_interaction_semantics() {
    let config = HaspConfig::from_toml("[limits]\nprivate = 1").expect("config");
    let handler = handler_with_config(&config);
    let actor = ActorId::new();

    handler.state().set(
        actor,
        PendingInteraction::create(LockType::Private, None, None, true).expect("arm"),
    );

    assert!(!handler.handle_targeted(actor, loc(1), &chest()).cancel);

    let verdict = handler.handle_targeted(actor, loc(2), &chest());
    assert!(verdict.cancel);
    assert_eq!(verdict.reason, Some(DenyReason::LockLimitReached));
    assert!(handler.registry().get(loc(2)).is_none());
    assert!(handler.state().has(actor), "persisting interaction stays armed");

    // Removing one frees headroom.
    handler.registry().remove(loc(1), actor).expect("remove");
    assert!(!handler.handle_targeted(actor, loc(2), &chest()).cancel);
}

// ---------------------------------------------------------------------------
// Scenario: locks survive a restart through the SQLite store
// ---------------------------------------------------------------------------

#[test]
fn locks_survive_restart_via_store() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("locks.db");
    let config = HaspConfig::default();
    let owner = ActorId::new();
    let friend = ActorId::new();
    let location = loc(1);

    {
        let store: Arc<dyn LockStore> = Arc::new(
            SqliteLockStore::open(&db_path, &config.storage).expect("open store"),
        );
        let registry =
            Arc::new(LockRegistry::with_store(&config, store).expect("registry"));
        let handler =
            InteractionHandler::new(registry, Arc::new(InteractionStateMachine::new()));

        handler.state().set(
            owner,
            PendingInteraction::create(LockType::Private, Some("shed".to_string()), None, false)
                .expect("arm"),
        );
        assert!(!handler.handle_targeted(owner, location, &chest()).cancel);
        handler
            .registry()
            .update(location, |lock| lock.grant(friend, GrantLevel::Manage))
            .expect("grant");
    }

    // "Restart": a fresh registry over the same database file.
    let store: Arc<dyn LockStore> = Arc::new(
        SqliteLockStore::open(&db_path, &config.storage).expect("reopen store"),
    );
    let registry = Arc::new(LockRegistry::with_store(&config, store).expect("reload"));
    let handler = InteractionHandler::new(registry, Arc::new(InteractionStateMachine::new()));

    let lock = handler.registry().get(location).expect("lock restored");
    assert_eq!(lock.owner, owner);
    assert_eq!(lock.kind, LockType::Private);
    assert_eq!(lock.name.as_deref(), Some("shed"));
    assert_eq!(lock.grant_level(friend), Some(GrantLevel::Manage));

    assert!(handler.handle_targeted(ActorId::new(), location, &chest()).cancel);
    assert!(!handler.handle_targeted(friend, location, &chest()).cancel);
}

// ---------------------------------------------------------------------------
// Scenario: concurrent actors on different blocks never interfere
// ---------------------------------------------------------------------------

#[test]
fn concurrent_actors_lock_independent_blocks() {
    let registry = Arc::new(LockRegistry::new(&HaspConfig::default()));
    let state = Arc::new(InteractionStateMachine::new());
    let handler = InteractionHandler::new(Arc::clone(&registry), Arc::clone(&state));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let handler = handler.clone();
            std::thread::spawn(move || {
                let actor = ActorId::new();
                handler.state().set(
                    actor,
                    PendingInteraction::create(LockType::Private, None, None, false)
                        .expect("arm"),
                );
                let verdict = handler.handle_targeted(actor, loc(i), &chest());
                assert!(!verdict.cancel);
                assert!(!handler.state().has(actor));
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("thread");
    }
    assert_eq!(registry.len(), 8);
}
