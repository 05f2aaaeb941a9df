//! Hasp benchmark suite.
//!
//! CI-enforced performance targets for the interaction hot path:
//!   policy_evaluate_* ................ < 100ns
//!   registry_get_hit_10k ............. < 1μs
//!   registry_create_remove_cycle ..... < 5μs
//!   handle_targeted_* ................ < 2μs

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use hasp_core::config::HaspConfig;
use hasp_core::interaction::PendingInteraction;
use hasp_core::lock::{GrantLevel, Lock, LockType};
use hasp_core::policy::{evaluate, AccessKind};
use hasp_core::types::{ActorId, BlockKind, Location, WorldId};
use hasp_core::{InteractionHandler, InteractionStateMachine, LockRegistry};

fn loc(x: i32) -> Location {
    Location::new(WorldId(uuid::Uuid::nil()), x, 64, 0)
}

fn chest() -> BlockKind {
    BlockKind::from("chest")
}

/// Benchmark: pure policy evaluation for the three caller classes.
fn bench_policy_evaluate(c: &mut Criterion) {
    let owner = ActorId::new();
    let friend = ActorId::new();
    let stranger = ActorId::new();
    let mut lock = Lock::new(owner, LockType::Private, chest());
    lock.grant(friend, GrantLevel::Access);

    c.bench_function("policy_evaluate_owner", |b| {
        b.iter(|| evaluate(black_box(Some(&lock)), black_box(owner), AccessKind::Use));
    });
    c.bench_function("policy_evaluate_allow_listed", |b| {
        b.iter(|| evaluate(black_box(Some(&lock)), black_box(friend), AccessKind::Withdraw));
    });
    c.bench_function("policy_evaluate_stranger", |b| {
        b.iter(|| evaluate(black_box(Some(&lock)), black_box(stranger), AccessKind::Use));
    });
}

/// Benchmark: registry lookup against a populated map.
fn bench_registry_get(c: &mut Criterion) {
    let registry = LockRegistry::new(&HaspConfig::default());
    let owner = ActorId::new();
    for x in 0..10_000 {
        registry
            .create(loc(x), Lock::new(owner, LockType::Private, chest()))
            .expect("seed");
    }

    c.bench_function("registry_get_hit_10k", |b| {
        b.iter(|| black_box(registry.get(black_box(loc(5_000)))));
    });
    c.bench_function("registry_get_miss_10k", |b| {
        b.iter(|| black_box(registry.get(black_box(loc(20_000)))));
    });
}

/// Benchmark: the full create/remove write cycle on one location.
fn bench_registry_create_remove(c: &mut Criterion) {
    let registry = LockRegistry::new(&HaspConfig::default());
    let owner = ActorId::new();
    let location = loc(0);

    c.bench_function("registry_create_remove_cycle", |b| {
        b.iter(|| {
            registry
                .create(location, Lock::new(owner, LockType::Public, chest()))
                .expect("create");
            registry.remove(location, owner).expect("remove");
        });
    });
}

/// Benchmark: the handler hot path, passive and with a pending create.
fn bench_handle_targeted(c: &mut Criterion) {
    let registry = Arc::new(LockRegistry::new(&HaspConfig::default()));
    let state = Arc::new(InteractionStateMachine::new());
    let handler = InteractionHandler::new(Arc::clone(&registry), state);

    let owner = ActorId::new();
    let stranger = ActorId::new();
    let block = chest();
    registry
        .create(loc(0), Lock::new(owner, LockType::Private, block.clone()))
        .expect("seed");

    c.bench_function("handle_targeted_passive_denied", |b| {
        b.iter(|| black_box(handler.handle_targeted(black_box(stranger), loc(0), &block)));
    });
    c.bench_function("handle_targeted_passive_unlocked", |b| {
        b.iter(|| black_box(handler.handle_targeted(black_box(stranger), loc(1), &block)));
    });
    c.bench_function("handle_targeted_pending_create", |b| {
        let mut x = 100;
        b.iter(|| {
            // Fresh interaction and fresh location every pass, so each
            // apply exercises a real create.
            handler.state().set(
                owner,
                PendingInteraction::create(LockType::Public, None, None, false)
                    .expect("interaction"),
            );
            x += 1;
            black_box(handler.handle_targeted(owner, loc(x), &block));
        });
    });
}

criterion_group!(
    benches,
    bench_policy_evaluate,
    bench_registry_get,
    bench_registry_create_remove,
    bench_handle_targeted
);
criterion_main!(benches);
