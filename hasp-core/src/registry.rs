//! The lock registry: the one shared, durable map from location to lock.
//!
//! Every operation is atomic per location. Creation and removal run inside
//! the map's per-key exclusive section, so two actors racing on the same
//! block observe a linear history; operations on different locations never
//! block each other.
//!
//! The registry exclusively owns all lock records. Lookups return clones
//! and mutations go through [`LockRegistry::update`], so no caller can
//! hold a stale reference across a concurrent change.

use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, error, info};

use crate::config::{HaspConfig, LimitsConfig};
use crate::error::{HaspError, Result};
use crate::lock::{Lock, LockType};
use crate::metrics::LockCounters;
use crate::policy::{self, AccessKind};
use crate::storage::LockStore;
use crate::types::{ActorId, BlockKind, Location};

/// Shared location→lock map with write-through persistence.
pub struct LockRegistry {
    locks: DashMap<Location, Lock>,
    lockable_kinds: HashSet<String>,
    limits: LimitsConfig,
    store: Option<Arc<dyn LockStore>>,
    counters: LockCounters,
}

impl std::fmt::Debug for LockRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockRegistry")
            .field("locks", &self.locks.len())
            .field("lockable_kinds", &self.lockable_kinds.len())
            .field("persistent", &self.store.is_some())
            .finish_non_exhaustive()
    }
}

impl LockRegistry {
    /// Create an in-memory registry with no storage collaborator.
    #[must_use]
    pub fn new(config: &HaspConfig) -> Self {
        Self {
            locks: DashMap::new(),
            lockable_kinds: config.lockable.kinds.iter().cloned().collect(),
            limits: config.limits.clone(),
            store: None,
            counters: LockCounters::new(),
        }
    }

    /// Create a registry backed by `store`, loading every stored lock.
    ///
    /// # Errors
    /// Propagates `load_all` failures: a broken store at startup is fatal
    /// to the caller's setup path, unlike later write-through errors.
    pub fn with_store(config: &HaspConfig, store: Arc<dyn LockStore>) -> Result<Self> {
        let registry = Self {
            store: Some(Arc::clone(&store)),
            ..Self::new(config)
        };
        for (location, lock) in store.load_all()? {
            registry.locks.insert(location, lock);
        }
        info!(locks = registry.locks.len(), "Lock registry restored");
        Ok(registry)
    }

    // ------------------------------------------------------------------
    // Core operations
    // ------------------------------------------------------------------

    /// The lock at `location`, if any. Returns a clone; never fails.
    #[must_use]
    pub fn get(&self, location: Location) -> Option<Lock> {
        self.locks.get(&location).map(|entry| entry.clone())
    }

    /// Insert `lock` at `location`.
    ///
    /// Fails with [`HaspError::AlreadyLocked`] if the location is taken and
    /// with [`HaspError::LockLimitReached`] if the owner is at the
    /// configured ceiling for this lock type. The ceiling is counted before
    /// the insert; one actor's events arrive serially, so an owner cannot
    /// race the count against their own insert.
    ///
    /// # Errors
    /// See above; both are expected, user-facing conditions.
    pub fn create(&self, location: Location, lock: Lock) -> Result<Lock> {
        if let Some(limit) = self.limits.limit_for(lock.kind) {
            let owned = u32::try_from(self.count_owned(lock.owner, lock.kind)).unwrap_or(u32::MAX);
            if owned >= limit {
                return Err(HaspError::LockLimitReached { kind: lock.kind, limit });
            }
        }

        match self.locks.entry(location) {
            Entry::Occupied(_) => Err(HaspError::AlreadyLocked { location }),
            Entry::Vacant(vacant) => {
                let stored = vacant.insert(lock).clone();
                self.write_through(location, &stored);
                self.counters.locks_created.fetch_add(1, Ordering::Relaxed);
                debug!(
                    location = %location,
                    owner = %stored.owner,
                    kind = %stored.kind,
                    "Lock created"
                );
                Ok(stored)
            }
        }
    }

    /// Apply `mutate` to the lock at `location` and return the result.
    ///
    /// The mutation runs inside the per-key exclusive section, so
    /// concurrent updates to one lock serialize.
    ///
    /// # Errors
    /// Fails with [`HaspError::NotLocked`] if no lock exists there.
    pub fn update(
        &self,
        location: Location,
        mutate: impl FnOnce(&mut Lock),
    ) -> Result<Lock> {
        let Some(mut entry) = self.locks.get_mut(&location) else {
            return Err(HaspError::NotLocked { location });
        };
        mutate(&mut entry);
        let updated = entry.clone();
        drop(entry);

        self.write_through(location, &updated);
        self.counters.locks_updated.fetch_add(1, Ordering::Relaxed);
        debug!(location = %location, "Lock updated");
        Ok(updated)
    }

    /// Delete the lock at `location` on behalf of `requester`.
    ///
    /// The REMOVE permission check runs inside the exclusive section, so a
    /// racing ownership change cannot let an unauthorized delete through.
    ///
    /// # Errors
    /// Fails with [`HaspError::NotLocked`] if absent and
    /// [`HaspError::NotAuthorized`] if the policy denies REMOVE.
    pub fn remove(&self, location: Location, requester: ActorId) -> Result<Lock> {
        match self.locks.entry(location) {
            Entry::Vacant(_) => Err(HaspError::NotLocked { location }),
            Entry::Occupied(entry) => {
                if !policy::evaluate(Some(entry.get()), requester, AccessKind::Remove).is_allow() {
                    return Err(HaspError::NotAuthorized);
                }
                let lock = entry.remove();
                self.delete_through(location);
                self.counters.locks_removed.fetch_add(1, Ordering::Relaxed);
                debug!(location = %location, requester = %requester, "Lock removed");
                Ok(lock)
            }
        }
    }

    /// Whether blocks of `kind` may carry locks at all.
    #[must_use]
    pub fn is_lockable(&self, kind: &BlockKind) -> bool {
        self.lockable_kinds.contains(kind.as_str())
    }

    // ------------------------------------------------------------------
    // Ownership queries
    // ------------------------------------------------------------------

    /// How many locks of `kind` the owner currently holds.
    #[must_use]
    pub fn count_owned(&self, owner: ActorId, kind: LockType) -> usize {
        self.locks
            .iter()
            .filter(|entry| entry.owner == owner && entry.kind == kind)
            .count()
    }

    /// Every lock the owner holds, with its location.
    #[must_use]
    pub fn owned_by(&self, owner: ActorId) -> Vec<(Location, Lock)> {
        self.locks
            .iter()
            .filter(|entry| entry.owner == owner)
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }

    /// Administratively remove every lock the owner holds, skipping the
    /// permission check. Returns how many were removed.
    pub fn purge_owner(&self, owner: ActorId) -> usize {
        let owned: Vec<Location> = self
            .locks
            .iter()
            .filter(|entry| entry.owner == owner)
            .map(|entry| *entry.key())
            .collect();

        let mut removed = 0;
        for location in owned {
            // Ownership is re-checked inside the exclusive section; a lock
            // that changed hands since the scan stays put.
            if self.locks.remove_if(&location, |_, l| l.owner == owner).is_some() {
                self.delete_through(location);
                removed += 1;
            }
        }

        if removed > 0 {
            self.counters
                .locks_removed
                .fetch_add(removed as u64, Ordering::Relaxed);
            info!(owner = %owner, count = removed, "Purged owner's locks");
        }
        removed
    }

    /// Total number of locks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether the registry holds no locks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    /// Runtime counters, shared with the interaction handler.
    #[must_use]
    pub fn counters(&self) -> &LockCounters {
        &self.counters
    }

    // ------------------------------------------------------------------
    // Write-through
    // ------------------------------------------------------------------

    // Storage failures are logged and swallowed: the in-memory result
    // stands, and the operation's own error taxonomy stays untouched.
    fn write_through(&self, location: Location, lock: &Lock) {
        if let Some(store) = &self.store {
            if let Err(e) = store.persist(&location, lock) {
                error!(location = %location, error = %e, "Lock write-through failed");
            }
        }
    }

    fn delete_through(&self, location: Location) {
        if let Some(store) = &self.store {
            if let Err(e) = store.delete(&location) {
                error!(location = %location, error = %e, "Lock delete-through failed");
            }
        }
    }
}
