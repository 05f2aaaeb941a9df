//! SQLite persistence for the lock registry.
//!
//! The registry talks to storage through the [`LockStore`] trait so tests
//! and embedded hosts can run without a database. The shipped
//! implementation keeps one row per lock:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS locks (
//!     world      TEXT    NOT NULL,
//!     x          INTEGER NOT NULL,
//!     y          INTEGER NOT NULL,
//!     z          INTEGER NOT NULL,
//!     data       BLOB    NOT NULL,
//!     updated_at TEXT    NOT NULL,
//!     PRIMARY KEY (world, x, y, z)
//! );
//! ```
//!
//! The lock itself is JSON inside the BLOB column, which keeps the schema
//! stable across lock-record changes; the coordinate columns exist only to
//! key the row.

use std::path::{Path, PathBuf};

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OpenFlags};
use tracing::{debug, info, warn};

use crate::config::StorageConfig;
use crate::error::{HaspError, Result};
use crate::lock::Lock;
use crate::types::{Location, WorldId};

/// Storage collaborator for the lock registry.
///
/// `load_all` runs once at registry construction; `persist` and `delete`
/// are write-through calls made while holding the registry's per-location
/// exclusive section, so implementations must be cheap and must tolerate
/// being called from many threads.
pub trait LockStore: Send + Sync {
    /// Load every stored lock.
    ///
    /// # Errors
    /// Returns an error if the backing store cannot be read.
    fn load_all(&self) -> Result<Vec<(Location, Lock)>>;

    /// Insert or replace the lock at `location`.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    fn persist(&self, location: &Location, lock: &Lock) -> Result<()>;

    /// Delete the lock row at `location`, if any.
    ///
    /// # Errors
    /// Returns an error if the delete fails.
    fn delete(&self, location: &Location) -> Result<()>;
}

// ---------------------------------------------------------------------------
// SQLite implementation
// ---------------------------------------------------------------------------

/// [`LockStore`] backed by a single SQLite database file.
///
/// The connection sits behind a mutex: lock mutations are rare next to
/// reads (which never touch storage), so one serialized writer is enough.
pub struct SqliteLockStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl std::fmt::Debug for SqliteLockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteLockStore")
            .field("db_path", &self.db_path)
            .finish_non_exhaustive()
    }
}

impl SqliteLockStore {
    /// Open (or create) the database at `path`.
    ///
    /// The schema is created if it does not exist. WAL mode is enabled
    /// when `config.wal` is true.
    ///
    /// # Errors
    /// Returns [`HaspError::Database`] on SQLite failures.
    pub fn open<P: AsRef<Path>>(path: P, config: &StorageConfig) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = Connection::open_with_flags(&db_path, flags)?;

        if config.wal {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch(&format!(
            "PRAGMA busy_timeout = {};",
            config.busy_timeout_ms
        ))?;

        Self::init_schema(&conn)?;

        info!(path = %db_path.display(), wal = config.wal, "Lock store opened");

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
        })
    }

    /// Open an in-memory database (useful for tests).
    ///
    /// # Errors
    /// Returns [`HaspError::Database`] on SQLite failures.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: PathBuf::from(":memory:"),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS locks (
                world      TEXT    NOT NULL,
                x          INTEGER NOT NULL,
                y          INTEGER NOT NULL,
                z          INTEGER NOT NULL,
                data       BLOB    NOT NULL,
                updated_at TEXT    NOT NULL,
                PRIMARY KEY (world, x, y, z)
            );",
        )?;
        Ok(())
    }

    /// Path to the database file (or `:memory:`).
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Number of stored lock rows.
    ///
    /// # Errors
    /// Returns [`HaspError::Database`] on SQLite failures.
    pub fn lock_count(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM locks", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

impl LockStore for SqliteLockStore {
    fn load_all(&self) -> Result<Vec<(Location, Lock)>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached("SELECT world, x, y, z, data FROM locks")?;

        let rows = stmt.query_map([], |row| {
            let world: String = row.get(0)?;
            let x: i32 = row.get(1)?;
            let y: i32 = row.get(2)?;
            let z: i32 = row.get(3)?;
            let data: Vec<u8> = row.get(4)?;
            Ok((world, x, y, z, data))
        })?;

        let mut locks = Vec::new();
        for row in rows {
            let (world, x, y, z, data) = row?;
            let Ok(world_uuid) = uuid::Uuid::parse_str(&world) else {
                warn!(world = %world, "Skipping lock row with invalid world UUID");
                continue;
            };
            let location = Location::new(WorldId(world_uuid), x, y, z);
            let lock: Lock = serde_json::from_slice(&data)
                .map_err(|e| HaspError::Serialization(e.to_string()))?;
            locks.push((location, lock));
        }

        info!(count = locks.len(), "Loaded locks from store");
        Ok(locks)
    }

    fn persist(&self, location: &Location, lock: &Lock) -> Result<()> {
        let json =
            serde_json::to_vec(lock).map_err(|e| HaspError::Serialization(e.to_string()))?;
        let now = Utc::now().to_rfc3339();

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO locks (world, x, y, z, data, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(world, x, y, z) DO UPDATE SET
                data = excluded.data,
                updated_at = excluded.updated_at",
            params![
                location.world.0.to_string(),
                location.x,
                location.y,
                location.z,
                json,
                now
            ],
        )?;

        debug!(location = %location, bytes = json.len(), "Persisted lock");
        Ok(())
    }

    fn delete(&self, location: &Location) -> Result<()> {
        let conn = self.conn.lock();
        let deleted = conn.execute(
            "DELETE FROM locks WHERE world = ?1 AND x = ?2 AND y = ?3 AND z = ?4",
            params![
                location.world.0.to_string(),
                location.x,
                location.y,
                location.z
            ],
        )?;

        debug!(location = %location, existed = deleted > 0, "Deleted lock row");
        Ok(())
    }
}
