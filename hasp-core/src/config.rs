//! Configuration for the hasp lock system.
//!
//! Maps directly to `hasp.toml`. Every key has a code-side default, so an
//! absent file and an empty file behave the same.

use serde::{Deserialize, Serialize};

use crate::lock::LockType;

/// Top-level hasp configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HaspConfig {
    /// Which block kinds may carry locks.
    #[serde(default)]
    pub lockable: LockableConfig,
    /// Per-owner lock count ceilings.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// SQLite persistence settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

impl HaspConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `HaspError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        toml::from_str(toml_str).map_err(|e| crate::HaspError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// The set of block kinds eligible for locking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockableConfig {
    /// Block kind identifiers, as the host adapter reports them.
    #[serde(default = "default_lockable_kinds")]
    pub kinds: Vec<String>,
}

impl Default for LockableConfig {
    fn default() -> Self {
        Self {
            kinds: default_lockable_kinds(),
        }
    }
}

/// How many locks of each type one owner may hold. Zero means unlimited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Ceiling for PUBLIC locks per owner.
    #[serde(default)]
    pub public: u32,
    /// Ceiling for PRIVATE locks per owner.
    #[serde(default)]
    pub private: u32,
    /// Ceiling for DONATION locks per owner.
    #[serde(default)]
    pub donation: u32,
    /// Ceiling for PASSWORD_ALWAYS locks per owner.
    #[serde(default)]
    pub password_always: u32,
    /// Ceiling for PASSWORD_ONCE locks per owner.
    #[serde(default)]
    pub password_once: u32,
}

impl LimitsConfig {
    /// The configured ceiling for `kind`, or `None` when unlimited.
    #[must_use]
    pub fn limit_for(&self, kind: LockType) -> Option<u32> {
        let raw = match kind {
            LockType::Public => self.public,
            LockType::Private => self.private,
            LockType::Donation => self.donation,
            LockType::PasswordAlways => self.password_always,
            LockType::PasswordOnce => self.password_once,
        };
        (raw > 0).then_some(raw)
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            public: 0,
            private: 0,
            donation: 0,
            password_always: 0,
            password_once: 0,
        }
    }
}

/// SQLite persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database file path, relative to the host's data directory.
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Use WAL mode for concurrent reads.
    #[serde(default = "default_true")]
    pub wal: bool,
    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            wal: true,
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool {
    true
}

fn default_db_path() -> String {
    "hasp.db".to_string()
}

fn default_busy_timeout() -> u64 {
    5000
}

fn default_lockable_kinds() -> Vec<String> {
    [
        "chest",
        "trapped_chest",
        "furnace",
        "hopper",
        "dispenser",
        "dropper",
        "brewing_stand",
        "shulker_box",
        "wooden_door",
        "iron_door",
        "trapdoor",
        "fence_gate",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}
