//! Configuration schema.
//!
//! A `LedgerConfig` is deserialized from TOML. Every section and every field
//! is optional; anything left out takes the default shown below.
//!
//! ```toml
//! [store]
//! backend = "sqlite"          # or "memory"
//! path = "ledger.db"
//!
//! [writer]
//! queue_capacity = 64
//! max_retries = 3
//!
//! [verify]
//! policy = "stored-hash"      # or "recomputed"
//!
//! [server]
//! bind = "0.0.0.0:8000"
//! page_size = 100
//! read_timeout_ms = 10000
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use ledger_contracts::ChainPolicy;

/// Which `LedgerStore` implementation to open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    /// Process-local and lost on exit. For demos and tests.
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    /// SQLite database file. Ignored by the `memory` backend.
    pub path: PathBuf,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            path: PathBuf::from("ledger.db"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WriterSettings {
    pub queue_capacity: usize,
    pub max_retries: u32,
}

impl Default for WriterSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            max_retries: 3,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerifySettings {
    pub policy: ChainPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSettings {
    pub bind: SocketAddr,
    /// Blocks fetched per store read when listing or verifying.
    pub page_size: usize,
    /// Budget for a single list, verify, or export request.
    pub read_timeout_ms: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8000)),
            page_size: 100,
            read_timeout_ms: 10_000,
        }
    }
}

/// The top-level structure deserialized from a TOML config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    pub store: StoreSettings,
    pub writer: WriterSettings,
    pub verify: VerifySettings,
    pub server: ServerSettings,
}
