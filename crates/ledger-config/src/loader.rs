//! Loading, overriding, and applying a `LedgerConfig`.
//!
//! Precedence, lowest first: built-in defaults, the TOML file, then the
//! `LEDGER_DB_PATH` and `LEDGER_BIND` environment variables.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use ledger_audit::{InMemoryLedgerStore, LedgerOptions, SqliteLedgerStore, WriterOptions};
use ledger_contracts::{LedgerError, LedgerResult};
use ledger_core::LedgerStore;

use crate::settings::{LedgerConfig, StoreBackend};

/// Overrides `store.path`.
pub const ENV_DB_PATH: &str = "LEDGER_DB_PATH";
/// Overrides `server.bind`.
pub const ENV_BIND: &str = "LEDGER_BIND";

fn config_err(reason: String) -> LedgerError {
    LedgerError::ConfigError { reason }
}

impl LedgerConfig {
    /// Parse `s` as TOML.
    ///
    /// Returns `LedgerError::ConfigError` if the TOML is malformed, has
    /// unknown keys, or fails validation.
    pub fn from_toml_str(s: &str) -> LedgerResult<Self> {
        let config: LedgerConfig =
            toml::from_str(s).map_err(|e| config_err(format!("failed to parse config TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read the file at `path` and parse it as TOML.
    pub fn from_file(path: &Path) -> LedgerResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            config_err(format!("failed to read config file '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Defaults or `path`, with process environment overrides applied.
    pub fn load(path: Option<&Path>) -> LedgerResult<Self> {
        let config = match path {
            Some(path) => {
                debug!(path = %path.display(), "loading ledger config");
                Self::from_file(path)?
            }
            None => Self::default(),
        };
        config.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides looked up through `lookup` (normally the environment).
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> LedgerResult<Self> {
        if let Some(path) = lookup(ENV_DB_PATH) {
            self.store.path = PathBuf::from(path);
        }
        if let Some(bind) = lookup(ENV_BIND) {
            self.server.bind = bind
                .parse()
                .map_err(|e| config_err(format!("{} '{}' is not a socket address: {}", ENV_BIND, bind, e)))?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject values that would make the ledger unusable.
    pub fn validate(&self) -> LedgerResult<()> {
        if self.writer.queue_capacity == 0 {
            return Err(config_err("writer.queue_capacity must be at least 1".to_string()));
        }
        if self.server.page_size == 0 {
            return Err(config_err("server.page_size must be at least 1".to_string()));
        }
        if self.server.read_timeout_ms == 0 {
            return Err(config_err("server.read_timeout_ms must be at least 1".to_string()));
        }
        if self.store.backend == StoreBackend::Sqlite && self.store.path.as_os_str().is_empty() {
            return Err(config_err("store.path must be set for the sqlite backend".to_string()));
        }
        Ok(())
    }

    /// Writer, policy, and paging options for `Ledger::start`.
    pub fn ledger_options(&self) -> LedgerOptions {
        LedgerOptions {
            writer: WriterOptions {
                queue_capacity: self.writer.queue_capacity,
                max_retries: self.writer.max_retries,
            },
            policy: self.verify.policy,
            page_size: self.server.page_size,
        }
    }

    /// Open the configured store.
    pub fn open_store(&self) -> LedgerResult<Arc<dyn LedgerStore>> {
        match self.store.backend {
            StoreBackend::Sqlite => {
                info!(path = %self.store.path.display(), "opening sqlite ledger store");
                Ok(Arc::new(SqliteLedgerStore::open(&self.store.path)?))
            }
            StoreBackend::Memory => {
                info!("using in-memory ledger store; blocks will not survive a restart");
                Ok(Arc::new(InMemoryLedgerStore::new()))
            }
        }
    }
}
