//! # ledger-config
//!
//! TOML configuration for the audit ledger service.
//!
//! ```rust,ignore
//! use ledger_config::LedgerConfig;
//!
//! let config = LedgerConfig::load(Some(Path::new("ledger.toml")))?;
//! let (ledger, _worker) = Ledger::start(config.open_store()?, config.ledger_options())?;
//! ```

pub mod loader;
pub mod settings;

pub use loader::{ENV_BIND, ENV_DB_PATH};
pub use settings::{LedgerConfig, ServerSettings, StoreBackend, StoreSettings, VerifySettings, WriterSettings};
