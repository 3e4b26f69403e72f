//! # ledger-audit
//!
//! Append-only, SHA-256 hash-chained audit ledger for the barangay portal.
//!
//! ## Overview
//!
//! Every privileged action appends a `Block` that commits to the previous
//! block's hash. Rewriting any stored field, or splicing rows out, breaks
//! the chain and is reported by verification.
//!
//! Appends are serialized through a single worker (`LedgerWriter`) so two
//! concurrent actions can never chain from the same tip. The stores also
//! refuse any block that is not chained from their current tip.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ledger_audit::{Ledger, LedgerOptions, SqliteLedgerStore};
//!
//! let store = Arc::new(SqliteLedgerStore::open("ledger.db")?);
//! let (ledger, _worker) = Ledger::start(store, LedgerOptions::default())?;
//!
//! ledger.append("alice", "ROLE_CHANGE", "resident->admin").await?;
//! assert!(ledger.verify(None)?.passed);
//! ```

pub mod chain;
pub mod export;
pub mod ledger;
pub mod memory;
pub mod reader;
pub mod sqlite;
pub mod writer;

pub use chain::{hash_block, recompute_hash, seal_block, verify_chain, Anchor, ChainWalker};
pub use export::LedgerExport;
pub use ledger::{Ledger, LedgerOptions};
pub use memory::InMemoryLedgerStore;
pub use reader::{verify_store, Blocks, DEFAULT_PAGE_SIZE};
pub use sqlite::SqliteLedgerStore;
pub use writer::{append_block, append_block_with_clock, LedgerWriter, WriterOptions, WriterWorker};

// ── Tests ─────────────────────────────────────────────────────────────────────
