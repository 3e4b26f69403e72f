//! Sealed ledger snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ledger_contracts::{Block, VerificationReport};

/// A point-in-time export of (a filtered view of) the ledger.
///
/// `terminal_hash` is the hash of the newest block in the whole chain at
/// export time, or `GENESIS_HASH` for an empty ledger, and can be kept
/// elsewhere as a compact commitment to everything before it. `report` is a
/// full-chain verification taken right after `blocks` were read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerExport {
    /// Wall-clock time (UTC) the export was produced.
    pub exported_at: DateTime<Utc>,

    /// Number of blocks in `blocks`.
    pub block_count: usize,

    pub terminal_hash: String,

    /// Exported blocks in ascending sequence order.
    pub blocks: Vec<Block>,

    pub report: VerificationReport,
}
