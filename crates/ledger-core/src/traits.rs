//! Core trait definitions for the audit ledger.
//!
//! - `LedgerStore`: the durable, ordered ledger table
//! - `AuditSink`: where privileged-action handlers send entries
//!
//! The store is deliberately dumb: it assigns sequence ids and refuses to
//! insert a block that is not chained from its current tip. Hashing and
//! serialization of appends live above it, in the writer.

use std::future::Future;

use ledger_contracts::{AuditEntry, Block, LedgerResult, NewBlock};

/// An append-only, ordered table of blocks.
///
/// There is no update or delete operation. Implementations must be safe to
/// share across threads; reads may run concurrently with an insert.
pub trait LedgerStore: Send + Sync {
    /// The block with the highest sequence id, or `None` on an empty ledger.
    fn latest(&self) -> LedgerResult<Option<Block>>;

    /// A single block by sequence id.
    fn get(&self, sequence_id: u64) -> LedgerResult<Option<Block>>;

    /// Insert a sealed block and return it with its assigned sequence id.
    ///
    /// Compare-and-swap on the tip: if `block.prev_hash` is not the hash of
    /// the current latest block (or `GENESIS_HASH` when empty), nothing is
    /// written and `LedgerError::StaleTip` is returned.
    fn insert(&self, block: &NewBlock) -> LedgerResult<Block>;

    /// Up to `limit` blocks with sequence id `>= cursor`, ascending.
    fn read_from(&self, cursor: u64, limit: usize) -> LedgerResult<Vec<Block>>;

    /// Number of stored blocks.
    fn count(&self) -> LedgerResult<u64>;
}

/// The append trigger used by privileged-action handlers.
///
/// `record` resolves once the block is committed, or with the error that
/// prevented it. Implementations must never report success for an entry
/// that was not persisted.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: AuditEntry) -> impl Future<Output = LedgerResult<Block>> + Send;
}
