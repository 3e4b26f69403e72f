//! In-memory implementation of `LedgerStore`.
//!
//! `InMemoryLedgerStore` keeps all blocks in a `Vec` behind a `Mutex`. It
//! enforces the same contract as the SQLite store (monotonic ids starting at
//! 1, compare-and-swap on the chain tip) and is what the tests and the
//! `memory` backend run against.

use std::sync::{Arc, Mutex, MutexGuard};

use ledger_contracts::{Block, LedgerError, LedgerResult, NewBlock, GENESIS_HASH};
use ledger_core::LedgerStore;

// ── Internal mutable state ────────────────────────────────────────────────────

pub(crate) struct InMemoryState {
    /// All blocks, in ascending sequence order.
    pub(crate) blocks: Vec<Block>,

    /// The next sequence id to assign. Never reused, like SQLite's
    /// `AUTOINCREMENT`.
    pub(crate) next_id: u64,
}

// ── Public store ──────────────────────────────────────────────────────────────

/// An append-only ledger table held in process memory.
///
/// Clones share the same underlying table.
#[derive(Clone)]
pub struct InMemoryLedgerStore {
    pub(crate) state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(InMemoryState {
                blocks: Vec::new(),
                next_id: 1,
            })),
        }
    }

    fn lock(&self) -> LedgerResult<MutexGuard<'_, InMemoryState>> {
        self.state
            .lock()
            .map_err(|e| LedgerError::store(format!("ledger state lock poisoned: {}", e)))
    }
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn latest(&self) -> LedgerResult<Option<Block>> {
        Ok(self.lock()?.blocks.last().cloned())
    }

    fn get(&self, sequence_id: u64) -> LedgerResult<Option<Block>> {
        let state = self.lock()?;
        Ok(state
            .blocks
            .binary_search_by_key(&sequence_id, |b| b.sequence_id)
            .ok()
            .map(|idx| state.blocks[idx].clone()))
    }

    fn insert(&self, block: &NewBlock) -> LedgerResult<Block> {
        let mut state = self.lock()?;

        let tip = state
            .blocks
            .last()
            .map_or(GENESIS_HASH, |b| b.hash.as_str());
        if tip != block.prev_hash {
            return Err(LedgerError::StaleTip {
                expected: block.prev_hash.clone(),
                found: tip.to_string(),
            });
        }

        let stored = block.clone().into_block(state.next_id);
        state.next_id += 1;
        state.blocks.push(stored.clone());

        Ok(stored)
    }

    fn read_from(&self, cursor: u64, limit: usize) -> LedgerResult<Vec<Block>> {
        let state = self.lock()?;
        let start = state.blocks.partition_point(|b| b.sequence_id < cursor);
        Ok(state.blocks[start..].iter().take(limit).cloned().collect())
    }

    fn count(&self) -> LedgerResult<u64> {
        Ok(self.lock()?.blocks.len() as u64)
    }
}
