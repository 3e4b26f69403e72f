//! Read side of the ledger: filtered listing and store-backed verification.
//!
//! Both walk the store page by page through `LedgerStore::read_from`, so
//! neither holds the whole chain in memory nor takes any ledger-wide lock.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::debug;

use ledger_contracts::{
    Block, BlockQuery, ChainPolicy, LedgerError, LedgerResult, SequenceRange, VerificationReport,
};
use ledger_core::LedgerStore;

use crate::chain::{Anchor, ChainWalker};

/// Default number of blocks fetched per store read.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// A lazy, finite, restartable listing of blocks in ascending sequence order.
///
/// Pages are fetched on demand. After stopping early, build a new query with
/// `BlockQuery::after(blocks.cursor())` to resume where this one left off.
pub struct Blocks {
    store: Arc<dyn LedgerStore>,
    query: BlockQuery,
    page_size: usize,
    buffer: VecDeque<Block>,
    next_cursor: u64,
    last_seen: Option<u64>,
    yielded: usize,
    exhausted: bool,
}

impl Blocks {
    pub fn new(store: Arc<dyn LedgerStore>, query: BlockQuery, page_size: usize) -> Self {
        let next_cursor = query.after.map_or(0, |after| after.saturating_add(1));
        let last_seen = query.after;
        Self {
            store,
            query,
            page_size: page_size.max(1),
            buffer: VecDeque::new(),
            next_cursor,
            last_seen,
            yielded: 0,
            exhausted: false,
        }
    }

    /// The last sequence id examined, matching or not.
    pub fn cursor(&self) -> Option<u64> {
        self.last_seen
    }

    fn fill(&mut self) -> LedgerResult<()> {
        let page = self.store.read_from(self.next_cursor, self.page_size)?;
        debug!(cursor = self.next_cursor, fetched = page.len(), "read ledger page");

        if page.len() < self.page_size {
            self.exhausted = true;
        }
        if let Some(last) = page.last() {
            self.next_cursor = last.sequence_id + 1;
        }
        self.buffer.extend(page);
        Ok(())
    }
}

impl Iterator for Blocks {
    type Item = LedgerResult<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.query.limit.is_some_and(|limit| self.yielded >= limit) {
                return None;
            }

            if let Some(block) = self.buffer.pop_front() {
                self.last_seen = Some(block.sequence_id);
                if self.query.matches(&block) {
                    self.yielded += 1;
                    return Some(Ok(block));
                }
                continue;
            }

            if self.exhausted {
                return None;
            }
            if let Err(e) = self.fill() {
                self.exhausted = true;
                return Some(Err(e));
            }
        }
    }
}

/// Verify `range` of the chain held in `store`.
///
/// A range that starts after block 1 is anchored on the stored hash of the
/// block just before it. Findings are returned in the report; only store
/// failures and an inverted range are errors.
pub fn verify_store(
    store: &dyn LedgerStore,
    range: SequenceRange,
    policy: ChainPolicy,
    page_size: usize,
) -> LedgerResult<VerificationReport> {
    if let (Some(start), Some(end)) = (range.start, range.end) {
        if start > end {
            return Err(LedgerError::invalid(
                "range",
                format!("start {} is after end {}", start, end),
            ));
        }
    }

    let page_size = page_size.max(1);
    let mut cursor = 0;
    let mut walker = ChainWalker::new(Anchor::Genesis, policy);

    if !range.starts_at_genesis() {
        let before = range.start.unwrap_or(1) - 1;
        let anchor = match store.get(before)? {
            Some(block) => Anchor::Block {
                sequence_id: block.sequence_id,
                hash: block.hash,
            },
            None => Anchor::Detached {
                missing_from: before,
            },
        };
        walker = ChainWalker::new(anchor, policy);
        cursor = before + 1;
    }

    'pages: loop {
        let page = store.read_from(cursor, page_size)?;
        let full = page.len() == page_size;

        for block in &page {
            if range.end.is_some_and(|end| block.sequence_id > end) {
                break 'pages;
            }
            walker.observe(block);
            cursor = block.sequence_id + 1;
        }

        if !full {
            break;
        }
    }

    let report = walker.finish();
    debug!(
        checked = report.checked,
        findings = report.findings.len(),
        gaps = report.gaps.len(),
        passed = report.passed,
        "ledger verification finished"
    );
    Ok(report)
}
