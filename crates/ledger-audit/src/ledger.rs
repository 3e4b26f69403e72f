//! The `Ledger` facade: one store, one writer, and the read surface.

use std::sync::Arc;

use chrono::Utc;

use ledger_contracts::{
    AuditEntry, Block, BlockQuery, ChainPolicy, LedgerResult, SequenceRange, VerificationReport,
    GENESIS_HASH,
};
use ledger_core::{AuditSink, LedgerStore};

use crate::{
    export::LedgerExport,
    reader::{verify_store, Blocks, DEFAULT_PAGE_SIZE},
    writer::{LedgerWriter, WriterOptions, WriterWorker},
};

/// Settings shared by the write and read paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerOptions {
    pub writer: WriterOptions,
    /// Cascade policy used when `verify` is not given one explicitly.
    pub policy: ChainPolicy,
    /// Blocks fetched per store read.
    pub page_size: usize,
}

impl Default for LedgerOptions {
    fn default() -> Self {
        Self {
            writer: WriterOptions::default(),
            policy: ChainPolicy::default(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// A running audit ledger.
///
/// Cloning is cheap and every clone appends through the same worker. Read
/// methods block on the store; call them from `spawn_blocking` in async code.
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn LedgerStore>,
    writer: LedgerWriter,
    policy: ChainPolicy,
    page_size: usize,
}

impl Ledger {
    /// Start the append worker over `store`.
    ///
    /// The returned `WriterWorker` may be joined after every clone of the
    /// ledger is dropped, or simply dropped to detach it.
    pub fn start(
        store: Arc<dyn LedgerStore>,
        options: LedgerOptions,
    ) -> LedgerResult<(Self, WriterWorker)> {
        let (writer, worker) = LedgerWriter::spawn(Arc::clone(&store), options.writer)?;
        let ledger = Self {
            store,
            writer,
            policy: options.policy,
            page_size: options.page_size.max(1),
        };
        Ok((ledger, worker))
    }

    pub fn store(&self) -> Arc<dyn LedgerStore> {
        Arc::clone(&self.store)
    }

    pub fn policy(&self) -> ChainPolicy {
        self.policy
    }

    /// Append one audited event through the single writer.
    pub async fn append(
        &self,
        actor: impl Into<String>,
        action: impl Into<String>,
        details: impl Into<String>,
    ) -> LedgerResult<Block> {
        self.writer.append(actor, action, details).await
    }

    /// Operational test hook; identical contract to `append`.
    pub async fn append_test_event(
        &self,
        actor: impl Into<String>,
        action: impl Into<String>,
        details: impl Into<String>,
    ) -> LedgerResult<Block> {
        self.append(actor, action, details).await
    }

    /// Lazily list blocks matching `query`, oldest first.
    pub fn list_blocks(&self, query: BlockQuery) -> Blocks {
        Blocks::new(self.store(), query, self.page_size)
    }

    /// Verify `range` (default: the whole chain) with the configured policy.
    pub fn verify(&self, range: Option<SequenceRange>) -> LedgerResult<VerificationReport> {
        self.verify_with(range, self.policy)
    }

    pub fn verify_with(
        &self,
        range: Option<SequenceRange>,
        policy: ChainPolicy,
    ) -> LedgerResult<VerificationReport> {
        verify_store(
            self.store.as_ref(),
            range.unwrap_or_default(),
            policy,
            self.page_size,
        )
    }

    pub fn count(&self) -> LedgerResult<u64> {
        self.store.count()
    }

    /// Snapshot the blocks matching `query` together with a full-chain
    /// verification report.
    pub fn export(&self, query: BlockQuery) -> LedgerResult<LedgerExport> {
        let blocks = self.list_blocks(query).collect::<LedgerResult<Vec<_>>>()?;
        let report = self.verify(None)?;
        let terminal_hash = report
            .head_hash
            .clone()
            .unwrap_or_else(|| GENESIS_HASH.to_string());

        Ok(LedgerExport {
            exported_at: Utc::now(),
            block_count: blocks.len(),
            terminal_hash,
            blocks,
            report,
        })
    }
}

impl AuditSink for Ledger {
    async fn record(&self, entry: AuditEntry) -> LedgerResult<Block> {
        self.writer.submit(entry).await
    }
}
