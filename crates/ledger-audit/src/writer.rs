//! The single ledger writer.
//!
//! Reading the tip and inserting the next block is not atomic, so concurrent
//! appends must never run that sequence side by side. `LedgerWriter` funnels
//! every append through a bounded channel to one worker thread, which runs
//! each append to completion before taking the next. The store's own
//! compare-and-swap on the tip catches writers in other processes; the
//! worker retries those conflicts a bounded number of times.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use chrono::{DateTime, SubsecRound, Utc};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use ledger_contracts::{AuditEntry, Block, LedgerError, LedgerResult, GENESIS_HASH};
use ledger_core::{AuditSink, LedgerStore};

use crate::chain::seal_block;

/// Tuning for the append worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterOptions {
    /// Requests that may wait in the queue before senders are held back.
    pub queue_capacity: usize,
    /// Extra attempts after the store reports a stale tip.
    pub max_retries: u32,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            max_retries: 3,
        }
    }
}

/// The current time truncated to what a block can represent.
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Append one entry directly against `store`.
///
/// This is the unsynchronized read-tip-then-insert step. Callers that may
/// run concurrently must go through `LedgerWriter` instead.
pub fn append_block(
    store: &dyn LedgerStore,
    entry: &AuditEntry,
    max_retries: u32,
) -> LedgerResult<Block> {
    append_block_with_clock(store, entry, max_retries, now_millis)
}

/// `append_block` with an injectable clock.
///
/// The timestamp never goes backwards: if the clock reads earlier than the
/// tip, the tip's timestamp is reused.
pub fn append_block_with_clock(
    store: &dyn LedgerStore,
    entry: &AuditEntry,
    max_retries: u32,
    clock: impl Fn() -> DateTime<Utc>,
) -> LedgerResult<Block> {
    entry.validate()?;

    let mut attempt = 0;
    loop {
        let latest = store.latest()?;
        let (prev_hash, floor) = match &latest {
            Some(tip) => (tip.hash.as_str(), Some(tip.timestamp)),
            None => (GENESIS_HASH, None),
        };

        let now = clock();
        let timestamp = floor.map_or(now, |floor| now.max(floor));
        let sealed = seal_block(entry, prev_hash, timestamp);

        match store.insert(&sealed) {
            Err(LedgerError::StaleTip { expected, found }) if attempt < max_retries => {
                attempt += 1;
                warn!(
                    attempt,
                    expected = %expected,
                    found = %found,
                    "ledger tip moved during append; retrying"
                );
            }
            result => return result,
        }
    }
}

struct AppendRequest {
    entry: AuditEntry,
    reply: oneshot::Sender<LedgerResult<Block>>,
}

/// Handle to the append worker. Cheap to clone; every clone feeds the same
/// queue.
///
/// When the last handle is dropped the queue closes, the worker finishes any
/// requests already queued, and its thread exits.
#[derive(Clone)]
pub struct LedgerWriter {
    tx: mpsc::Sender<AppendRequest>,
}

/// The worker thread behind a `LedgerWriter`.
pub struct WriterWorker {
    handle: JoinHandle<u64>,
}

impl WriterWorker {
    /// Wait for the worker to exit and return how many blocks it appended.
    ///
    /// Only returns once every `LedgerWriter` clone has been dropped.
    pub fn join(self) -> LedgerResult<u64> {
        self.handle
            .join()
            .map_err(|_| LedgerError::store("ledger writer thread panicked"))
    }
}

impl LedgerWriter {
    /// Start the worker thread over `store`.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the OS refuses to spawn the thread.
    pub fn spawn(
        store: Arc<dyn LedgerStore>,
        options: WriterOptions,
    ) -> LedgerResult<(Self, WriterWorker)> {
        let (tx, rx) = mpsc::channel(options.queue_capacity.max(1));
        let max_retries = options.max_retries;

        let handle = thread::Builder::new()
            .name("ledger-writer".to_string())
            .spawn(move || run_worker(store, rx, max_retries))
            .map_err(|e| LedgerError::store(format!("failed to start ledger writer: {}", e)))?;

        debug!(queue_capacity = options.queue_capacity, max_retries, "ledger writer started");

        Ok((Self { tx }, WriterWorker { handle }))
    }

    /// Append one event and wait until its block is committed.
    pub async fn append(
        &self,
        actor: impl Into<String>,
        action: impl Into<String>,
        details: impl Into<String>,
    ) -> LedgerResult<Block> {
        self.submit(AuditEntry::new(actor, action, details)).await
    }

    /// Queue a prepared entry and wait for the worker's answer.
    ///
    /// Invalid entries are rejected here, before they take a queue slot.
    pub async fn submit(&self, entry: AuditEntry) -> LedgerResult<Block> {
        entry.validate()?;

        let (reply, answer) = oneshot::channel();
        self.tx
            .send(AppendRequest { entry, reply })
            .await
            .map_err(|_| LedgerError::WriterClosed)?;

        answer.await.map_err(|_| LedgerError::WriterClosed)?
    }
}

impl AuditSink for LedgerWriter {
    async fn record(&self, entry: AuditEntry) -> LedgerResult<Block> {
        self.submit(entry).await
    }
}

fn run_worker(
    store: Arc<dyn LedgerStore>,
    mut rx: mpsc::Receiver<AppendRequest>,
    max_retries: u32,
) -> u64 {
    let mut appended = 0;

    while let Some(AppendRequest { entry, reply }) = rx.blocking_recv() {
        let result = append_block(store.as_ref(), &entry, max_retries);

        match &result {
            Ok(block) => {
                appended += 1;
                info!(
                    sequence_id = block.sequence_id,
                    actor = %block.actor,
                    action = %block.action,
                    hash = %block.hash,
                    "ledger block appended"
                );
            }
            Err(e) => {
                error!(
                    actor = %entry.actor,
                    action = %entry.action,
                    error = %e,
                    "failed to append ledger block"
                );
            }
        }

        // The caller may have stopped waiting; the block is committed either way.
        let _ = reply.send(result);
    }

    debug!(appended, "ledger writer queue closed; worker exiting");
    appended
}
