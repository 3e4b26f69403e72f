//! Strict audited execution of privileged actions.
//!
//! `AuditedAction` runs a privileged action and then records it:
//!
//!   Validate entry → Run action → Append block
//!
//! The contract is strict. An action whose ledger entry cannot be written is
//! reported to the caller as failed, so an audited action never succeeds
//! without a trail.

use std::future::Future;

use tracing::{debug, error};

use ledger_contracts::{AuditEntry, Block, LedgerError};

use crate::traits::AuditSink;

/// Wraps an `AuditSink` and enforces the strict audit contract.
pub struct AuditedAction<S> {
    sink: S,
}

impl<S: AuditSink> AuditedAction<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    /// Run `action` and record `entry` if it succeeds.
    ///
    /// # Pipeline
    ///
    /// 1. Validate `entry`. A malformed entry fails fast and `action` is
    ///    never polled.
    /// 2. Await `action`. Its error is returned unchanged and nothing is
    ///    recorded, since nothing happened.
    /// 3. Append `entry`. On failure the result is
    ///    `LedgerError::AuditWriteFailed`, converted into `E`.
    ///
    /// Returns the action's value together with the committed block.
    pub async fn run<T, E, F>(&self, entry: AuditEntry, action: F) -> Result<(T, Block), E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<LedgerError>,
    {
        entry.validate()?;

        let value = action.await?;

        debug!(actor = %entry.actor, action = %entry.action, "privileged action completed; recording");

        let action_label = entry.action.clone();
        match self.sink.record(entry).await {
            Ok(block) => Ok((value, block)),
            Err(e) => {
                error!(
                    action = %action_label,
                    error = %e,
                    "privileged action completed but its audit entry was not written"
                );
                Err(E::from(LedgerError::AuditWriteFailed {
                    action: action_label,
                    reason: e.to_string(),
                }))
            }
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}
