//! Error types for the audit ledger.
//!
//! All fallible ledger operations return `LedgerResult<T>`. Verification
//! findings are deliberately absent here: a broken chain is reported through
//! `VerificationReport`, not through an error.

use thiserror::Error;

/// The unified error type for the ledger crates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// An append request was rejected before hashing.
    #[error("invalid {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    /// The backing store could not be opened, read, or written.
    #[error("ledger store unavailable: {reason}")]
    StoreUnavailable { reason: String },

    /// A stored row exists but cannot be decoded into a `Block`.
    #[error("corrupt ledger record {sequence_id}: {reason}")]
    CorruptRecord { sequence_id: u64, reason: String },

    /// The store refused an insert because the chain tip moved.
    ///
    /// `expected` is the tip hash the new block was chained from, `found` is
    /// the tip hash the store actually holds.
    #[error("stale chain tip: block was chained from {expected} but the tip is {found}")]
    StaleTip { expected: String, found: String },

    /// The append worker has shut down and no longer accepts requests.
    #[error("ledger writer is closed")]
    WriterClosed,

    /// A privileged action completed but its ledger entry could not be written.
    ///
    /// Under the strict audit contract the action is reported as failed.
    #[error("audit write failed for action '{action}': {reason}")]
    AuditWriteFailed { action: String, reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// The HTTP listener could not be bound or stopped unexpectedly.
    #[error("server error: {reason}")]
    ServerError { reason: String },

    /// A read did not finish within its time budget.
    #[error("{operation} timed out after {timeout_ms} ms")]
    Timeout { operation: String, timeout_ms: u64 },
}

impl LedgerError {
    /// Shorthand for `InvalidInput`.
    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        LedgerError::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Shorthand for `StoreUnavailable` from any displayable cause.
    pub fn store(reason: impl std::fmt::Display) -> Self {
        LedgerError::StoreUnavailable {
            reason: reason.to_string(),
        }
    }
}

/// Convenience alias used throughout the ledger crates.
pub type LedgerResult<T> = Result<T, LedgerError>;
