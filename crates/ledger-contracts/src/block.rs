//! Block types for the audit ledger.
//!
//! An `AuditEntry` is what a caller asks to record. The writer seals it into
//! a `NewBlock` by fixing its timestamp and hash-linking it to the chain tip,
//! and the store turns that into a `Block` by assigning a sequence id.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{LedgerError, LedgerResult};

/// The sentinel `prev_hash` of the first block ever appended.
///
/// 64 hex zeros, the same length as a SHA-256 hex digest.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Render a timestamp the way it is hashed and persisted.
///
/// Always millisecond precision with a `Z` suffix, e.g.
/// `2026-10-18T09:15:02.114Z`.
pub fn canonical_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a persisted RFC-3339 timestamp back into UTC.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|ts| ts.with_timezone(&Utc))
}

/// One audited event as submitted by a privileged-action handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Who performed the action (username, `"system"`, …).
    pub actor: String,
    /// Short label of what happened, e.g. `"ROLE_CHANGE"`.
    pub action: String,
    /// Free-text payload. May be empty; a missing or `null` value reads as `""`.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub details: String,
}

fn null_as_empty<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Option::<String>::deserialize(d).map(Option::unwrap_or_default)
}

impl AuditEntry {
    pub fn new(
        actor: impl Into<String>,
        action: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            actor: actor.into(),
            action: action.into(),
            details: details.into(),
        }
    }

    /// Reject entries whose `actor` or `action` is blank.
    ///
    /// Runs before any hashing so a malformed entry never reaches the store.
    pub fn validate(&self) -> LedgerResult<()> {
        if self.actor.trim().is_empty() {
            return Err(LedgerError::invalid("actor", "must not be empty"));
        }
        if self.action.trim().is_empty() {
            return Err(LedgerError::invalid("action", "must not be empty"));
        }
        Ok(())
    }
}

/// A sealed block that has not been assigned a sequence id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBlock {
    pub actor: String,
    pub action: String,
    pub details: String,
    pub timestamp: DateTime<Utc>,
    pub prev_hash: String,
    pub hash: String,
}

impl NewBlock {
    /// Attach the store-assigned sequence id.
    pub fn into_block(self, sequence_id: u64) -> Block {
        Block {
            sequence_id,
            timestamp: self.timestamp,
            actor: self.actor,
            action: self.action,
            details: self.details,
            hash: self.hash,
            prev_hash: self.prev_hash,
        }
    }
}

/// One immutable, hash-linked row of the ledger.
///
/// Serializes with the field names the portal has always exposed:
/// `id, timestamp, actor, action, details, hash, prev_hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Store-assigned position in the chain, starting at 1.
    #[serde(rename = "id")]
    pub sequence_id: u64,

    /// Append time, millisecond precision.
    #[serde(with = "timestamp_format")]
    pub timestamp: DateTime<Utc>,

    pub actor: String,
    pub action: String,
    pub details: String,

    /// SHA-256 (hex) of this block's length-prefixed fields.
    pub hash: String,

    /// `hash` of the preceding block, or `GENESIS_HASH`.
    pub prev_hash: String,
}

impl Block {
    pub fn is_genesis(&self) -> bool {
        self.prev_hash == GENESIS_HASH
    }
}

mod timestamp_format {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::canonical_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}
