//! Chain verification report types.
//!
//! A verification walk never fails because the chain is broken. It always
//! produces a `VerificationReport`, and callers decide what a finding means.

use serde::{Deserialize, Serialize};

/// How the verifier advances its expected `prev_hash` after each block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChainPolicy {
    /// Continue from the block's stored `hash`. A single corrupted block is
    /// flagged once.
    #[default]
    StoredHash,

    /// Continue from a hash rebuilt from genesis. Every block after a
    /// corrupted one is also flagged as a link break.
    Recomputed,
}

impl std::str::FromStr for ChainPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stored-hash" => Ok(ChainPolicy::StoredHash),
            "recomputed" => Ok(ChainPolicy::Recomputed),
            other => Err(format!(
                "unknown chain policy '{}' (expected 'stored-hash' or 'recomputed')",
                other
            )),
        }
    }
}

/// What was wrong with a flagged block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    /// `prev_hash` does not match the preceding block's hash.
    LinkBreak,
    /// The stored `hash` does not match a recomputation of the block's fields.
    ContentTamper,
    /// Both of the above.
    Both,
}

impl FindingKind {
    /// Combine the two independent checks into a kind, if either failed.
    pub fn from_checks(link_break: bool, content_tamper: bool) -> Option<Self> {
        match (link_break, content_tamper) {
            (true, true) => Some(FindingKind::Both),
            (true, false) => Some(FindingKind::LinkBreak),
            (false, true) => Some(FindingKind::ContentTamper),
            (false, false) => None,
        }
    }

    pub fn is_link_break(self) -> bool {
        matches!(self, FindingKind::LinkBreak | FindingKind::Both)
    }

    pub fn is_content_tamper(self) -> bool {
        matches!(self, FindingKind::ContentTamper | FindingKind::Both)
    }
}

/// A single flagged block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub sequence_id: u64,
    pub kind: FindingKind,
}

/// A hole in the sequence ids, i.e. rows that were removed out of band.
///
/// `missing_from..=missing_to` are the ids that should exist but do not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceGap {
    pub missing_from: u64,
    pub missing_to: u64,
}

/// The outcome of one verification walk.
///
/// Contains no wall-clock fields, so verifying an unchanged chain twice
/// yields equal reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// True only if there are no findings and no gaps.
    pub passed: bool,
    /// The cascade policy used for this walk.
    pub policy: ChainPolicy,
    /// Number of blocks examined.
    pub checked: u64,
    /// Flagged blocks in ascending sequence order.
    pub findings: Vec<Finding>,
    /// Sequence gaps in ascending order.
    pub gaps: Vec<SequenceGap>,
    /// Stored hash of the last examined block, if any.
    pub head_hash: Option<String>,
}

impl VerificationReport {
    pub fn link_breaks(&self) -> impl Iterator<Item = u64> + '_ {
        self.findings
            .iter()
            .filter(|f| f.kind.is_link_break())
            .map(|f| f.sequence_id)
    }

    pub fn content_tampers(&self) -> impl Iterator<Item = u64> + '_ {
        self.findings
            .iter()
            .filter(|f| f.kind.is_content_tamper())
            .map(|f| f.sequence_id)
    }
}
