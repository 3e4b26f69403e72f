//! Hash-chain primitives: hashing, sealing, and chain integrity verification.
//!
//! Hash input layout (bytes, in order), SHA-256:
//!   1. prev_hash  (64 ASCII hex chars)
//!   2. actor
//!   3. action
//!   4. details
//!   5. timestamp  (canonical RFC-3339 text, millisecond precision)
//!
//! Each field is written as its UTF-8 byte length (8-byte little-endian)
//! followed by its bytes, so no choice of field contents can make two
//! different blocks hash the same input.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::warn;

use ledger_contracts::{
    block::canonical_timestamp, AuditEntry, Block, ChainPolicy, Finding, FindingKind, NewBlock,
    SequenceGap, VerificationReport, GENESIS_HASH,
};

fn update_field(hasher: &mut Sha256, field: &str) {
    hasher.update((field.len() as u64).to_le_bytes());
    hasher.update(field.as_bytes());
}

/// Compute the SHA-256 hash of one block's fields.
///
/// Returns a lowercase 64-character hex string.
pub fn hash_block(
    prev_hash: &str,
    actor: &str,
    action: &str,
    details: &str,
    timestamp: &DateTime<Utc>,
) -> String {
    let mut hasher = Sha256::new();
    update_field(&mut hasher, prev_hash);
    update_field(&mut hasher, actor);
    update_field(&mut hasher, action);
    update_field(&mut hasher, details);
    update_field(&mut hasher, &canonical_timestamp(timestamp));

    hex::encode(hasher.finalize())
}

/// Recompute a stored block's hash from its own fields.
pub fn recompute_hash(block: &Block) -> String {
    rehash_from(&block.prev_hash, block)
}

fn rehash_from(prev_hash: &str, block: &Block) -> String {
    hash_block(
        prev_hash,
        &block.actor,
        &block.action,
        &block.details,
        &block.timestamp,
    )
}

/// Seal `entry` onto a chain whose tip hash is `prev_hash`.
pub fn seal_block(entry: &AuditEntry, prev_hash: &str, timestamp: DateTime<Utc>) -> NewBlock {
    let hash = hash_block(
        prev_hash,
        &entry.actor,
        &entry.action,
        &entry.details,
        &timestamp,
    );

    NewBlock {
        actor: entry.actor.clone(),
        action: entry.action.clone(),
        details: entry.details.clone(),
        timestamp,
        prev_hash: prev_hash.to_string(),
        hash,
    }
}

/// Where a verification walk starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anchor {
    /// The walk starts at the head of the chain. The first block must be
    /// sequence 1 and link to `GENESIS_HASH`.
    Genesis,

    /// The walk starts right after this stored block.
    Block { sequence_id: u64, hash: String },

    /// The block that should precede the walk (`missing_from`) does not
    /// exist. The first block's link cannot be checked and the hole is
    /// reported as a gap.
    Detached { missing_from: u64 },
}

/// Incremental chain verifier.
///
/// Feed blocks in ascending sequence order with `observe`, then call
/// `finish`. Keeps O(findings) memory, so arbitrarily long chains can be
/// verified page by page.
pub struct ChainWalker {
    policy: ChainPolicy,
    expected_prev: Option<String>,
    last_sequence: Option<u64>,
    detached_from: Option<u64>,
    checked: u64,
    findings: Vec<Finding>,
    gaps: Vec<SequenceGap>,
    head_hash: Option<String>,
}

impl ChainWalker {
    pub fn new(anchor: Anchor, policy: ChainPolicy) -> Self {
        let (expected_prev, last_sequence, detached_from) = match anchor {
            Anchor::Genesis => (Some(GENESIS_HASH.to_string()), Some(0), None),
            Anchor::Block { sequence_id, hash } => (Some(hash), Some(sequence_id), None),
            Anchor::Detached { missing_from } => (None, None, Some(missing_from)),
        };

        Self {
            policy,
            expected_prev,
            last_sequence,
            detached_from,
            checked: 0,
            findings: Vec::new(),
            gaps: Vec::new(),
            head_hash: None,
        }
    }

    /// Check one block against the chain state built so far.
    pub fn observe(&mut self, block: &Block) {
        self.check_sequence(block.sequence_id);

        // A detached walk has nothing to compare the first link against.
        let expected_prev = self
            .expected_prev
            .take()
            .unwrap_or_else(|| block.prev_hash.clone());

        let link_break = block.prev_hash != expected_prev;
        let content_tamper = recompute_hash(block) != block.hash;

        if let Some(kind) = FindingKind::from_checks(link_break, content_tamper) {
            warn!(
                sequence_id = block.sequence_id,
                kind = ?kind,
                "ledger block failed verification"
            );
            self.findings.push(Finding {
                sequence_id: block.sequence_id,
                kind,
            });
        }

        self.expected_prev = Some(match self.policy {
            ChainPolicy::StoredHash => block.hash.clone(),
            ChainPolicy::Recomputed => rehash_from(&expected_prev, block),
        });
        self.checked += 1;
        self.head_hash = Some(block.hash.clone());
    }

    fn check_sequence(&mut self, sequence_id: u64) {
        let missing_from = match (self.last_sequence, self.detached_from.take()) {
            (_, Some(missing_from)) => Some(missing_from),
            (Some(last), None) if sequence_id > last + 1 => Some(last + 1),
            _ => None,
        };

        if let Some(missing_from) = missing_from {
            let gap = SequenceGap {
                missing_from,
                missing_to: sequence_id.saturating_sub(1).max(missing_from),
            };
            warn!(
                missing_from = gap.missing_from,
                missing_to = gap.missing_to,
                "ledger sequence gap detected"
            );
            self.gaps.push(gap);
        }

        self.last_sequence = Some(sequence_id);
    }

    pub fn finish(self) -> VerificationReport {
        VerificationReport {
            passed: self.findings.is_empty() && self.gaps.is_empty(),
            policy: self.policy,
            checked: self.checked,
            findings: self.findings,
            gaps: self.gaps,
            head_hash: self.head_hash,
        }
    }
}

/// Verify a complete chain held in memory, starting from genesis.
///
/// An empty chain is valid.
pub fn verify_chain(blocks: &[Block], policy: ChainPolicy) -> VerificationReport {
    let mut walker = ChainWalker::new(Anchor::Genesis, policy);
    for block in blocks {
        walker.observe(block);
    }
    walker.finish()
}
