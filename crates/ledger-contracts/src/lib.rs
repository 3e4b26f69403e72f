//! # ledger-contracts
//!
//! Shared types for the barangay audit ledger.
//!
//! Every other crate in the workspace imports from here. No hashing, storage,
//! or I/O lives in this crate, only data definitions, input validation, and
//! the error type.

pub mod block;
pub mod error;
pub mod query;
pub mod verify;

pub use block::{canonical_timestamp, parse_timestamp, AuditEntry, Block, NewBlock, GENESIS_HASH};
pub use error::{LedgerError, LedgerResult};
pub use query::{BlockQuery, SequenceRange, SortOrder};
pub use verify::{ChainPolicy, Finding, FindingKind, SequenceGap, VerificationReport};

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::*;

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn block(sequence_id: u64, actor: &str, action: &str) -> Block {
        Block {
            sequence_id,
            timestamp: Utc.with_ymd_and_hms(2026, 3, 14, 8, 30, 0).unwrap(),
            actor: actor.to_string(),
            action: action.to_string(),
            details: String::new(),
            hash: "ab12cd34".repeat(8),
            prev_hash: GENESIS_HASH.to_string(),
        }
    }

    // ── AuditEntry validation ────────────────────────────────────────────────

    #[test]
    fn entry_with_actor_and_action_is_valid() {
        let entry = AuditEntry::new("alice", "ROLE_CHANGE", "");
        assert!(entry.validate().is_ok(), "empty details are permitted");
    }

    #[test]
    fn blank_actor_is_rejected() {
        let err = AuditEntry::new("   ", "ROLE_CHANGE", "x").validate().unwrap_err();
        assert_eq!(
            err,
            LedgerError::InvalidInput {
                field: "actor".to_string(),
                reason: "must not be empty".to_string(),
            }
        );
    }

    #[test]
    fn blank_action_is_rejected() {
        let err = AuditEntry::new("alice", "", "x").validate().unwrap_err();
        assert!(err.to_string().contains("invalid action"));
    }

    #[test]
    fn entry_details_default_to_empty_when_missing() {
        let entry: AuditEntry =
            serde_json::from_str(r#"{"actor":"bob","action":"PASSWORD_RESET"}"#).unwrap();
        assert_eq!(entry.details, "");
    }

    #[test]
    fn entry_details_default_to_empty_when_null() {
        let entry: AuditEntry =
            serde_json::from_str(r#"{"actor":"admin","action":"TEST","details":null}"#).unwrap();
        assert_eq!(entry.details, "");
        assert!(entry.validate().is_ok());
    }

    // ── Block wire format ────────────────────────────────────────────────────

    #[test]
    fn block_serializes_with_portal_field_names() {
        let json = serde_json::to_value(block(7, "alice", "ROLE_CHANGE")).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["timestamp"], "2026-03-14T08:30:00.000Z");
        assert_eq!(json["prev_hash"], GENESIS_HASH);
        assert!(json.get("sequence_id").is_none());
    }

    #[test]
    fn genesis_hash_has_sha256_hex_length() {
        assert_eq!(GENESIS_HASH.len(), 64);
        assert!(GENESIS_HASH.chars().all(|c| c == '0'));
    }

    // ── BlockQuery ───────────────────────────────────────────────────────────

    #[test]
    fn actor_filter_is_case_insensitive() {
        let q = BlockQuery::new().actor("ALI");
        assert!(q.matches(&block(1, "alice", "LOGIN")));
        assert!(!q.matches(&block(2, "bob", "LOGIN")));
    }

    #[test]
    fn search_matches_actor_action_or_hash() {
        let b = block(1, "kagawad.reyes", "DOCUMENT_ISSUED");
        assert!(BlockQuery::new().search("reyes").matches(&b));
        assert!(BlockQuery::new().search("document").matches(&b));
        assert!(BlockQuery::new().search("cd34ab12").matches(&b));
        assert!(!BlockQuery::new().search("blotter").matches(&b));
    }

    #[test]
    fn date_filters_bound_the_timestamp() {
        let b = block(1, "alice", "LOGIN");
        let day = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        assert!(BlockQuery::new().on(day).matches(&b));
        assert!(!BlockQuery::new().on(day.succ_opt().unwrap()).matches(&b));

        let later = Utc.with_ymd_and_hms(2026, 3, 15, 0, 0, 0).unwrap();
        assert!(!BlockQuery::new().between(Some(later), None).matches(&b));
        assert!(BlockQuery::new().between(None, Some(later)).matches(&b));
    }

    // ── SequenceRange ────────────────────────────────────────────────────────

    #[test]
    fn sequence_range_bounds_are_inclusive() {
        let r = SequenceRange::new(Some(3), Some(5));
        assert!(!r.contains(2));
        assert!(r.contains(3));
        assert!(r.contains(5));
        assert!(!r.contains(6));
        assert!(!r.starts_at_genesis());
        assert!(SequenceRange::all().starts_at_genesis());
    }

    // ── Verification report ──────────────────────────────────────────────────

    #[test]
    fn finding_kind_combines_checks() {
        assert_eq!(FindingKind::from_checks(false, false), None);
        assert_eq!(FindingKind::from_checks(true, false), Some(FindingKind::LinkBreak));
        assert_eq!(FindingKind::from_checks(false, true), Some(FindingKind::ContentTamper));
        assert_eq!(FindingKind::from_checks(true, true), Some(FindingKind::Both));
        assert!(FindingKind::Both.is_link_break());
        assert!(FindingKind::Both.is_content_tamper());
    }

    #[test]
    fn chain_policy_parses_kebab_case() {
        assert_eq!("stored-hash".parse::<ChainPolicy>(), Ok(ChainPolicy::StoredHash));
        assert_eq!("recomputed".parse::<ChainPolicy>(), Ok(ChainPolicy::Recomputed));
        assert!("cascade".parse::<ChainPolicy>().is_err());
    }

    // ── LedgerError display messages ─────────────────────────────────────────

    #[test]
    fn error_stale_tip_display() {
        let err = LedgerError::StaleTip {
            expected: "aaa".to_string(),
            found: "bbb".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("stale chain tip"));
        assert!(msg.contains("aaa"));
        assert!(msg.contains("bbb"));
    }

    #[test]
    fn error_audit_write_failed_display() {
        let err = LedgerError::AuditWriteFailed {
            action: "ROLE_CHANGE".to_string(),
            reason: "disk full".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("ROLE_CHANGE"));
        assert!(msg.contains("disk full"));
    }
}
