//! # ledger-core
//!
//! The seams of the barangay audit ledger.
//!
//! This crate provides:
//! - `LedgerStore`, the durable ordered table the writer appends to
//! - `AuditSink`, the append trigger privileged-action handlers call
//! - `AuditedAction`, which binds an action to its audit write under the
//!   strict contract (no trail, no success)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ledger_core::AuditedAction;
//!
//! let guard = AuditedAction::new(writer.clone());
//! let (account, block) = guard
//!     .run(AuditEntry::new("admin", "ROLE_CHANGE", "resident->admin"), change_role(id))
//!     .await?;
//! ```

pub mod executor;
pub mod traits;

pub use executor::AuditedAction;
pub use traits::{AuditSink, LedgerStore};
