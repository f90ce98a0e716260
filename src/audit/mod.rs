//! Integrity Audit Log
//!
//! Append-only record of hash generations, validations and violations,
//! delivered to a SQLite table or a JSONL file.

pub mod entry;
pub mod logger;
pub mod store;
pub mod verify;

pub use entry::{AuditEventType, AuditOutcome, IntegrityAuditEntry};
pub use logger::IntegrityAuditLog;
pub use store::JsonlAuditStore;
pub use verify::{verify_audit_log_file, verify_entries, VerificationResult};
