//! Budget integrity sealing
//!
//! Deterministic hashing of a budget and its line tree, the seal transition,
//! and the validation flow that detects tampering after approval.

pub mod line_hash;
pub mod metrics;
pub mod service;
pub mod validator;
pub mod violation;

pub use line_hash::{canonical_decimal, hash_line, lines_merkle_root};
pub use metrics::{HashOperation, IntegrityMetrics, MetricsSnapshot};
pub use service::BudgetIntegrityService;
pub use validator::IntegrityValidator;
pub use violation::{IntegrityViolation, ViolationType};
