//! Integrity violation raised when a sealed budget no longer matches its seal.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Number of hash characters shown in messages.
const DISPLAY_HASH_CHARS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationType {
    TamperingDetected,
    StructureModificationAttempted,
    HashMismatch,
}

impl ViolationType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::TamperingDetected => "Tampering detected",
            Self::StructureModificationAttempted => "Structure modification attempted",
            Self::HashMismatch => "Hash mismatch",
        }
    }
}

impl fmt::Display for ViolationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityViolation {
    pub budget_id: Uuid,
    pub expected_hash: String,
    pub actual_hash: String,
    pub violation_type: ViolationType,
}

impl IntegrityViolation {
    pub fn new(
        budget_id: Uuid,
        expected_hash: impl Into<String>,
        actual_hash: impl Into<String>,
        violation_type: ViolationType,
    ) -> Self {
        Self {
            budget_id,
            expected_hash: expected_hash.into(),
            actual_hash: actual_hash.into(),
            violation_type,
        }
    }

    pub fn tampering(budget_id: Uuid, expected_hash: &str, actual_hash: &str) -> Self {
        Self::new(
            budget_id,
            expected_hash,
            actual_hash,
            ViolationType::TamperingDetected,
        )
    }

    /// A mutation was attempted on the structure of a sealed budget.
    /// Both hashes are the current seal since nothing was recomputed.
    pub fn structure_modification(budget_id: Uuid, approval_hash: &str) -> Self {
        Self::new(
            budget_id,
            approval_hash,
            approval_hash,
            ViolationType::StructureModificationAttempted,
        )
    }
}

fn truncate(hash: &str) -> &str {
    match hash.char_indices().nth(DISPLAY_HASH_CHARS) {
        Some((idx, _)) => &hash[..idx],
        None => hash,
    }
}

impl fmt::Display for IntegrityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Budget integrity violation on {}: {} (expected {}..., actual {}...)",
            self.budget_id,
            self.violation_type,
            truncate(&self.expected_hash),
            truncate(&self.actual_hash)
        )
    }
}

impl std::error::Error for IntegrityViolation {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::sha256_hex;

    #[test]
    fn test_display_truncates_hashes() {
        let expected = sha256_hex("sealed");
        let actual = sha256_hex("tampered");
        let violation = IntegrityViolation::tampering(Uuid::new_v4(), &expected, &actual);
        let message = violation.to_string();

        assert!(message.contains("Tampering detected"));
        assert!(message.contains(&expected[..16]));
        assert!(!message.contains(&expected[..17]));
        assert!(message.contains(&actual[..16]));
    }

    #[test]
    fn test_short_hash_not_padded() {
        assert_eq!(truncate("abc"), "abc");
    }
}
