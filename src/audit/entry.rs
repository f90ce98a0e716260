//! Integrity Audit Entry
//!
//! One append-only record of a hash generation, validation or violation.
//! Each entry carries a digest of its own canonical form so edits to a
//! persisted entry are detectable.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::crypto::sha256_hex;
use crate::error::BaselineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventType {
    HashGenerated,
    HashValidated,
    HashViolation,
}

impl AuditEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HashGenerated => "HASH_GENERATED",
            Self::HashValidated => "HASH_VALIDATED",
            Self::HashViolation => "HASH_VIOLATION",
        }
    }
}

impl fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditEventType {
    type Err = BaselineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HASH_GENERATED" => Ok(Self::HashGenerated),
            "HASH_VALIDATED" => Ok(Self::HashValidated),
            "HASH_VIOLATION" => Ok(Self::HashViolation),
            other => Err(BaselineError::SerializationError(format!(
                "Unknown audit event type: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditOutcome {
    Success,
    Failure,
}

impl AuditOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
        }
    }
}

impl FromStr for AuditOutcome {
    type Err = BaselineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUCCESS" => Ok(Self::Success),
            "FAILURE" => Ok(Self::Failure),
            other => Err(BaselineError::SerializationError(format!(
                "Unknown audit outcome: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityAuditEntry {
    pub id: Uuid,
    pub budget_id: Uuid,
    pub event_type: AuditEventType,
    pub approval_hash: Option<String>,
    pub execution_hash: Option<String>,
    pub actor: Uuid,
    pub timestamp: DateTime<Utc>,
    pub outcome: AuditOutcome,
    pub detail: Option<String>,
    pub algorithm: String,
    pub entry_hash: String,
}

impl IntegrityAuditEntry {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        budget_id: Uuid,
        event_type: AuditEventType,
        approval_hash: Option<String>,
        execution_hash: Option<String>,
        actor: Uuid,
        timestamp: DateTime<Utc>,
        outcome: AuditOutcome,
        detail: Option<String>,
        algorithm: &str,
    ) -> Self {
        let mut entry = Self {
            id: Uuid::new_v4(),
            budget_id,
            event_type,
            approval_hash,
            execution_hash,
            actor,
            timestamp,
            outcome,
            detail,
            algorithm: algorithm.to_string(),
            entry_hash: String::new(),
        };
        entry.entry_hash = entry.calculate_hash();
        entry
    }

    /// Canonical string representation for hashing
    pub fn canonical_string(&self) -> String {
        format!(
            "id:{}|budget_id:{}|event_type:{}|approval_hash:{}|execution_hash:{}|actor:{}|timestamp:{}|outcome:{}|detail:{}|algorithm:{}",
            self.id,
            self.budget_id,
            self.event_type,
            self.approval_hash.as_deref().unwrap_or(""),
            self.execution_hash.as_deref().unwrap_or(""),
            self.actor,
            self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
            self.outcome.as_str(),
            self.detail.as_deref().unwrap_or(""),
            self.algorithm
        )
    }

    pub fn calculate_hash(&self) -> String {
        sha256_hex(self.canonical_string())
    }

    pub fn verify_hash(&self) -> bool {
        self.entry_hash == self.calculate_hash()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} {} for budget {} by {}",
            self.event_type,
            self.outcome.as_str(),
            self.budget_id,
            self.actor
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> IntegrityAuditEntry {
        IntegrityAuditEntry::new(
            Uuid::new_v4(),
            AuditEventType::HashGenerated,
            Some(sha256_hex("approval")),
            Some(sha256_hex("execution")),
            Uuid::new_v4(),
            Utc::now(),
            AuditOutcome::Success,
            None,
            "SHA-256-v1",
        )
    }

    #[test]
    fn test_entry_hash_verifies() {
        let entry = entry();
        assert!(entry.verify_hash());
        assert_eq!(entry.entry_hash.len(), 64);
    }

    #[test]
    fn test_tampered_entry_detected() {
        let mut entry = entry();
        entry.outcome = AuditOutcome::Failure;
        assert!(!entry.verify_hash());
    }

    #[test]
    fn test_json_uses_wire_labels() {
        let json = serde_json::to_string(&entry()).unwrap();
        assert!(json.contains("\"HASH_GENERATED\""));
        assert!(json.contains("\"SUCCESS\""));

        let parsed: IntegrityAuditEntry = serde_json::from_str(&json).unwrap();
        assert!(parsed.verify_hash());
    }

    #[test]
    fn test_labels_parse() {
        assert_eq!(
            "HASH_VIOLATION".parse::<AuditEventType>().unwrap(),
            AuditEventType::HashViolation
        );
        assert!("HASH_LOST".parse::<AuditEventType>().is_err());
        assert_eq!("FAILURE".parse::<AuditOutcome>().unwrap(), AuditOutcome::Failure);
    }
}
