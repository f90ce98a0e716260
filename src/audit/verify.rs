//! Audit Log Verification
//!
//! Structural checks over a loaded integrity audit log.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{info, warn};

use crate::audit::entry::{AuditEventType, AuditOutcome, IntegrityAuditEntry};
use crate::audit::store::load_entries;
use crate::error::BaselineError;

/// Verification result with detailed information
#[derive(Debug, Clone, Default)]
pub struct VerificationResult {
    pub entry_count: usize,
    pub tampered_entries: Vec<usize>,
    pub duplicate_ids: Vec<usize>,
    pub out_of_order: Vec<usize>,
    /// HASH_VIOLATION entries not marked FAILURE, or HASH_GENERATED
    /// entries without an approval hash.
    pub malformed_events: Vec<usize>,
    pub event_counts: HashMap<AuditEventType, usize>,
}

impl VerificationResult {
    pub fn is_valid(&self) -> bool {
        self.tampered_entries.is_empty()
            && self.duplicate_ids.is_empty()
            && self.out_of_order.is_empty()
            && self.malformed_events.is_empty()
    }

    pub fn summary(&self) -> String {
        if self.is_valid() {
            format!("Audit log is valid ({} entries)", self.entry_count)
        } else {
            format!(
                "Audit log is invalid ({} entries): {} tampered, {} duplicate ids, {} out of order, {} malformed",
                self.entry_count,
                self.tampered_entries.len(),
                self.duplicate_ids.len(),
                self.out_of_order.len(),
                self.malformed_events.len()
            )
        }
    }

    pub fn detailed_status(&self) -> String {
        let mut counts: Vec<String> = self
            .event_counts
            .iter()
            .map(|(event, count)| format!("  {}: {}", event, count))
            .collect();
        counts.sort();
        format!(
            "Entries: {}\nTampered: {:?}\nDuplicate ids: {:?}\nOut of order: {:?}\nMalformed: {:?}\nEvents:\n{}",
            self.entry_count,
            self.tampered_entries,
            self.duplicate_ids,
            self.out_of_order,
            self.malformed_events,
            counts.join("\n")
        )
    }
}

pub fn verify_entries(entries: &[IntegrityAuditEntry]) -> VerificationResult {
    let mut result = VerificationResult {
        entry_count: entries.len(),
        ..Default::default()
    };
    let mut seen = HashSet::new();

    for (i, entry) in entries.iter().enumerate() {
        *result.event_counts.entry(entry.event_type).or_insert(0) += 1;

        if !entry.verify_hash() {
            result.tampered_entries.push(i);
        }
        if !seen.insert(entry.id) {
            result.duplicate_ids.push(i);
        }
        if i > 0 && entry.timestamp < entries[i - 1].timestamp {
            result.out_of_order.push(i);
        }

        let malformed = match entry.event_type {
            AuditEventType::HashViolation => entry.outcome != AuditOutcome::Failure,
            AuditEventType::HashGenerated => entry.approval_hash.is_none(),
            AuditEventType::HashValidated => false,
        };
        if malformed {
            result.malformed_events.push(i);
        }
    }

    if result.is_valid() {
        info!("Audit log verification successful: {} entries", entries.len());
    } else {
        warn!("{}", result.summary());
    }
    result
}

pub fn verify_audit_log_file(path: &Path) -> Result<VerificationResult, BaselineError> {
    info!("Verifying audit log file: {}", path.display());
    if !path.exists() {
        return Err(BaselineError::AuditError(format!(
            "Audit log file does not exist: {}",
            path.display()
        )));
    }
    let entries = load_entries(path)?;
    Ok(verify_entries(&entries))
}
