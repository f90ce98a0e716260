//! In-process counters and structured events for hash computations.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashOperation {
    Approval,
    Execution,
}

impl HashOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approval => "approval_hash",
            Self::Execution => "execution_hash",
        }
    }
}

#[derive(Debug, Default)]
pub struct IntegrityMetrics {
    approval_hashes: AtomicU64,
    execution_hashes: AtomicU64,
    hash_failures: AtomicU64,
    validations: AtomicU64,
    violations: AtomicU64,
    audit_failures: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub approval_hashes: u64,
    pub execution_hashes: u64,
    pub hash_failures: u64,
    pub validations: u64,
    pub violations: u64,
    pub audit_failures: u64,
}

impl IntegrityMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hash(
        &self,
        operation: HashOperation,
        correlation_id: Uuid,
        budget_id: Uuid,
        line_count: usize,
        elapsed: Duration,
    ) {
        let counter = match operation {
            HashOperation::Approval => &self.approval_hashes,
            HashOperation::Execution => &self.execution_hashes,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        info!(
            operation = operation.as_str(),
            %correlation_id,
            %budget_id,
            line_count,
            duration_ms = elapsed.as_millis() as u64,
            "Integrity hash computed"
        );
    }

    pub fn record_hash_failure(
        &self,
        operation: HashOperation,
        correlation_id: Uuid,
        budget_id: Uuid,
        reason: &str,
    ) {
        self.hash_failures.fetch_add(1, Ordering::Relaxed);
        error!(
            operation = operation.as_str(),
            %correlation_id,
            %budget_id,
            reason,
            "Integrity hash computation failed"
        );
    }

    pub fn record_validation(&self, valid: bool) {
        self.validations.fetch_add(1, Ordering::Relaxed);
        if !valid {
            self.violations.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_audit_failure(&self) {
        self.audit_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            approval_hashes: self.approval_hashes.load(Ordering::Relaxed),
            execution_hashes: self.execution_hashes.load(Ordering::Relaxed),
            hash_failures: self.hash_failures.load(Ordering::Relaxed),
            validations: self.validations.load(Ordering::Relaxed),
            violations: self.violations.load(Ordering::Relaxed),
            audit_failures: self.audit_failures.load(Ordering::Relaxed),
        }
    }
}
