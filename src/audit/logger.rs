//! Integrity Audit Log
//!
//! Records hash generations, validations and violations. Delivery to the
//! store never fails the caller: store errors are logged, counted and
//! dropped. Entries are either queued to a background dispatcher (outbox)
//! or appended inline under a timeout.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::audit::entry::{AuditEventType, AuditOutcome, IntegrityAuditEntry};
use crate::budget::Budget;
use crate::clock::Clock;
use crate::crypto::ALGORITHM_VERSION;
use crate::error::BaselineError;
use crate::integrity::metrics::IntegrityMetrics;
use crate::integrity::violation::IntegrityViolation;
use crate::repository::AuditStore;

enum AuditSink {
    Inline(Arc<dyn AuditStore>),
    Outbox(mpsc::UnboundedSender<IntegrityAuditEntry>),
    Disabled,
}

/// Upper bound on one inline append before the entry is dropped.
pub const DEFAULT_APPEND_TIMEOUT: Duration = Duration::from_secs(5);

pub struct IntegrityAuditLog {
    sink: AuditSink,
    clock: Arc<dyn Clock>,
    metrics: Arc<IntegrityMetrics>,
    append_timeout: Duration,
}

impl IntegrityAuditLog {
    /// Append entries directly to `store` after the primary commit.
    ///
    /// Each append is bounded by [`DEFAULT_APPEND_TIMEOUT`]; a store that
    /// stalls costs the caller that long at most.
    pub fn inline(
        store: Arc<dyn AuditStore>,
        clock: Arc<dyn Clock>,
        metrics: Arc<IntegrityMetrics>,
    ) -> Self {
        Self {
            sink: AuditSink::Inline(store),
            clock,
            metrics,
            append_timeout: DEFAULT_APPEND_TIMEOUT,
        }
    }

    pub fn with_append_timeout(mut self, append_timeout: Duration) -> Self {
        self.append_timeout = append_timeout;
        self
    }

    /// Queue entries for a background dispatcher draining into `store`.
    ///
    /// The dispatcher exits once the log is dropped and the queue is
    /// drained; await the handle to flush on shutdown.
    pub fn with_outbox(
        store: Arc<dyn AuditStore>,
        clock: Arc<dyn Clock>,
        metrics: Arc<IntegrityMetrics>,
    ) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<IntegrityAuditEntry>();
        let dispatcher_metrics = metrics.clone();

        let handle = tokio::spawn(async move {
            while let Some(entry) = rx.recv().await {
                if let Err(e) = store.append(&entry).await {
                    dispatcher_metrics.record_audit_failure();
                    error!(
                        entry_id = %entry.id,
                        budget_id = %entry.budget_id,
                        "Failed to deliver audit entry from outbox: {}",
                        e
                    );
                }
            }
            debug!("Audit outbox dispatcher stopped");
        });

        let log = Self {
            sink: AuditSink::Outbox(tx),
            clock,
            metrics,
            append_timeout: DEFAULT_APPEND_TIMEOUT,
        };
        (log, handle)
    }

    /// Build entries without delivering them anywhere.
    pub fn disabled(clock: Arc<dyn Clock>, metrics: Arc<IntegrityMetrics>) -> Self {
        Self {
            sink: AuditSink::Disabled,
            clock,
            metrics,
            append_timeout: DEFAULT_APPEND_TIMEOUT,
        }
    }

    /// Record a HASH_GENERATED event for a freshly sealed budget.
    pub async fn log_hash_generation(
        &self,
        budget: &Budget,
    ) -> Result<IntegrityAuditEntry, BaselineError> {
        let seal = budget.seal().ok_or_else(|| {
            BaselineError::StateError(format!(
                "Cannot log hash generation for budget {} without an approval hash",
                budget.id()
            ))
        })?;

        let entry = IntegrityAuditEntry::new(
            budget.id(),
            AuditEventType::HashGenerated,
            Some(seal.approval_hash.clone()),
            seal.execution_hash.clone(),
            seal.sealed_by,
            seal.sealed_at,
            AuditOutcome::Success,
            None,
            &seal.algorithm,
        );
        self.deliver(&entry).await;
        info!(
            "Integrity hash generated for budget {} by {}",
            budget.id(),
            seal.sealed_by
        );
        Ok(entry)
    }

    pub async fn log_hash_validation(
        &self,
        budget: &Budget,
        validator: Uuid,
        success: bool,
        detail: Option<String>,
    ) -> IntegrityAuditEntry {
        let outcome = if success {
            AuditOutcome::Success
        } else {
            AuditOutcome::Failure
        };
        let entry = IntegrityAuditEntry::new(
            budget.id(),
            AuditEventType::HashValidated,
            budget.approval_hash().map(str::to_string),
            budget.execution_hash().map(str::to_string),
            validator,
            self.clock.now(),
            outcome,
            detail,
            budget
                .seal()
                .map(|s| s.algorithm.as_str())
                .unwrap_or(ALGORITHM_VERSION),
        );
        self.deliver(&entry).await;
        entry
    }

    pub async fn log_integrity_violation(
        &self,
        violation: &IntegrityViolation,
        detector: Uuid,
    ) -> IntegrityAuditEntry {
        let entry = IntegrityAuditEntry::new(
            violation.budget_id,
            AuditEventType::HashViolation,
            Some(violation.expected_hash.clone()),
            Some(violation.actual_hash.clone()),
            detector,
            self.clock.now(),
            AuditOutcome::Failure,
            Some(violation.violation_type.label().to_string()),
            ALGORITHM_VERSION,
        );
        self.deliver(&entry).await;
        warn!("Integrity violation recorded: {}", violation);
        entry
    }

    async fn deliver(&self, entry: &IntegrityAuditEntry) {
        match &self.sink {
            AuditSink::Inline(store) => {
                match tokio::time::timeout(self.append_timeout, store.append(entry)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        self.metrics.record_audit_failure();
                        error!(
                            entry_id = %entry.id,
                            budget_id = %entry.budget_id,
                            "Failed to append audit entry: {}",
                            e
                        );
                    }
                    Err(_) => {
                        self.metrics.record_audit_failure();
                        error!(
                            entry_id = %entry.id,
                            budget_id = %entry.budget_id,
                            "Audit append timed out after {:?}, entry dropped",
                            self.append_timeout
                        );
                    }
                }
            }
            AuditSink::Outbox(tx) => {
                if tx.send(entry.clone()).is_err() {
                    self.metrics.record_audit_failure();
                    error!(
                        entry_id = %entry.id,
                        "Audit outbox closed, entry dropped"
                    );
                }
            }
            AuditSink::Disabled => {
                debug!("Audit disabled, skipping {}", entry.summary());
            }
        }
    }
}
