//! Validation flow run before a sealed budget's financial state changes.

use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::audit::IntegrityAuditLog;
use crate::budget::Budget;
use crate::error::BaselineError;
use crate::integrity::service::BudgetIntegrityService;
use crate::integrity::violation::IntegrityViolation;

pub struct IntegrityValidator {
    service: Arc<BudgetIntegrityService>,
    audit: Arc<IntegrityAuditLog>,
}

impl IntegrityValidator {
    pub fn new(service: Arc<BudgetIntegrityService>, audit: Arc<IntegrityAuditLog>) -> Self {
        Self { service, audit }
    }

    /// Recompute the approval hash and compare it with the seal.
    ///
    /// Unsealed budgets pass untouched. A mismatch is recorded as a
    /// HASH_VIOLATION and returned as an error that must block the mutation.
    pub async fn validate(&self, budget: &Budget, validator: Uuid) -> Result<(), BaselineError> {
        let expected = match budget.approval_hash() {
            Some(hash) => hash.to_string(),
            None => {
                debug!("Budget {} is not sealed, nothing to validate", budget.id());
                return Ok(());
            }
        };

        let actual = self.service.compute_approval_hash(budget).await?;
        let valid = actual == expected;
        self.service.metrics().record_validation(valid);

        if valid {
            self.audit
                .log_hash_validation(budget, validator, true, None)
                .await;
            return Ok(());
        }

        let violation = IntegrityViolation::tampering(budget.id(), &expected, &actual);
        warn!("{}", violation);
        self.audit
            .log_hash_validation(budget, validator, false, Some(violation.to_string()))
            .await;
        self.audit.log_integrity_violation(&violation, validator).await;
        Err(violation.into())
    }
}
