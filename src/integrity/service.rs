//! Budget integrity service: approval and execution hashes, sealing.

use std::sync::Arc;
use std::time::Instant;

use chrono::SecondsFormat;
use tracing::debug;
use uuid::Uuid;

use crate::budget::{validate_tree, Budget, BudgetLine, IntegritySeal};
use crate::clock::Clock;
use crate::crypto::{sha256_hex, ALGORITHM_VERSION};
use crate::error::BaselineError;
use crate::integrity::line_hash::{
    canonical_decimal, encode_fields, hash_line, lines_merkle_root,
};
use crate::integrity::metrics::{HashOperation, IntegrityMetrics};
use crate::repository::{BudgetLineQuery, UnitPriceSnapshotLookup};

pub struct BudgetIntegrityService {
    lines: Arc<dyn BudgetLineQuery>,
    snapshots: Arc<dyn UnitPriceSnapshotLookup>,
    clock: Arc<dyn Clock>,
    metrics: Arc<IntegrityMetrics>,
}

impl BudgetIntegrityService {
    pub fn new(
        lines: Arc<dyn BudgetLineQuery>,
        snapshots: Arc<dyn UnitPriceSnapshotLookup>,
        clock: Arc<dyn Clock>,
        metrics: Arc<IntegrityMetrics>,
    ) -> Self {
        Self {
            lines,
            snapshots,
            clock,
            metrics,
        }
    }

    pub fn metrics(&self) -> &Arc<IntegrityMetrics> {
        &self.metrics
    }

    /// Structural seal: budget header plus the Merkle root of its lines.
    ///
    /// Deterministic for identical budget and line data regardless of the
    /// order the lines are returned in.
    pub async fn compute_approval_hash(&self, budget: &Budget) -> Result<String, BaselineError> {
        let started = Instant::now();
        let (result, line_count) = match self.lines.lines_of(budget.id()).await {
            Ok(lines) => (self.approval_hash_over(budget, &lines).await, lines.len()),
            Err(e) => (Err(e), 0),
        };
        self.observe(HashOperation::Approval, budget.id(), line_count, started, result)
    }

    /// Financial attestation chained to the approval hash.
    ///
    /// Includes the current instant, so two calls only agree when the clock
    /// has not moved between them.
    pub async fn compute_execution_hash(&self, budget: &Budget) -> Result<String, BaselineError> {
        let started = Instant::now();
        let (result, line_count) = match budget.approval_hash() {
            None => (
                Err(BaselineError::StateError(format!(
                    "Budget {} has no approval hash; approve it before computing the execution hash",
                    budget.id()
                ))),
                0,
            ),
            Some(approval_hash) => match self.lines.lines_of(budget.id()).await {
                Ok(lines) => (Ok(self.execution_digest(approval_hash, &lines)), lines.len()),
                Err(e) => (Err(e), 0),
            },
        };
        self.observe(HashOperation::Execution, budget.id(), line_count, started, result)
    }

    /// Seal a draft budget in memory: approval hash over its frozen form,
    /// chained execution hash, then the `Frozen` transition.
    ///
    /// Lines are read once, so both hashes describe the same line set.
    pub async fn seal(&self, budget: &mut Budget, approver: Uuid) -> Result<(), BaselineError> {
        if budget.is_frozen() {
            return Err(BaselineError::BudgetAlreadyFrozen(budget.id()));
        }

        let lines = self.lines.lines_of(budget.id()).await?;
        let mut seal = IntegritySeal {
            approval_hash: String::new(),
            execution_hash: None,
            algorithm: ALGORITHM_VERSION.to_string(),
            sealed_by: approver,
            sealed_at: self.clock.now(),
        };

        let started = Instant::now();
        let frozen_form = budget.as_sealed_form(seal.clone());
        let approval = self.approval_hash_over(&frozen_form, &lines).await;
        seal.approval_hash =
            self.observe(HashOperation::Approval, budget.id(), lines.len(), started, approval)?;

        let started = Instant::now();
        let execution = Ok(self.execution_digest(&seal.approval_hash, &lines));
        seal.execution_hash = Some(self.observe(
            HashOperation::Execution,
            budget.id(),
            lines.len(),
            started,
            execution,
        )?);

        debug!(
            "Sealing budget {} with approval hash {}",
            budget.id(),
            seal.approval_hash
        );
        budget.apply_seal(seal)
    }

    /// Recompute and store the execution hash of a sealed budget.
    pub async fn refresh_execution_hash(&self, budget: &mut Budget) -> Result<String, BaselineError> {
        let hash = self.compute_execution_hash(budget).await?;
        budget.set_execution_hash(hash.clone())?;
        Ok(hash)
    }

    async fn approval_hash_over(
        &self,
        budget: &Budget,
        lines: &[BudgetLine],
    ) -> Result<String, BaselineError> {
        validate_tree(budget.id(), lines)?;
        let mut hashes = Vec::with_capacity(lines.len());
        for line in lines {
            let snapshot = self.snapshots.snapshot_for(line.id).await?;
            hashes.push(hash_line(line, snapshot.as_ref())?);
        }
        Ok(approval_digest(budget, &lines_merkle_root(hashes)))
    }

    fn execution_digest(&self, approval_hash: &str, lines: &[BudgetLine]) -> String {
        let mut ordered: Vec<&BudgetLine> = lines.iter().collect();
        ordered.sort_by_key(|l| l.id);

        let mut fields = Vec::with_capacity(2 + ordered.len() * 4);
        fields.push(approval_hash.to_string());
        for line in ordered {
            fields.push(line.id.to_string());
            fields.push(canonical_decimal(line.actual_spend));
            fields.push(canonical_decimal(line.pending_commitments));
            fields.push(canonical_decimal(line.remaining_balance()));
        }
        fields.push(self.clock.now().to_rfc3339_opts(SecondsFormat::Nanos, true));

        sha256_hex(encode_fields(&fields))
    }

    fn observe(
        &self,
        operation: HashOperation,
        budget_id: Uuid,
        line_count: usize,
        started: Instant,
        result: Result<String, BaselineError>,
    ) -> Result<String, BaselineError> {
        let correlation_id = Uuid::new_v4();
        match &result {
            Ok(_) => self.metrics.record_hash(
                operation,
                correlation_id,
                budget_id,
                line_count,
                started.elapsed(),
            ),
            Err(e) => {
                self.metrics
                    .record_hash_failure(operation, correlation_id, budget_id, &e.to_string())
            }
        }
        result
    }
}

fn approval_digest(budget: &Budget, lines_root: &str) -> String {
    let id = budget.id().to_string();
    let project_id = budget.project_id().to_string();
    let contractual = budget.is_contractual().to_string();
    sha256_hex(encode_fields([
        id.as_str(),
        budget.name(),
        project_id.as_str(),
        budget.state().label(),
        contractual.as_str(),
        lines_root,
        ALGORITHM_VERSION,
    ]))
}
