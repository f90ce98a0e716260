//! Baseline orchestrator: approves a budget and freezes its schedule as one
//! atomic step, then records the seal in the audit log.

use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::audit::IntegrityAuditLog;
use crate::budget::Budget;
use crate::clock::Clock;
use crate::database::Database;
use crate::error::BaselineError;
use crate::integrity::{BudgetIntegrityService, IntegrityMetrics, IntegrityValidator};
use crate::repository::{BaselineTransaction, BudgetRepository, SchedulePlanRepository, UnitOfWork};
use crate::schedule::{ScheduleFreezeService, SchedulePlan, ScheduleSnapshot};

pub struct BaselineOrchestrator {
    budgets: Arc<dyn BudgetRepository>,
    plans: Arc<dyn SchedulePlanRepository>,
    unit_of_work: Arc<dyn UnitOfWork>,
    integrity: Arc<BudgetIntegrityService>,
    freeze: ScheduleFreezeService,
    validator: IntegrityValidator,
    audit: Arc<IntegrityAuditLog>,
}

impl BaselineOrchestrator {
    pub fn new(
        budgets: Arc<dyn BudgetRepository>,
        plans: Arc<dyn SchedulePlanRepository>,
        unit_of_work: Arc<dyn UnitOfWork>,
        integrity: Arc<BudgetIntegrityService>,
        freeze: ScheduleFreezeService,
        audit: Arc<IntegrityAuditLog>,
    ) -> Self {
        let validator = IntegrityValidator::new(integrity.clone(), audit.clone());
        Self {
            budgets,
            plans,
            unit_of_work,
            integrity,
            freeze,
            validator,
            audit,
        }
    }

    /// Wire every collaborator to the same SQLite database.
    pub fn with_database(
        db: Arc<Database>,
        audit: Arc<IntegrityAuditLog>,
        clock: Arc<dyn Clock>,
        metrics: Arc<IntegrityMetrics>,
    ) -> Self {
        Self::with_unit_of_work(db.clone(), db, audit, clock, metrics)
    }

    /// Same as `with_database`, but persisting through `unit_of_work`.
    pub fn with_unit_of_work(
        db: Arc<Database>,
        unit_of_work: Arc<dyn UnitOfWork>,
        audit: Arc<IntegrityAuditLog>,
        clock: Arc<dyn Clock>,
        metrics: Arc<IntegrityMetrics>,
    ) -> Self {
        let integrity = Arc::new(BudgetIntegrityService::new(
            db.clone(),
            db.clone(),
            clock.clone(),
            metrics,
        ));
        let freeze = ScheduleFreezeService::new(db.clone(), clock);
        Self::new(db.clone(), db, unit_of_work, integrity, freeze, audit)
    }

    pub fn integrity(&self) -> &Arc<BudgetIntegrityService> {
        &self.integrity
    }

    /// Approve a draft budget and freeze the schedule of its project.
    ///
    /// Either both aggregates are persisted together with the snapshot, or
    /// neither is. The HASH_GENERATED audit entry is written after commit
    /// and its failure does not affect the result.
    pub async fn approve_budget(
        &self,
        budget_id: Uuid,
        approver: Uuid,
    ) -> Result<ScheduleSnapshot, BaselineError> {
        info!("Approving budget {} by {}", budget_id, approver);

        let mut budget = self.load_budget(budget_id).await?;
        if budget.is_frozen() {
            warn!("Budget {} is already frozen, approval rejected", budget_id);
            return Err(BaselineError::BudgetAlreadyFrozen(budget_id));
        }

        let mut plan = self
            .plans
            .find_plan_by_project(budget.project_id())
            .await?
            .ok_or(BaselineError::MissingSchedule {
                budget_id,
                project_id: budget.project_id(),
            })?;

        self.integrity.seal(&mut budget, approver).await?;
        let snapshot = self.freeze.freeze_plan(&mut plan, budget_id, approver).await?;

        self.write_baseline(&budget, &plan, &snapshot).await?;
        info!(
            "Budget {} approved and schedule plan {} frozen (snapshot {})",
            budget_id,
            plan.id(),
            snapshot.id
        );

        if let Err(e) = self.audit.log_hash_generation(&budget).await {
            warn!("Could not record hash generation for budget {}: {}", budget_id, e);
        }

        Ok(snapshot)
    }

    /// Check a budget against its seal. Unsealed budgets pass.
    pub async fn verify_budget(&self, budget_id: Uuid, validator: Uuid) -> Result<(), BaselineError> {
        let budget = self.load_budget(budget_id).await?;
        self.validator.validate(&budget, validator).await
    }

    /// Validate the seal, then recompute and persist the execution hash.
    pub async fn refresh_execution_hash(
        &self,
        budget_id: Uuid,
        actor: Uuid,
    ) -> Result<String, BaselineError> {
        let mut budget = self.load_budget(budget_id).await?;
        if !budget.is_frozen() {
            return Err(BaselineError::StateError(format!(
                "Budget {} must be approved before its execution hash can be refreshed",
                budget_id
            )));
        }

        self.validator.validate(&budget, actor).await?;
        let hash = self.integrity.refresh_execution_hash(&mut budget).await?;

        let mut tx = self.unit_of_work.begin().await?;
        if let Err(e) = tx.save_budget(&budget).await {
            rollback(tx).await;
            return Err(e);
        }
        tx.commit().await?;

        info!("Execution hash of budget {} refreshed by {}", budget_id, actor);
        Ok(hash)
    }

    async fn load_budget(&self, budget_id: Uuid) -> Result<Budget, BaselineError> {
        self.budgets
            .find_budget(budget_id)
            .await?
            .ok_or_else(|| BaselineError::budget_not_found(budget_id))
    }

    async fn write_baseline(
        &self,
        budget: &Budget,
        plan: &SchedulePlan,
        snapshot: &ScheduleSnapshot,
    ) -> Result<(), BaselineError> {
        let mut tx = self.unit_of_work.begin().await?;
        if let Err(e) = stage(&mut tx, budget, plan, snapshot).await {
            rollback(tx).await;
            return Err(e);
        }
        tx.commit().await
    }
}

async fn stage(
    tx: &mut Box<dyn BaselineTransaction>,
    budget: &Budget,
    plan: &SchedulePlan,
    snapshot: &ScheduleSnapshot,
) -> Result<(), BaselineError> {
    tx.save_budget(budget).await?;
    tx.save_schedule_plan(plan).await?;
    tx.save_schedule_snapshot(snapshot).await
}

async fn rollback(tx: Box<dyn BaselineTransaction>) {
    if let Err(e) = tx.rollback().await {
        error!("Rollback of baseline transaction failed: {}", e);
    }
}
