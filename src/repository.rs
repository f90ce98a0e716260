//! Collaborator interfaces used by the integrity and baseline services.
//!
//! `database::Database` implements all of them against SQLite; tests
//! substitute in-memory or failing implementations.

use async_trait::async_trait;
use uuid::Uuid;

use crate::audit::entry::IntegrityAuditEntry;
use crate::budget::{Budget, BudgetLine, UnitPriceSnapshot};
use crate::error::BaselineError;
use crate::schedule::{ScheduleSnapshot, ScheduledActivity, SchedulePlan};

pub type RepoResult<T> = Result<T, BaselineError>;

#[async_trait]
pub trait BudgetLineQuery: Send + Sync {
    /// All lines of a budget, in no particular order.
    async fn lines_of(&self, budget_id: Uuid) -> RepoResult<Vec<BudgetLine>>;
}

#[async_trait]
pub trait UnitPriceSnapshotLookup: Send + Sync {
    async fn snapshot_for(&self, line_id: Uuid) -> RepoResult<Option<UnitPriceSnapshot>>;
}

#[async_trait]
pub trait BudgetRepository: Send + Sync {
    async fn find_budget(&self, budget_id: Uuid) -> RepoResult<Option<Budget>>;
    async fn find_budget_by_project(&self, project_id: Uuid) -> RepoResult<Option<Budget>>;
}

#[async_trait]
pub trait SchedulePlanRepository: Send + Sync {
    async fn find_plan_by_project(&self, project_id: Uuid) -> RepoResult<Option<SchedulePlan>>;
}

#[async_trait]
pub trait ActivityQuery: Send + Sync {
    async fn activities_of(&self, plan_id: Uuid) -> RepoResult<Vec<ScheduledActivity>>;
}

/// One transactional boundary spanning the budget and schedule aggregates.
#[async_trait]
pub trait BaselineTransaction: Send {
    /// Persist the budget. Fails with `Conflict` when its version is stale.
    async fn save_budget(&mut self, budget: &Budget) -> RepoResult<()>;
    /// Persist the plan. Fails with `Conflict` when its version is stale.
    async fn save_schedule_plan(&mut self, plan: &SchedulePlan) -> RepoResult<()>;
    /// Insert-only.
    async fn save_schedule_snapshot(&mut self, snapshot: &ScheduleSnapshot) -> RepoResult<()>;
    async fn commit(self: Box<Self>) -> RepoResult<()>;
    async fn rollback(self: Box<Self>) -> RepoResult<()>;
}

#[async_trait]
pub trait UnitOfWork: Send + Sync {
    async fn begin(&self) -> RepoResult<Box<dyn BaselineTransaction>>;
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, entry: &IntegrityAuditEntry) -> RepoResult<()>;
}
