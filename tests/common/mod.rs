#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use budget_baseline::audit::{IntegrityAuditEntry, IntegrityAuditLog};
use budget_baseline::budget::{Budget, BudgetLine};
use budget_baseline::clock::FixedClock;
use budget_baseline::database::Database;
use budget_baseline::error::BaselineError;
use budget_baseline::integrity::IntegrityMetrics;
use budget_baseline::repository::{AuditStore, BaselineTransaction, RepoResult, UnitOfWork};
use budget_baseline::schedule::{ScheduleSnapshot, ScheduledActivity, SchedulePlan};
use budget_baseline::BaselineOrchestrator;

/// Setup an in-memory SQLite database for testing
pub async fn setup_test_db() -> Arc<Database> {
    Arc::new(
        Database::new_in_memory()
            .await
            .expect("Failed to create test database"),
    )
}

pub fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap(),
    ))
}

pub fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, month, day).unwrap()
}

/// Draft budget with one root line per amount, not yet persisted.
pub fn draft_budget(amounts: &[i64]) -> (Budget, Vec<BudgetLine>) {
    let budget = Budget::new(Uuid::new_v4(), "Residential block C").unwrap();
    let lines = amounts
        .iter()
        .enumerate()
        .map(|(i, amount)| {
            BudgetLine::root(
                budget.id(),
                &format!("{:02}", i + 1),
                &format!("Work package {}", i + 1),
                Some("gl"),
                Decimal::ONE,
                Decimal::from(*amount),
            )
            .unwrap()
        })
        .collect();
    (budget, lines)
}

pub async fn insert_budget(db: &Database, budget: &Budget, lines: &[BudgetLine]) {
    db.insert_budget(budget).await.unwrap();
    for line in lines {
        db.insert_budget_line(line).await.unwrap();
    }
}

/// Plan spanning March 2024 with one activity per line.
pub async fn insert_plan(db: &Database, project_id: Uuid, lines: &[BudgetLine]) -> SchedulePlan {
    let plan = SchedulePlan::new(project_id, Some(date(3, 1)), Some(date(3, 31))).unwrap();
    db.insert_schedule_plan(&plan).await.unwrap();

    let mut previous: Option<Uuid> = None;
    for (i, line) in lines.iter().enumerate() {
        let start = date(3, 1 + (i as u32) * 5);
        let activity = ScheduledActivity::new(
            plan.id(),
            line.id,
            start,
            start + chrono::Duration::days(4),
            previous.into_iter().collect(),
        )
        .unwrap();
        db.insert_activity(&activity).await.unwrap();
        previous = Some(activity.id);
    }
    plan
}

pub struct Seeded {
    pub budget: Budget,
    pub lines: Vec<BudgetLine>,
    pub plan: SchedulePlan,
}

/// Budget, lines, plan and activities persisted in one call.
pub async fn seed_baseline(db: &Database, amounts: &[i64]) -> Seeded {
    let (budget, lines) = draft_budget(amounts);
    insert_budget(db, &budget, &lines).await;
    let plan = insert_plan(db, budget.project_id(), &lines).await;
    Seeded {
        budget,
        lines,
        plan,
    }
}

pub fn orchestrator_with_store(
    db: Arc<Database>,
    clock: Arc<FixedClock>,
    audit_store: Arc<dyn AuditStore>,
) -> (BaselineOrchestrator, Arc<IntegrityMetrics>) {
    let metrics = Arc::new(IntegrityMetrics::new());
    let audit = IntegrityAuditLog::inline(audit_store, clock.clone(), metrics.clone());
    let orchestrator =
        BaselineOrchestrator::with_database(db, Arc::new(audit), clock, metrics.clone());
    (orchestrator, metrics)
}

/// Orchestrator whose audit entries go to the same database.
pub fn db_orchestrator(
    db: Arc<Database>,
    clock: Arc<FixedClock>,
) -> (BaselineOrchestrator, Arc<IntegrityMetrics>) {
    orchestrator_with_store(db.clone(), clock, db)
}

/// Unit of work whose schedule-plan save always fails.
pub struct FailingScheduleSave {
    pub inner: Arc<Database>,
}

struct FailingScheduleTransaction {
    inner: Box<dyn BaselineTransaction>,
}

#[async_trait]
impl BaselineTransaction for FailingScheduleTransaction {
    async fn save_budget(&mut self, budget: &Budget) -> RepoResult<()> {
        self.inner.save_budget(budget).await
    }

    async fn save_schedule_plan(&mut self, _plan: &SchedulePlan) -> RepoResult<()> {
        Err(BaselineError::DatabaseError(
            "injected schedule save failure".to_string(),
        ))
    }

    async fn save_schedule_snapshot(&mut self, snapshot: &ScheduleSnapshot) -> RepoResult<()> {
        self.inner.save_schedule_snapshot(snapshot).await
    }

    async fn commit(self: Box<Self>) -> RepoResult<()> {
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> RepoResult<()> {
        self.inner.rollback().await
    }
}

#[async_trait]
impl UnitOfWork for FailingScheduleSave {
    async fn begin(&self) -> RepoResult<Box<dyn BaselineTransaction>> {
        let inner = self.inner.begin().await?;
        Ok(Box::new(FailingScheduleTransaction { inner }))
    }
}

/// Unit of work that lets another writer bump the budget version just
/// before the transaction opens.
pub struct ConcurrentBudgetWriter {
    pub inner: Arc<Database>,
    pub budget_id: Uuid,
}

#[async_trait]
impl UnitOfWork for ConcurrentBudgetWriter {
    async fn begin(&self) -> RepoResult<Box<dyn BaselineTransaction>> {
        sqlx::query("UPDATE budgets SET version = version + 1 WHERE id = ?")
            .bind(self.budget_id.to_string())
            .execute(self.inner.pool())
            .await?;
        self.inner.begin().await
    }
}

pub struct FailingAuditStore;

#[async_trait]
impl AuditStore for FailingAuditStore {
    async fn append(&self, _entry: &IntegrityAuditEntry) -> RepoResult<()> {
        Err(BaselineError::AuditError("audit sink unavailable".to_string()))
    }
}

/// Store whose appends never complete.
pub struct HangingAuditStore;

#[async_trait]
impl AuditStore for HangingAuditStore {
    async fn append(&self, _entry: &IntegrityAuditEntry) -> RepoResult<()> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingAuditStore {
    pub entries: Mutex<Vec<IntegrityAuditEntry>>,
}

#[async_trait]
impl AuditStore for RecordingAuditStore {
    async fn append(&self, entry: &IntegrityAuditEntry) -> RepoResult<()> {
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }
}

/// Rewrite a line's amount behind the application's back.
pub async fn tamper_line_amount(db: &Database, line_id: Uuid, amount: Decimal) {
    sqlx::query("UPDATE budget_lines SET assigned_amount = ? WHERE id = ?")
        .bind(amount.to_string())
        .bind(line_id.to_string())
        .execute(db.pool())
        .await
        .unwrap();
}
