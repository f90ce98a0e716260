pub mod models;
pub mod queries;
pub mod schema;
pub mod transaction;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use std::str::FromStr;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::audit::entry::IntegrityAuditEntry;
use crate::budget::{Budget, BudgetLine, UnitPriceSnapshot};
use crate::error::BaselineError;
use crate::integrity::IntegrityViolation;
use crate::repository::{
    ActivityQuery, AuditStore, BaselineTransaction, BudgetLineQuery, BudgetRepository,
    RepoResult, SchedulePlanRepository, UnitOfWork, UnitPriceSnapshotLookup,
};
use crate::schedule::{ScheduleSnapshot, ScheduledActivity, SchedulePlan};

use queries::Queries;
use transaction::SqliteBaselineTransaction;

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, BaselineError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        info!("Connected to {}", database_url);
        Ok(Database { pool })
    }

    /// Private in-memory database with the schema applied.
    ///
    /// Limited to one connection that is never recycled, since every SQLite
    /// memory connection is a separate database.
    pub async fn new_in_memory() -> Result<Self, BaselineError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        let db = Database { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    pub async fn run_migrations(&self) -> Result<(), BaselineError> {
        for (name, sql) in schema::MIGRATIONS {
            sqlx::raw_sql(sql).execute(&self.pool).await?;
            debug!("Applied migration {}", name);
        }
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn insert_budget(&self, budget: &Budget) -> Result<(), BaselineError> {
        Queries::insert_budget(&self.pool, budget).await?;
        Ok(())
    }

    pub async fn insert_budget_line(&self, line: &BudgetLine) -> Result<(), BaselineError> {
        line.validate()?;
        let mut tx = self.pool.begin().await?;
        let budget = Queries::get_budget(&mut *tx, line.budget_id)
            .await?
            .ok_or(BaselineError::NotFound {
                entity: "Budget",
                id: line.budget_id,
            })?;
        if let Some(approval_hash) = budget.approval_hash {
            warn!("Refused new line {} on sealed budget {}", line.id, line.budget_id);
            return Err(
                IntegrityViolation::structure_modification(line.budget_id, &approval_hash).into(),
            );
        }
        Queries::insert_line(&mut *tx, line).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Rewrite a line's structure and financials. Refused once the owning
    /// budget is sealed; use [`Database::record_line_financials`] then.
    pub async fn update_budget_line(&self, line: &BudgetLine) -> Result<(), BaselineError> {
        line.validate()?;
        let mut tx = self.pool.begin().await?;
        Self::ensure_line_unsealed(&mut tx, line.id).await?;
        Queries::overwrite_line(&mut *tx, line).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Record spend and commitments. Allowed on sealed budgets: neither
    /// column is part of the approval hash.
    pub async fn record_line_financials(
        &self,
        line_id: Uuid,
        actual_spend: Decimal,
        pending_commitments: Decimal,
    ) -> Result<(), BaselineError> {
        if actual_spend < Decimal::ZERO || pending_commitments < Decimal::ZERO {
            return Err(BaselineError::ValidationError(format!(
                "Line {}: spend and commitments cannot be negative",
                line_id
            )));
        }
        let updated =
            Queries::update_line_financials(&self.pool, line_id, &actual_spend, &pending_commitments)
                .await?;
        if updated == 0 {
            return Err(BaselineError::NotFound {
                entity: "Budget line",
                id: line_id,
            });
        }
        Ok(())
    }

    /// Capture or adjust a line's composition. Refused once the owning
    /// budget is sealed.
    pub async fn save_unit_price_snapshot(
        &self,
        snapshot: &UnitPriceSnapshot,
    ) -> Result<(), BaselineError> {
        let mut tx = self.pool.begin().await?;
        Self::ensure_line_unsealed(&mut tx, snapshot.line_id()).await?;
        Queries::upsert_unit_price_snapshot(&mut *tx, snapshot).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn ensure_line_unsealed(
        tx: &mut Transaction<'static, Sqlite>,
        line_id: Uuid,
    ) -> Result<(), BaselineError> {
        match Queries::get_line_seal(&mut **tx, line_id).await? {
            None => Err(BaselineError::NotFound {
                entity: "Budget line",
                id: line_id,
            }),
            Some((budget_id, Some(approval_hash))) => {
                let budget_id = Uuid::parse_str(&budget_id)
                    .map_err(|e| BaselineError::DatabaseError(e.to_string()))?;
                warn!(
                    "Refused structural write to line {} of sealed budget {}",
                    line_id, budget_id
                );
                Err(IntegrityViolation::structure_modification(budget_id, &approval_hash).into())
            }
            Some((_, None)) => Ok(()),
        }
    }

    pub async fn insert_schedule_plan(&self, plan: &SchedulePlan) -> Result<(), BaselineError> {
        Queries::insert_plan(&self.pool, plan).await?;
        Ok(())
    }

    pub async fn insert_activity(&self, activity: &ScheduledActivity) -> Result<(), BaselineError> {
        Queries::insert_activity(&self.pool, activity).await?;
        Ok(())
    }

    pub async fn find_plan(&self, plan_id: Uuid) -> Result<Option<SchedulePlan>, BaselineError> {
        Queries::get_plan(&self.pool, plan_id)
            .await?
            .map(SchedulePlan::try_from)
            .transpose()
    }

    pub async fn snapshots_for_plan(
        &self,
        plan_id: Uuid,
    ) -> Result<Vec<ScheduleSnapshot>, BaselineError> {
        Queries::get_snapshots_for_plan(&self.pool, plan_id)
            .await?
            .into_iter()
            .map(ScheduleSnapshot::try_from)
            .collect()
    }

    pub async fn audit_entries_for_budget(
        &self,
        budget_id: Uuid,
    ) -> Result<Vec<IntegrityAuditEntry>, BaselineError> {
        Queries::get_audit_entries(&self.pool, budget_id)
            .await?
            .into_iter()
            .map(IntegrityAuditEntry::try_from)
            .collect()
    }
}

#[async_trait]
impl BudgetRepository for Database {
    async fn find_budget(&self, budget_id: Uuid) -> RepoResult<Option<Budget>> {
        Queries::get_budget(&self.pool, budget_id)
            .await?
            .map(Budget::try_from)
            .transpose()
    }

    async fn find_budget_by_project(&self, project_id: Uuid) -> RepoResult<Option<Budget>> {
        Queries::get_budget_by_project(&self.pool, project_id)
            .await?
            .map(Budget::try_from)
            .transpose()
    }
}

#[async_trait]
impl BudgetLineQuery for Database {
    async fn lines_of(&self, budget_id: Uuid) -> RepoResult<Vec<BudgetLine>> {
        Queries::get_lines(&self.pool, budget_id)
            .await?
            .into_iter()
            .map(BudgetLine::try_from)
            .collect()
    }
}

#[async_trait]
impl UnitPriceSnapshotLookup for Database {
    async fn snapshot_for(&self, line_id: Uuid) -> RepoResult<Option<UnitPriceSnapshot>> {
        Queries::get_unit_price_snapshot(&self.pool, line_id)
            .await?
            .map(UnitPriceSnapshot::try_from)
            .transpose()
    }
}

#[async_trait]
impl SchedulePlanRepository for Database {
    async fn find_plan_by_project(&self, project_id: Uuid) -> RepoResult<Option<SchedulePlan>> {
        Queries::get_plan_by_project(&self.pool, project_id)
            .await?
            .map(SchedulePlan::try_from)
            .transpose()
    }
}

#[async_trait]
impl ActivityQuery for Database {
    async fn activities_of(&self, plan_id: Uuid) -> RepoResult<Vec<ScheduledActivity>> {
        Queries::get_activities(&self.pool, plan_id)
            .await?
            .into_iter()
            .map(ScheduledActivity::try_from)
            .collect()
    }
}

#[async_trait]
impl UnitOfWork for Database {
    async fn begin(&self) -> RepoResult<Box<dyn BaselineTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(SqliteBaselineTransaction::new(tx)))
    }
}

#[async_trait]
impl AuditStore for Database {
    async fn append(&self, entry: &IntegrityAuditEntry) -> RepoResult<()> {
        Queries::insert_audit_entry(&self.pool, entry).await?;
        Ok(())
    }
}
