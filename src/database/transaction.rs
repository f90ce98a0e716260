//! SQLite unit of work for the baseline write set.

use async_trait::async_trait;
use sqlx::{Sqlite, Transaction};
use tracing::debug;

use crate::budget::Budget;
use crate::database::queries::Queries;
use crate::error::BaselineError;
use crate::repository::{BaselineTransaction, RepoResult};
use crate::schedule::{ScheduleSnapshot, SchedulePlan};

pub struct SqliteBaselineTransaction {
    tx: Transaction<'static, Sqlite>,
}

impl SqliteBaselineTransaction {
    pub(crate) fn new(tx: Transaction<'static, Sqlite>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl BaselineTransaction for SqliteBaselineTransaction {
    async fn save_budget(&mut self, budget: &Budget) -> RepoResult<()> {
        let updated = Queries::update_budget(&mut *self.tx, budget).await?;
        if updated == 0 {
            return Err(BaselineError::Conflict {
                entity: "Budget",
                id: budget.id(),
                version: budget.version(),
            });
        }
        debug!("Budget {} staged for commit", budget.id());
        Ok(())
    }

    async fn save_schedule_plan(&mut self, plan: &SchedulePlan) -> RepoResult<()> {
        let updated = Queries::update_plan(&mut *self.tx, plan).await?;
        if updated == 0 {
            return Err(BaselineError::Conflict {
                entity: "Schedule plan",
                id: plan.id(),
                version: plan.version(),
            });
        }
        debug!("Schedule plan {} staged for commit", plan.id());
        Ok(())
    }

    async fn save_schedule_snapshot(&mut self, snapshot: &ScheduleSnapshot) -> RepoResult<()> {
        Queries::insert_snapshot(&mut *self.tx, snapshot).await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> RepoResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> RepoResult<()> {
        self.tx.rollback().await?;
        debug!("Baseline transaction rolled back");
        Ok(())
    }
}
