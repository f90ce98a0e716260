//! SQL statements, usable against the pool or an open transaction.

use rust_decimal::Decimal;
use sqlx::{Executor, Sqlite};
use uuid::Uuid;

use crate::audit::entry::IntegrityAuditEntry;
use crate::budget::{Budget, BudgetLine, UnitPriceSnapshot};
use crate::database::models::*;
use crate::schedule::{ScheduleSnapshot, ScheduledActivity, SchedulePlan};

pub struct Queries;

const BUDGET_COLUMNS: &str = "id, project_id, name, contractual, approval_hash, execution_hash, \
     integrity_algorithm, sealed_by, sealed_at, version";

const LINE_COLUMNS: &str = "id, budget_id, parent_id, item_code, description, unit, quantity, \
     assigned_amount, level, actual_spend, pending_commitments, version";

const PLAN_COLUMNS: &str =
    "id, project_id, start_date, end_date, frozen_at, frozen_by, snapshot_algorithm, version";

impl Queries {
    pub async fn get_budget<'e, E>(executor: E, id: Uuid) -> Result<Option<BudgetRow>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, BudgetRow>(&format!(
            "SELECT {} FROM budgets WHERE id = ?",
            BUDGET_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(executor)
        .await
    }

    pub async fn get_budget_by_project<'e, E>(
        executor: E,
        project_id: Uuid,
    ) -> Result<Option<BudgetRow>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, BudgetRow>(&format!(
            "SELECT {} FROM budgets WHERE project_id = ?",
            BUDGET_COLUMNS
        ))
        .bind(project_id.to_string())
        .fetch_optional(executor)
        .await
    }

    pub async fn insert_budget<'e, E>(executor: E, budget: &Budget) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let record = budget.to_record();
        sqlx::query(
            r#"
            INSERT INTO budgets (id, project_id, name, contractual, approval_hash, execution_hash,
                                 integrity_algorithm, sealed_by, sealed_at, version)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.project_id.to_string())
        .bind(record.name)
        .bind(record.contractual)
        .bind(record.approval_hash)
        .bind(record.execution_hash)
        .bind(record.algorithm)
        .bind(record.sealed_by.map(|u| u.to_string()))
        .bind(record.sealed_at)
        .bind(record.version)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Optimistic update. Returns the number of rows touched: 0 means the
    /// stored version no longer matches.
    pub async fn update_budget<'e, E>(executor: E, budget: &Budget) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let record = budget.to_record();
        let result = sqlx::query(
            r#"
            UPDATE budgets
            SET name = ?, contractual = ?, approval_hash = ?, execution_hash = ?,
                integrity_algorithm = ?, sealed_by = ?, sealed_at = ?,
                version = version + 1, updated_at = CURRENT_TIMESTAMP
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(record.name)
        .bind(record.contractual)
        .bind(record.approval_hash)
        .bind(record.execution_hash)
        .bind(record.algorithm)
        .bind(record.sealed_by.map(|u| u.to_string()))
        .bind(record.sealed_at)
        .bind(record.id.to_string())
        .bind(record.version)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn get_lines<'e, E>(executor: E, budget_id: Uuid) -> Result<Vec<BudgetLineRow>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, BudgetLineRow>(&format!(
            "SELECT {} FROM budget_lines WHERE budget_id = ?",
            LINE_COLUMNS
        ))
        .bind(budget_id.to_string())
        .fetch_all(executor)
        .await
    }

    pub async fn insert_line<'e, E>(executor: E, line: &BudgetLine) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"
            INSERT INTO budget_lines (id, budget_id, parent_id, item_code, description, unit,
                                      quantity, assigned_amount, level, actual_spend,
                                      pending_commitments, version)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(line.id.to_string())
        .bind(line.budget_id.to_string())
        .bind(line.parent_id.map(|p| p.to_string()))
        .bind(&line.item_code)
        .bind(&line.description)
        .bind(&line.unit)
        .bind(line.quantity.to_string())
        .bind(line.assigned_amount.to_string())
        .bind(i64::from(line.level))
        .bind(line.actual_spend.to_string())
        .bind(line.pending_commitments.to_string())
        .bind(line.version)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Overwrite every mutable column of a line, bypassing version checks.
    pub async fn overwrite_line<'e, E>(executor: E, line: &BudgetLine) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE budget_lines
            SET parent_id = ?, item_code = ?, description = ?, unit = ?, quantity = ?,
                assigned_amount = ?, level = ?, actual_spend = ?, pending_commitments = ?,
                version = version + 1
            WHERE id = ?
            "#,
        )
        .bind(line.parent_id.map(|p| p.to_string()))
        .bind(&line.item_code)
        .bind(&line.description)
        .bind(&line.unit)
        .bind(line.quantity.to_string())
        .bind(line.assigned_amount.to_string())
        .bind(i64::from(line.level))
        .bind(line.actual_spend.to_string())
        .bind(line.pending_commitments.to_string())
        .bind(line.id.to_string())
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Owning budget of a line and its approval hash, if sealed.
    pub async fn get_line_seal<'e, E>(
        executor: E,
        line_id: Uuid,
    ) -> Result<Option<(String, Option<String>)>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, (String, Option<String>)>(
            r#"
            SELECT b.id, b.approval_hash
            FROM budget_lines l
            JOIN budgets b ON b.id = l.budget_id
            WHERE l.id = ?
            "#,
        )
        .bind(line_id.to_string())
        .fetch_optional(executor)
        .await
    }

    pub async fn update_line_financials<'e, E>(
        executor: E,
        line_id: Uuid,
        actual_spend: &Decimal,
        pending_commitments: &Decimal,
    ) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE budget_lines
            SET actual_spend = ?, pending_commitments = ?, version = version + 1
            WHERE id = ?
            "#,
        )
        .bind(actual_spend.to_string())
        .bind(pending_commitments.to_string())
        .bind(line_id.to_string())
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn get_unit_price_snapshot<'e, E>(
        executor: E,
        line_id: Uuid,
    ) -> Result<Option<UnitPriceSnapshotRow>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, UnitPriceSnapshotRow>(
            r#"
            SELECT id, line_id, external_catalog_id, catalog_source, original_yield,
                   current_yield, yield_changed_by, yield_changed_at, unit, captured_at, inputs
            FROM unit_price_snapshots
            WHERE line_id = ?
            "#,
        )
        .bind(line_id.to_string())
        .fetch_optional(executor)
        .await
    }

    /// Insert or replace the snapshot of a line (one per line).
    pub async fn upsert_unit_price_snapshot<'e, E>(
        executor: E,
        snapshot: &UnitPriceSnapshot,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let record = snapshot.to_record();
        let inputs = serde_json::to_string(&record.inputs)
            .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
        sqlx::query(
            r#"
            INSERT INTO unit_price_snapshots (id, line_id, external_catalog_id, catalog_source,
                                              original_yield, current_yield, yield_changed_by,
                                              yield_changed_at, unit, captured_at, inputs)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (line_id) DO UPDATE SET
                current_yield = excluded.current_yield,
                yield_changed_by = excluded.yield_changed_by,
                yield_changed_at = excluded.yield_changed_at,
                inputs = excluded.inputs
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.line_id.to_string())
        .bind(record.external_catalog_id)
        .bind(record.catalog_source)
        .bind(record.original_yield.to_string())
        .bind(record.current_yield.to_string())
        .bind(record.yield_changed_by.map(|u| u.to_string()))
        .bind(record.yield_changed_at)
        .bind(record.unit)
        .bind(record.captured_at)
        .bind(inputs)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn get_plan_by_project<'e, E>(
        executor: E,
        project_id: Uuid,
    ) -> Result<Option<SchedulePlanRow>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, SchedulePlanRow>(&format!(
            "SELECT {} FROM schedule_plans WHERE project_id = ?",
            PLAN_COLUMNS
        ))
        .bind(project_id.to_string())
        .fetch_optional(executor)
        .await
    }

    pub async fn get_plan<'e, E>(executor: E, id: Uuid) -> Result<Option<SchedulePlanRow>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, SchedulePlanRow>(&format!(
            "SELECT {} FROM schedule_plans WHERE id = ?",
            PLAN_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(executor)
        .await
    }

    pub async fn insert_plan<'e, E>(executor: E, plan: &SchedulePlan) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let record = plan.to_record();
        sqlx::query(
            r#"
            INSERT INTO schedule_plans (id, project_id, start_date, end_date, frozen_at,
                                        frozen_by, snapshot_algorithm, version)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.project_id.to_string())
        .bind(record.start_date)
        .bind(record.end_date)
        .bind(record.frozen_at)
        .bind(record.frozen_by.map(|u| u.to_string()))
        .bind(record.snapshot_algorithm)
        .bind(record.version)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn update_plan<'e, E>(executor: E, plan: &SchedulePlan) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let record = plan.to_record();
        let result = sqlx::query(
            r#"
            UPDATE schedule_plans
            SET start_date = ?, end_date = ?, frozen_at = ?, frozen_by = ?,
                snapshot_algorithm = ?, version = version + 1
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(record.start_date)
        .bind(record.end_date)
        .bind(record.frozen_at)
        .bind(record.frozen_by.map(|u| u.to_string()))
        .bind(record.snapshot_algorithm)
        .bind(record.id.to_string())
        .bind(record.version)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn get_activities<'e, E>(executor: E, plan_id: Uuid) -> Result<Vec<ActivityRow>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, ActivityRow>(
            r#"
            SELECT id, plan_id, line_id, start_date, end_date, predecessors
            FROM scheduled_activities
            WHERE plan_id = ?
            "#,
        )
        .bind(plan_id.to_string())
        .fetch_all(executor)
        .await
    }

    pub async fn insert_activity<'e, E>(
        executor: E,
        activity: &ScheduledActivity,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let predecessors = serde_json::to_string(&activity.predecessors)
            .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
        sqlx::query(
            r#"
            INSERT INTO scheduled_activities (id, plan_id, line_id, start_date, end_date, predecessors)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(activity.id.to_string())
        .bind(activity.plan_id.to_string())
        .bind(activity.line_id.to_string())
        .bind(activity.start_date)
        .bind(activity.end_date)
        .bind(predecessors)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn get_snapshots_for_plan<'e, E>(
        executor: E,
        plan_id: Uuid,
    ) -> Result<Vec<ScheduleSnapshotRow>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, ScheduleSnapshotRow>(
            r#"
            SELECT id, plan_id, budget_id, dates_json, durations_json, sequence_json,
                   calendars_json, captured_at, algorithm
            FROM schedule_snapshots
            WHERE plan_id = ?
            ORDER BY captured_at
            "#,
        )
        .bind(plan_id.to_string())
        .fetch_all(executor)
        .await
    }

    pub async fn insert_snapshot<'e, E>(
        executor: E,
        snapshot: &ScheduleSnapshot,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"
            INSERT INTO schedule_snapshots (id, plan_id, budget_id, dates_json, durations_json,
                                            sequence_json, calendars_json, captured_at, algorithm)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(snapshot.id.to_string())
        .bind(snapshot.plan_id.to_string())
        .bind(snapshot.budget_id.to_string())
        .bind(snapshot.dates.to_string())
        .bind(snapshot.durations.to_string())
        .bind(snapshot.sequence.to_string())
        .bind(snapshot.calendars.to_string())
        .bind(snapshot.captured_at)
        .bind(&snapshot.algorithm)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn insert_audit_entry<'e, E>(
        executor: E,
        entry: &IntegrityAuditEntry,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"
            INSERT INTO integrity_audit_log (id, budget_id, event_type, approval_hash,
                                             execution_hash, actor, occurred_at, outcome,
                                             detail, algorithm, entry_hash)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id.to_string())
        .bind(entry.budget_id.to_string())
        .bind(entry.event_type.as_str())
        .bind(&entry.approval_hash)
        .bind(&entry.execution_hash)
        .bind(entry.actor.to_string())
        .bind(entry.timestamp)
        .bind(entry.outcome.as_str())
        .bind(&entry.detail)
        .bind(&entry.algorithm)
        .bind(&entry.entry_hash)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn get_audit_entries<'e, E>(
        executor: E,
        budget_id: Uuid,
    ) -> Result<Vec<AuditEntryRow>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, AuditEntryRow>(
            r#"
            SELECT id, budget_id, event_type, approval_hash, execution_hash, actor,
                   occurred_at, outcome, detail, algorithm, entry_hash
            FROM integrity_audit_log
            WHERE budget_id = ?
            ORDER BY occurred_at, rowid
            "#,
        )
        .bind(budget_id.to_string())
        .fetch_all(executor)
        .await
    }
}
