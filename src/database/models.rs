//! Row types as stored in SQLite and their conversion to domain values.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use crate::audit::entry::IntegrityAuditEntry;
use crate::budget::{
    Budget, BudgetLine, BudgetRecord, InputSnapshot, UnitPriceSnapshot, UnitPriceSnapshotRecord,
};
use crate::error::BaselineError;
use crate::schedule::{ScheduleSnapshot, ScheduledActivity, SchedulePlan, SchedulePlanRecord};

pub(crate) fn parse_uuid(column: &str, value: &str) -> Result<Uuid, BaselineError> {
    Uuid::parse_str(value).map_err(|e| {
        BaselineError::SerializationError(format!("Invalid UUID in {}: {} ({})", column, value, e))
    })
}

fn parse_opt_uuid(column: &str, value: Option<&str>) -> Result<Option<Uuid>, BaselineError> {
    value.map(|v| parse_uuid(column, v)).transpose()
}

pub(crate) fn parse_decimal(column: &str, value: &str) -> Result<Decimal, BaselineError> {
    Decimal::from_str(value).map_err(|e| {
        BaselineError::SerializationError(format!(
            "Invalid decimal in {}: {} ({})",
            column, value, e
        ))
    })
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BudgetRow {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub contractual: bool,
    pub approval_hash: Option<String>,
    pub execution_hash: Option<String>,
    pub integrity_algorithm: Option<String>,
    pub sealed_by: Option<String>,
    pub sealed_at: Option<DateTime<Utc>>,
    pub version: i64,
}

impl TryFrom<BudgetRow> for Budget {
    type Error = BaselineError;

    fn try_from(row: BudgetRow) -> Result<Self, Self::Error> {
        Budget::restore(BudgetRecord {
            id: parse_uuid("budgets.id", &row.id)?,
            project_id: parse_uuid("budgets.project_id", &row.project_id)?,
            name: row.name,
            contractual: row.contractual,
            approval_hash: row.approval_hash,
            execution_hash: row.execution_hash,
            algorithm: row.integrity_algorithm,
            sealed_by: parse_opt_uuid("budgets.sealed_by", row.sealed_by.as_deref())?,
            sealed_at: row.sealed_at,
            version: row.version,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BudgetLineRow {
    pub id: String,
    pub budget_id: String,
    pub parent_id: Option<String>,
    pub item_code: String,
    pub description: String,
    pub unit: Option<String>,
    pub quantity: String,
    pub assigned_amount: String,
    pub level: i64,
    pub actual_spend: String,
    pub pending_commitments: String,
    pub version: i64,
}

impl TryFrom<BudgetLineRow> for BudgetLine {
    type Error = BaselineError;

    fn try_from(row: BudgetLineRow) -> Result<Self, Self::Error> {
        let level = u32::try_from(row.level).map_err(|_| {
            BaselineError::SerializationError(format!(
                "Invalid level {} for line {}",
                row.level, row.id
            ))
        })?;
        Ok(BudgetLine {
            id: parse_uuid("budget_lines.id", &row.id)?,
            budget_id: parse_uuid("budget_lines.budget_id", &row.budget_id)?,
            parent_id: parse_opt_uuid("budget_lines.parent_id", row.parent_id.as_deref())?,
            item_code: row.item_code,
            description: row.description,
            unit: row.unit,
            quantity: parse_decimal("budget_lines.quantity", &row.quantity)?,
            assigned_amount: parse_decimal("budget_lines.assigned_amount", &row.assigned_amount)?,
            level,
            actual_spend: parse_decimal("budget_lines.actual_spend", &row.actual_spend)?,
            pending_commitments: parse_decimal(
                "budget_lines.pending_commitments",
                &row.pending_commitments,
            )?,
            version: row.version,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UnitPriceSnapshotRow {
    pub id: String,
    pub line_id: String,
    pub external_catalog_id: String,
    pub catalog_source: String,
    pub original_yield: String,
    pub current_yield: String,
    pub yield_changed_by: Option<String>,
    pub yield_changed_at: Option<DateTime<Utc>>,
    pub unit: String,
    pub captured_at: DateTime<Utc>,
    pub inputs: String,
}

impl TryFrom<UnitPriceSnapshotRow> for UnitPriceSnapshot {
    type Error = BaselineError;

    fn try_from(row: UnitPriceSnapshotRow) -> Result<Self, Self::Error> {
        let inputs: Vec<InputSnapshot> = serde_json::from_str(&row.inputs)?;
        UnitPriceSnapshot::restore(UnitPriceSnapshotRecord {
            id: parse_uuid("unit_price_snapshots.id", &row.id)?,
            line_id: parse_uuid("unit_price_snapshots.line_id", &row.line_id)?,
            external_catalog_id: row.external_catalog_id,
            catalog_source: row.catalog_source,
            original_yield: parse_decimal("unit_price_snapshots.original_yield", &row.original_yield)?,
            current_yield: parse_decimal("unit_price_snapshots.current_yield", &row.current_yield)?,
            yield_changed_by: parse_opt_uuid(
                "unit_price_snapshots.yield_changed_by",
                row.yield_changed_by.as_deref(),
            )?,
            yield_changed_at: row.yield_changed_at,
            unit: row.unit,
            captured_at: row.captured_at,
            inputs,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SchedulePlanRow {
    pub id: String,
    pub project_id: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub frozen_at: Option<DateTime<Utc>>,
    pub frozen_by: Option<String>,
    pub snapshot_algorithm: Option<String>,
    pub version: i64,
}

impl TryFrom<SchedulePlanRow> for SchedulePlan {
    type Error = BaselineError;

    fn try_from(row: SchedulePlanRow) -> Result<Self, Self::Error> {
        SchedulePlan::restore(SchedulePlanRecord {
            id: parse_uuid("schedule_plans.id", &row.id)?,
            project_id: parse_uuid("schedule_plans.project_id", &row.project_id)?,
            start_date: row.start_date,
            end_date: row.end_date,
            frozen_at: row.frozen_at,
            frozen_by: parse_opt_uuid("schedule_plans.frozen_by", row.frozen_by.as_deref())?,
            snapshot_algorithm: row.snapshot_algorithm,
            version: row.version,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ActivityRow {
    pub id: String,
    pub plan_id: String,
    pub line_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub predecessors: String,
}

impl TryFrom<ActivityRow> for ScheduledActivity {
    type Error = BaselineError;

    fn try_from(row: ActivityRow) -> Result<Self, Self::Error> {
        Ok(ScheduledActivity {
            id: parse_uuid("scheduled_activities.id", &row.id)?,
            plan_id: parse_uuid("scheduled_activities.plan_id", &row.plan_id)?,
            line_id: parse_uuid("scheduled_activities.line_id", &row.line_id)?,
            start_date: row.start_date,
            end_date: row.end_date,
            predecessors: serde_json::from_str(&row.predecessors)?,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScheduleSnapshotRow {
    pub id: String,
    pub plan_id: String,
    pub budget_id: String,
    pub dates_json: String,
    pub durations_json: String,
    pub sequence_json: String,
    pub calendars_json: String,
    pub captured_at: DateTime<Utc>,
    pub algorithm: String,
}

impl TryFrom<ScheduleSnapshotRow> for ScheduleSnapshot {
    type Error = BaselineError;

    fn try_from(row: ScheduleSnapshotRow) -> Result<Self, Self::Error> {
        Ok(ScheduleSnapshot {
            id: parse_uuid("schedule_snapshots.id", &row.id)?,
            plan_id: parse_uuid("schedule_snapshots.plan_id", &row.plan_id)?,
            budget_id: parse_uuid("schedule_snapshots.budget_id", &row.budget_id)?,
            dates: serde_json::from_str(&row.dates_json)?,
            durations: serde_json::from_str(&row.durations_json)?,
            sequence: serde_json::from_str(&row.sequence_json)?,
            calendars: serde_json::from_str(&row.calendars_json)?,
            captured_at: row.captured_at,
            algorithm: row.algorithm,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuditEntryRow {
    pub id: String,
    pub budget_id: String,
    pub event_type: String,
    pub approval_hash: Option<String>,
    pub execution_hash: Option<String>,
    pub actor: String,
    pub occurred_at: DateTime<Utc>,
    pub outcome: String,
    pub detail: Option<String>,
    pub algorithm: String,
    pub entry_hash: String,
}

impl TryFrom<AuditEntryRow> for IntegrityAuditEntry {
    type Error = BaselineError;

    fn try_from(row: AuditEntryRow) -> Result<Self, Self::Error> {
        Ok(IntegrityAuditEntry {
            id: parse_uuid("integrity_audit_log.id", &row.id)?,
            budget_id: parse_uuid("integrity_audit_log.budget_id", &row.budget_id)?,
            event_type: row.event_type.parse()?,
            approval_hash: row.approval_hash,
            execution_hash: row.execution_hash,
            actor: parse_uuid("integrity_audit_log.actor", &row.actor)?,
            timestamp: row.occurred_at,
            outcome: row.outcome.parse()?,
            detail: row.detail,
            algorithm: row.algorithm,
            entry_hash: row.entry_hash,
        })
    }
}
