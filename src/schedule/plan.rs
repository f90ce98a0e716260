//! Project schedule plan and its freeze record.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BaselineError;

pub const SNAPSHOT_ALGORITHM: &str = "TEMPORAL-SNAPSHOT-v1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanFreeze {
    pub frozen_at: DateTime<Utc>,
    pub frozen_by: Uuid,
    pub snapshot_algorithm: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulePlan {
    id: Uuid,
    project_id: Uuid,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    freeze: Option<PlanFreeze>,
    version: i64,
}

#[derive(Debug, Clone)]
pub struct SchedulePlanRecord {
    pub id: Uuid,
    pub project_id: Uuid,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub frozen_at: Option<DateTime<Utc>>,
    pub frozen_by: Option<Uuid>,
    pub snapshot_algorithm: Option<String>,
    pub version: i64,
}

fn check_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<(), BaselineError> {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(BaselineError::ValidationError(format!(
                "End date {} precedes start date {}",
                end, start
            )));
        }
    }
    Ok(())
}

impl SchedulePlan {
    pub fn new(
        project_id: Uuid,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Self, BaselineError> {
        check_range(start_date, end_date)?;
        Ok(Self {
            id: Uuid::new_v4(),
            project_id,
            start_date,
            end_date,
            freeze: None,
            version: 0,
        })
    }

    pub fn restore(record: SchedulePlanRecord) -> Result<Self, BaselineError> {
        check_range(record.start_date, record.end_date)?;
        let freeze = match (record.frozen_at, record.frozen_by, record.snapshot_algorithm) {
            (None, None, None) => None,
            (Some(frozen_at), Some(frozen_by), Some(snapshot_algorithm)) => Some(PlanFreeze {
                frozen_at,
                frozen_by,
                snapshot_algorithm,
            }),
            _ => {
                return Err(BaselineError::ValidationError(format!(
                    "Schedule plan {}: partial freeze record",
                    record.id
                )))
            }
        };
        Ok(Self {
            id: record.id,
            project_id: record.project_id,
            start_date: record.start_date,
            end_date: record.end_date,
            freeze,
            version: record.version,
        })
    }

    pub fn to_record(&self) -> SchedulePlanRecord {
        SchedulePlanRecord {
            id: self.id,
            project_id: self.project_id,
            start_date: self.start_date,
            end_date: self.end_date,
            frozen_at: self.freeze.as_ref().map(|f| f.frozen_at),
            frozen_by: self.freeze.as_ref().map(|f| f.frozen_by),
            snapshot_algorithm: self.freeze.as_ref().map(|f| f.snapshot_algorithm.clone()),
            version: self.version,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn project_id(&self) -> Uuid {
        self.project_id
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start_date
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }

    pub fn freeze_record(&self) -> Option<&PlanFreeze> {
        self.freeze.as_ref()
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn is_frozen(&self) -> bool {
        self.freeze.is_some()
    }

    /// Inclusive day count between start and end, when both are known.
    pub fn duration_days(&self) -> Option<i64> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => Some((end - start).num_days() + 1),
            _ => None,
        }
    }

    fn guard_not_frozen(&self, operation: &str) -> Result<(), BaselineError> {
        if self.is_frozen() {
            return Err(BaselineError::schedule_frozen(self.id, operation));
        }
        Ok(())
    }

    pub fn update_dates(
        &mut self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<(), BaselineError> {
        self.guard_not_frozen("update_dates")?;
        check_range(start_date, end_date)?;
        self.start_date = start_date;
        self.end_date = end_date;
        Ok(())
    }

    /// Push the end date out to the latest activity end. Never pulls it in.
    pub fn extend_end_to(&mut self, latest_activity_end: NaiveDate) -> Result<(), BaselineError> {
        self.guard_not_frozen("extend_end_to")?;
        check_range(self.start_date, Some(latest_activity_end))?;
        match self.end_date {
            Some(end) if end >= latest_activity_end => {}
            _ => self.end_date = Some(latest_activity_end),
        }
        Ok(())
    }

    pub fn freeze(&mut self, actor: Uuid, at: DateTime<Utc>) -> Result<(), BaselineError> {
        if self.is_frozen() {
            return Err(BaselineError::StateError(format!(
                "Schedule plan {} is already frozen",
                self.id
            )));
        }
        if self.start_date.is_none() || self.end_date.is_none() {
            return Err(BaselineError::StateError(format!(
                "Schedule plan {} needs start and end dates before it can be frozen",
                self.id
            )));
        }
        self.freeze = Some(PlanFreeze {
            frozen_at: at,
            frozen_by: actor,
            snapshot_algorithm: SNAPSHOT_ALGORITHM.to_string(),
        });
        Ok(())
    }
}
