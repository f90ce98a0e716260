//! Scheduled activity, one per budget line on the plan.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BaselineError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledActivity {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub line_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub predecessors: Vec<Uuid>,
}

impl ScheduledActivity {
    pub fn new(
        plan_id: Uuid,
        line_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
        predecessors: Vec<Uuid>,
    ) -> Result<Self, BaselineError> {
        if end_date < start_date {
            return Err(BaselineError::ValidationError(format!(
                "Activity for line {}: end {} precedes start {}",
                line_id, end_date, start_date
            )));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            plan_id,
            line_id,
            start_date,
            end_date,
            predecessors,
        })
    }

    pub fn duration_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}
