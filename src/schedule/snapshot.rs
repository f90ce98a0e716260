//! Immutable temporal snapshot captured when a plan is frozen.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::BaselineError;
use crate::schedule::activity::ScheduledActivity;
use crate::schedule::plan::{SchedulePlan, SNAPSHOT_ALGORITHM};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSnapshot {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub budget_id: Uuid,
    pub dates: Value,
    pub durations: Value,
    pub sequence: Value,
    pub calendars: Value,
    pub captured_at: DateTime<Utc>,
    pub algorithm: String,
}

impl ScheduleSnapshot {
    /// Capture the plan and its activities. The plan must carry both dates.
    pub fn capture(
        plan: &SchedulePlan,
        activities: &[ScheduledActivity],
        budget_id: Uuid,
        captured_at: DateTime<Utc>,
    ) -> Result<Self, BaselineError> {
        let (start, end, total_days) =
            match (plan.start_date(), plan.end_date(), plan.duration_days()) {
                (Some(start), Some(end), Some(days)) => (start, end, days),
                _ => {
                    return Err(BaselineError::StateError(format!(
                        "Schedule plan {} has no complete date range to snapshot",
                        plan.id()
                    )))
                }
            };

        let mut ordered: Vec<&ScheduledActivity> = activities.iter().collect();
        ordered.sort_by_key(|a| (a.start_date, a.id));

        let dates = json!({
            "plan": { "start": start, "end": end },
            "activities": ordered.iter().map(|a| json!({
                "id": a.id,
                "line_id": a.line_id,
                "start": a.start_date,
                "end": a.end_date,
            })).collect::<Vec<_>>(),
        });

        let durations = json!({
            "total_days": total_days,
            "activities": ordered.iter().map(|a| json!({
                "id": a.id,
                "line_id": a.line_id,
                "duration_days": a.duration_days(),
            })).collect::<Vec<_>>(),
        });

        let sequence = json!({
            "activities": ordered.iter().map(|a| json!({
                "id": a.id,
                "line_id": a.line_id,
                "predecessors": a.predecessors,
            })).collect::<Vec<_>>(),
        });

        // Calendars are not modelled yet.
        let calendars = json!({
            "calendars": [],
            "holidays": [],
            "constraints": [],
        });

        Ok(Self {
            id: Uuid::new_v4(),
            plan_id: plan.id(),
            budget_id,
            dates,
            durations,
            sequence,
            calendars,
            captured_at,
            algorithm: SNAPSHOT_ALGORITHM.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    #[test]
    fn test_payloads() {
        let plan = SchedulePlan::new(Uuid::new_v4(), Some(date(1, 1)), Some(date(1, 10))).unwrap();
        let first = ScheduledActivity::new(plan.id(), Uuid::new_v4(), date(1, 1), date(1, 4), vec![])
            .unwrap();
        let second = ScheduledActivity::new(
            plan.id(),
            Uuid::new_v4(),
            date(1, 5),
            date(1, 10),
            vec![first.id],
        )
        .unwrap();

        let snapshot = ScheduleSnapshot::capture(
            &plan,
            &[second.clone(), first.clone()],
            Uuid::new_v4(),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(snapshot.algorithm, "TEMPORAL-SNAPSHOT-v1");
        assert_eq!(snapshot.dates["plan"]["start"], "2024-01-01");
        assert_eq!(snapshot.dates["activities"][0]["id"], json!(first.id));
        assert_eq!(snapshot.durations["total_days"], 10);
        assert_eq!(snapshot.durations["activities"][1]["duration_days"], 6);
        assert_eq!(
            snapshot.sequence["activities"][1]["predecessors"],
            json!([first.id])
        );
        assert_eq!(snapshot.calendars["holidays"], json!([]));
    }

    #[test]
    fn test_incomplete_plan_rejected() {
        let plan = SchedulePlan::new(Uuid::new_v4(), Some(date(1, 1)), None).unwrap();
        assert!(ScheduleSnapshot::capture(&plan, &[], Uuid::new_v4(), Utc::now()).is_err());
    }
}
