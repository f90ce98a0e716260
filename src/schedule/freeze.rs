//! Freezes a schedule plan and captures its snapshot in one step.

use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::BaselineError;
use crate::repository::ActivityQuery;
use crate::schedule::plan::SchedulePlan;
use crate::schedule::snapshot::ScheduleSnapshot;

pub struct ScheduleFreezeService {
    activities: Arc<dyn ActivityQuery>,
    clock: Arc<dyn Clock>,
}

impl ScheduleFreezeService {
    pub fn new(activities: Arc<dyn ActivityQuery>, clock: Arc<dyn Clock>) -> Self {
        Self { activities, clock }
    }

    /// Freeze `plan` in memory and build the snapshot tied to `budget_id`.
    ///
    /// On error the plan is left unfrozen. Nothing is persisted here.
    pub async fn freeze_plan(
        &self,
        plan: &mut SchedulePlan,
        budget_id: Uuid,
        actor: Uuid,
    ) -> Result<ScheduleSnapshot, BaselineError> {
        let activities = self.activities.activities_of(plan.id()).await?;
        let now = self.clock.now();

        let mut frozen = plan.clone();
        frozen.freeze(actor, now)?;
        let snapshot = ScheduleSnapshot::capture(&frozen, &activities, budget_id, now)?;
        *plan = frozen;

        info!(
            "Schedule plan {} frozen for budget {} ({} activities)",
            plan.id(),
            budget_id,
            activities.len()
        );
        Ok(snapshot)
    }
}
