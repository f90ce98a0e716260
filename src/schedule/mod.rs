//! Schedule plans, their activities and the freeze that accompanies budget approval.

pub mod activity;
pub mod freeze;
pub mod plan;
pub mod snapshot;

pub use activity::ScheduledActivity;
pub use freeze::ScheduleFreezeService;
pub use plan::{PlanFreeze, SchedulePlan, SchedulePlanRecord, SNAPSHOT_ALGORITHM};
pub use snapshot::ScheduleSnapshot;
