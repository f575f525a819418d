//! Daily sweep: status transitions, waiver reactivation, then overdue and
//! escalation notifications, in that order.

use shared::AppResult;
use tracing::{info, instrument};

use crate::services::notification_engine::NotificationEngine;
use crate::services::task_generator::TaskGenerator;

#[derive(Debug, Clone, Copy, Default)]
pub struct SweepSummary {
    pub tasks_marked_overdue: u64,
    pub waivers_reactivated: u64,
    pub notifications_created: u64,
}

pub struct DailySweep {
    task_generator: TaskGenerator,
    notification_engine: NotificationEngine,
}

impl DailySweep {
    pub fn new(task_generator: TaskGenerator, notification_engine: NotificationEngine) -> Self {
        Self {
            task_generator,
            notification_engine,
        }
    }

    /// One sweep tick. Errors propagate so the scheduler can back off and
    /// retry on the next tick without partial bookkeeping.
    #[instrument(skip_all)]
    pub async fn run(&self) -> AppResult<SweepSummary> {
        let tasks_marked_overdue = self.task_generator.update_task_statuses().await?;
        let waivers_reactivated = self.task_generator.reactivate_expired_waivers().await?;
        let notifications_created = self.notification_engine.process_overdue_tasks().await?;

        let summary = SweepSummary {
            tasks_marked_overdue,
            waivers_reactivated,
            notifications_created,
        };
        info!(
            tasks_marked_overdue,
            waivers_reactivated, notifications_created, "daily sweep finished"
        );
        Ok(summary)
    }
}
