//! Task persistence and lifecycle: reconcile calculated calendars against
//! stored tasks and drive status transitions.

use std::sync::Arc;

use chrono::{Days, NaiveDate, Utc};
use serde_json::json;
use shared::config::MonitoringConfig;
use shared::{AppError, AppResult, AuditAction, AuditRecord};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::models::{MonitoringEvent, MonitoringTask, TaskStatus};
use crate::domain::repositories::{AuditRepository, TaskRepository};
use crate::services::scheduling::{matches_test_type, utc_midnight};

const ENTITY_TYPE: &str = "MonitoringTask";

pub struct TaskGenerator {
    tasks: Arc<dyn TaskRepository>,
    audit: Arc<dyn AuditRepository>,
    window_days: i64,
}

impl TaskGenerator {
    pub fn new(
        tasks: Arc<dyn TaskRepository>,
        audit: Arc<dyn AuditRepository>,
        config: &MonitoringConfig,
    ) -> Self {
        Self {
            tasks,
            audit,
            window_days: config.task_window_days,
        }
    }

    /// Reconcile calculated tasks against persisted ones. Matches on
    /// (patient, medication, test type, due date ± window). Terminal tasks
    /// are left untouched; drifted tasks get their due date and status
    /// updated; everything else is inserted.
    #[instrument(skip_all, fields(calculated = calculated_tasks.len()))]
    pub async fn create_or_update_tasks(
        &self,
        calculated_tasks: Vec<MonitoringTask>,
        actor: &str,
    ) -> AppResult<Vec<MonitoringTask>> {
        let today = Utc::now().date_naive();
        let mut saved = Vec::new();

        for mut calc_task in calculated_tasks {
            if calc_task.is_open() {
                calc_task.status = if calc_task.due_date < today
                    && calc_task.status == TaskStatus::Due
                {
                    TaskStatus::Overdue
                } else {
                    calc_task.status
                };
            }

            let (window_start, window_end) = self.window_around(calc_task.due_date);
            let existing = self
                .tasks
                .find_matching(
                    calc_task.patient_id,
                    calc_task.medication_order_id,
                    &calc_task.test_type,
                    window_start,
                    window_end,
                )
                .await?;

            match existing {
                Some(task) if task.is_terminal() => continue,
                Some(mut task) => {
                    if task.due_date != calc_task.due_date || task.status != calc_task.status {
                        task.due_date = calc_task.due_date;
                        task.status = calc_task.status;
                        self.tasks.update(&task).await?;
                        self.audit_update(actor, task.id, json!({"updated": true}))
                            .await?;
                        saved.push(task);
                    }
                }
                None => {
                    self.tasks.insert(&calc_task).await?;
                    self.audit_update(actor, calc_task.id, json!({"created": true}))
                        .await?;
                    saved.push(calc_task);
                }
            }
        }

        Ok(saved)
    }

    /// Daily sweep step one: DUE tasks past their due date become OVERDUE.
    pub async fn update_task_statuses(&self) -> AppResult<u64> {
        let today = Utc::now().date_naive();
        let updated = self.tasks.mark_due_tasks_overdue(today).await?;
        if updated > 0 {
            info!(updated, "marked due tasks overdue");
        }
        Ok(updated)
    }

    /// Close a task against a monitoring event. Idempotent when the task is
    /// already DONE.
    pub async fn mark_task_done(
        &self,
        task_id: Uuid,
        completed_by: &str,
        event: &MonitoringEvent,
    ) -> AppResult<MonitoringTask> {
        let mut task = self
            .tasks
            .find_by_id(task_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("task {task_id} not found")))?;
        if task.status == TaskStatus::Done {
            return Ok(task);
        }

        task.status = TaskStatus::Done;
        task.completed_at = Some(utc_midnight(event.performed_date));
        self.tasks.update(&task).await?;
        self.audit_update(completed_by, task.id, json!({"status": "DONE"}))
            .await?;
        Ok(task)
    }

    /// Set a task aside with a reason, optionally until a review date.
    pub async fn waive_task(
        &self,
        task_id: Uuid,
        waived_by: &str,
        reason: &str,
        waived_until: Option<NaiveDate>,
    ) -> AppResult<MonitoringTask> {
        let mut task = self
            .tasks
            .find_by_id(task_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("task {task_id} not found")))?;

        task.status = TaskStatus::Waived;
        task.waived_reason = Some(reason.to_string());
        task.waived_until = waived_until;
        self.tasks.update(&task).await?;

        let record = AuditRecord::new(
            waived_by,
            AuditAction::Waive,
            ENTITY_TYPE,
            task.id.to_string(),
            json!({"reason": reason}),
        );
        self.audit.record(&record).await?;
        Ok(task)
    }

    /// Daily sweep step two: waivers past their review date drop back to
    /// OVERDUE with the waiver fields cleared.
    pub async fn reactivate_expired_waivers(&self) -> AppResult<u64> {
        let today = Utc::now().date_naive();
        let expired = self.tasks.expired_waivers(today).await?;
        let count = expired.len() as u64;
        for mut task in expired {
            task.status = TaskStatus::Overdue;
            task.waived_reason = None;
            task.waived_until = None;
            self.tasks.update(&task).await?;
        }
        if count > 0 {
            info!(count, "reactivated expired waivers");
        }
        Ok(count)
    }

    /// Close every open task the event satisfies: matching test type and a
    /// due date within ± window of the performed date.
    #[instrument(skip_all, fields(event_id = %event.id, test_type = %event.test_type))]
    pub async fn auto_complete_tasks_for_event(
        &self,
        event: &MonitoringEvent,
        actor: &str,
    ) -> AppResult<Vec<MonitoringTask>> {
        let (window_start, window_end) = self.window_around(event.performed_date);
        let open_tasks = self
            .tasks
            .list_for_patient_with_statuses(
                event.patient_id,
                &[TaskStatus::Due, TaskStatus::Overdue],
            )
            .await?;

        let mut completed = Vec::new();
        for mut task in open_tasks {
            if !matches_test_type(&task.test_type, &event.test_type) {
                continue;
            }
            if task.due_date < window_start || task.due_date > window_end {
                continue;
            }
            task.status = TaskStatus::Done;
            task.completed_at = Some(utc_midnight(event.performed_date));
            self.tasks.update(&task).await?;
            self.audit_update(
                actor,
                task.id,
                json!({"status": "DONE", "auto_completed": true}),
            )
            .await?;
            completed.push(task);
        }
        Ok(completed)
    }

    fn window_around(&self, date: NaiveDate) -> (NaiveDate, NaiveDate) {
        let window = Days::new(self.window_days.max(0) as u64);
        (
            date.checked_sub_days(window).unwrap_or(NaiveDate::MIN),
            date.checked_add_days(window).unwrap_or(NaiveDate::MAX),
        )
    }

    async fn audit_update(
        &self,
        actor: &str,
        task_id: Uuid,
        details: serde_json::Value,
    ) -> AppResult<()> {
        let record = AuditRecord::new(
            actor,
            AuditAction::Update,
            ENTITY_TYPE,
            task_id.to_string(),
            details,
        );
        self.audit.record(&record).await
    }
}
