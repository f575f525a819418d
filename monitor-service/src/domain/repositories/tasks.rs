use chrono::NaiveDate;
use shared::AppResult;
use uuid::Uuid;

use crate::domain::models::{DrugCategory, MonitoringTask, TaskStatus, WorklistRow};

#[async_trait::async_trait]
pub trait TaskRepository: Send + Sync {
    async fn insert(&self, task: &MonitoringTask) -> AppResult<()>;

    async fn update(&self, task: &MonitoringTask) -> AppResult<()>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<MonitoringTask>>;

    /// Locate an existing task for reconciliation: same patient, medication
    /// and test type, due within [window_start, window_end]. This lookup is
    /// the serialization point for concurrent reconciles.
    async fn find_matching(
        &self,
        patient_id: Uuid,
        medication_order_id: Uuid,
        test_type: &str,
        window_start: NaiveDate,
        window_end: NaiveDate,
    ) -> AppResult<Option<MonitoringTask>>;

    async fn list_for_patient_with_statuses(
        &self,
        patient_id: Uuid,
        statuses: &[TaskStatus],
    ) -> AppResult<Vec<MonitoringTask>>;

    async fn list_with_status(&self, status: TaskStatus) -> AppResult<Vec<MonitoringTask>>;

    /// Flip DUE tasks with due_date < today to OVERDUE; returns the count.
    async fn mark_due_tasks_overdue(&self, today: NaiveDate) -> AppResult<u64>;

    /// Waived tasks whose waiver expired before today.
    async fn expired_waivers(&self, today: NaiveDate) -> AppResult<Vec<MonitoringTask>>;

    /// The earliest-due open task for the patient that has an assignee.
    async fn earliest_open_assigned(&self, patient_id: Uuid) -> AppResult<Option<MonitoringTask>>;

    /// Tasks joined with medication and patient, filtered and sorted by
    /// due date ascending.
    async fn worklist(
        &self,
        status: Option<TaskStatus>,
        drug_category: Option<DrugCategory>,
    ) -> AppResult<Vec<WorklistRow>>;
}
