use chrono::{DateTime, NaiveDate, Utc};
use shared::{AppError, AppResult};
use sqlx::PgPool;
use uuid::Uuid;

use super::parse_stored;
use crate::domain::models::{DrugCategory, MonitoringTask, TaskStatus, WorklistRow};
use crate::domain::repositories::TaskRepository;
use crate::infrastructure::database::queries::tasks::*;

pub struct PgTaskRepository {
    pool: PgPool,
}

impl PgTaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: Uuid,
    patient_id: Uuid,
    medication_order_id: Uuid,
    test_type: String,
    due_date: NaiveDate,
    status: String,
    assigned_to: Option<String>,
    completed_at: Option<DateTime<Utc>>,
    waived_reason: Option<String>,
    waived_until: Option<NaiveDate>,
}

impl TryFrom<TaskRow> for MonitoringTask {
    type Error = AppError;

    fn try_from(row: TaskRow) -> AppResult<Self> {
        Ok(MonitoringTask {
            id: row.id,
            patient_id: row.patient_id,
            medication_order_id: row.medication_order_id,
            test_type: row.test_type,
            due_date: row.due_date,
            status: parse_stored::<TaskStatus>(&row.status, "task status")?,
            assigned_to: row.assigned_to,
            completed_at: row.completed_at,
            waived_reason: row.waived_reason,
            waived_until: row.waived_until,
        })
    }
}

#[derive(sqlx::FromRow)]
struct WorklistDbRow {
    task_id: Uuid,
    patient_id: Uuid,
    pseudonym: String,
    drug_name: String,
    start_date: NaiveDate,
    hdat: bool,
    test_type: String,
    due_date: NaiveDate,
    assigned_to: Option<String>,
    status: String,
}

fn rows_to_tasks(rows: Vec<TaskRow>) -> AppResult<Vec<MonitoringTask>> {
    rows.into_iter().map(MonitoringTask::try_from).collect()
}

#[async_trait::async_trait]
impl TaskRepository for PgTaskRepository {
    async fn insert(&self, task: &MonitoringTask) -> AppResult<()> {
        sqlx::query(TASK_INSERT)
            .bind(task.id)
            .bind(task.patient_id)
            .bind(task.medication_order_id)
            .bind(&task.test_type)
            .bind(task.due_date)
            .bind(task.status.to_string())
            .bind(&task.assigned_to)
            .bind(task.completed_at)
            .bind(&task.waived_reason)
            .bind(task.waived_until)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update(&self, task: &MonitoringTask) -> AppResult<()> {
        let result = sqlx::query(TASK_UPDATE)
            .bind(task.id)
            .bind(task.due_date)
            .bind(task.status.to_string())
            .bind(&task.assigned_to)
            .bind(task.completed_at)
            .bind(&task.waived_reason)
            .bind(task.waived_until)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("task {}", task.id)));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<MonitoringTask>> {
        let row: Option<TaskRow> = sqlx::query_as(TASK_FIND_BY_ID)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(MonitoringTask::try_from).transpose()
    }

    async fn find_matching(
        &self,
        patient_id: Uuid,
        medication_order_id: Uuid,
        test_type: &str,
        window_start: NaiveDate,
        window_end: NaiveDate,
    ) -> AppResult<Option<MonitoringTask>> {
        let row: Option<TaskRow> = sqlx::query_as(TASK_FIND_MATCHING)
            .bind(patient_id)
            .bind(medication_order_id)
            .bind(test_type)
            .bind(window_start)
            .bind(window_end)
            .fetch_optional(&self.pool)
            .await?;
        row.map(MonitoringTask::try_from).transpose()
    }

    async fn list_for_patient_with_statuses(
        &self,
        patient_id: Uuid,
        statuses: &[TaskStatus],
    ) -> AppResult<Vec<MonitoringTask>> {
        let status_strings: Vec<String> = statuses.iter().map(ToString::to_string).collect();
        let rows: Vec<TaskRow> = sqlx::query_as(TASK_LIST_FOR_PATIENT_WITH_STATUSES)
            .bind(patient_id)
            .bind(status_strings)
            .fetch_all(&self.pool)
            .await?;
        rows_to_tasks(rows)
    }

    async fn list_with_status(&self, status: TaskStatus) -> AppResult<Vec<MonitoringTask>> {
        let rows: Vec<TaskRow> = sqlx::query_as(TASK_LIST_WITH_STATUS)
            .bind(status.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows_to_tasks(rows)
    }

    async fn mark_due_tasks_overdue(&self, today: NaiveDate) -> AppResult<u64> {
        let result = sqlx::query(TASK_MARK_DUE_OVERDUE)
            .bind(today)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn expired_waivers(&self, today: NaiveDate) -> AppResult<Vec<MonitoringTask>> {
        let rows: Vec<TaskRow> = sqlx::query_as(TASK_EXPIRED_WAIVERS)
            .bind(today)
            .fetch_all(&self.pool)
            .await?;
        rows_to_tasks(rows)
    }

    async fn earliest_open_assigned(
        &self,
        patient_id: Uuid,
    ) -> AppResult<Option<MonitoringTask>> {
        let row: Option<TaskRow> = sqlx::query_as(TASK_EARLIEST_OPEN_ASSIGNED)
            .bind(patient_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(MonitoringTask::try_from).transpose()
    }

    async fn worklist(
        &self,
        status: Option<TaskStatus>,
        drug_category: Option<DrugCategory>,
    ) -> AppResult<Vec<WorklistRow>> {
        let rows: Vec<WorklistDbRow> = sqlx::query_as(TASK_WORKLIST)
            .bind(status.map(|s| s.to_string()))
            .bind(drug_category.map(|c| c.to_string()))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|row| {
                Ok(WorklistRow {
                    task_id: row.task_id,
                    patient_id: row.patient_id,
                    pseudonym: row.pseudonym,
                    drug_name: row.drug_name,
                    start_date: row.start_date,
                    hdat: row.hdat,
                    test_type: row.test_type,
                    due_date: row.due_date,
                    assigned_to: row.assigned_to,
                    status: parse_stored::<TaskStatus>(&row.status, "task status")?,
                })
            })
            .collect()
    }
}
