use chrono::{DateTime, Utc};
use shared::{AppError, AppResult};
use sqlx::PgPool;
use uuid::Uuid;

use super::parse_stored;
use crate::domain::models::{
    InAppNotification, NotificationPriority, NotificationStatus, NotificationType, Recipient,
    RecipientType,
};
use crate::domain::repositories::{NotificationFilter, NotificationRepository};
use crate::infrastructure::database::queries::notifications::*;

pub struct PgNotificationRepository {
    pool: PgPool,
}

impl PgNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    recipient_type: String,
    recipient_id: String,
    notification_type: String,
    priority: String,
    status: String,
    title: String,
    message: String,
    payload: serde_json::Value,
    patient_id: Option<Uuid>,
    task_id: Option<Uuid>,
    event_id: Option<Uuid>,
    dedupe_key: String,
    viewed_at: Option<DateTime<Utc>>,
    acked_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for InAppNotification {
    type Error = AppError;

    fn try_from(row: NotificationRow) -> AppResult<Self> {
        Ok(InAppNotification {
            id: row.id,
            recipient: Recipient {
                recipient_type: parse_stored::<RecipientType>(
                    &row.recipient_type,
                    "recipient type",
                )?,
                recipient_id: row.recipient_id,
            },
            notification_type: parse_stored::<NotificationType>(
                &row.notification_type,
                "notification type",
            )?,
            priority: parse_stored::<NotificationPriority>(&row.priority, "priority")?,
            status: parse_stored::<NotificationStatus>(&row.status, "notification status")?,
            title: row.title,
            message: row.message,
            payload: row.payload,
            patient_id: row.patient_id,
            task_id: row.task_id,
            event_id: row.event_id,
            dedupe_key: row.dedupe_key,
            viewed_at: row.viewed_at,
            acked_at: row.acked_at,
            created_at: row.created_at,
        })
    }
}

#[async_trait::async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn insert_if_absent(&self, notification: &InAppNotification) -> AppResult<bool> {
        let result = sqlx::query(NOTIFICATION_INSERT_IF_ABSENT)
            .bind(notification.id)
            .bind(notification.recipient.recipient_type.to_string())
            .bind(&notification.recipient.recipient_id)
            .bind(notification.notification_type.to_string())
            .bind(notification.priority.to_string())
            .bind(notification.status.to_string())
            .bind(&notification.title)
            .bind(&notification.message)
            .bind(&notification.payload)
            .bind(notification.patient_id)
            .bind(notification.task_id)
            .bind(notification.event_id)
            .bind(&notification.dedupe_key)
            .bind(notification.viewed_at)
            .bind(notification.acked_at)
            .bind(notification.created_at)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<InAppNotification>> {
        let row: Option<NotificationRow> = sqlx::query_as(NOTIFICATION_FIND_BY_ID)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(InAppNotification::try_from).transpose()
    }

    async fn find_by_dedupe_key(
        &self,
        dedupe_key: &str,
    ) -> AppResult<Option<InAppNotification>> {
        let row: Option<NotificationRow> = sqlx::query_as(NOTIFICATION_FIND_BY_DEDUPE_KEY)
            .bind(dedupe_key)
            .fetch_optional(&self.pool)
            .await?;
        row.map(InAppNotification::try_from).transpose()
    }

    async fn update(&self, notification: &InAppNotification) -> AppResult<()> {
        let result = sqlx::query(NOTIFICATION_UPDATE)
            .bind(notification.id)
            .bind(notification.status.to_string())
            .bind(notification.viewed_at)
            .bind(notification.acked_at)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "notification {}",
                notification.id
            )));
        }
        Ok(())
    }

    async fn list_visible(
        &self,
        username: &str,
        team_inbox_ids: &[String],
        filter: &NotificationFilter,
    ) -> AppResult<Vec<InAppNotification>> {
        let rows: Vec<NotificationRow> = sqlx::query_as(NOTIFICATION_LIST_VISIBLE)
            .bind(username)
            .bind(team_inbox_ids.to_vec())
            .bind(filter.status.map(|s| s.to_string()))
            .bind(filter.priority.map(|p| p.to_string()))
            .bind(filter.patient_id)
            .bind(filter.unread_only)
            .bind(filter.limit.unwrap_or(100).clamp(0, 500))
            .bind(filter.offset.unwrap_or(0).max(0))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(InAppNotification::try_from).collect()
    }
}
