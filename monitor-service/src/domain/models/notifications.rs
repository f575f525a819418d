use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecipientType {
    User,
    Team,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    TaskOverdue,
    TaskEscalated,
    EventWarning,
    EventCritical,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
    EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationPriority {
    Info,
    Warning,
    Critical,
}

/// UNREAD → READ on view; ACKED is terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationStatus {
    Unread,
    Read,
    Acked,
}

/// Addressee of a notification: a named user or a configured team inbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub recipient_type: RecipientType,
    pub recipient_id: String,
}

impl Recipient {
    pub fn user(username: impl Into<String>) -> Self {
        Self {
            recipient_type: RecipientType::User,
            recipient_id: username.into(),
        }
    }

    pub fn team(inbox_id: impl Into<String>) -> Self {
        Self {
            recipient_type: RecipientType::Team,
            recipient_id: inbox_id.into(),
        }
    }
}

/// A persisted in-app alert. `dedupe_key` is globally unique so repeated
/// triggers for the same logical condition collapse to one record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InAppNotification {
    pub id: Uuid,
    pub recipient: Recipient,
    pub notification_type: NotificationType,
    pub priority: NotificationPriority,
    pub status: NotificationStatus,
    pub title: String,
    pub message: String,
    pub payload: serde_json::Value,
    pub patient_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
    pub event_id: Option<Uuid>,
    pub dedupe_key: String,
    pub viewed_at: Option<DateTime<Utc>>,
    pub acked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl InAppNotification {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        recipient: Recipient,
        notification_type: NotificationType,
        priority: NotificationPriority,
        title: impl Into<String>,
        message: impl Into<String>,
        dedupe_key: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            recipient,
            notification_type,
            priority,
            status: NotificationStatus::Unread,
            title: title.into(),
            message: message.into(),
            payload,
            patient_id: None,
            task_id: None,
            event_id: None,
            dedupe_key: dedupe_key.into(),
            viewed_at: None,
            acked_at: None,
            created_at: Utc::now(),
        }
    }
}
