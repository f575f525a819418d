use shared::AppResult;
use uuid::Uuid;

use crate::domain::models::{
    InAppNotification, NotificationPriority, NotificationStatus,
};

/// Filters for the visibility query: a user sees notifications addressed to
/// them plus those addressed to team inboxes they subscribe to.
#[derive(Debug, Clone, Default)]
pub struct NotificationFilter {
    pub status: Option<NotificationStatus>,
    pub priority: Option<NotificationPriority>,
    pub patient_id: Option<Uuid>,
    pub unread_only: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[async_trait::async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Insert unless a notification with the same dedupe key exists.
    /// Returns true when the row was created; a unique-key conflict from a
    /// concurrent writer also reports false.
    async fn insert_if_absent(&self, notification: &InAppNotification) -> AppResult<bool>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<InAppNotification>>;

    async fn find_by_dedupe_key(&self, dedupe_key: &str)
        -> AppResult<Option<InAppNotification>>;

    async fn update(&self, notification: &InAppNotification) -> AppResult<()>;

    async fn list_visible(
        &self,
        username: &str,
        team_inbox_ids: &[String],
        filter: &NotificationFilter,
    ) -> AppResult<Vec<InAppNotification>>;
}
