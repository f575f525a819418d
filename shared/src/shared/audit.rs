use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::shared::{AppError, AppResult};

/// Recorded actions, stored verbatim in the audit trail.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    View,
    Update,
    Acknowledge,
    Waive,
    NotificationCreated,
    NotificationViewed,
    NotificationAcked,
}

/// One immutable audit trail entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Uuid,
    pub actor: String,
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: String,
    pub request_id: String,
    pub ip_address: String,
    pub details: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(
        actor: impl Into<String>,
        action: AuditAction,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor: actor.into(),
            action,
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            request_id: String::new(),
            ip_address: String::new(),
            details,
            timestamp: Utc::now(),
        }
    }

    pub fn with_context(mut self, context: &AuditContext) -> Self {
        if let Some(request_id) = &context.request_id {
            self.request_id = request_id.clone();
        }
        if let Some(ip_address) = &context.ip_address {
            self.ip_address = ip_address.clone();
        }
        self
    }
}

/// Caller-supplied context attached to audit entries.
#[derive(Debug, Clone, Default)]
pub struct AuditContext {
    pub request_id: Option<String>,
    pub ip_address: Option<String>,
}

impl AuditContext {
    pub fn new(request_id: Option<String>, ip_address: Option<String>) -> Self {
        Self {
            request_id,
            ip_address,
        }
    }
}

/// Append a record to the JSONL export file, creating parent directories on
/// first use. The export is a best-effort mirror of the database trail.
pub fn append_jsonl_export(path: &Path, record: &AuditRecord) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| AppError::Internal(format!("audit export dir: {e}")))?;
    }
    let line = serde_json::to_string(record)
        .map_err(|e| AppError::Internal(format!("audit export serialize: {e}")))?;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| AppError::Internal(format!("audit export open: {e}")))?;
    writeln!(file, "{line}").map_err(|e| AppError::Internal(format!("audit export write: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_round_trips_through_strings() {
        assert_eq!(AuditAction::NotificationCreated.to_string(), "NOTIFICATION_CREATED");
        assert_eq!(
            "WAIVE".parse::<AuditAction>().unwrap(),
            AuditAction::Waive
        );
    }

    #[test]
    fn jsonl_export_appends_lines() {
        let dir = std::env::temp_dir().join(format!("audit-export-{}", Uuid::new_v4()));
        let path = dir.join("audit.jsonl");
        let record = AuditRecord::new(
            "SYSTEM",
            AuditAction::Update,
            "MonitoringTask",
            "t-1",
            serde_json::json!({"created": true}),
        );
        append_jsonl_export(&path, &record).unwrap();
        append_jsonl_export(&path, &record).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
