//! Deduplicated in-app notifications for overdue, escalated, and abnormal
//! conditions.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use shared::config::NotificationConfig;
use shared::{AppError, AppResult, AuditAction, AuditRecord};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::models::{
    InAppNotification, MonitoringEvent, MonitoringTask, NotificationPriority, NotificationStatus,
    NotificationType, Patient, Recipient,
};
use crate::domain::repositories::{
    AuditRepository, EventRepository, NotificationRepository, PatientRepository, TaskRepository,
};
use crate::services::abnormality::ThresholdEvaluator;

const ENTITY_TYPE: &str = "InAppNotification";

/// Outbound delivery boundary. The engine persists the notification and
/// hands the record over; transports (email, IM) live behind this trait.
#[async_trait::async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, notification: &InAppNotification) -> AppResult<()>;
}

/// Default delivery: log and move on.
#[derive(Debug, Default)]
pub struct LogSender;

#[async_trait::async_trait]
impl NotificationSender for LogSender {
    async fn send(&self, notification: &InAppNotification) -> AppResult<()> {
        info!(
            notification_id = %notification.id,
            notification_type = %notification.notification_type,
            recipient = %notification.recipient.recipient_id,
            "notification queued for delivery"
        );
        Ok(())
    }
}

pub struct NotificationEngine {
    notifications: Arc<dyn NotificationRepository>,
    tasks: Arc<dyn TaskRepository>,
    patients: Arc<dyn PatientRepository>,
    events: Arc<dyn EventRepository>,
    audit: Arc<dyn AuditRepository>,
    sender: Arc<dyn NotificationSender>,
    config: NotificationConfig,
    escalation_threshold_days: i64,
}

impl NotificationEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        notifications: Arc<dyn NotificationRepository>,
        tasks: Arc<dyn TaskRepository>,
        patients: Arc<dyn PatientRepository>,
        events: Arc<dyn EventRepository>,
        audit: Arc<dyn AuditRepository>,
        sender: Arc<dyn NotificationSender>,
        config: NotificationConfig,
        escalation_threshold_days: i64,
    ) -> Self {
        Self {
            notifications,
            tasks,
            patients,
            events,
            audit,
            sender,
            config,
            escalation_threshold_days,
        }
    }

    /// Daily sweep step three: one TASK_OVERDUE notification per overdue
    /// task, plus a TASK_ESCALATED notification to the team lead once the
    /// escalation threshold is crossed. Re-running is a no-op thanks to the
    /// dedupe keys. Returns the number of notifications created.
    #[instrument(skip_all)]
    pub async fn process_overdue_tasks(&self) -> AppResult<u64> {
        if !self.config.in_app_enabled {
            return Ok(0);
        }

        let today = Utc::now().date_naive();
        let overdue = self
            .tasks
            .list_with_status(crate::domain::models::TaskStatus::Overdue)
            .await?;

        let mut created = 0;
        for task in &overdue {
            let Some(patient) = self.patients.find_by_id(task.patient_id).await? else {
                warn!(task_id = %task.id, "overdue task without patient; skipping");
                continue;
            };

            let overdue_key = format!("TASK_OVERDUE:{}", task.id);
            let mut notification = InAppNotification::new(
                self.recipient_for_task(task),
                NotificationType::TaskOverdue,
                NotificationPriority::Warning,
                "Monitoring overdue",
                format!("Task overdue since {}", task.due_date),
                overdue_key,
                json!({
                    "pseudonym": patient.pseudonym,
                    "test_type": task.test_type,
                    "due_date": task.due_date,
                    "status": task.status,
                }),
            );
            notification.patient_id = Some(patient.id);
            notification.task_id = Some(task.id);
            if self.create_if_missing(notification).await? {
                created += 1;
            }

            let days_overdue = (today - task.due_date).num_days();
            if days_overdue >= self.escalation_threshold_days {
                let escalation_key = format!("TASK_ESCALATED:{}", task.id);
                let mut escalation = InAppNotification::new(
                    Recipient::team(&self.config.team_lead_inbox_id),
                    NotificationType::TaskEscalated,
                    NotificationPriority::Critical,
                    "Urgent review required",
                    "Monitoring task overdue beyond escalation threshold.",
                    escalation_key,
                    json!({
                        "pseudonym": patient.pseudonym,
                        "test_type": task.test_type,
                        "due_date": task.due_date,
                        "days_overdue": days_overdue,
                        "status": task.status,
                    }),
                );
                escalation.patient_id = Some(patient.id);
                escalation.task_id = Some(task.id);
                if self.create_if_missing(escalation).await? {
                    created += 1;
                }
            }
        }
        Ok(created)
    }

    /// Raise an EVENT_WARNING or EVENT_CRITICAL notification for an
    /// abnormal result, addressed to the patient's earliest-due assignee
    /// when one exists.
    #[instrument(skip_all, fields(event_id = %event.id))]
    pub async fn notify_abnormal_event(
        &self,
        event: &MonitoringEvent,
        patient: &Patient,
        priority: NotificationPriority,
        reason: Option<&str>,
    ) -> AppResult<Option<InAppNotification>> {
        if !self.config.in_app_enabled {
            return Ok(None);
        }

        let (notification_type, title, message) = match priority {
            NotificationPriority::Critical => (
                NotificationType::EventCritical,
                "Urgent review required",
                "Monitoring result outside configured critical thresholds.",
            ),
            _ => (
                NotificationType::EventWarning,
                "Review required",
                "Monitoring result outside configured warning thresholds.",
            ),
        };

        let dedupe_key = format!("{}:{}", notification_type, event.id);
        let mut notification = InAppNotification::new(
            self.recipient_for_event(patient).await?,
            notification_type,
            priority,
            title,
            message,
            dedupe_key.clone(),
            json!({
                "pseudonym": patient.pseudonym,
                "test_type": event.test_type,
                "performed_date": event.performed_date,
                "value": event.value,
                "unit": event.unit,
                "attachment_url": event.attachment_url,
                "reason": reason,
            }),
        );
        notification.patient_id = Some(patient.id);
        notification.event_id = Some(event.id);

        if self.create_if_missing(notification).await? {
            self.notifications.find_by_dedupe_key(&dedupe_key).await
        } else {
            Ok(None)
        }
    }

    /// UNREAD -> READ; already-read notifications are untouched.
    pub async fn mark_notification_read(
        &self,
        notification_id: Uuid,
        actor: &str,
    ) -> AppResult<InAppNotification> {
        let mut notification = self.get(notification_id).await?;
        if notification.status == NotificationStatus::Unread {
            notification.status = NotificationStatus::Read;
            notification.viewed_at = Some(Utc::now());
            self.notifications.update(&notification).await?;
            self.audit_status(actor, AuditAction::NotificationViewed, &notification)
                .await?;
        }
        Ok(notification)
    }

    /// Terminal acknowledgement. A linked event is marked REVIEWED with
    /// the acknowledging actor and timestamp.
    pub async fn acknowledge_notification(
        &self,
        notification_id: Uuid,
        actor: &str,
    ) -> AppResult<InAppNotification> {
        let mut notification = self.get(notification_id).await?;
        notification.status = NotificationStatus::Acked;
        notification.acked_at = Some(Utc::now());
        self.notifications.update(&notification).await?;
        self.audit_status(actor, AuditAction::NotificationAcked, &notification)
            .await?;

        if let Some(event_id) = notification.event_id {
            if let Some(mut event) = self.events.find_by_id(event_id).await? {
                ThresholdEvaluator::mark_reviewed(&mut event, actor);
                self.events.update(&event).await?;
            }
        }
        Ok(notification)
    }

    fn recipient_for_task(&self, task: &MonitoringTask) -> Recipient {
        match &task.assigned_to {
            Some(assignee) => Recipient::user(assignee),
            None => Recipient::team(&self.config.team_inbox_id),
        }
    }

    async fn recipient_for_event(&self, patient: &Patient) -> AppResult<Recipient> {
        let assigned = self.tasks.earliest_open_assigned(patient.id).await?;
        Ok(match assigned.and_then(|t| t.assigned_to) {
            Some(assignee) => Recipient::user(assignee),
            None => Recipient::team(&self.config.team_inbox_id),
        })
    }

    async fn create_if_missing(&self, notification: InAppNotification) -> AppResult<bool> {
        let created = match self.notifications.insert_if_absent(&notification).await {
            Ok(created) => created,
            // A concurrent writer claimed the dedupe key first.
            Err(err) if err.is_unique_violation() => false,
            Err(err) => return Err(err),
        };
        if !created {
            return Ok(false);
        }

        let record = AuditRecord::new(
            "SYSTEM",
            AuditAction::NotificationCreated,
            ENTITY_TYPE,
            notification.id.to_string(),
            json!({
                "type": notification.notification_type,
                "priority": notification.priority,
                "recipient": notification.recipient.recipient_id,
            }),
        );
        self.audit.record(&record).await?;
        self.sender.send(&notification).await?;
        Ok(true)
    }

    async fn get(&self, notification_id: Uuid) -> AppResult<InAppNotification> {
        self.notifications
            .find_by_id(notification_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("notification {notification_id} not found")))
    }

    async fn audit_status(
        &self,
        actor: &str,
        action: AuditAction,
        notification: &InAppNotification,
    ) -> AppResult<()> {
        let record = AuditRecord::new(
            actor,
            action,
            ENTITY_TYPE,
            notification.id.to_string(),
            json!({"status": notification.status}),
        );
        self.audit.record(&record).await
    }
}
