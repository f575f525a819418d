mod common;

use std::sync::Arc;

use chrono::{Days, Utc};
use common::{build_med, build_patient, date, notification_engine};
use monitor_service::domain::models::{
    DrugCategory, MonitoringEvent, MonitoringTask, NotificationPriority, NotificationStatus,
    NotificationType, RecipientType, ReviewStatus, TaskStatus,
};
use monitor_service::domain::repositories::{
    EventRepository, MedicationRepository, NotificationFilter, NotificationRepository,
    PatientRepository, TaskRepository,
};
use monitor_service::infrastructure::database::InMemoryDatabase;

async fn seed_overdue_task(
    db: &Arc<InMemoryDatabase>,
    days_overdue: u64,
) -> (monitor_service::domain::models::Patient, MonitoringTask) {
    let patient = build_patient("PT-NOTIF-1");
    let med = build_med(&patient, "risperidone", DrugCategory::Standard, date(2025, 1, 1));
    let task = MonitoringTask::new(
        patient.id,
        med.id,
        "Weight/BMI",
        Utc::now()
            .date_naive()
            .checked_sub_days(Days::new(days_overdue))
            .unwrap(),
        TaskStatus::Overdue,
    );
    PatientRepository::insert(db.as_ref(), &patient).await.unwrap();
    MedicationRepository::insert(db.as_ref(), &med).await.unwrap();
    TaskRepository::insert(db.as_ref(), &task).await.unwrap();
    (patient, task)
}

#[tokio::test]
async fn overdue_notifications_deduplicate_across_sweeps() {
    let db = Arc::new(InMemoryDatabase::new());
    let (_, _) = seed_overdue_task(&db, 5).await;
    let engine = notification_engine(&db);

    let first = engine.process_overdue_tasks().await.unwrap();
    let second = engine.process_overdue_tasks().await.unwrap();

    assert!(first >= 1);
    assert_eq!(second, 0);
    assert_eq!(db.notification_count().await, 1);
}

#[tokio::test]
async fn overdue_notification_goes_to_team_inbox_when_unassigned() {
    let db = Arc::new(InMemoryDatabase::new());
    let (_, task) = seed_overdue_task(&db, 5).await;
    let engine = notification_engine(&db);

    engine.process_overdue_tasks().await.unwrap();

    let notification = db
        .find_by_dedupe_key(&format!("TASK_OVERDUE:{}", task.id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(notification.recipient.recipient_type, RecipientType::Team);
    assert_eq!(notification.recipient.recipient_id, "TEAM_INBOX");
    assert_eq!(notification.priority, NotificationPriority::Warning);
    assert_eq!(notification.status, NotificationStatus::Unread);
}

#[tokio::test]
async fn escalation_fires_past_threshold() {
    let db = Arc::new(InMemoryDatabase::new());
    let (_, task) = seed_overdue_task(&db, 45).await;
    let engine = notification_engine(&db);

    let created = engine.process_overdue_tasks().await.unwrap();
    assert_eq!(created, 2);

    let escalation = db
        .find_by_dedupe_key(&format!("TASK_ESCALATED:{}", task.id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(escalation.notification_type, NotificationType::TaskEscalated);
    assert_eq!(escalation.priority, NotificationPriority::Critical);
    assert_eq!(escalation.recipient.recipient_id, "TEAM_LEAD_INBOX");
}

#[tokio::test]
async fn abnormal_event_notification_targets_earliest_assignee() {
    let db = Arc::new(InMemoryDatabase::new());
    let patient = build_patient("PT-NOTIF-2");
    let med = build_med(&patient, "olanzapine", DrugCategory::SpecialGroup, date(2025, 1, 1));
    PatientRepository::insert(db.as_ref(), &patient).await.unwrap();
    MedicationRepository::insert(db.as_ref(), &med).await.unwrap();

    let mut assigned = MonitoringTask::new(
        patient.id,
        med.id,
        "HbA1c",
        date(2025, 2, 1),
        TaskStatus::Due,
    );
    assigned.assigned_to = Some("dr-jones".to_string());
    let mut later = MonitoringTask::new(
        patient.id,
        med.id,
        "Lipids",
        date(2025, 6, 1),
        TaskStatus::Due,
    );
    later.assigned_to = Some("dr-smith".to_string());
    TaskRepository::insert(db.as_ref(), &assigned).await.unwrap();
    TaskRepository::insert(db.as_ref(), &later).await.unwrap();

    let mut event = MonitoringEvent::new(patient.id, "HbA1c", date(2025, 2, 3), "CSV_UPLOAD");
    event.value = Some("9.1".to_string());
    EventRepository::insert(db.as_ref(), &event).await.unwrap();

    let engine = notification_engine(&db);
    let notification = engine
        .notify_abnormal_event(&event, &patient, NotificationPriority::Critical, Some("HIGH_CRITICAL"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(notification.notification_type, NotificationType::EventCritical);
    assert_eq!(notification.recipient.recipient_type, RecipientType::User);
    assert_eq!(notification.recipient.recipient_id, "dr-jones");

    // A second trigger for the same event is absorbed by the dedupe key.
    let again = engine
        .notify_abnormal_event(&event, &patient, NotificationPriority::Critical, None)
        .await
        .unwrap();
    assert!(again.is_none());
    assert_eq!(db.notification_count().await, 1);
}

#[tokio::test]
async fn acknowledge_marks_linked_event_reviewed() {
    let db = Arc::new(InMemoryDatabase::new());
    let patient = build_patient("PT-NOTIF-3");
    PatientRepository::insert(db.as_ref(), &patient).await.unwrap();

    let mut event = MonitoringEvent::new(patient.id, "HbA1c", date(2025, 2, 3), "CSV_UPLOAD");
    event.reviewed_status = Some(ReviewStatus::PendingReview);
    EventRepository::insert(db.as_ref(), &event).await.unwrap();

    let engine = notification_engine(&db);
    let notification = engine
        .notify_abnormal_event(&event, &patient, NotificationPriority::Warning, None)
        .await
        .unwrap()
        .unwrap();

    // Read is idempotent, ack is terminal.
    let read = engine
        .mark_notification_read(notification.id, "dr-jones")
        .await
        .unwrap();
    assert_eq!(read.status, NotificationStatus::Read);
    let read_again = engine
        .mark_notification_read(notification.id, "dr-jones")
        .await
        .unwrap();
    assert_eq!(read_again.viewed_at, read.viewed_at);

    let acked = engine
        .acknowledge_notification(notification.id, "dr-jones")
        .await
        .unwrap();
    assert_eq!(acked.status, NotificationStatus::Acked);

    let refreshed = EventRepository::find_by_id(db.as_ref(), event.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.reviewed_status, Some(ReviewStatus::Reviewed));
    assert_eq!(refreshed.reviewed_by.as_deref(), Some("dr-jones"));
    assert!(refreshed.reviewed_at.is_some());
}

#[tokio::test]
async fn visibility_is_the_union_of_user_and_team_inboxes() {
    let db = Arc::new(InMemoryDatabase::new());
    let (_, task) = seed_overdue_task(&db, 45).await;
    let engine = notification_engine(&db);
    engine.process_overdue_tasks().await.unwrap();

    // Overdue went to TEAM_INBOX, escalation to TEAM_LEAD_INBOX.
    let both = db
        .list_visible(
            "dr-jones",
            &["TEAM_INBOX".to_string(), "TEAM_LEAD_INBOX".to_string()],
            &NotificationFilter::default(),
        )
        .await
        .unwrap();
    assert_eq!(both.len(), 2);

    let team_only = db
        .list_visible(
            "dr-jones",
            &["TEAM_INBOX".to_string()],
            &NotificationFilter::default(),
        )
        .await
        .unwrap();
    assert_eq!(team_only.len(), 1);
    assert_eq!(
        team_only[0].dedupe_key,
        format!("TASK_OVERDUE:{}", task.id)
    );
}
