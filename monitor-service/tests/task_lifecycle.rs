mod common;

use std::sync::Arc;

use chrono::{Days, Utc};
use common::{build_med, build_patient, date, task_generator};
use monitor_service::domain::models::{
    DrugCategory, MonitoringEvent, MonitoringTask, TaskStatus,
};
use monitor_service::domain::repositories::{
    MedicationRepository, PatientRepository, TaskRepository,
};
use monitor_service::infrastructure::database::InMemoryDatabase;
use shared::AppError;

async fn seed_patient_and_med(
    db: &Arc<InMemoryDatabase>,
) -> (monitor_service::domain::models::Patient, monitor_service::domain::models::MedicationOrder)
{
    let patient = build_patient("PT-TASK-1");
    let med = build_med(&patient, "risperidone", DrugCategory::Standard, date(2025, 1, 1));
    PatientRepository::insert(db.as_ref(), &patient).await.unwrap();
    MedicationRepository::insert(db.as_ref(), &med).await.unwrap();
    (patient, med)
}

#[tokio::test]
async fn due_task_becomes_overdue_on_sweep() {
    let db = Arc::new(InMemoryDatabase::new());
    let (patient, med) = seed_patient_and_med(&db).await;
    let generator = task_generator(&db);

    let task = MonitoringTask::new(
        patient.id,
        med.id,
        "Weight/BMI",
        Utc::now().date_naive().checked_sub_days(Days::new(1)).unwrap(),
        TaskStatus::Due,
    );
    TaskRepository::insert(db.as_ref(), &task).await.unwrap();

    let updated = generator.update_task_statuses().await.unwrap();
    assert_eq!(updated, 1);

    let refreshed = TaskRepository::find_by_id(db.as_ref(), task.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.status, TaskStatus::Overdue);
}

#[tokio::test]
async fn mark_task_done_is_idempotent() {
    let db = Arc::new(InMemoryDatabase::new());
    let (patient, med) = seed_patient_and_med(&db).await;
    let generator = task_generator(&db);

    let task = MonitoringTask::new(
        patient.id,
        med.id,
        "HbA1c",
        date(2025, 4, 1),
        TaskStatus::Overdue,
    );
    TaskRepository::insert(db.as_ref(), &task).await.unwrap();

    let mut event = MonitoringEvent::new(patient.id, "HbA1c", date(2025, 4, 5), "TEST");
    event.medication_order_id = Some(med.id);

    let completed = generator
        .mark_task_done(task.id, "clinician-1", &event)
        .await
        .unwrap();
    assert_eq!(completed.status, TaskStatus::Done);
    assert_eq!(
        completed.completed_at.unwrap().to_rfc3339(),
        "2025-04-05T00:00:00+00:00"
    );

    // Second completion is a no-op, not an error.
    let again = generator
        .mark_task_done(task.id, "clinician-2", &event)
        .await
        .unwrap();
    assert_eq!(again.status, TaskStatus::Done);
}

#[tokio::test]
async fn mark_unknown_task_is_not_found() {
    let db = Arc::new(InMemoryDatabase::new());
    let (patient, _) = seed_patient_and_med(&db).await;
    let generator = task_generator(&db);

    let event = MonitoringEvent::new(patient.id, "HbA1c", date(2025, 4, 5), "TEST");
    let err = generator
        .mark_task_done(uuid::Uuid::new_v4(), "clinician-1", &event)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn waive_then_reactivate_clears_waiver_fields() {
    let db = Arc::new(InMemoryDatabase::new());
    let (patient, med) = seed_patient_and_med(&db).await;
    let generator = task_generator(&db);

    let task = MonitoringTask::new(
        patient.id,
        med.id,
        "Prolactin",
        date(2025, 3, 1),
        TaskStatus::Overdue,
    );
    TaskRepository::insert(db.as_ref(), &task).await.unwrap();

    let yesterday = Utc::now().date_naive().checked_sub_days(Days::new(1)).unwrap();
    let waived = generator
        .waive_task(task.id, "senior-1", "Patient declined", Some(yesterday))
        .await
        .unwrap();
    assert_eq!(waived.status, TaskStatus::Waived);
    assert_eq!(waived.waived_reason.as_deref(), Some("Patient declined"));

    let reactivated = generator.reactivate_expired_waivers().await.unwrap();
    assert_eq!(reactivated, 1);

    let refreshed = TaskRepository::find_by_id(db.as_ref(), task.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.status, TaskStatus::Overdue);
    assert_eq!(refreshed.waived_reason, None);
    assert_eq!(refreshed.waived_until, None);
}

#[tokio::test]
async fn reconcile_never_duplicates_tasks() {
    let db = Arc::new(InMemoryDatabase::new());
    let (patient, med) = seed_patient_and_med(&db).await;
    let generator = task_generator(&db);

    let task = MonitoringTask::new(
        patient.id,
        med.id,
        "Weight/BMI",
        date(2025, 1, 1),
        TaskStatus::Due,
    );
    generator
        .create_or_update_tasks(vec![task.clone()], "SYSTEM")
        .await
        .unwrap();
    generator
        .create_or_update_tasks(vec![task], "SYSTEM")
        .await
        .unwrap();

    assert_eq!(db.task_count().await, 1);
}

#[tokio::test]
async fn reconcile_leaves_terminal_tasks_alone() {
    let db = Arc::new(InMemoryDatabase::new());
    let (patient, med) = seed_patient_and_med(&db).await;
    let generator = task_generator(&db);

    let mut done = MonitoringTask::new(
        patient.id,
        med.id,
        "Lipids",
        date(2025, 1, 1),
        TaskStatus::Done,
    );
    done.completed_at = Some(Utc::now());
    TaskRepository::insert(db.as_ref(), &done).await.unwrap();

    // A recalculated task for the same slot must not reopen it.
    let recalculated = MonitoringTask::new(
        patient.id,
        med.id,
        "Lipids",
        date(2025, 1, 8),
        TaskStatus::Due,
    );
    generator
        .create_or_update_tasks(vec![recalculated], "SYSTEM")
        .await
        .unwrap();

    let refreshed = TaskRepository::find_by_id(db.as_ref(), done.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.status, TaskStatus::Done);
    assert_eq!(refreshed.due_date, date(2025, 1, 1));
    assert_eq!(db.task_count().await, 1);
}

#[tokio::test]
async fn auto_complete_closes_tasks_within_window() {
    let db = Arc::new(InMemoryDatabase::new());
    let (patient, med) = seed_patient_and_med(&db).await;
    let generator = task_generator(&db);

    let near = MonitoringTask::new(
        patient.id,
        med.id,
        "HbA1c",
        date(2025, 4, 1),
        TaskStatus::Overdue,
    );
    let far = MonitoringTask::new(
        patient.id,
        med.id,
        "HbA1c",
        date(2025, 7, 1),
        TaskStatus::Due,
    );
    TaskRepository::insert(db.as_ref(), &near).await.unwrap();
    TaskRepository::insert(db.as_ref(), &far).await.unwrap();

    // Fuzzy rule: a fasting glucose result satisfies the HbA1c task.
    let event = MonitoringEvent::new(patient.id, "Fasting glucose", date(2025, 4, 10), "TEST");
    let completed = generator
        .auto_complete_tasks_for_event(&event, "SYSTEM")
        .await
        .unwrap();

    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].id, near.id);

    let untouched = TaskRepository::find_by_id(db.as_ref(), far.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(untouched.status, TaskStatus::Due);
}

#[tokio::test]
async fn auto_complete_window_is_symmetric() {
    let db = Arc::new(InMemoryDatabase::new());
    let (patient, med) = seed_patient_and_med(&db).await;
    let generator = task_generator(&db);

    // Due date 14 days after the event still matches; 15 does not.
    let inside = MonitoringTask::new(
        patient.id,
        med.id,
        "BP",
        date(2025, 4, 15),
        TaskStatus::Due,
    );
    let outside = MonitoringTask::new(
        patient.id,
        med.id,
        "BP",
        date(2025, 4, 16),
        TaskStatus::Due,
    );
    TaskRepository::insert(db.as_ref(), &inside).await.unwrap();
    TaskRepository::insert(db.as_ref(), &outside).await.unwrap();

    let event = MonitoringEvent::new(patient.id, "BP", date(2025, 4, 1), "TEST");
    let completed = generator
        .auto_complete_tasks_for_event(&event, "SYSTEM")
        .await
        .unwrap();

    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].id, inside.id);
}

#[tokio::test]
async fn reconcile_emits_audit_records() {
    let db = Arc::new(InMemoryDatabase::new());
    let (patient, med) = seed_patient_and_med(&db).await;
    let generator = task_generator(&db);

    let task = MonitoringTask::new(
        patient.id,
        med.id,
        "U&Es",
        date(2025, 2, 1),
        TaskStatus::Due,
    );
    generator
        .create_or_update_tasks(vec![task], "clinician-1")
        .await
        .unwrap();

    let records = db.audit_records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].actor, "clinician-1");
    assert_eq!(records[0].entity_type, "MonitoringTask");
}
