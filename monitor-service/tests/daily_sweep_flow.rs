mod common;

use std::sync::Arc;

use chrono::{Days, Utc};
use common::{build_med, build_patient, date, notification_engine, task_generator};
use monitor_service::domain::models::{DrugCategory, MonitoringTask, TaskStatus};
use monitor_service::domain::repositories::{
    MedicationRepository, PatientRepository, TaskRepository,
};
use monitor_service::infrastructure::database::InMemoryDatabase;
use monitor_service::jobs::DailySweep;

#[tokio::test]
async fn sweep_transitions_reactivates_and_notifies_in_order() {
    let db = Arc::new(InMemoryDatabase::new());
    let patient = build_patient("PT-SWEEP-1");
    let med = build_med(&patient, "risperidone", DrugCategory::Standard, date(2025, 1, 1));
    PatientRepository::insert(db.as_ref(), &patient).await.unwrap();
    MedicationRepository::insert(db.as_ref(), &med).await.unwrap();

    let today = Utc::now().date_naive();

    // A DUE task past its date, an expired waiver, and an ONGOING task
    // that must never transition.
    let due = MonitoringTask::new(
        patient.id,
        med.id,
        "Weight/BMI",
        today.checked_sub_days(Days::new(3)).unwrap(),
        TaskStatus::Due,
    );
    let mut waived = MonitoringTask::new(
        patient.id,
        med.id,
        "Prolactin",
        today.checked_sub_days(Days::new(60)).unwrap(),
        TaskStatus::Waived,
    );
    waived.waived_reason = Some("Patient declined".to_string());
    waived.waived_until = Some(today.checked_sub_days(Days::new(1)).unwrap());
    let ongoing = MonitoringTask::new(
        patient.id,
        med.id,
        "Hydration vigilance",
        today.checked_sub_days(Days::new(90)).unwrap(),
        TaskStatus::Ongoing,
    );
    TaskRepository::insert(db.as_ref(), &due).await.unwrap();
    TaskRepository::insert(db.as_ref(), &waived).await.unwrap();
    TaskRepository::insert(db.as_ref(), &ongoing).await.unwrap();

    let sweep = DailySweep::new(task_generator(&db), notification_engine(&db));
    let summary = sweep.run().await.unwrap();

    assert_eq!(summary.tasks_marked_overdue, 1);
    assert_eq!(summary.waivers_reactivated, 1);
    // One overdue notification each for the flipped task and the
    // reactivated waiver; the waiver is 60 days past due, so it also
    // escalates.
    assert_eq!(summary.notifications_created, 3);

    let refreshed_ongoing = TaskRepository::find_by_id(db.as_ref(), ongoing.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed_ongoing.status, TaskStatus::Ongoing);

    // The next sweep finds nothing new to do.
    let second = sweep.run().await.unwrap();
    assert_eq!(second.tasks_marked_overdue, 0);
    assert_eq!(second.waivers_reactivated, 0);
    assert_eq!(second.notifications_created, 0);
}
