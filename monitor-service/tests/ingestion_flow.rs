mod common;

use std::sync::Arc;

use common::{date, ingestion_service};
use monitor_service::domain::models::{
    AbnormalFlag, DrugCategory, MonitoringTask, ReferenceThreshold, ReviewStatus, TaskStatus,
};
use monitor_service::domain::repositories::{
    PatientRepository, TaskRepository, ThresholdRepository,
};
use monitor_service::infrastructure::database::InMemoryDatabase;
use monitor_service::services::ingestion::{EventRecord, MedicationRecord, PatientRecord};
use monitor_service::services::worklist::{get_worklist, WorklistQuery};
use shared::AppError;

fn medication_record(pseudonym: &str, drug: &str, start: &str) -> MedicationRecord {
    MedicationRecord {
        pseudonymous_number: pseudonym.to_string(),
        drug_name: drug.to_string(),
        start_date: start.to_string(),
        stop_date: None,
        dose: None,
        route: None,
        frequency: None,
        is_hdat: None,
        source_system: None,
        source_id: None,
    }
}

fn event_record(pseudonym: &str, test_type: &str, performed: &str) -> EventRecord {
    EventRecord {
        pseudonymous_number: pseudonym.to_string(),
        test_type: test_type.to_string(),
        performed_date: performed.to_string(),
        value: None,
        unit: None,
        interpretation: None,
        attachment_url: None,
        source_system: None,
        source_id: None,
    }
}

#[tokio::test]
async fn medication_upsert_materializes_schedule() {
    let db = Arc::new(InMemoryDatabase::new());
    let service = ingestion_service(&db);

    let (medication, created) = service
        .upsert_medication(&medication_record("PT-ING-1", "risperidone", "2025-01-01"))
        .await
        .unwrap();
    assert!(created);
    assert_eq!(medication.drug_category, DrugCategory::Standard);
    assert!(db.task_count().await > 0);

    // Re-ingesting the same row touches nothing new.
    let before = db.task_count().await;
    let (_, created_again) = service
        .upsert_medication(&medication_record("PT-ING-1", "risperidone", "2025-01-01"))
        .await
        .unwrap();
    assert!(!created_again);
    assert_eq!(db.task_count().await, before);
}

#[tokio::test]
async fn special_group_name_sets_category_and_flags() {
    let db = Arc::new(InMemoryDatabase::new());
    let service = ingestion_service(&db);

    let (medication, _) = service
        .upsert_medication(&medication_record("PT-ING-2", "Clozapine", "2025-01-01"))
        .await
        .unwrap();
    assert_eq!(medication.drug_category, DrugCategory::SpecialGroup);
    assert!(medication.flags.is_clozapine);
}

#[tokio::test]
async fn event_ingest_classifies_completes_and_notifies() {
    let db = Arc::new(InMemoryDatabase::new());
    let service = ingestion_service(&db);

    let mut threshold = ReferenceThreshold::numeric("HbA1c", "%");
    threshold.high_warning = Some(6.0);
    threshold.high_critical = Some(7.0);
    ThresholdRepository::upsert(db.as_ref(), &threshold).await.unwrap();

    let patient = service
        .upsert_patient(&PatientRecord {
            pseudonymous_number: "PT-ING-3".to_string(),
            age_band: Some("35-44".to_string()),
            sex: Some("F".to_string()),
            ethnicity: None,
            service: None,
        })
        .await
        .unwrap();

    let task = MonitoringTask::new(
        patient.id,
        uuid::Uuid::new_v4(),
        "Glucose/HbA1c",
        date(2025, 4, 1),
        TaskStatus::Due,
    );
    TaskRepository::insert(db.as_ref(), &task).await.unwrap();

    let mut record = event_record("PT-ING-3", "HbA1c", "2025-04-05");
    record.value = Some("7.5".to_string());
    record.unit = Some("%".to_string());

    let outcome = service.ingest_event(&record).await.unwrap();
    assert!(outcome.created);
    assert_eq!(outcome.event.abnormal_flag, AbnormalFlag::OutsideCritical);
    assert_eq!(
        outcome.event.reviewed_status,
        Some(ReviewStatus::PendingReview)
    );
    assert_eq!(outcome.completed_tasks, 1);
    assert!(outcome.notified);

    let closed = TaskRepository::find_by_id(db.as_ref(), task.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(closed.status, TaskStatus::Done);

    // Same natural key on re-ingest updates in place.
    let outcome_again = service.ingest_event(&record).await.unwrap();
    assert!(!outcome_again.created);
    assert_eq!(outcome_again.event.id, outcome.event.id);
}

#[tokio::test]
async fn events_csv_streams_and_collects_row_errors() {
    let db = Arc::new(InMemoryDatabase::new());
    let service = ingestion_service(&db);
    service
        .upsert_patient(&PatientRecord {
            pseudonymous_number: "PT-ING-4".to_string(),
            age_band: None,
            sex: None,
            ethnicity: None,
            service: None,
        })
        .await
        .unwrap();

    let csv = "\
pseudonymous_number,test_type,performed_date,value,unit,interpretation,attachment_url,source_system,source_id
PT-ING-4,HbA1c,2025-04-05,7.5,%,,,,
PT-ING-4,BP,not-a-date,120/80,,,,,
PT-ING-4,Lipids,2025-04-06,4.2,mmol/L,,,,
";
    let report = service
        .ingest_events_csv(std::io::Cursor::new(csv.to_string().into_bytes()))
        .await
        .unwrap();

    assert_eq!(report.inserted, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("performed_date"));
}

#[tokio::test]
async fn identifier_like_values_are_rejected_in_anonymised_mode() {
    let db = Arc::new(InMemoryDatabase::new());
    let service = ingestion_service(&db);

    let err = service
        .upsert_patient(&PatientRecord {
            pseudonymous_number: "1234567890".to_string(),
            age_band: None,
            sex: None,
            ethnicity: None,
            service: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert!(err.to_string().contains("pseudonymous_number"));
}

#[tokio::test]
async fn threshold_csv_import_validates_rows() {
    let db = Arc::new(InMemoryDatabase::new());
    let service = ingestion_service(&db);

    let csv = "\
monitoring_type,unit,comparator_type,sex,age_band,source_system_scope,low_critical,low_warning,high_warning,high_critical,coded_abnormal_values,enabled,version
HbA1c,%,NUMERIC,,,,3.0,4.0,6.0,7.0,,true,v1
ECG,ms,CODED,,,,,,,,ABNORMAL;CRITICAL,true,v1
Lipids,mmol/L,NUMERIC,,,,,,,,,,v1
";
    let report = service
        .import_thresholds_csv(std::io::Cursor::new(csv.as_bytes()))
        .await
        .unwrap();

    // The lipids row is numeric with no limits and is rejected.
    assert_eq!(report.inserted, 2);
    assert_eq!(report.skipped, 1);

    let hba1c = ThresholdRepository::enabled_for_type(db.as_ref(), "HbA1c")
        .await
        .unwrap();
    assert_eq!(hba1c.len(), 1);
    assert_eq!(hba1c[0].high_critical, Some(7.0));

    let ecg = ThresholdRepository::enabled_for_type(db.as_ref(), "ECG")
        .await
        .unwrap();
    assert_eq!(
        ecg[0].coded_abnormal_values,
        vec!["ABNORMAL".to_string(), "CRITICAL".to_string()]
    );
}

#[tokio::test]
async fn worklist_filters_by_status_and_category() {
    let db = Arc::new(InMemoryDatabase::new());
    let service = ingestion_service(&db);
    service
        .upsert_medication(&medication_record("PT-ING-5", "risperidone", "2025-01-01"))
        .await
        .unwrap();

    let tasks: Arc<dyn TaskRepository> = db.clone();
    let all = get_worklist(&tasks, &WorklistQuery::default()).await.unwrap();
    assert!(all.count > 0);
    assert!(all.items.windows(2).all(|w| w[0].due_date <= w[1].due_date));

    let overdue_only = get_worklist(
        &tasks,
        &WorklistQuery {
            status: Some(TaskStatus::Overdue),
            drug_category: None,
        },
    )
    .await
    .unwrap();
    assert!(overdue_only.items.iter().all(|r| r.status == TaskStatus::Overdue));

    let hdat_only = get_worklist(
        &tasks,
        &WorklistQuery {
            status: None,
            drug_category: Some(DrugCategory::Hdat),
        },
    )
    .await
    .unwrap();
    assert_eq!(hdat_only.count, 0);
}

#[tokio::test]
async fn tracked_patient_counter_increments() {
    let db = Arc::new(InMemoryDatabase::new());
    let service = ingestion_service(&db);

    let patient = service
        .upsert_patient(&PatientRecord {
            pseudonymous_number: "PT-ING-6".to_string(),
            age_band: None,
            sex: None,
            ethnicity: None,
            service: None,
        })
        .await
        .unwrap();

    service
        .record_patient_fetch(patient.id, "EPR_FETCH", Some("dr-jones"))
        .await
        .unwrap();
    service
        .record_patient_fetch(patient.id, "EPR_FETCH", None)
        .await
        .unwrap();

    let tracked = PatientRepository::tracked_patient_ids(db.as_ref())
        .await
        .unwrap();
    assert_eq!(tracked, vec![patient.id]);
}
