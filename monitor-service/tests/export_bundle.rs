mod common;

use std::io::Read;
use std::sync::Arc;

use common::{build_med, build_patient, date};
use monitor_service::domain::models::{DrugCategory, MonitoringEvent};
use monitor_service::domain::repositories::{
    EventRepository, MedicationRepository, PatientRepository,
};
use monitor_service::infrastructure::database::InMemoryDatabase;
use monitor_service::services::export::ExportService;

fn read_entry(archive: &mut zip::ZipArchive<std::io::Cursor<Vec<u8>>>, name: &str) -> String {
    let mut entry = archive.by_name(name).unwrap();
    let mut contents = String::new();
    entry.read_to_string(&mut contents).unwrap();
    contents
}

#[tokio::test]
async fn bundle_contains_three_csvs_with_stable_headers() {
    let db = Arc::new(InMemoryDatabase::new());

    let mut patient = build_patient("PT-EXP-1");
    patient.sex = Some("F".to_string());
    patient.age_band = Some("35-44".to_string());
    let mut med = build_med(&patient, "olanzapine", DrugCategory::SpecialGroup, date(2025, 1, 1));
    med.flags.is_olanzapine = true;
    let mut event = MonitoringEvent::new(patient.id, "HbA1c", date(2025, 4, 5), "CSV_UPLOAD");
    event.value = Some("7.5".to_string());
    event.unit = Some("%".to_string());

    PatientRepository::insert(db.as_ref(), &patient).await.unwrap();
    MedicationRepository::insert(db.as_ref(), &med).await.unwrap();
    EventRepository::insert(db.as_ref(), &event).await.unwrap();

    let service = ExportService::new(db.clone(), db.clone(), db.clone());
    let bytes = service.build_export_zip(false).await.unwrap();

    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    assert_eq!(archive.len(), 3);

    let patients_csv = read_entry(&mut archive, "patients.csv");
    assert!(patients_csv
        .starts_with("pseudonymous_number,age_band,sex,ethnicity,service"));
    assert!(patients_csv.contains("PT-EXP-1,35-44,F"));

    let medications_csv = read_entry(&mut archive, "medications.csv");
    assert!(medications_csv.starts_with(
        "pseudonymous_number,drug_name,start_date,stop_date,dose,route,frequency,is_hdat"
    ));
    assert!(medications_csv.contains("PT-EXP-1,olanzapine,2025-01-01"));

    let events_csv = read_entry(&mut archive, "events.csv");
    assert!(events_csv.starts_with(
        "pseudonymous_number,test_type,performed_date,value,unit,interpretation,attachment_url,abnormal_flag,reviewed_status,source_system"
    ));
    assert!(events_csv.contains("PT-EXP-1,HbA1c,2025-04-05,7.5,%"));
}

#[tokio::test]
async fn tracked_only_export_filters_patients() {
    let db = Arc::new(InMemoryDatabase::new());

    let tracked = build_patient("PT-EXP-2");
    let untracked = build_patient("PT-EXP-3");
    PatientRepository::insert(db.as_ref(), &tracked).await.unwrap();
    PatientRepository::insert(db.as_ref(), &untracked).await.unwrap();
    PatientRepository::track_patient(db.as_ref(), tracked.id, "EPR_FETCH", None)
        .await
        .unwrap();

    let service = ExportService::new(db.clone(), db.clone(), db.clone());
    let bytes = service.build_export_zip(true).await.unwrap();

    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    let patients_csv = read_entry(&mut archive, "patients.csv");
    assert!(patients_csv.contains("PT-EXP-2"));
    assert!(!patients_csv.contains("PT-EXP-3"));
}

#[tokio::test]
async fn empty_tracking_set_exports_empty_files() {
    let db = Arc::new(InMemoryDatabase::new());
    let patient = build_patient("PT-EXP-4");
    PatientRepository::insert(db.as_ref(), &patient).await.unwrap();

    let service = ExportService::new(db.clone(), db.clone(), db.clone());
    let bytes = service.build_export_zip(true).await.unwrap();

    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    let patients_csv = read_entry(&mut archive, "patients.csv");
    assert_eq!(patients_csv.lines().count(), 1);
}
