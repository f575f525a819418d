#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use monitor_service::domain::models::{DrugCategory, MedicationOrder, Patient};
use monitor_service::infrastructure::database::InMemoryDatabase;
use monitor_service::services::abnormality::ThresholdEvaluator;
use monitor_service::services::ingestion::IngestionService;
use monitor_service::services::notification_engine::{LogSender, NotificationEngine};
use monitor_service::services::ruleset::default_ruleset;
use monitor_service::services::scheduling::SchedulingEngine;
use monitor_service::services::task_generator::TaskGenerator;
use shared::Settings;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn build_patient(pseudonym: &str) -> Patient {
    Patient::new(pseudonym)
}

pub fn build_med(
    patient: &Patient,
    drug_name: &str,
    category: DrugCategory,
    start: NaiveDate,
) -> MedicationOrder {
    MedicationOrder::new(patient.id, drug_name, category, start)
}

pub fn scheduling_engine() -> SchedulingEngine {
    let settings = Settings::default();
    SchedulingEngine::new(default_ruleset().unwrap(), &settings.monitoring)
}

pub fn task_generator(db: &Arc<InMemoryDatabase>) -> TaskGenerator {
    let settings = Settings::default();
    TaskGenerator::new(db.clone(), db.clone(), &settings.monitoring)
}

pub fn notification_engine(db: &Arc<InMemoryDatabase>) -> NotificationEngine {
    let settings = Settings::default();
    NotificationEngine::new(
        db.clone(),
        db.clone(),
        db.clone(),
        db.clone(),
        db.clone(),
        Arc::new(LogSender),
        settings.notifications.clone(),
        settings.monitoring.escalation_threshold_days,
    )
}

pub fn ingestion_service(db: &Arc<InMemoryDatabase>) -> IngestionService {
    let settings = Settings::default();
    IngestionService::new(
        db.clone(),
        db.clone(),
        db.clone(),
        db.clone(),
        scheduling_engine(),
        task_generator(db),
        ThresholdEvaluator::new(db.clone()),
        notification_engine(db),
        settings.security.clone(),
    )
}
