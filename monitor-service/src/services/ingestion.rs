//! Ingestion: typed upserts for patients, medication orders, and
//! monitoring events, plus streaming CSV batch import.
//!
//! Each medication upsert recomputes and reconciles the monitoring
//! calendar. Each event upsert classifies the value, auto-completes
//! matching open tasks, and raises an abnormal notification when
//! warranted. Batch paths stream rows through a bounded channel and
//! collect per-row errors into a bounded report.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Deserialize;
use shared::config::SecurityConfig;
use shared::shared::identifier::find_identifier_matches;
use shared::{AppError, AppResult};
use tokio::sync::mpsc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::models::{
    AbnormalFlag, ComparatorType, DrugCategory, MedicationOrder, MonitoringEvent,
    NotificationPriority, Patient, ReferenceThreshold, SPECIAL_GROUP_DRUGS,
};
use crate::domain::repositories::{
    EventRepository, MedicationRepository, PatientRepository, ThresholdRepository,
};
use crate::services::abnormality::ThresholdEvaluator;
use crate::services::notification_engine::NotificationEngine;
use crate::services::scheduling::SchedulingEngine;
use crate::services::task_generator::TaskGenerator;

const SYSTEM_ACTOR: &str = "SYSTEM";
/// Reported per-row errors are capped; the totals still count everything.
const MAX_ROW_ERRORS: usize = 10;
/// Backpressure depth between the CSV parser and the ingest worker.
const INGEST_CHANNEL_DEPTH: usize = 64;

// ============================================================================
// Row types
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct PatientRecord {
    pub pseudonymous_number: String,
    #[serde(default)]
    pub age_band: Option<String>,
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default)]
    pub ethnicity: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MedicationRecord {
    pub pseudonymous_number: String,
    pub drug_name: String,
    pub start_date: String,
    #[serde(default)]
    pub stop_date: Option<String>,
    #[serde(default)]
    pub dose: Option<String>,
    #[serde(default)]
    pub route: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub is_hdat: Option<bool>,
    #[serde(default)]
    pub source_system: Option<String>,
    #[serde(default)]
    pub source_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventRecord {
    pub pseudonymous_number: String,
    pub test_type: String,
    pub performed_date: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub interpretation: Option<String>,
    #[serde(default)]
    pub attachment_url: Option<String>,
    #[serde(default)]
    pub source_system: Option<String>,
    #[serde(default)]
    pub source_id: Option<String>,
}

/// What happened to one ingested event.
#[derive(Debug)]
pub struct EventOutcome {
    pub event: MonitoringEvent,
    pub created: bool,
    pub completed_tasks: usize,
    pub notified: bool,
}

/// Batch ingest summary with a bounded error report.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
    pub total_error_count: usize,
}

impl IngestReport {
    fn push_error(&mut self, row: usize, err: &AppError) {
        self.skipped += 1;
        self.total_error_count += 1;
        if self.errors.len() < MAX_ROW_ERRORS {
            self.errors.push(format!("row {row}: {err}"));
        }
    }
}

// ============================================================================
// Service
// ============================================================================

pub struct IngestionService {
    patients: Arc<dyn PatientRepository>,
    medications: Arc<dyn MedicationRepository>,
    events: Arc<dyn EventRepository>,
    thresholds: Arc<dyn ThresholdRepository>,
    scheduler: SchedulingEngine,
    task_generator: TaskGenerator,
    evaluator: ThresholdEvaluator,
    notifier: NotificationEngine,
    security: SecurityConfig,
}

impl IngestionService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        patients: Arc<dyn PatientRepository>,
        medications: Arc<dyn MedicationRepository>,
        events: Arc<dyn EventRepository>,
        thresholds: Arc<dyn ThresholdRepository>,
        scheduler: SchedulingEngine,
        task_generator: TaskGenerator,
        evaluator: ThresholdEvaluator,
        notifier: NotificationEngine,
        security: SecurityConfig,
    ) -> Self {
        Self {
            patients,
            medications,
            events,
            thresholds,
            scheduler,
            task_generator,
            evaluator,
            notifier,
            security,
        }
    }

    // ------------------------------------------------------------------
    // Patients
    // ------------------------------------------------------------------

    pub async fn upsert_patient(&self, record: &PatientRecord) -> AppResult<Patient> {
        if record.pseudonymous_number.trim().is_empty() {
            return Err(AppError::Validation(
                "missing pseudonymous_number".to_string(),
            ));
        }
        self.screen_fields(&[
            ("pseudonymous_number", Some(&record.pseudonymous_number)),
            ("age_band", record.age_band.as_deref()),
            ("sex", record.sex.as_deref()),
            ("ethnicity", record.ethnicity.as_deref()),
            ("service", record.service.as_deref()),
        ])?;

        match self
            .patients
            .find_by_pseudonym(&record.pseudonymous_number)
            .await?
        {
            Some(mut patient) => {
                patient.age_band = record.age_band.clone().or(patient.age_band);
                patient.sex = record.sex.clone().or(patient.sex);
                patient.ethnicity = record.ethnicity.clone().or(patient.ethnicity);
                patient.service = record.service.clone().or(patient.service);
                self.patients.update(&patient).await?;
                Ok(patient)
            }
            None => {
                let mut patient = Patient::new(record.pseudonymous_number.clone());
                patient.age_band = record.age_band.clone();
                patient.sex = record.sex.clone();
                patient.ethnicity = record.ethnicity.clone();
                patient.service = record.service.clone();
                self.patients.insert(&patient).await?;
                Ok(patient)
            }
        }
    }

    pub async fn ingest_patients(&self, records: Vec<PatientRecord>) -> AppResult<IngestReport> {
        let mut report = IngestReport::default();
        for (row, record) in records.into_iter().enumerate() {
            let existed = self
                .patients
                .find_by_pseudonym(&record.pseudonymous_number)
                .await?
                .is_some();
            match self.upsert_patient(&record).await {
                Ok(_) if existed => report.updated += 1,
                Ok(_) => report.inserted += 1,
                Err(err) => report.push_error(row, &err),
            }
        }
        Ok(report)
    }

    /// Bookkeeping for on-demand upstream fetches.
    pub async fn record_patient_fetch(
        &self,
        patient_id: Uuid,
        source_system: &str,
        requested_by: Option<&str>,
    ) -> AppResult<()> {
        self.patients
            .track_patient(patient_id, source_system, requested_by)
            .await
    }

    // ------------------------------------------------------------------
    // Medication orders
    // ------------------------------------------------------------------

    /// Upsert one medication order and reconcile its calendar. Idempotent
    /// via (source_system, source_id) when provided, else the natural key
    /// (patient, drug, start date).
    #[instrument(skip_all, fields(drug = %record.drug_name))]
    pub async fn upsert_medication(
        &self,
        record: &MedicationRecord,
    ) -> AppResult<(MedicationOrder, bool)> {
        let drug_name = record.drug_name.trim().to_string();
        if drug_name.is_empty() {
            return Err(AppError::Validation("missing drug_name".to_string()));
        }
        self.screen_fields(&[
            ("pseudonymous_number", Some(&record.pseudonymous_number)),
            ("drug_name", Some(&drug_name)),
            ("dose", record.dose.as_deref()),
        ])?;

        let start_date = parse_date("start_date", &record.start_date)?;
        let stop_date = record
            .stop_date
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| parse_date("stop_date", s))
            .transpose()?;
        if let Some(stop) = stop_date {
            if start_date > stop {
                return Err(AppError::Validation(
                    "start_date is after stop_date".to_string(),
                ));
            }
        }

        let patient = self.get_or_create_patient(&record.pseudonymous_number).await?;

        let is_hdat = record.is_hdat.unwrap_or(false);
        let drug_lower = drug_name.to_lowercase();
        let category = if is_hdat {
            DrugCategory::Hdat
        } else if SPECIAL_GROUP_DRUGS.contains(&drug_lower.as_str()) {
            DrugCategory::SpecialGroup
        } else {
            DrugCategory::Standard
        };

        let existing = match (&record.source_system, &record.source_id) {
            (Some(system), Some(id)) => self.medications.find_by_source(system, id).await?,
            _ => {
                self.medications
                    .find_natural(patient.id, &drug_name, start_date)
                    .await?
            }
        };

        let (mut medication, created) = match existing {
            Some(medication) => (medication, false),
            None => {
                let medication =
                    MedicationOrder::new(patient.id, drug_name.clone(), category, start_date);
                (medication, true)
            }
        };

        medication.drug_name = drug_name;
        medication.drug_category = category;
        medication.start_date = start_date;
        medication.stop_date = stop_date;
        medication.dose = record.dose.clone();
        medication.route = record.route.clone();
        medication.frequency = record.frequency.clone();
        medication.flags.is_hdat = is_hdat;
        medication.flags.is_clozapine = drug_lower == "clozapine";
        medication.flags.is_olanzapine = drug_lower == "olanzapine";
        medication.flags.is_chlorpromazine = drug_lower == "chlorpromazine";
        medication.source_system = record.source_system.clone();
        medication.source_id = record.source_id.clone();

        if created {
            self.medications.insert(&medication).await?;
        } else {
            self.medications.update(&medication).await?;
        }

        self.refresh_schedule(&medication, &patient).await?;
        Ok((medication, created))
    }

    pub async fn ingest_medications(
        &self,
        records: Vec<MedicationRecord>,
    ) -> AppResult<IngestReport> {
        let mut report = IngestReport::default();
        for (row, record) in records.into_iter().enumerate() {
            match self.upsert_medication(&record).await {
                Ok((_, true)) => report.inserted += 1,
                Ok((_, false)) => report.updated += 1,
                Err(err) => report.push_error(row, &err),
            }
        }
        Ok(report)
    }

    /// Recompute the calendar for a medication order and reconcile it.
    pub async fn refresh_schedule(
        &self,
        medication: &MedicationOrder,
        patient: &Patient,
    ) -> AppResult<usize> {
        let events = self.events.list_for_patient(patient.id).await?;
        let tasks = self
            .scheduler
            .calculate_schedule(medication, patient, &events)?;
        let saved = self
            .task_generator
            .create_or_update_tasks(tasks, SYSTEM_ACTOR)
            .await?;
        Ok(saved.len())
    }

    // ------------------------------------------------------------------
    // Monitoring events
    // ------------------------------------------------------------------

    /// Upsert one monitoring event, classify it, auto-complete matching
    /// open tasks, and raise an abnormal notification when warranted.
    #[instrument(skip_all, fields(test_type = %record.test_type))]
    pub async fn ingest_event(&self, record: &EventRecord) -> AppResult<EventOutcome> {
        let test_type = record.test_type.trim().to_string();
        if test_type.is_empty() {
            return Err(AppError::Validation("missing test_type".to_string()));
        }
        self.screen_fields(&[
            ("pseudonymous_number", Some(&record.pseudonymous_number)),
            ("value", record.value.as_deref()),
            ("interpretation", record.interpretation.as_deref()),
        ])?;
        let performed_date = parse_date("performed_date", &record.performed_date)?;
        let source_system = record
            .source_system
            .clone()
            .unwrap_or_else(|| "CSV_UPLOAD".to_string());

        let patient = self.get_or_create_patient(&record.pseudonymous_number).await?;

        let existing = match (&record.source_system, &record.source_id) {
            (Some(system), Some(id)) => self.events.find_by_source(system, id).await?,
            _ => {
                self.events
                    .find_natural(patient.id, &test_type, performed_date)
                    .await?
            }
        };

        let (mut event, created) = match existing {
            Some(event) => (event, false),
            None => {
                let event =
                    MonitoringEvent::new(patient.id, test_type.clone(), performed_date, &source_system);
                (event, true)
            }
        };
        if let Some(value) = &record.value {
            event.value = Some(value.clone());
        }
        if let Some(unit) = &record.unit {
            event.unit = Some(unit.clone());
        }
        if let Some(interpretation) = &record.interpretation {
            event.interpretation = Some(interpretation.clone());
        }
        if let Some(attachment_url) = &record.attachment_url {
            event.attachment_url = Some(attachment_url.clone());
        }
        event.source_id = record.source_id.clone();

        let evaluation = self.evaluator.evaluate_event(&event, &patient).await?;
        ThresholdEvaluator::apply_evaluation(&mut event, &evaluation);

        if created {
            self.events.insert(&event).await?;
        } else {
            self.events.update(&event).await?;
        }

        let completed = self
            .task_generator
            .auto_complete_tasks_for_event(&event, SYSTEM_ACTOR)
            .await?;

        let priority = match evaluation.flag {
            AbnormalFlag::OutsideCritical => Some(NotificationPriority::Critical),
            AbnormalFlag::OutsideWarning => Some(NotificationPriority::Warning),
            _ => None,
        };
        let mut notified = false;
        if let Some(priority) = priority {
            notified = self
                .notifier
                .notify_abnormal_event(&event, &patient, priority, evaluation.reason.as_deref())
                .await?
                .is_some();
        }

        Ok(EventOutcome {
            event,
            created,
            completed_tasks: completed.len(),
            notified,
        })
    }

    /// Stream an events CSV through a bounded channel: a blocking parser
    /// feeds rows, this worker ingests them one at a time, and per-row
    /// failures land in the bounded report instead of aborting the batch.
    pub async fn ingest_events_csv<R>(&self, reader: R) -> AppResult<IngestReport>
    where
        R: std::io::Read + Send + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<(usize, EventRecord)>(INGEST_CHANNEL_DEPTH);

        let parser = tokio::task::spawn_blocking(move || {
            let mut csv_reader = csv::Reader::from_reader(reader);
            let mut parse_errors: Vec<(usize, String)> = Vec::new();
            for (row, result) in csv_reader.deserialize::<EventRecord>().enumerate() {
                match result {
                    Ok(record) => {
                        if tx.blocking_send((row, record)).is_err() {
                            break;
                        }
                    }
                    Err(err) => parse_errors.push((row, err.to_string())),
                }
            }
            parse_errors
        });

        let mut report = IngestReport::default();
        while let Some((row, record)) = rx.recv().await {
            match self.ingest_event(&record).await {
                Ok(outcome) if outcome.created => report.inserted += 1,
                Ok(_) => report.updated += 1,
                Err(err) => report.push_error(row, &err),
            }
        }

        let parse_errors = parser
            .await
            .map_err(|e| AppError::Internal(format!("csv parser task: {e}")))?;
        for (row, message) in parse_errors {
            report.push_error(row, &AppError::Validation(message));
        }

        info!(
            inserted = report.inserted,
            updated = report.updated,
            skipped = report.skipped,
            "event csv ingest finished"
        );
        Ok(report)
    }

    // ------------------------------------------------------------------
    // Reference thresholds
    // ------------------------------------------------------------------

    /// Import thresholds from CSV with the documented header. Coded values
    /// accept a semicolon-separated list or a JSON array in the cell.
    pub async fn import_thresholds_csv<R: std::io::Read>(
        &self,
        reader: R,
    ) -> AppResult<IngestReport> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut report = IngestReport::default();

        for (row, result) in csv_reader.deserialize::<ThresholdRecord>().enumerate() {
            let record = match result {
                Ok(record) => record,
                Err(err) => {
                    report.push_error(row, &AppError::Validation(err.to_string()));
                    continue;
                }
            };
            match self.build_threshold(&record) {
                Ok(threshold) => {
                    self.thresholds.upsert(&threshold).await?;
                    report.inserted += 1;
                }
                Err(err) => report.push_error(row, &err),
            }
        }
        Ok(report)
    }

    fn build_threshold(&self, record: &ThresholdRecord) -> AppResult<ReferenceThreshold> {
        let comparator_type = record
            .comparator_type
            .trim()
            .to_uppercase()
            .parse::<ComparatorType>()
            .map_err(|_| {
                AppError::Configuration(format!(
                    "invalid comparator_type: {}",
                    record.comparator_type
                ))
            })?;

        let mut threshold = ReferenceThreshold::numeric(
            record.monitoring_type.trim().to_string(),
            record.unit.trim().to_string(),
        );
        threshold.comparator_type = comparator_type;
        threshold.sex = non_empty(&record.sex);
        threshold.age_band = non_empty(&record.age_band);
        threshold.source_system_scope = non_empty(&record.source_system_scope);
        threshold.low_critical = record.low_critical;
        threshold.low_warning = record.low_warning;
        threshold.high_warning = record.high_warning;
        threshold.high_critical = record.high_critical;
        threshold.coded_abnormal_values = parse_coded_values(&record.coded_abnormal_values);
        threshold.enabled = record.enabled.unwrap_or(true);
        threshold.version = non_empty(&record.version);

        if threshold.monitoring_type.is_empty() {
            return Err(AppError::Validation("missing monitoring_type".to_string()));
        }
        if !threshold.limits_are_ordered() {
            return Err(AppError::Validation(format!(
                "unordered limits for {}",
                threshold.monitoring_type
            )));
        }
        if comparator_type == ComparatorType::Numeric && !threshold.has_limits() {
            return Err(AppError::Validation(format!(
                "numeric threshold for {} has no limits",
                threshold.monitoring_type
            )));
        }
        Ok(threshold)
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    async fn get_or_create_patient(&self, pseudonym: &str) -> AppResult<Patient> {
        let pseudonym = pseudonym.trim();
        if pseudonym.is_empty() {
            return Err(AppError::Validation(
                "missing pseudonymous_number".to_string(),
            ));
        }
        if let Some(patient) = self.patients.find_by_pseudonym(pseudonym).await? {
            return Ok(patient);
        }
        let patient = Patient::new(pseudonym);
        self.patients.insert(&patient).await?;
        Ok(patient)
    }

    /// Reject identifier-like values in anonymised mode, pointing at the
    /// offending field.
    fn screen_fields(&self, fields: &[(&str, Option<&str>)]) -> AppResult<()> {
        if self.security.allow_identifiers {
            return Ok(());
        }
        for (name, value) in fields {
            if let Some(value) = value {
                let matches = find_identifier_matches(value);
                if !matches.is_empty() {
                    return Err(AppError::Validation(format!(
                        "{name} contains identifier-like value ({})",
                        matches.join(", ")
                    )));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ThresholdRecord {
    monitoring_type: String,
    unit: String,
    comparator_type: String,
    #[serde(default)]
    sex: Option<String>,
    #[serde(default)]
    age_band: Option<String>,
    #[serde(default)]
    source_system_scope: Option<String>,
    #[serde(default)]
    low_critical: Option<f64>,
    #[serde(default)]
    low_warning: Option<f64>,
    #[serde(default)]
    high_warning: Option<f64>,
    #[serde(default)]
    high_critical: Option<f64>,
    #[serde(default)]
    coded_abnormal_values: Option<String>,
    #[serde(default)]
    enabled: Option<bool>,
    #[serde(default)]
    version: Option<String>,
}

fn parse_date(field: &str, raw: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("invalid {field}: {raw} (expected YYYY-MM-DD)")))
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_coded_values(cell: &Option<String>) -> Vec<String> {
    let Some(cell) = cell else {
        return Vec::new();
    };
    let cell = cell.trim();
    if cell.is_empty() {
        return Vec::new();
    }
    if cell.starts_with('[') {
        if let Ok(values) = serde_json::from_str::<Vec<String>>(cell) {
            return values;
        }
    }
    cell.split(';')
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}
