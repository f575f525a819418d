//! Export bundle: a ZIP of patients.csv, medications.csv, events.csv with
//! stable headers.

use std::io::Write;
use std::sync::Arc;

use shared::{AppError, AppResult};
use tracing::instrument;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::domain::repositories::{EventRepository, MedicationRepository, PatientRepository};

pub struct ExportService {
    patients: Arc<dyn PatientRepository>,
    medications: Arc<dyn MedicationRepository>,
    events: Arc<dyn EventRepository>,
}

impl ExportService {
    pub fn new(
        patients: Arc<dyn PatientRepository>,
        medications: Arc<dyn MedicationRepository>,
        events: Arc<dyn EventRepository>,
    ) -> Self {
        Self {
            patients,
            medications,
            events,
        }
    }

    /// Build the bundle. With `tracked_only`, rows are restricted to
    /// patients with a tracking record; an empty tracking set yields empty
    /// CSVs rather than everything.
    #[instrument(skip_all, fields(tracked_only))]
    pub async fn build_export_zip(&self, tracked_only: bool) -> AppResult<Vec<u8>> {
        let patient_ids = if tracked_only {
            Some(self.patients.tracked_patient_ids().await?)
        } else {
            None
        };
        let id_filter = patient_ids.as_deref();

        let patients = self.patients.list_all(id_filter).await?;
        let medications = self.medications.list_all(id_filter).await?;
        let events = self.events.list_all(id_filter).await?;

        let mut pseudonyms = std::collections::HashMap::new();
        for patient in &patients {
            pseudonyms.insert(patient.id, patient.pseudonym.clone());
        }
        let pseudonym_of =
            |id: &uuid::Uuid| pseudonyms.get(id).cloned().unwrap_or_default();

        let patients_csv = to_csv(
            &["pseudonymous_number", "age_band", "sex", "ethnicity", "service"],
            patients.iter().map(|p| {
                vec![
                    p.pseudonym.clone(),
                    p.age_band.clone().unwrap_or_default(),
                    p.sex.clone().unwrap_or_default(),
                    p.ethnicity.clone().unwrap_or_default(),
                    p.service.clone().unwrap_or_default(),
                ]
            }),
        )?;

        let medications_csv = to_csv(
            &[
                "pseudonymous_number",
                "drug_name",
                "start_date",
                "stop_date",
                "dose",
                "route",
                "frequency",
                "is_hdat",
            ],
            medications.iter().map(|m| {
                vec![
                    pseudonym_of(&m.patient_id),
                    m.drug_name.clone(),
                    m.start_date.to_string(),
                    m.stop_date.map(|d| d.to_string()).unwrap_or_default(),
                    m.dose.clone().unwrap_or_default(),
                    m.route.clone().unwrap_or_default(),
                    m.frequency.clone().unwrap_or_default(),
                    m.flags.is_hdat.to_string(),
                ]
            }),
        )?;

        let events_csv = to_csv(
            &[
                "pseudonymous_number",
                "test_type",
                "performed_date",
                "value",
                "unit",
                "interpretation",
                "attachment_url",
                "abnormal_flag",
                "reviewed_status",
                "source_system",
            ],
            events.iter().map(|e| {
                vec![
                    pseudonym_of(&e.patient_id),
                    e.test_type.clone(),
                    e.performed_date.to_string(),
                    e.value.clone().unwrap_or_default(),
                    e.unit.clone().unwrap_or_default(),
                    e.interpretation.clone().unwrap_or_default(),
                    e.attachment_url.clone().unwrap_or_default(),
                    e.abnormal_flag.to_string(),
                    e.reviewed_status.map(|s| s.to_string()).unwrap_or_default(),
                    e.source_system.clone(),
                ]
            }),
        )?;

        let mut buffer = Vec::new();
        {
            let mut zip = ZipWriter::new(std::io::Cursor::new(&mut buffer));
            let options = SimpleFileOptions::default();
            for (name, contents) in [
                ("patients.csv", &patients_csv),
                ("medications.csv", &medications_csv),
                ("events.csv", &events_csv),
            ] {
                zip.start_file(name, options)
                    .map_err(|e| AppError::Internal(format!("export zip entry {name}: {e}")))?;
                zip.write_all(contents.as_bytes())
                    .map_err(|e| AppError::Internal(format!("export zip write {name}: {e}")))?;
            }
            zip.finish()
                .map_err(|e| AppError::Internal(format!("export zip finish: {e}")))?;
        }
        Ok(buffer)
    }
}

fn to_csv<I>(columns: &[&str], rows: I) -> AppResult<String>
where
    I: Iterator<Item = Vec<String>>,
{
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(columns)
        .map_err(|e| AppError::Internal(format!("export csv header: {e}")))?;
    for row in rows {
        writer
            .write_record(&row)
            .map_err(|e| AppError::Internal(format!("export csv row: {e}")))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("export csv flush: {e}")))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("export csv utf8: {e}")))
}
