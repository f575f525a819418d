use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Lifecycle state of a monitoring task.
///
/// DONE and WAIVED are terminal for reconciliation; ONGOING marks
/// open-ended vigilance and never transitions automatically.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Due,
    Overdue,
    Done,
    Waived,
    Ongoing,
}

/// Classification of an event value against reference thresholds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AbnormalFlag {
    Normal,
    OutsideWarning,
    OutsideCritical,
    Unknown,
}

/// Clinical review state of an abnormal event.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    PendingReview,
    Reviewed,
}

/// A derived monitoring obligation owned by one medication order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringTask {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub medication_order_id: Uuid,
    pub test_type: String,
    pub due_date: NaiveDate,
    pub status: TaskStatus,
    pub assigned_to: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub waived_reason: Option<String>,
    pub waived_until: Option<NaiveDate>,
}

impl MonitoringTask {
    pub fn new(
        patient_id: Uuid,
        medication_order_id: Uuid,
        test_type: impl Into<String>,
        due_date: NaiveDate,
        status: TaskStatus,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id,
            medication_order_id,
            test_type: test_type.into(),
            due_date,
            status,
            assigned_to: None,
            completed_at: None,
            waived_reason: None,
            waived_until: None,
        }
    }

    /// DONE and WAIVED are never regressed by automatic reconciliation.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, TaskStatus::Done | TaskStatus::Waived)
    }

    pub fn is_open(&self) -> bool {
        matches!(self.status, TaskStatus::Due | TaskStatus::Overdue)
    }
}

/// An observed test result for a patient. Medication linkage is soft.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringEvent {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub medication_order_id: Option<Uuid>,
    pub test_type: String,
    pub performed_date: NaiveDate,
    pub value: Option<String>,
    pub unit: Option<String>,
    pub interpretation: Option<String>,
    pub attachment_url: Option<String>,
    pub source_system: String,
    pub source_id: Option<String>,
    pub recorded_by: Option<String>,
    pub abnormal_flag: AbnormalFlag,
    pub abnormal_reason_code: Option<String>,
    pub reviewed_status: Option<ReviewStatus>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl MonitoringEvent {
    pub fn new(
        patient_id: Uuid,
        test_type: impl Into<String>,
        performed_date: NaiveDate,
        source_system: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id,
            medication_order_id: None,
            test_type: test_type.into(),
            performed_date,
            value: None,
            unit: None,
            interpretation: None,
            attachment_url: None,
            source_system: source_system.into(),
            source_id: None,
            recorded_by: None,
            abnormal_flag: AbnormalFlag::Unknown,
            abnormal_reason_code: None,
            reviewed_status: None,
            reviewed_by: None,
            reviewed_at: None,
        }
    }
}

/// One worklist line: a task joined with its medication and patient.
#[derive(Debug, Clone, Serialize)]
pub struct WorklistRow {
    pub task_id: Uuid,
    pub patient_id: Uuid,
    pub pseudonym: String,
    pub drug_name: String,
    pub start_date: NaiveDate,
    pub hdat: bool,
    pub test_type: String,
    pub due_date: NaiveDate,
    pub assigned_to: Option<String>,
    pub status: TaskStatus,
}
