use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A monitored patient, known only by a stable pseudonym.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub pseudonym: String,
    pub sex: Option<String>,
    pub age_band: Option<String>,
    pub ethnicity: Option<String>,
    pub service: Option<String>,
    pub risk_flags: Option<RiskFlags>,
}

impl Patient {
    pub fn new(pseudonym: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            pseudonym: pseudonym.into(),
            sex: None,
            age_band: None,
            ethnicity: None,
            service: None,
            risk_flags: None,
        }
    }
}

/// Clinician-attested cardiovascular risk indicators used by ECG rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskFlags {
    pub ecg_indicated: bool,
    pub cv_risk_present: bool,
    pub family_history_cvd: bool,
    pub inpatient_admission: bool,
    pub attested_by: Option<String>,
    pub attested_at: Option<DateTime<Utc>>,
}

impl RiskFlags {
    /// Any flag that indicates an ECG is warranted.
    pub fn any_ecg_indicator(&self) -> bool {
        self.ecg_indicated
            || self.cv_risk_present
            || self.family_history_cvd
            || self.inpatient_admission
    }
}
