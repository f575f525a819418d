use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Bookkeeping counter for patients pulled in on demand from an upstream
/// record system. Drives the tracked-only export filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedPatient {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub patient_hash: Option<String>,
    pub source_system: Option<String>,
    pub requested_by: Option<String>,
    pub request_count: i64,
    pub first_requested_at: DateTime<Utc>,
    pub last_requested_at: DateTime<Utc>,
}

impl TrackedPatient {
    pub fn new(patient_id: Uuid, source_system: Option<String>, requested_by: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            patient_id,
            patient_hash: None,
            source_system,
            requested_by,
            request_count: 1,
            first_requested_at: now,
            last_requested_at: now,
        }
    }
}
