//! sqlx-backed repository implementations. Queries use the runtime API so
//! the crate builds without a live database; row structs mirror column
//! order in the corresponding SELECT statements.

mod audit;
mod events;
mod medications;
mod notifications;
mod patients;
mod rulesets;
mod tasks;
mod thresholds;

pub use audit::PgAuditRepository;
pub use events::PgEventRepository;
pub use medications::PgMedicationRepository;
pub use notifications::PgNotificationRepository;
pub use patients::PgPatientRepository;
pub use rulesets::PgRulesetRepository;
pub use tasks::PgTaskRepository;
pub use thresholds::PgThresholdRepository;

use shared::{AppError, AppResult};

/// Stored enum values are trusted strings; a mismatch means schema drift.
pub(crate) fn parse_stored<T: std::str::FromStr>(raw: &str, what: &str) -> AppResult<T> {
    raw.parse()
        .map_err(|_| AppError::Internal(format!("stored {what} has unexpected value: {raw}")))
}
