pub mod audit;
pub mod events;
pub mod medications;
pub mod notifications;
pub mod patients;
pub mod rulesets;
pub mod tasks;
pub mod thresholds;

pub use audit::AuditRepository;
pub use events::EventRepository;
pub use medications::MedicationRepository;
pub use notifications::{NotificationFilter, NotificationRepository};
pub use patients::PatientRepository;
pub use rulesets::RulesetRepository;
pub use tasks::TaskRepository;
pub use thresholds::ThresholdRepository;
