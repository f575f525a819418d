pub mod medication;
pub mod monitoring;
pub mod notifications;
pub mod patient;
pub mod ruleset;
pub mod thresholds;
pub mod tracking;

pub use medication::{DrugCategory, MedicationFlags, MedicationOrder, SPECIAL_GROUP_DRUGS};
pub use monitoring::{
    AbnormalFlag, MonitoringEvent, MonitoringTask, ReviewStatus, TaskStatus, WorklistRow,
};
pub use notifications::{
    InAppNotification, NotificationPriority, NotificationStatus, NotificationType, Recipient,
    RecipientType,
};
pub use patient::{Patient, RiskFlags};
pub use ruleset::{
    CategoryRules, MilestoneException, MilestoneRule, Ruleset, RulesetVersion, TestsBlock,
    WeeklyBlock,
};
pub use thresholds::{ComparatorType, ReferenceThreshold};
pub use tracking::TrackedPatient;
