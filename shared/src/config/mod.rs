pub mod settings;

pub use settings::{
    AuditConfig, DatabaseConfig, LoggingConfig, MonitoringConfig, NotificationConfig,
    SecurityConfig, Settings,
};
