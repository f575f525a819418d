pub mod config;
pub mod infrastructure;
pub mod shared;

pub use crate::config::Settings;
pub use crate::shared::{AppError, AppResult, ErrorKind};
pub use crate::shared::{AuditAction, AuditContext, AuditRecord};
