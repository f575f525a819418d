pub mod audit;
pub mod error;
pub mod identifier;
pub mod result;

pub use audit::{AuditAction, AuditContext, AuditRecord};
pub use error::{AppError, ErrorKind};
pub use result::AppResult;
