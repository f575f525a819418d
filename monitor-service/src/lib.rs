//! Physical-health monitoring core for antipsychotic prescribing.
//!
//! Expands medication orders into monitoring calendars, reconciles the
//! calendar against observed results, classifies result values against
//! operator-configured thresholds, and raises deduplicated in-app
//! notifications for overdue and abnormal findings.

pub mod domain;
pub mod infrastructure;
pub mod jobs;
pub mod services;
