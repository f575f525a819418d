//! Worklist query: tasks joined with medication and patient, for the
//! clinical review screen.

use std::sync::Arc;

use serde::Serialize;
use shared::AppResult;

use crate::domain::models::{DrugCategory, TaskStatus, WorklistRow};
use crate::domain::repositories::TaskRepository;

#[derive(Debug, Clone, Default)]
pub struct WorklistQuery {
    pub status: Option<TaskStatus>,
    pub drug_category: Option<DrugCategory>,
}

#[derive(Debug, Serialize)]
pub struct Worklist {
    pub count: usize,
    pub items: Vec<WorklistRow>,
}

/// Filtered tasks sorted by due date ascending.
pub async fn get_worklist(
    tasks: &Arc<dyn TaskRepository>,
    query: &WorklistQuery,
) -> AppResult<Worklist> {
    let items = tasks.worklist(query.status, query.drug_category).await?;
    Ok(Worklist {
        count: items.len(),
        items,
    })
}
