use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Versioned monitoring ruleset: the data-driven half of schedule
/// expansion. Category-specific special cases (clozapine FBC, HDAT add-on,
/// ECG indication) are applied in code after generic expansion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ruleset {
    pub categories: HashMap<String, CategoryRules>,
}

impl Ruleset {
    pub fn category(&self, name: &str) -> Option<&CategoryRules> {
        self.categories.get(name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryRules {
    #[serde(default)]
    pub baseline: Vec<String>,
    #[serde(default)]
    pub weekly: Option<WeeklyBlock>,
    #[serde(default)]
    pub milestones: Vec<MilestoneRule>,
    #[serde(default)]
    pub annual: Option<TestsBlock>,
    #[serde(default)]
    pub every_3_months: Option<TestsBlock>,
    #[serde(default)]
    pub every_4_6_months: Option<TestsBlock>,
    #[serde(default)]
    pub every_6_months: Option<TestsBlock>,
}

/// N repeats at a fixed week interval after the start date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyBlock {
    pub count: u32,
    #[serde(default = "default_interval_weeks")]
    pub interval_weeks: u32,
    #[serde(default)]
    pub tests: Vec<String>,
}

fn default_interval_weeks() -> u32 {
    1
}

/// Tests due at a fixed month offset, with optional per-drug removals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestoneRule {
    pub months: u32,
    #[serde(default)]
    pub tests: Vec<String>,
    #[serde(default)]
    pub exceptions: HashMap<String, MilestoneException>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MilestoneException {
    #[serde(default)]
    pub remove_tests: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestsBlock {
    #[serde(default)]
    pub tests: Vec<String>,
}

/// A persisted ruleset revision; the newest `created_at` is authoritative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesetVersion {
    pub id: Uuid,
    pub version: String,
    pub effective_from: NaiveDate,
    pub rules: Ruleset,
    pub created_at: DateTime<Utc>,
}

impl RulesetVersion {
    pub fn new(version: impl Into<String>, effective_from: NaiveDate, rules: Ruleset) -> Self {
        Self {
            id: Uuid::new_v4(),
            version: version.into(),
            effective_from,
            rules,
            created_at: Utc::now(),
        }
    }
}
