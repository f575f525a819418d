use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// How a threshold compares against event values.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComparatorType {
    Numeric,
    Coded,
}

/// Operator-configured classification rule for one monitoring type.
///
/// Scoping facets (sex, age band, source system) narrow applicability; a
/// null facet matches everything. Bounds are ordered
/// low_critical ≤ low_warning ≤ high_warning ≤ high_critical.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceThreshold {
    pub id: Uuid,
    pub monitoring_type: String,
    pub unit: String,
    pub comparator_type: ComparatorType,
    pub sex: Option<String>,
    pub age_band: Option<String>,
    pub source_system_scope: Option<String>,
    pub low_critical: Option<f64>,
    pub low_warning: Option<f64>,
    pub high_warning: Option<f64>,
    pub high_critical: Option<f64>,
    pub coded_abnormal_values: Vec<String>,
    pub enabled: bool,
    pub version: Option<String>,
    pub updated_by: Option<String>,
}

impl ReferenceThreshold {
    pub fn numeric(monitoring_type: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            monitoring_type: monitoring_type.into(),
            unit: unit.into(),
            comparator_type: ComparatorType::Numeric,
            sex: None,
            age_band: None,
            source_system_scope: None,
            low_critical: None,
            low_warning: None,
            high_warning: None,
            high_critical: None,
            coded_abnormal_values: Vec::new(),
            enabled: true,
            version: None,
            updated_by: None,
        }
    }

    pub fn coded(
        monitoring_type: impl Into<String>,
        unit: impl Into<String>,
        coded_abnormal_values: Vec<String>,
    ) -> Self {
        Self {
            comparator_type: ComparatorType::Coded,
            coded_abnormal_values,
            ..Self::numeric(monitoring_type, unit)
        }
    }

    pub fn has_limits(&self) -> bool {
        self.low_critical.is_some()
            || self.low_warning.is_some()
            || self.high_warning.is_some()
            || self.high_critical.is_some()
    }

    /// Specificity score for tie-breaking among matching thresholds:
    /// sex +2, age band +1, source system scope +2.
    pub fn specificity(&self) -> i32 {
        let mut score = 0;
        if self.sex.is_some() {
            score += 2;
        }
        if self.age_band.is_some() {
            score += 1;
        }
        if self.source_system_scope.is_some() {
            score += 2;
        }
        score
    }

    /// Bound ordering sanity check used on upsert and CSV import.
    pub fn limits_are_ordered(&self) -> bool {
        let ordered = |lo: Option<f64>, hi: Option<f64>| match (lo, hi) {
            (Some(lo), Some(hi)) => lo <= hi,
            _ => true,
        };
        ordered(self.low_critical, self.low_warning)
            && ordered(self.low_warning, self.high_warning)
            && ordered(self.high_warning, self.high_critical)
            && ordered(self.low_critical, self.high_critical)
    }
}
