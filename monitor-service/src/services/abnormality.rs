//! Threshold evaluation: classify a monitoring event value as
//! NORMAL / OUTSIDE_WARNING / OUTSIDE_CRITICAL / UNKNOWN.

use std::sync::Arc;

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use shared::AppResult;
use tracing::instrument;
use uuid::Uuid;

use crate::domain::models::{
    AbnormalFlag, ComparatorType, MonitoringEvent, Patient, ReferenceThreshold, ReviewStatus,
};
use crate::domain::repositories::ThresholdRepository;

static NUMERIC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(-?\d+(?:\.\d+)?)\s*([a-zA-Z%µ/]+)?")
        .unwrap_or_else(|e| panic!("numeric value pattern: {e}"))
});

/// Outcome of classifying one event.
#[derive(Debug, Clone, PartialEq)]
pub struct AbnormalEvaluation {
    pub flag: AbnormalFlag,
    pub reason: Option<String>,
    pub threshold_id: Option<Uuid>,
    pub numeric_value: Option<f64>,
    pub unit: Option<String>,
}

impl AbnormalEvaluation {
    fn unknown(reason: &str, numeric_value: Option<f64>, unit: Option<String>) -> Self {
        Self {
            flag: AbnormalFlag::Unknown,
            reason: Some(reason.to_string()),
            threshold_id: None,
            numeric_value,
            unit,
        }
    }
}

/// Pull the first numeric token (and any trailing unit) out of a free-form
/// result value such as "7.5 %" or "110mmol/L".
pub fn parse_numeric_value(value: Option<&str>) -> (Option<f64>, Option<String>) {
    let Some(value) = value else {
        return (None, None);
    };
    let Some(caps) = NUMERIC_RE.captures(value) else {
        return (None, None);
    };
    let numeric = caps.get(1).and_then(|m| m.as_str().parse::<f64>().ok());
    if numeric.is_none() {
        return (None, None);
    }
    let unit = caps.get(2).map(|m| m.as_str().to_string());
    (numeric, unit)
}

/// Units compare with whitespace stripped, case preserved.
pub fn normalize_unit(unit: Option<&str>) -> Option<String> {
    unit.map(|u| u.split_whitespace().collect::<String>())
        .filter(|u| !u.is_empty())
}

pub struct ThresholdEvaluator {
    thresholds: Arc<dyn ThresholdRepository>,
}

impl ThresholdEvaluator {
    pub fn new(thresholds: Arc<dyn ThresholdRepository>) -> Self {
        Self { thresholds }
    }

    #[instrument(skip_all, fields(event_id = %event.id, test_type = %event.test_type))]
    pub async fn evaluate_event(
        &self,
        event: &MonitoringEvent,
        patient: &Patient,
    ) -> AppResult<AbnormalEvaluation> {
        let thresholds = self.thresholds.enabled_for_type(&event.test_type).await?;
        Ok(evaluate_against(&thresholds, event, patient))
    }

    /// Write an evaluation back onto the event: flag and reason always, the
    /// parsed unit when the event had none, and the review state.
    /// PENDING_REVIEW is set exactly when the flag is warning or critical.
    pub fn apply_evaluation(event: &mut MonitoringEvent, evaluation: &AbnormalEvaluation) {
        event.abnormal_flag = evaluation.flag;
        event.abnormal_reason_code = evaluation.reason.clone();
        if event.unit.is_none() {
            event.unit = evaluation.unit.clone();
        }
        if matches!(
            evaluation.flag,
            AbnormalFlag::OutsideWarning | AbnormalFlag::OutsideCritical
        ) {
            event.reviewed_status = Some(ReviewStatus::PendingReview);
        } else {
            event.reviewed_status = None;
            event.reviewed_by = None;
            event.reviewed_at = None;
        }
    }

    /// Mark an event clinically reviewed, recording the actor and time.
    pub fn mark_reviewed(event: &mut MonitoringEvent, reviewed_by: &str) {
        event.reviewed_status = Some(ReviewStatus::Reviewed);
        event.reviewed_by = Some(reviewed_by.to_string());
        event.reviewed_at = Some(Utc::now());
    }
}

/// Classification core, independent of storage.
pub fn evaluate_against(
    thresholds: &[ReferenceThreshold],
    event: &MonitoringEvent,
    patient: &Patient,
) -> AbnormalEvaluation {
    if thresholds.is_empty() {
        return AbnormalEvaluation::unknown("NO_THRESHOLDS", None, None);
    }

    if let Some(coded) = evaluate_coded(thresholds, event) {
        return coded;
    }

    let (numeric_value, parsed_unit) = parse_numeric_value(event.value.as_deref());
    let unit = event.unit.clone().or(parsed_unit);
    let Some(numeric_value) = numeric_value else {
        return AbnormalEvaluation::unknown("NON_NUMERIC_VALUE", None, unit);
    };

    let unit_norm = normalize_unit(unit.as_deref());
    let Some(threshold) = select_numeric_threshold(thresholds, patient, event, unit_norm.as_deref())
    else {
        return AbnormalEvaluation::unknown("UNIT_MISMATCH", Some(numeric_value), unit_norm);
    };

    let (flag, reason) = compare_numeric(threshold, numeric_value);
    AbnormalEvaluation {
        flag,
        reason,
        threshold_id: Some(threshold.id),
        numeric_value: Some(numeric_value),
        unit: unit_norm,
    }
}

/// Coded pass runs first; any coded hit is critical.
fn evaluate_coded(
    thresholds: &[ReferenceThreshold],
    event: &MonitoringEvent,
) -> Option<AbnormalEvaluation> {
    let interpretation = event.interpretation.as_deref()?.trim();
    if interpretation.is_empty() {
        return None;
    }
    let interpretation_upper = interpretation.to_uppercase();
    thresholds
        .iter()
        .filter(|t| t.comparator_type == ComparatorType::Coded)
        .find(|t| {
            t.coded_abnormal_values
                .iter()
                .any(|v| v.to_uppercase() == interpretation_upper)
        })
        .map(|t| AbnormalEvaluation {
            flag: AbnormalFlag::OutsideCritical,
            reason: Some("CODED_ABNORMAL".to_string()),
            threshold_id: Some(t.id),
            numeric_value: None,
            unit: None,
        })
}

/// Numeric candidates must match the event's normalized unit and every set
/// scoping facet; the most specific candidate wins, stable on ties.
fn select_numeric_threshold<'a>(
    thresholds: &'a [ReferenceThreshold],
    patient: &Patient,
    event: &MonitoringEvent,
    unit: Option<&str>,
) -> Option<&'a ReferenceThreshold> {
    let candidates = thresholds
        .iter()
        .filter(|t| t.comparator_type == ComparatorType::Numeric)
        .filter(|t| normalize_unit(Some(&t.unit)).as_deref() == unit)
        .filter(|t| facet_matches(t.sex.as_deref(), patient.sex.as_deref()))
        .filter(|t| facet_matches(t.age_band.as_deref(), patient.age_band.as_deref()))
        .filter(|t| {
            facet_matches(
                t.source_system_scope.as_deref(),
                Some(event.source_system.as_str()),
            )
        });

    // Highest specificity wins; the first candidate keeps ties stable.
    let mut best: Option<&ReferenceThreshold> = None;
    for candidate in candidates {
        match best {
            Some(current) if candidate.specificity() <= current.specificity() => {}
            _ => best = Some(candidate),
        }
    }
    best
}

fn facet_matches(facet: Option<&str>, subject: Option<&str>) -> bool {
    match facet {
        None => true,
        Some(facet) => subject == Some(facet),
    }
}

/// Bounds are checked in a fixed order and the first match wins.
fn compare_numeric(
    threshold: &ReferenceThreshold,
    value: f64,
) -> (AbnormalFlag, Option<String>) {
    if !threshold.has_limits() {
        return (AbnormalFlag::Unknown, Some("NO_LIMITS".to_string()));
    }
    if threshold.low_critical.is_some_and(|lc| value < lc) {
        return (AbnormalFlag::OutsideCritical, Some("LOW_CRITICAL".to_string()));
    }
    if threshold.low_warning.is_some_and(|lw| value < lw) {
        return (AbnormalFlag::OutsideWarning, Some("LOW_WARNING".to_string()));
    }
    if threshold.high_critical.is_some_and(|hc| value > hc) {
        return (AbnormalFlag::OutsideCritical, Some("HIGH_CRITICAL".to_string()));
    }
    if threshold.high_warning.is_some_and(|hw| value > hw) {
        return (AbnormalFlag::OutsideWarning, Some("HIGH_WARNING".to_string()));
    }
    (AbnormalFlag::Normal, None)
}
