//! Ruleset loading and validation.

use std::sync::Arc;

use shared::{AppError, AppResult};

use crate::domain::models::{Ruleset, RulesetVersion};
use crate::domain::repositories::RulesetRepository;

const DEFAULT_RULESET: &str = include_str!("../../rules/ruleset_v1.json");

/// Parse and validate a ruleset document.
pub fn parse_ruleset(raw: &str) -> AppResult<Ruleset> {
    let ruleset: Ruleset = serde_json::from_str(raw)
        .map_err(|e| AppError::Configuration(format!("invalid ruleset document: {e}")))?;
    validate_ruleset(&ruleset)?;
    Ok(ruleset)
}

/// The ruleset compiled into the binary; used until an operator uploads a
/// versioned replacement.
pub fn default_ruleset() -> AppResult<Ruleset> {
    parse_ruleset(DEFAULT_RULESET)
}

/// Validate and persist an uploaded ruleset revision. The new version
/// becomes active immediately because the newest `created_at` wins.
pub async fn upload_ruleset(
    repo: &Arc<dyn RulesetRepository>,
    version: &str,
    effective_from: chrono::NaiveDate,
    raw: &str,
) -> AppResult<RulesetVersion> {
    if version.trim().is_empty() {
        return Err(AppError::Validation("missing ruleset version".to_string()));
    }
    let rules = parse_ruleset(raw)?;
    let ruleset_version = RulesetVersion::new(version.trim(), effective_from, rules);
    repo.insert_version(&ruleset_version).await?;
    Ok(ruleset_version)
}

/// The active ruleset: the newest persisted version, or the embedded
/// default when none has been uploaded.
pub async fn load_active_ruleset(repo: &Arc<dyn RulesetRepository>) -> AppResult<Ruleset> {
    match repo.latest().await? {
        Some(version) => {
            validate_ruleset(&version.rules)?;
            Ok(version.rules)
        }
        None => default_ruleset(),
    }
}

fn validate_ruleset(ruleset: &Ruleset) -> AppResult<()> {
    if ruleset.categories.is_empty() {
        return Err(AppError::Configuration(
            "ruleset defines no categories".to_string(),
        ));
    }
    for (name, rules) in &ruleset.categories {
        let has_any = !rules.baseline.is_empty()
            || rules.weekly.as_ref().is_some_and(|w| !w.tests.is_empty())
            || rules.milestones.iter().any(|m| !m.tests.is_empty())
            || rules.annual.as_ref().is_some_and(|b| !b.tests.is_empty())
            || rules
                .every_3_months
                .as_ref()
                .is_some_and(|b| !b.tests.is_empty())
            || rules
                .every_4_6_months
                .as_ref()
                .is_some_and(|b| !b.tests.is_empty())
            || rules
                .every_6_months
                .as_ref()
                .is_some_and(|b| !b.tests.is_empty());
        if !has_any {
            return Err(AppError::Configuration(format!(
                "ruleset category {name} defines no tests"
            )));
        }
        if let Some(weekly) = &rules.weekly {
            if weekly.interval_weeks == 0 {
                return Err(AppError::Configuration(format!(
                    "ruleset category {name} has a zero weekly interval"
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ruleset_parses_and_validates() {
        let ruleset = default_ruleset().unwrap();
        assert!(ruleset.category("STANDARD").is_some());
        assert!(ruleset.category("SPECIAL_GROUP").is_some());
        assert!(ruleset.category("HDAT").is_some());
    }

    #[test]
    fn standard_baseline_covers_core_panel() {
        let ruleset = default_ruleset().unwrap();
        let baseline = &ruleset.category("STANDARD").unwrap().baseline;
        for test in ["Weight/BMI", "Prolactin", "Lipids", "BP", "Pulse", "U&Es", "FBC"] {
            assert!(baseline.iter().any(|t| t == test), "missing {test}");
        }
    }

    #[test]
    fn empty_category_is_rejected() {
        let err = parse_ruleset(r#"{"categories": {"STANDARD": {}}}"#).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[test]
    fn garbage_document_is_a_configuration_error() {
        let err = parse_ruleset("not json").unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }
}
