//! Schedule expansion: medication order -> deduplicated, sorted task list.

use std::collections::HashSet;

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, Utc};
use shared::config::MonitoringConfig;
use shared::{AppError, AppResult};
use tracing::instrument;
use uuid::Uuid;

use crate::domain::models::{
    CategoryRules, MedicationOrder, MonitoringEvent, MonitoringTask, Patient, Ruleset, TaskStatus,
};
use crate::services::rule_evaluator::{add_weeks, RuleEvaluator};

const ECG_IF_INDICATED: &str = "ECG_if_indicated";
const ECG: &str = "ECG";

/// Add calendar months while clamping to the target month's last day, so
/// end-of-month start dates stay at month end.
pub fn add_months(start: NaiveDate, months: u32) -> NaiveDate {
    let zero_based = i64::from(start.month0()) + i64::from(months);
    let year = start.year() + (zero_based / 12) as i32;
    let month = (zero_based % 12) as u32 + 1;
    let day = start.day().min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MAX)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    first_of_next
        .and_then(|d| d.checked_sub_days(Days::new(1)))
        .map(|d| d.day())
        .unwrap_or(28)
}

fn normalize_test_type(test_type: &str) -> String {
    test_type.trim().to_lowercase()
}

/// Exact test-type match, plus the one fuzzy rule: glucose and HbA1c
/// results satisfy each other's monitoring obligations.
pub fn matches_test_type(task_type: &str, event_type: &str) -> bool {
    let task_norm = normalize_test_type(task_type);
    let event_norm = normalize_test_type(event_type);
    if task_norm == event_norm {
        return true;
    }
    let fuzzy = |s: &str| s.contains("glucose") || s.contains("hba1c");
    fuzzy(&task_norm) && fuzzy(&event_norm)
}

/// A date's midnight as a UTC instant; the completion timestamp granted to
/// tasks closed by a dated result.
pub fn utc_midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

#[derive(Debug, Clone)]
struct Milestone {
    due_date: NaiveDate,
    tests: Vec<String>,
}

/// Expands a medication order into its monitoring calendar. Pure and
/// deterministic apart from today's date, which fixes initial statuses.
pub struct SchedulingEngine {
    ruleset: Ruleset,
    window_days: i64,
    horizon_years: i32,
    evaluator: RuleEvaluator,
}

impl SchedulingEngine {
    pub fn new(ruleset: Ruleset, config: &MonitoringConfig) -> Self {
        Self {
            ruleset,
            window_days: config.task_window_days,
            horizon_years: config.scheduling_horizon_years,
            evaluator: RuleEvaluator::new(),
        }
    }

    #[instrument(skip_all, fields(medication_id = %medication.id, drug = %medication.drug_name))]
    pub fn calculate_schedule(
        &self,
        medication: &MedicationOrder,
        patient: &Patient,
        existing_events: &[MonitoringEvent],
    ) -> AppResult<Vec<MonitoringTask>> {
        let category = medication.effective_category().to_string();
        let category_rules = self.ruleset.category(&category).ok_or_else(|| {
            AppError::Configuration(format!("no rules defined for category: {category}"))
        })?;

        let ecg_required = self.evaluator.should_require_ecg(medication, patient);
        let today = Utc::now().date_naive();

        let milestones = self.build_milestones(medication, category_rules);

        let mut tasks: Vec<MonitoringTask> = Vec::new();
        for milestone in &milestones {
            self.generate_milestone_tasks(
                medication,
                patient,
                milestone,
                existing_events,
                ecg_required,
                today,
                &mut tasks,
            );
        }

        let tasks =
            self.evaluator
                .apply_clozapine_fbc_schedule(tasks, medication, self.horizon_years, today);
        let tasks = self.evaluator.apply_hdat_extra_rules(tasks, medication);

        let mut tasks = dedupe(tasks);

        if let Some(stop_date) = medication.stop_date {
            tasks.retain(|task| task.due_date <= stop_date);
        }

        tasks.sort_by(|a, b| {
            a.due_date
                .cmp(&b.due_date)
                .then_with(|| a.test_type.cmp(&b.test_type))
        });
        Ok(tasks)
    }

    fn build_milestones(
        &self,
        medication: &MedicationOrder,
        category_rules: &CategoryRules,
    ) -> Vec<Milestone> {
        let start = medication.start_date;
        let drug_lower = medication.drug_name_lower();
        let horizon_months = self.horizon_years.max(0) as u32 * 12;
        let mut milestones: Vec<Milestone> = Vec::new();

        if !category_rules.baseline.is_empty() {
            milestones.push(Milestone {
                due_date: start,
                tests: category_rules.baseline.clone(),
            });
        }

        if let Some(weekly) = &category_rules.weekly {
            for i in 0..weekly.count {
                milestones.push(Milestone {
                    due_date: add_weeks(start, u64::from((i + 1) * weekly.interval_weeks)),
                    tests: weekly.tests.clone(),
                });
            }
        }

        for rule in &category_rules.milestones {
            let mut tests = rule.tests.clone();
            if let Some(exception) = rule.exceptions.get(&drug_lower) {
                tests.retain(|t| !exception.remove_tests.contains(t));
            }
            milestones.push(Milestone {
                due_date: add_months(start, rule.months),
                tests,
            });
        }

        if let Some(annual) = &category_rules.annual {
            for year in 2..=self.horizon_years.max(0) as u32 {
                milestones.push(Milestone {
                    due_date: add_months(start, 12 * year),
                    tests: annual.tests.clone(),
                });
            }
        }

        let mut recurring = |block: &Option<crate::domain::models::TestsBlock>,
                             first_month: u32,
                             stride: u32| {
            if let Some(block) = block {
                let mut current = first_month;
                while current <= horizon_months {
                    milestones.push(Milestone {
                        due_date: add_months(start, current),
                        tests: block.tests.clone(),
                    });
                    current += stride;
                }
            }
        };
        recurring(&category_rules.every_4_6_months, 16, 5);
        recurring(&category_rules.every_3_months, 15, 3);
        recurring(&category_rules.every_6_months, 18, 6);

        milestones
    }

    #[allow(clippy::too_many_arguments)]
    fn generate_milestone_tasks(
        &self,
        medication: &MedicationOrder,
        patient: &Patient,
        milestone: &Milestone,
        existing_events: &[MonitoringEvent],
        ecg_required: bool,
        today: NaiveDate,
        out: &mut Vec<MonitoringTask>,
    ) {
        for test_type in &milestone.tests {
            let test_type = if test_type == ECG_IF_INDICATED {
                if !ecg_required {
                    continue;
                }
                ECG
            } else {
                test_type.as_str()
            };

            let event = self.check_event_exists(
                patient.id,
                test_type,
                milestone.due_date,
                existing_events,
            );

            let mut task = MonitoringTask::new(
                patient.id,
                medication.id,
                test_type,
                milestone.due_date,
                TaskStatus::Due,
            );
            match event {
                Some(event) => {
                    task.status = TaskStatus::Done;
                    task.completed_at = Some(utc_midnight(event.performed_date));
                }
                None if milestone.due_date < today => task.status = TaskStatus::Overdue,
                None => {}
            }
            out.push(task);
        }
    }

    fn check_event_exists<'a>(
        &self,
        patient_id: Uuid,
        test_type: &str,
        due_date: NaiveDate,
        existing_events: &'a [MonitoringEvent],
    ) -> Option<&'a MonitoringEvent> {
        let window = Days::new(self.window_days.max(0) as u64);
        let window_start = due_date.checked_sub_days(window)?;
        let window_end = due_date.checked_add_days(window)?;

        existing_events.iter().find(|event| {
            event.patient_id == patient_id
                && matches_test_type(test_type, &event.test_type)
                && event.performed_date >= window_start
                && event.performed_date <= window_end
        })
    }
}

fn dedupe(tasks: Vec<MonitoringTask>) -> Vec<MonitoringTask> {
    let mut seen: HashSet<(String, NaiveDate, Uuid)> = HashSet::new();
    tasks
        .into_iter()
        .filter(|task| {
            seen.insert((
                task.test_type.clone(),
                task.due_date,
                task.medication_order_id,
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn add_months_preserves_plain_days() {
        assert_eq!(add_months(date(2025, 1, 15), 3), date(2025, 4, 15));
        assert_eq!(add_months(date(2025, 11, 1), 2), date(2026, 1, 1));
    }

    #[test]
    fn add_months_clamps_to_month_end() {
        assert_eq!(add_months(date(2025, 1, 31), 1), date(2025, 2, 28));
        assert_eq!(add_months(date(2024, 1, 31), 1), date(2024, 2, 29));
        assert_eq!(add_months(date(2025, 3, 31), 1), date(2025, 4, 30));
    }

    #[test]
    fn fuzzy_match_covers_glucose_and_hba1c() {
        assert!(matches_test_type("Glucose/HbA1c", "HbA1c"));
        assert!(matches_test_type("HbA1c", "Fasting glucose"));
        assert!(matches_test_type("Lipids", "lipids "));
        assert!(!matches_test_type("Lipids", "FBC"));
    }

    #[test]
    fn utc_midnight_is_start_of_day() {
        let instant = utc_midnight(date(2025, 4, 5));
        assert_eq!(instant.to_rfc3339(), "2025-04-05T00:00:00+00:00");
    }
}
