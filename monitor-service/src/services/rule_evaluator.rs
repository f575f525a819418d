//! Per-drug special cases applied after generic schedule expansion.

use chrono::{Days, NaiveDate};

use crate::domain::models::{MedicationOrder, MonitoringTask, Patient, TaskStatus};

/// Drugs whose summary of product characteristics mandates a baseline ECG.
const SPC_ECG_REQUIRED: &[&str] = &["haloperidol", "pimozide", "sertindole"];

const FBC: &str = "FBC";
const HYDRATION_VIGILANCE: &str = "Hydration vigilance";

#[derive(Debug, Clone, Copy, Default)]
pub struct RuleEvaluator;

impl RuleEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// ECG is indicated by the drug itself or by any attested risk flag.
    pub fn should_require_ecg(&self, medication: &MedicationOrder, patient: &Patient) -> bool {
        if SPC_ECG_REQUIRED.contains(&medication.drug_name_lower().as_str()) {
            return true;
        }
        patient
            .risk_flags
            .as_ref()
            .is_some_and(|flags| flags.any_ecg_indicator())
    }

    /// Replace the calendar's FBC tasks with the clozapine haematology
    /// schedule: weekly for weeks 1-18, two-weekly for 17 occurrences from
    /// week 20, then four-weekly from week 52 to the horizon.
    pub fn apply_clozapine_fbc_schedule(
        &self,
        tasks: Vec<MonitoringTask>,
        medication: &MedicationOrder,
        horizon_years: i32,
        today: NaiveDate,
    ) -> Vec<MonitoringTask> {
        if !medication.is_clozapine() {
            return tasks;
        }

        let mut result: Vec<MonitoringTask> = tasks
            .into_iter()
            .filter(|task| task.test_type != FBC)
            .collect();

        let start = medication.start_date;
        let mut push_fbc = |week: u64| {
            let due_date = add_weeks(start, week);
            let status = if due_date < today {
                TaskStatus::Overdue
            } else {
                TaskStatus::Due
            };
            result.push(MonitoringTask::new(
                medication.patient_id,
                medication.id,
                FBC,
                due_date,
                status,
            ));
        };

        for week in 1..=18 {
            push_fbc(week);
        }
        for i in 0..17 {
            push_fbc(20 + 2 * i);
        }
        let end_weeks = horizon_years.max(0) as u64 * 52;
        let mut current = 52;
        while current <= end_weeks {
            push_fbc(current);
            current += 4;
        }

        result
    }

    /// High-dose therapy adds one open-ended hydration vigilance task at
    /// the start date.
    pub fn apply_hdat_extra_rules(
        &self,
        mut tasks: Vec<MonitoringTask>,
        medication: &MedicationOrder,
    ) -> Vec<MonitoringTask> {
        if !medication.is_hdat() {
            return tasks;
        }
        tasks.push(MonitoringTask::new(
            medication.patient_id,
            medication.id,
            HYDRATION_VIGILANCE,
            medication.start_date,
            TaskStatus::Ongoing,
        ));
        tasks
    }
}

pub(crate) fn add_weeks(start: NaiveDate, weeks: u64) -> NaiveDate {
    start
        .checked_add_days(Days::new(weeks * 7))
        .unwrap_or(NaiveDate::MAX)
}
