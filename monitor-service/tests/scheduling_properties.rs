mod common;

use chrono::NaiveDate;
use common::{build_med, build_patient, scheduling_engine};
use monitor_service::domain::models::DrugCategory;
use monitor_service::services::scheduling::add_months;
use proptest::prelude::*;

fn arb_start_date() -> impl Strategy<Value = NaiveDate> {
    (2020i32..=2030, 1u32..=12, 1u32..=28)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

fn arb_category() -> impl Strategy<Value = DrugCategory> {
    prop_oneof![
        Just(DrugCategory::Standard),
        Just(DrugCategory::SpecialGroup),
        Just(DrugCategory::Hdat),
    ]
}

proptest! {
    #[test]
    fn due_dates_never_precede_start(start in arb_start_date(), category in arb_category()) {
        let engine = scheduling_engine();
        let patient = build_patient("PT-PROP-1");
        let mut med = build_med(&patient, "risperidone", category, start);
        med.flags.is_hdat = category == DrugCategory::Hdat;

        let tasks = engine.calculate_schedule(&med, &patient, &[]).unwrap();
        for task in &tasks {
            prop_assert!(task.due_date >= start, "{} before start {start}", task.due_date);
        }
    }

    #[test]
    fn due_dates_stay_within_horizon(start in arb_start_date(), category in arb_category()) {
        let engine = scheduling_engine();
        let patient = build_patient("PT-PROP-2");
        let mut med = build_med(&patient, "risperidone", category, start);
        med.flags.is_hdat = category == DrugCategory::Hdat;

        let tasks = engine.calculate_schedule(&med, &patient, &[]).unwrap();
        let horizon_end = add_months(start, 5 * 12);
        for task in &tasks {
            prop_assert!(
                task.due_date <= horizon_end,
                "{} beyond horizon {horizon_end}",
                task.due_date
            );
        }
    }

    #[test]
    fn stop_date_bounds_every_task(start in arb_start_date(), stop_offset_days in 0i64..400) {
        let engine = scheduling_engine();
        let patient = build_patient("PT-PROP-3");
        let mut med = build_med(&patient, "risperidone", DrugCategory::Standard, start);
        med.stop_date = start.checked_add_days(chrono::Days::new(stop_offset_days as u64));

        let tasks = engine.calculate_schedule(&med, &patient, &[]).unwrap();
        let stop = med.stop_date.unwrap();
        for task in &tasks {
            prop_assert!(task.due_date <= stop);
        }
    }
}
