pub mod daily_sweep;

pub use daily_sweep::{DailySweep, SweepSummary};
