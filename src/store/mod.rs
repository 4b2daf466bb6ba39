//! Persistence for training plans.

pub mod plan_csv;

pub use plan_csv::{CsvPlanStore, LoadOutcome, PlanStore, SaveOutcome};
