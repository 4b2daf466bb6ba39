//! Configuration types.

use std::time::Duration;

use crate::error::ConfigError;

/// Assistant configuration.
///
/// Defaults match the shipped behavior; `from_env` overrides individual
/// values from `COACH_*` environment variables.
#[derive(Debug, Clone)]
pub struct CoachConfig {
    /// Model used for conversational steps (questions, briefs, discussion).
    pub model_small: String,
    /// Model used for plan generation and intent classification.
    pub model_coach: String,
    /// Sampling temperature for conversational steps.
    pub temperature_small: f64,
    /// Path of the CSV file the plan is persisted to.
    pub save_path: String,
    /// Character cap applied to the retrieval brief in the coach prompt.
    pub rag_char_cap: usize,
    /// Character cap applied to the web brief in the coach prompt.
    pub web_brief_cap: usize,
    /// Number of passages requested from the retrieval corpus.
    pub retrieve_k: usize,
    /// Size of the activity window fetched from the fitness platform.
    pub telemetry_window_days: i64,
    /// Bounded timeout applied to the telemetry fetch.
    pub telemetry_timeout: Duration,
    /// Replay window: only the last K messages are kept for model context.
    pub message_window: usize,
    /// Maximum number of sessions a generated plan may contain.
    pub max_sessions: usize,
    /// Upper bound on steps executed within a single turn.
    pub step_budget: usize,
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            model_small: "claude-3-5-haiku-latest".to_string(),
            model_coach: "claude-sonnet-4-20250514".to_string(),
            temperature_small: 0.95,
            save_path: "training_plan.csv".to_string(),
            rag_char_cap: 8000,
            web_brief_cap: 2000,
            retrieve_k: 4,
            telemetry_window_days: 90,
            telemetry_timeout: Duration::from_secs(30),
            message_window: 8,
            max_sessions: 28,
            step_budget: 16,
        }
    }
}

impl CoachConfig {
    /// Build a config from the environment, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(model) = std::env::var("COACH_MODEL_SMALL") {
            config.model_small = model;
        }
        if let Ok(model) = std::env::var("COACH_MODEL") {
            config.model_coach = model;
        }
        if let Ok(path) = std::env::var("COACH_SAVE_PATH") {
            config.save_path = path;
        }
        if let Ok(raw) = std::env::var("COACH_TELEMETRY_TIMEOUT_SECS") {
            let secs: u64 = raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "COACH_TELEMETRY_TIMEOUT_SECS".to_string(),
                message: format!("expected an integer number of seconds, got {raw:?}"),
            })?;
            config.telemetry_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}
