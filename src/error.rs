//! Error types for Coach Assist.

use std::time::Duration;

/// Top-level error type for the assistant.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("Plan store error: {0}")]
    PlanStore(#[from] PlanStoreError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Graph construction and execution errors.
///
/// Construction variants (`UnknownStep`, `MissingEdge`, `UnroutedLabel`) are
/// raised by `Graph::build` before any conversation runs.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Step {step} is not registered in the graph")]
    UnknownStep { step: String },

    #[error("Step {step} has no outgoing edge")]
    MissingEdge { step: String },

    #[error("Router after {step} may return label {label} but no edge is declared for it")]
    UnroutedLabel { step: String, label: String },

    #[error("Turn exceeded the step budget of {budget} steps")]
    StepBudgetExceeded { budget: usize },
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Structured output did not match the requested schema: {reason}")]
    SchemaMismatch { reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Telemetry (fitness platform) errors. Fatal for the turn when telemetry
/// consent was given: plan generation must not run on synthetic activity
/// data.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Telemetry fetch failed: {0}")]
    FetchFailed(String),

    #[error("Telemetry fetch timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Could not parse activity snapshot: {0}")]
    BadSnapshot(String),
}

/// Web-search errors. Always recoverable: the research step degrades to an
/// empty brief instead of failing the turn.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Search request failed: {0}")]
    RequestFailed(String),

    #[error("Search response could not be decoded: {0}")]
    BadResponse(String),
}

/// Document-retrieval errors. Always recoverable, same as search.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("Retrieval request failed: {0}")]
    RequestFailed(String),

    #[error("Retrieval response could not be decoded: {0}")]
    BadResponse(String),
}

/// Plan persistence errors. Validation problems (bad dates, missing columns)
/// are reported as structured outcome payloads (see `store::plan_csv`), not
/// as this type; these variants cover I/O-level failure only.
#[derive(Debug, thiserror::Error)]
pub enum PlanStoreError {
    #[error("Failed to write plan to {path}: {reason}")]
    WriteFailed { path: String, reason: String },

    #[error("Failed to read plan from {path}: {reason}")]
    ReadFailed { path: String, reason: String },
}

/// Result type alias for the assistant.
pub type Result<T> = std::result::Result<T, Error>;
