//! Telemetry — activity data from the external fitness platform.
//!
//! The platform call is a narrow interface: a date range in, a raw activity
//! snapshot (JSON) out. Statistical summarization of the snapshot lives in
//! [`summary`].

pub mod summary;

pub use summary::{fitness_summary, FitnessSummary};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::TelemetryError;

/// Source of raw activity snapshots.
#[async_trait]
pub trait TelemetryProvider: Send + Sync {
    /// Fetch the activity snapshot for a calendar-date range (inclusive).
    async fn fetch_snapshot(
        &self,
        from_date: NaiveDate,
        to_date: NaiveDate,
    ) -> Result<serde_json::Value, TelemetryError>;
}

/// HTTP telemetry client (e.g. a local bridge in front of the Garmin API).
pub struct HttpTelemetryClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTelemetryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl TelemetryProvider for HttpTelemetryClient {
    async fn fetch_snapshot(
        &self,
        from_date: NaiveDate,
        to_date: NaiveDate,
    ) -> Result<serde_json::Value, TelemetryError> {
        let url = format!("{}/snapshot", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .query(&[
                ("from_date", from_date.format("%Y-%m-%d").to_string()),
                ("to_date", to_date.format("%Y-%m-%d").to_string()),
            ])
            .send()
            .await
            .map_err(|e| TelemetryError::FetchFailed(e.to_string()))?;

        let response = response
            .error_for_status()
            .map_err(|e| TelemetryError::FetchFailed(e.to_string()))?;

        response
            .json()
            .await
            .map_err(|e| TelemetryError::BadSnapshot(e.to_string()))
    }
}
