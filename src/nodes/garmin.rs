//! Telemetry step — fetch recent activity data and summarize it.
//!
//! This step only runs when the user consented to telemetry, so a failure
//! here fails the turn: generating a plan on silently missing activity data
//! would contradict what the user asked for.

use async_trait::async_trait;
use chrono::{Duration, Utc};

use crate::error::{Error, TelemetryError};
use crate::graph::state::{ConversationState, Message, StateUpdate};
use crate::llm::{ChatMessage, CompletionRequest};
use crate::nodes::{NodeContext, Step};
use crate::telemetry::fitness_summary;

const INTERPRET_SYS: &str = "You are an endurance coach. Given a short JSON of the last 90 days of activity data, \
    write 3-5 sentences that explain what it means for fitness and training readiness. \
    Be clear, motivational, and avoid restating numbers verbatim. If empty, say so.";

pub struct GarminStep;

#[async_trait]
impl Step for GarminStep {
    async fn run(
        &self,
        _state: &ConversationState,
        ctx: &NodeContext,
    ) -> Result<StateUpdate, Error> {
        let to_date = Utc::now().date_naive();
        let from_date = to_date - Duration::days(ctx.config.telemetry_window_days);

        let snapshot = tokio::time::timeout(
            ctx.config.telemetry_timeout,
            ctx.telemetry.fetch_snapshot(from_date, to_date),
        )
        .await
        .map_err(|_| TelemetryError::Timeout {
            timeout: ctx.config.telemetry_timeout,
        })??;

        let summary = fitness_summary(&snapshot);
        let summary_json = serde_json::to_string(&summary)
            .map_err(|e| TelemetryError::BadSnapshot(e.to_string()))?;
        tracing::info!(status = %summary.status, "Telemetry snapshot summarized");

        let messages = vec![
            ChatMessage::system(INTERPRET_SYS),
            ChatMessage::user(format!("Here is the summary JSON:\n{summary_json}")),
        ];
        let request = CompletionRequest::new(messages)
            .with_temperature(ctx.config.temperature_small);
        let brief = ctx.llm_small.complete(request).await?;

        Ok(StateUpdate {
            garmin_data: Some(summary_json),
            messages: vec![Message::assistant_internal(brief.content)],
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::state::Visibility;
    use crate::nodes::testing::{context, ScriptedLlm, StubTelemetry};

    fn snapshot() -> serde_json::Value {
        serde_json::json!({
            "result": {
                "SnapshotFitnessDetails": {
                    "payload": {
                        "activityList": [
                            {
                                "startTimeLocal": "2025-06-02 07:30:00",
                                "activityType": {"typeKey": "running"},
                                "distance": 10000.0,
                                "duration": 3000.0
                            },
                            {
                                "startTimeLocal": "2025-06-09 07:30:00",
                                "activityType": {"typeKey": "running"},
                                "distance": 12000.0,
                                "duration": 3600.0
                            }
                        ]
                    }
                }
            }
        })
    }

    #[tokio::test]
    async fn stores_summary_and_emits_internal_brief() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(&dir, ScriptedLlm::new(["Solid aerobic base, keep it up."]));
        ctx.telemetry = std::sync::Arc::new(StubTelemetry {
            snapshot: Ok(snapshot()),
        });

        let update = GarminStep
            .run(&ConversationState::default(), &ctx)
            .await
            .unwrap();

        let data = update.garmin_data.expect("summary stored");
        assert!(data.contains("\"status\":\"ok\""));
        assert_eq!(update.messages.len(), 1);
        assert_eq!(update.messages[0].visibility, Visibility::Internal);
    }

    #[tokio::test]
    async fn fetch_failure_fails_the_turn() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir, ScriptedLlm::new(["unused"]));

        let result = GarminStep.run(&ConversationState::default(), &ctx).await;
        assert!(matches!(
            result,
            Err(Error::Telemetry(TelemetryError::FetchFailed(_)))
        ));
    }
}
