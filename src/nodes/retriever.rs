//! Retrieval step — corpus passages for plan generation.
//!
//! Like web search, retrieval failure degrades to an empty brief instead of
//! failing the turn.

use async_trait::async_trait;

use crate::error::Error;
use crate::graph::state::{Citation, ConversationState, EvidenceBrief, StateUpdate};
use crate::nodes::{NodeContext, Step};
use crate::retrieval::RetrievedPassage;

pub struct RetrieverStep;

/// Flatten the questionnaire answers (plus telemetry summary and pending
/// modify requests) into one retrieval query line.
fn retrieval_query(state: &ConversationState) -> String {
    let mut parts: Vec<String> = state
        .specs
        .iter()
        .filter(|(_, answer)| !answer.is_empty())
        .map(|(field, answer)| format!("{}: {answer}", field.key()))
        .collect();

    if let Some(garmin) = state.garmin_data.as_deref() {
        if !garmin.trim().is_empty() {
            parts.push(format!("garmin data: {garmin}"));
        }
    }
    if !state.modify_query.is_empty() {
        parts.push(format!("additional request: {}", state.modify_query.join(" ")));
    }

    parts.join(" | ")
}

/// Render passages as a numbered-citation brief plus its source list.
fn brief_from(passages: &[RetrievedPassage]) -> EvidenceBrief {
    let brief = passages
        .iter()
        .enumerate()
        .map(|(i, p)| format!("[{}] {}", i + 1, p.text))
        .collect::<Vec<_>>()
        .join("\n\n");
    let sources = passages
        .iter()
        .map(|p| Citation {
            title: p.source.clone(),
            url: None,
        })
        .collect();
    EvidenceBrief { brief, sources }
}

#[async_trait]
impl Step for RetrieverStep {
    async fn run(
        &self,
        state: &ConversationState,
        ctx: &NodeContext,
    ) -> Result<StateUpdate, Error> {
        let query = retrieval_query(state);

        let passages = match ctx.retriever.retrieve(&query, ctx.config.retrieve_k).await {
            Ok(passages) => passages,
            Err(e) => {
                tracing::warn!("Retrieval failed, continuing without local evidence: {e}");
                Vec::new()
            }
        };

        Ok(StateUpdate {
            rag_ctx: Some(brief_from(&passages)),
            ..Default::default()
        })
    }
}
