//! Step functions — one unit of work per conversation step.
//!
//! A step reads the current state and returns a partial [`StateUpdate`]; it
//! never mutates state directly. The engine owns merging and checkpointing.

pub mod coach;
pub mod discuss;
pub mod garmin;
pub mod modify;
pub mod persist;
pub mod questionnaire;
pub mod research;
pub mod retriever;
pub mod summary;
pub mod welcome;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::CoachConfig;
use crate::error::Error;
use crate::graph::state::{ConversationState, Sender, StateUpdate};
use crate::llm::{ChatMessage, LlmProvider};
use crate::retrieval::Retriever;
use crate::search::WebSearch;
use crate::store::PlanStore;
use crate::telemetry::TelemetryProvider;

/// Warning marker prefixed to every user-visible failure message.
pub const WARN_MARK: &str = "⚠️";
/// Success marker for confirmations.
pub const OK_MARK: &str = "✅";

/// Shared handles injected into every step.
pub struct NodeContext {
    /// Conversational model (questions, briefs, discussion).
    pub llm_small: Arc<dyn LlmProvider>,
    /// Generation/classification model.
    pub llm_coach: Arc<dyn LlmProvider>,
    pub telemetry: Arc<dyn TelemetryProvider>,
    pub search: Arc<dyn WebSearch>,
    pub retriever: Arc<dyn Retriever>,
    pub plan_store: Arc<dyn PlanStore>,
    pub config: CoachConfig,
}

/// One step of the conversation graph.
#[async_trait]
pub trait Step: Send + Sync {
    /// Run the step against a snapshot of the state, returning only the
    /// fields it changes.
    async fn run(&self, state: &ConversationState, ctx: &NodeContext)
        -> Result<StateUpdate, Error>;
}

/// No-op entry marker for the plan-creation branch; routing out of it picks
/// the first evidence step.
pub struct PlanEntryStep;

#[async_trait]
impl Step for PlanEntryStep {
    async fn run(
        &self,
        _state: &ConversationState,
        _ctx: &NodeContext,
    ) -> Result<StateUpdate, Error> {
        Ok(StateUpdate::default())
    }
}

/// Convert the transcript replay window into chat messages for the model.
/// Internal messages stay in the model context; that is the point of the
/// visibility flag.
pub(crate) fn history(state: &ConversationState) -> Vec<ChatMessage> {
    state
        .messages
        .iter()
        .map(|m| match m.sender {
            Sender::User => ChatMessage::user(&m.content),
            Sender::Assistant => ChatMessage::assistant(&m.content),
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod testing {
    //! Stub collaborators for step unit tests.

    use std::sync::Mutex;

    use super::*;
    use crate::error::{LlmError, RetrievalError, SearchError, TelemetryError};
    use crate::llm::{CompletionRequest, CompletionResponse};
    use crate::retrieval::RetrievedPassage;
    use crate::search::SearchHit;
    use crate::store::CsvPlanStore;

    /// LLM stub that pops scripted replies in order, then errors.
    pub struct ScriptedLlm {
        replies: Mutex<Vec<String>>,
    }

    impl ScriptedLlm {
        pub fn new<I: IntoIterator<Item = S>, S: Into<String>>(replies: I) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        fn model_name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                return Err(LlmError::RequestFailed {
                    provider: "scripted".to_string(),
                    reason: "script exhausted".to_string(),
                });
            }
            Ok(CompletionResponse {
                content: replies.remove(0),
                input_tokens: 0,
                output_tokens: 0,
            })
        }
    }

    pub struct StubTelemetry {
        pub snapshot: Result<serde_json::Value, String>,
    }

    #[async_trait]
    impl TelemetryProvider for StubTelemetry {
        async fn fetch_snapshot(
            &self,
            _from_date: chrono::NaiveDate,
            _to_date: chrono::NaiveDate,
        ) -> Result<serde_json::Value, TelemetryError> {
            self.snapshot
                .clone()
                .map_err(TelemetryError::FetchFailed)
        }
    }

    pub struct StubSearch {
        pub hits: Result<Vec<SearchHit>, String>,
    }

    #[async_trait]
    impl WebSearch for StubSearch {
        async fn search(&self, _query: &str) -> Result<Vec<SearchHit>, SearchError> {
            self.hits.clone().map_err(SearchError::RequestFailed)
        }
    }

    pub struct StubRetriever {
        pub passages: Vec<RetrievedPassage>,
    }

    #[async_trait]
    impl Retriever for StubRetriever {
        async fn retrieve(
            &self,
            _query: &str,
            _k: usize,
        ) -> Result<Vec<RetrievedPassage>, RetrievalError> {
            Ok(self.passages.clone())
        }
    }

    /// A context with inert collaborators and a temp-dir CSV store.
    pub fn context(dir: &tempfile::TempDir, llm: Arc<dyn LlmProvider>) -> NodeContext {
        let mut config = CoachConfig::default();
        config.save_path = dir
            .path()
            .join("plan.csv")
            .to_string_lossy()
            .into_owned();
        NodeContext {
            llm_small: Arc::clone(&llm),
            llm_coach: llm,
            telemetry: Arc::new(StubTelemetry {
                snapshot: Err("no telemetry".to_string()),
            }),
            search: Arc::new(StubSearch { hits: Ok(Vec::new()) }),
            retriever: Arc::new(StubRetriever { passages: Vec::new() }),
            plan_store: Arc::new(CsvPlanStore::new(&config.save_path)),
            config,
        }
    }
}
