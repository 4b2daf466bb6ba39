//! Persistence steps — save the accepted plan, load a stored one.
//!
//! Persistence problems never fail the turn; both steps surface them as
//! warning messages so the conversation can continue.

use async_trait::async_trait;

use crate::error::Error;
use crate::graph::state::{ConversationState, Message, StateUpdate};
use crate::nodes::{NodeContext, Step, OK_MARK, WARN_MARK};
use crate::store::LoadOutcome;

pub struct SaveStep;

#[async_trait]
impl Step for SaveStep {
    async fn run(
        &self,
        state: &ConversationState,
        ctx: &NodeContext,
    ) -> Result<StateUpdate, Error> {
        let text = match ctx.plan_store.save(&state.plan).await {
            Ok(outcome) => format!(
                "{OK_MARK} Plan saved ({} rows) to `{}` [{} → {}]",
                outcome.rows_written,
                outcome.path,
                outcome.date_range.start,
                outcome.date_range.end,
            ),
            Err(e) => {
                tracing::warn!("Plan save failed: {e}");
                format!("{WARN_MARK} Plan saving failed: {e}")
            }
        };

        Ok(StateUpdate {
            messages: vec![Message::assistant(text)],
            ..Default::default()
        })
    }
}

const SHOW_PLAN_FOLLOW_UP: &str = "Show me the plan as a markdown table and comment on it, please.";

pub struct LoadStep;

#[async_trait]
impl Step for LoadStep {
    async fn run(
        &self,
        _state: &ConversationState,
        ctx: &NodeContext,
    ) -> Result<StateUpdate, Error> {
        let (text, plan) = match ctx.plan_store.load().await {
            Ok(LoadOutcome::Ok { plan }) => (format!("{OK_MARK} Plan loaded"), Some(plan)),
            Ok(LoadOutcome::NotFound { path }) => {
                (format!("{WARN_MARK} No saved plan found at `{path}`"), None)
            }
            Ok(LoadOutcome::Failed { error, path }) => {
                tracing::warn!(path = %path, "Stored plan failed validation: {error}");
                (format!("{WARN_MARK} Plan loading failed: {error}"), None)
            }
            Err(e) => {
                tracing::warn!("Plan load failed: {e}");
                (format!("{WARN_MARK} Plan loading failed: {e}"), None)
            }
        };

        // The synthetic follow-up makes the next discuss reply present the
        // freshly loaded plan without waiting for the user to ask.
        Ok(StateUpdate {
            messages: vec![
                Message::assistant(text),
                Message::user_internal(SHOW_PLAN_FOLLOW_UP),
            ],
            plan,
            ..Default::default()
        })
    }
}
