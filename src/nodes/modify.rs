//! Modify step — classify whether the user is asking to change the plan.
//!
//! The classifier runs at temperature 0 against the latest user utterance
//! only. On any failure the conversation keeps flowing as discussion; a
//! regeneration is never triggered by a broken classification.

use async_trait::async_trait;

use crate::domain::{ModifyMode, ModifyRoute};
use crate::error::Error;
use crate::graph::state::{ConversationState, StateUpdate};
use crate::llm::{complete_structured, ChatMessage};
use crate::nodes::{NodeContext, Step};

const CLASSIFY_SYS: &str = "You are a strict router. Output ONLY a JSON object \
    {\"mode\": \"modify\"} or {\"mode\": \"continue\"}.\n\
    - 'modify' ONLY if the user EXPLICITLY asks to change the existing plan/schedule/sessions.\n\
    - If the request is a general question, praise, or unrelated, return 'continue'.";

pub struct ModifyStep;

#[async_trait]
impl Step for ModifyStep {
    async fn run(
        &self,
        state: &ConversationState,
        ctx: &NodeContext,
    ) -> Result<StateUpdate, Error> {
        let Some(utterance) = state.last_user_message().map(str::to_string) else {
            return Ok(StateUpdate {
                modify_mode: Some(ModifyMode::Continue),
                ..Default::default()
            });
        };

        let messages = vec![
            ChatMessage::system(CLASSIFY_SYS),
            ChatMessage::user(&utterance),
        ];
        let mode = match complete_structured::<ModifyRoute>(&ctx.llm_coach, messages, 0.0, 150)
            .await
        {
            Ok(route) => route.mode,
            Err(e) => {
                tracing::warn!("Modify-intent classification failed, continuing: {e}");
                ModifyMode::Continue
            }
        };

        let modify_query = if mode == ModifyMode::Modify {
            vec![utterance]
        } else {
            Vec::new()
        };

        Ok(StateUpdate {
            modify_mode: Some(mode),
            modify_query,
            ..Default::default()
        })
    }
}
