//! Welcome step — greet, then resolve the entry intent.

use async_trait::async_trait;

use crate::domain::WelcomeRoute;
use crate::error::Error;
use crate::graph::state::{ConversationState, Message, StateUpdate};
use crate::llm::{complete_structured, ChatMessage};
use crate::nodes::{NodeContext, Step};

const GREETING: &str = "Hi! I'm your endurance coach. \
    Do you want to build a *new* training plan, or *discuss* your current one?";

const CHOOSE_AGAIN: &str = "Sorry, I didn't catch that — \
    say *new plan* to build one, or *discuss* to talk about your current plan.";

const CLASSIFY_SYS: &str = "You are a strict router. Output ONLY a JSON object \
    {\"mode\": \"make\"} or {\"mode\": \"discuss\"}.\n\
    - 'make' if the user wants a new training plan built.\n\
    - 'discuss' if the user wants to talk about, review, or change an existing plan.";

pub struct WelcomeStep;

#[async_trait]
impl Step for WelcomeStep {
    async fn run(
        &self,
        state: &ConversationState,
        ctx: &NodeContext,
    ) -> Result<StateUpdate, Error> {
        // The front end may have picked the route already.
        if let Some(route) = state.start_route {
            return Ok(StateUpdate {
                mode: Some(route),
                welcomed: Some(true),
                ..Default::default()
            });
        }

        if !state.welcomed {
            return Ok(StateUpdate {
                messages: vec![Message::assistant(GREETING)],
                welcomed: Some(true),
                ..Default::default()
            });
        }

        let Some(utterance) = state.last_user_message() else {
            return Ok(StateUpdate {
                messages: vec![Message::assistant(CHOOSE_AGAIN)],
                ..Default::default()
            });
        };

        let messages = vec![
            ChatMessage::system(CLASSIFY_SYS),
            ChatMessage::user(utterance),
        ];
        match complete_structured::<WelcomeRoute>(&ctx.llm_coach, messages, 0.0, 150).await {
            Ok(route) => Ok(StateUpdate {
                mode: Some(route.mode),
                ..Default::default()
            }),
            Err(e) => {
                // No flow is entered on a failed classification; ask again.
                tracing::warn!("Entry-intent classification failed: {e}");
                Ok(StateUpdate {
                    messages: vec![Message::assistant(CHOOSE_AGAIN)],
                    ..Default::default()
                })
            }
        }
    }
}
