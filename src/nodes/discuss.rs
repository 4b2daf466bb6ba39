//! Discuss step — coach-style feedback on the current plan.

use async_trait::async_trait;

use crate::domain::format_plan_date;
use crate::error::Error;
use crate::graph::state::{ConversationState, Message, StateUpdate};
use crate::llm::{ChatMessage, CompletionRequest};
use crate::nodes::{history, NodeContext, Step};

pub struct DiscussStep;

fn system_prompt(state: &ConversationState) -> String {
    let plan = if state.plan.is_empty() {
        "No plan available yet.".to_string()
    } else {
        state
            .plan
            .iter()
            .map(|item| format!("{}: {}", format_plan_date(item.date), item.description))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "You are a professional endurance coach (running, cycling, trail, triathlon). \
         Ask what the user wants to modify in their current training plan.\n\
         Your role:\n\
         - If the plan is available, give concise, constructive feedback on the plan.\n\
         - Be supportive and professional, not too verbose (max 2-3 sentences unless details are needed).\n\
         - Keep tone positive and coaching-like. Use at most one emoji occasionally.\n\
         ======\n\
         THE PLAN:\n{plan}"
    )
}

#[async_trait]
impl Step for DiscussStep {
    async fn run(
        &self,
        state: &ConversationState,
        ctx: &NodeContext,
    ) -> Result<StateUpdate, Error> {
        let mut messages = vec![ChatMessage::system(system_prompt(state))];
        messages.extend(history(state));

        let request = CompletionRequest::new(messages)
            .with_temperature(ctx.config.temperature_small);
        let response = ctx.llm_small.complete(request).await?;

        Ok(StateUpdate {
            messages: vec![Message::assistant(response.content)],
            ..Default::default()
        })
    }
}
