//! Coach step — generate the structured training plan.

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::{ModifyMode, TrainingPlan};
use crate::error::Error;
use crate::graph::state::{ConversationState, StateUpdate};
use crate::llm::{complete_structured, ChatMessage};
use crate::nodes::{NodeContext, Step};

const MAX_PLAN_TOKENS: u64 = 8192;

pub struct CoachStep;

fn system_prompt(max_sessions: usize) -> String {
    format!(
        "Today is {today}.\n\
         You are a professional endurance coach.\n\
         Output ONLY a JSON object {{\"plan\": [{{\"Date\": \"DD-MM-YYYY\", \"Description\": \"...\"}}], \"justification\": \"...\"}}; \
         do not add extra keys or any commentary outside the JSON.\n\
         STRICT: Respect availability of the user, current volume, constraints; progress conservatively.\n\
         STRICT GUIDELINE: Generate at most {max_sessions} sessions.\n\
         Use evidence from RAG and web when helpful; place any citations only in the justification (e.g., [1], [W1]).\n\
         DESCRIPTION: one medium line (120-200 chars, 1-2 sentences, no newlines). \
         Include: sport; warm-up; main set; cool-down; intensity (pace/power/HR/RPE/tempo). \
         Avoid bare lines like \"60 min Z1\".\n\
         Rest days don't need to be stated.",
        today = Utc::now().date_naive().format("%Y-%m-%d"),
    )
}

fn cap(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn user_prompt(state: &ConversationState, ctx: &NodeContext) -> Result<String, Error> {
    let specs_blob = serde_json::to_string(
        &state
            .specs
            .iter()
            .map(|(field, answer)| (field.key(), answer.as_str()))
            .collect::<std::collections::BTreeMap<_, _>>(),
    )
    .map_err(crate::error::LlmError::Json)?;

    let rag_brief = state
        .rag_ctx
        .as_ref()
        .map(|c| cap(&c.brief, ctx.config.rag_char_cap))
        .unwrap_or("");
    let web_brief = state
        .web_ctx
        .as_ref()
        .map(|c| cap(&c.brief, ctx.config.web_brief_cap))
        .unwrap_or("");

    let mut prompt = format!("--- TRAINING SPEC (JSON) ---\n{specs_blob}");
    if let Some(garmin) = state.garmin_data.as_deref() {
        prompt.push_str(&format!("\n--- GARMIN (bounds) ---\n{garmin}"));
    }
    prompt.push_str(&format!(
        "\n--- EVIDENCE CONTEXT (RAG) ---\n{}",
        if rag_brief.is_empty() { "No local evidence." } else { rag_brief }
    ));
    prompt.push_str(&format!(
        "\n--- WEB BRIEF ---\n{}",
        if web_brief.is_empty() { "No web brief." } else { web_brief }
    ));
    if !state.modify_query.is_empty() {
        prompt.push_str(&format!(
            "\n--- USER MODIFY REQUEST ---\n{}\n",
            state.modify_query.join("|")
        ));
    }
    Ok(prompt)
}

#[async_trait]
impl Step for CoachStep {
    async fn run(
        &self,
        state: &ConversationState,
        ctx: &NodeContext,
    ) -> Result<StateUpdate, Error> {
        let messages = vec![
            ChatMessage::system(system_prompt(ctx.config.max_sessions)),
            ChatMessage::user(user_prompt(state, ctx)?),
        ];

        let generated: TrainingPlan =
            complete_structured(&ctx.llm_coach, messages, 0.0, MAX_PLAN_TOKENS).await?;
        tracing::info!(sessions = generated.plan.len(), "Plan generated");

        Ok(StateUpdate {
            plan: Some(generated.plan),
            justification: Some(generated.justification),
            // Each generation settles the pending modify classification.
            modify_mode: Some(ModifyMode::Continue),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SpecField;
    use crate::graph::state::EvidenceBrief;
    use crate::nodes::testing::{context, ScriptedLlm};

    fn plan_json() -> String {
        r#"{
            "plan": [
                {"Date": "12-08-2025", "Description": "Run 60 min: 15 min warm-up, 30 min steady Z2, 15 min cool-down."},
                {"Date": "14-08-2025", "Description": "Intervals: 6x800m at 5k pace, 400m jog recovery, easy cool-down."}
            ],
            "justification": "Conservative build honoring 3 days availability [1]."
        }"#
        .to_string()
    }

    #[tokio::test]
    async fn replaces_plan_and_resets_modify_mode() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir, ScriptedLlm::new([plan_json()]));
        let mut state = ConversationState::default();
        state.specs.insert(SpecField::Sport, "running".to_string());
        state.modify_mode = ModifyMode::Modify;

        let update = CoachStep.run(&state, &ctx).await.unwrap();
        assert_eq!(update.plan.as_ref().unwrap().len(), 2);
        assert!(update.justification.unwrap().contains("Conservative"));
        assert_eq!(update.modify_mode, Some(ModifyMode::Continue));
    }

    #[tokio::test]
    async fn malformed_output_fails_the_turn() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir, ScriptedLlm::new(["not json at all"]));

        let result = CoachStep.run(&ConversationState::default(), &ctx).await;
        assert!(result.is_err());
    }

    #[test]
    fn briefs_are_capped_in_the_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir, ScriptedLlm::new(Vec::<String>::new()));
        let mut state = ConversationState::default();
        state.rag_ctx = Some(EvidenceBrief {
            brief: "r".repeat(20_000),
            sources: Vec::new(),
        });
        state.web_ctx = Some(EvidenceBrief {
            brief: "w".repeat(10_000),
            sources: Vec::new(),
        });

        let prompt = user_prompt(&state, &ctx).unwrap();
        let rag_len = prompt.matches('r').count();
        let web_len = prompt.matches('w').count();
        assert!(rag_len <= ctx.config.rag_char_cap);
        assert!(web_len <= ctx.config.web_brief_cap + 10);
    }

    #[test]
    fn modify_requests_appear_pipe_joined() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir, ScriptedLlm::new(Vec::<String>::new()));
        let mut state = ConversationState::default();
        state.modify_query = vec!["more hills".to_string(), "no Mondays".to_string()];

        let prompt = user_prompt(&state, &ctx).unwrap();
        assert!(prompt.contains("--- USER MODIFY REQUEST ---\nmore hills|no Mondays"));
    }
}
