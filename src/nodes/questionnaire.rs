//! Questionnaire step — interviews the user field by field.
//!
//! Cursor semantics: `question_idx` is the index of the field whose question
//! is currently awaiting an answer. `None` means nothing has been asked yet
//! (the first entry asks field 0 and records nothing); `Some(len)` means
//! every field has been asked and answered, which is the only way out of the
//! questionnaire branch toward plan generation.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::domain::SpecField;
use crate::error::Error;
use crate::graph::state::{ConversationState, Message, StateUpdate};
use crate::llm::{ChatMessage, CompletionRequest};
use crate::nodes::{history, NodeContext, Step};

const REPHRASE_SYS: &str = "Your role is simply to rewrite the question in a nice way for the user.\n\
    Stay concise but not cold. The questions will tailor a training plan. Ensure continuity.\n\
    You must only ask one question at the time.\n\
    Strictly stick to the provided question.\n\
    Even if the user accidentally answered the question already ask it again.\n\
    No need to say hi to the user.";

pub struct QuestionnaireStep;

impl QuestionnaireStep {
    async fn ask(
        &self,
        state: &ConversationState,
        ctx: &NodeContext,
        field: SpecField,
    ) -> Result<Message, Error> {
        let mut messages = vec![ChatMessage::system(REPHRASE_SYS)];
        messages.extend(history(state));
        messages.push(ChatMessage::user(format!("QUESTION:\n{}", field.prompt())));

        let request = CompletionRequest::new(messages)
            .with_temperature(ctx.config.temperature_small);
        let response = ctx.llm_small.complete(request).await?;
        Ok(Message::assistant(response.content))
    }
}

#[async_trait]
impl Step for QuestionnaireStep {
    async fn run(
        &self,
        state: &ConversationState,
        ctx: &NodeContext,
    ) -> Result<StateUpdate, Error> {
        // Telemetry consent makes the two volume fields derivable; elide them
        // from this session's field list before the first question goes out.
        let (fields, fields_update) = if state.question_idx.is_none() && state.garmin_consent {
            let elided: Vec<SpecField> = state
                .fields
                .iter()
                .copied()
                .filter(|f| !SpecField::TELEMETRY_DERIVED.contains(f))
                .collect();
            (elided.clone(), Some(elided))
        } else {
            (state.fields.clone(), None)
        };
        let len = fields.len();

        match state.question_idx {
            // First entry: ask field 0, record nothing.
            None => {
                let question = self.ask(state, ctx, fields[0]).await?;
                Ok(StateUpdate {
                    messages: vec![question],
                    question_idx: Some(0),
                    fields: fields_update,
                    ..Default::default()
                })
            }
            // An answer is outstanding for fields[i].
            Some(i) if i < len => {
                let mut specs = BTreeMap::new();
                if let Some(answer) = state.last_user_message() {
                    specs.insert(fields[i], answer.to_string());
                }

                if i + 1 < len {
                    let question = self.ask(state, ctx, fields[i + 1]).await?;
                    Ok(StateUpdate {
                        messages: vec![question],
                        question_idx: Some(i + 1),
                        specs,
                        fields: fields_update,
                        ..Default::default()
                    })
                } else {
                    // Last answer recorded; signal "ready for generation".
                    Ok(StateUpdate {
                        question_idx: Some(len),
                        specs,
                        fields: fields_update,
                        ..Default::default()
                    })
                }
            }
            // Complete; nothing to ask. Routing sends the flow onward.
            Some(_) => Ok(StateUpdate {
                fields: fields_update,
                ..Default::default()
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::testing::{context, ScriptedLlm};

    fn answered(state: &mut ConversationState, text: &str) {
        state.apply(
            StateUpdate {
                messages: vec![Message::user(text)],
                ..Default::default()
            },
            8,
        );
    }

    #[tokio::test]
    async fn first_entry_asks_field_zero_without_recording() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir, ScriptedLlm::new(["Which sport shall we train for?"]));
        let state = ConversationState::default();

        let update = QuestionnaireStep.run(&state, &ctx).await.unwrap();
        assert_eq!(update.question_idx, Some(0));
        assert!(update.specs.is_empty());
        assert_eq!(update.messages.len(), 1);
    }

    #[tokio::test]
    async fn walks_all_fields_in_order_and_records_answers() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(
            &dir,
            ScriptedLlm::new(std::iter::repeat_n("next question".to_string(), 8)),
        );
        let mut state = ConversationState::default();

        // First turn: question 0 goes out.
        let update = QuestionnaireStep.run(&state, &ctx).await.unwrap();
        state.apply(update, 8);

        let answers = [
            "running",
            "10k in 45:00",
            "12-10-2025",
            "40 km",
            "15 km",
            "5 days, 1h each",
            "none",
            "negative splits",
        ];
        for (turn, answer) in answers.iter().enumerate() {
            answered(&mut state, answer);
            let update = QuestionnaireStep.run(&state, &ctx).await.unwrap();
            state.apply(update, 8);
            assert_eq!(state.question_idx, Some(turn + 1));
        }

        assert_eq!(state.question_idx, Some(8));
        for (field, answer) in SpecField::ALL.iter().zip(answers) {
            assert_eq!(state.specs.get(field).map(String::as_str), Some(answer));
        }
    }

    #[tokio::test]
    async fn telemetry_consent_elides_volume_fields_for_the_session() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(
            &dir,
            ScriptedLlm::new(std::iter::repeat_n("q".to_string(), 6)),
        );
        let mut state = ConversationState::default();
        state.garmin_consent = true;

        let update = QuestionnaireStep.run(&state, &ctx).await.unwrap();
        state.apply(update, 8);
        assert_eq!(state.fields.len(), 6);
        assert!(!state.fields.contains(&SpecField::CurrentWeeklyVolume));
        assert!(!state.fields.contains(&SpecField::LongestRecent));

        for answer in ["running", "finish", "12-10-2025", "4 days", "no injuries", "-"] {
            answered(&mut state, answer);
            let update = QuestionnaireStep.run(&state, &ctx).await.unwrap();
            state.apply(update, 8);
        }
        assert_eq!(state.question_idx, Some(6));
        assert!(!state.specs.contains_key(&SpecField::CurrentWeeklyVolume));
        assert!(!state.specs.contains_key(&SpecField::LongestRecent));
    }

    #[tokio::test]
    async fn llm_failure_propagates_as_turn_failure() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir, ScriptedLlm::new(Vec::<String>::new()));
        let state = ConversationState::default();
        assert!(QuestionnaireStep.run(&state, &ctx).await.is_err());
    }
}
