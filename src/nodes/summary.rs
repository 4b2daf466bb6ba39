//! Summary step — present the accepted plan.
//!
//! Rendering is deterministic: the plan table, justification and source list
//! are assembled from state, not asked of a model. After the summary the
//! session flips to discuss mode so follow-up turns are treated as feedback
//! or modification requests.

use async_trait::async_trait;

use crate::domain::{format_plan_date, StartMode};
use crate::error::Error;
use crate::graph::state::{Citation, ConversationState, Message, StateUpdate};
use crate::nodes::{NodeContext, Step};

pub struct SummaryStep;

fn render_sources(state: &ConversationState) -> String {
    let mut seen = std::collections::BTreeSet::new();
    let mut lines = Vec::new();
    let web = state.web_ctx.iter().flat_map(|c| c.sources.iter());
    let rag = state.rag_ctx.iter().flat_map(|c| c.sources.iter());
    for Citation { title, url } in web.chain(rag) {
        let key = (title.clone(), url.clone());
        if !seen.insert(key) {
            continue;
        }
        match url {
            Some(url) => lines.push(format!("- [{title}]({url})")),
            None => lines.push(format!("- {title}")),
        }
    }
    lines.join("\n")
}

fn render(state: &ConversationState) -> String {
    let mut out = String::from("Here is your training plan:\n\n");
    out.push_str("| Date | Session |\n|------|---------|\n");
    for item in &state.plan {
        // Pipes inside a description would break the table.
        let description = item.description.replace('|', "/");
        out.push_str(&format!("| {} | {} |\n", format_plan_date(item.date), description));
    }

    if let Some(justification) = state.justification.as_deref() {
        out.push_str(&format!("\n{justification}\n"));
    }

    let sources = render_sources(state);
    if !sources.is_empty() {
        out.push_str(&format!("\n**Sources**\n{sources}\n"));
    }
    out
}

#[async_trait]
impl Step for SummaryStep {
    async fn run(
        &self,
        state: &ConversationState,
        _ctx: &NodeContext,
    ) -> Result<StateUpdate, Error> {
        Ok(StateUpdate {
            messages: vec![Message::assistant(render(state))],
            mode: Some(StartMode::Discuss),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{parse_plan_date, TrainingItem};
    use crate::graph::state::EvidenceBrief;
    use crate::nodes::testing::{context, ScriptedLlm};

    fn state_with_plan() -> ConversationState {
        let mut state = ConversationState::default();
        state.plan = vec![
            TrainingItem {
                date: parse_plan_date("12-08-2025").unwrap(),
                description: "Easy 45 min Z2 run".to_string(),
            },
            TrainingItem {
                date: parse_plan_date("14-08-2025").unwrap(),
                description: "6x800m at 5k pace | full recovery".to_string(),
            },
        ];
        state.justification = Some("Two quality sessions fit the 3-day availability.".to_string());
        state
    }

    #[tokio::test]
    async fn renders_table_justification_and_flips_to_discuss() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir, ScriptedLlm::new(Vec::<String>::new()));
        let update = SummaryStep.run(&state_with_plan(), &ctx).await.unwrap();

        let text = &update.messages[0].content;
        assert!(text.contains("| 12-08-2025 | Easy 45 min Z2 run |"));
        assert!(text.contains("6x800m at 5k pace / full recovery"));
        assert!(text.contains("Two quality sessions"));
        assert_eq!(update.mode, Some(StartMode::Discuss));
    }

    #[test]
    fn sources_are_deduplicated_across_web_and_rag() {
        let mut state = state_with_plan();
        state.web_ctx = Some(EvidenceBrief {
            brief: String::new(),
            sources: vec![
                Citation {
                    title: "Polarized training".to_string(),
                    url: Some("https://example.org/p".to_string()),
                },
                Citation {
                    title: "Polarized training".to_string(),
                    url: Some("https://example.org/p".to_string()),
                },
            ],
        });
        state.rag_ctx = Some(EvidenceBrief {
            brief: String::new(),
            sources: vec![Citation {
                title: "base-building.md".to_string(),
                url: None,
            }],
        });

        let sources = render_sources(&state);
        assert_eq!(sources.matches("Polarized training").count(), 1);
        assert!(sources.contains("- [Polarized training](https://example.org/p)"));
        assert!(sources.contains("- base-building.md"));
    }

    #[test]
    fn no_sources_means_no_sources_section() {
        let text = render(&state_with_plan());
        assert!(!text.contains("**Sources**"));
    }
}
