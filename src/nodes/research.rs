//! Research step — web evidence for plan generation.
//!
//! Search failures never fail the turn; the coach prompt simply carries an
//! empty web brief.

use async_trait::async_trait;

use crate::error::Error;
use crate::graph::state::{Citation, ConversationState, EvidenceBrief, StateUpdate};
use crate::llm::{ChatMessage, CompletionRequest};
use crate::nodes::{NodeContext, Step};
use crate::search::{build_query, SearchHit};

const EXCERPT_CAP: usize = 1500;

const BRIEF_SYS: &str = "You compress web results into a small, strictly grounded brief for a coach.\n\
    Rules:\n\
    - Only use the provided snippets.\n\
    - Output <= 10 bullets.\n\
    - Each bullet: actionable facts or protocols worth knowing while creating a training plan, followed by (source: URL).\n\
    - Prefer consensus/guidelines; avoid fringe claims.";

pub struct ResearchStep;

fn pack_hits(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|hit| {
            let mut excerpt = hit.content.as_str();
            if let Some((cap, _)) = excerpt.char_indices().nth(EXCERPT_CAP) {
                excerpt = &excerpt[..cap];
            }
            format!("TITLE: {}\nURL: {}\nEXCERPT:\n{}", hit.title, hit.url, excerpt)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[async_trait]
impl Step for ResearchStep {
    async fn run(
        &self,
        state: &ConversationState,
        ctx: &NodeContext,
    ) -> Result<StateUpdate, Error> {
        let query = build_query(&state.specs, &state.modify_query);

        let hits = match ctx.search.search(&query).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!("Web search failed, continuing without a brief: {e}");
                Vec::new()
            }
        };

        if hits.is_empty() {
            return Ok(StateUpdate {
                web_ctx: Some(EvidenceBrief::default()),
                ..Default::default()
            });
        }

        let sources: Vec<Citation> = hits
            .iter()
            .map(|h| Citation {
                title: h.title.clone(),
                url: Some(h.url.clone()),
            })
            .collect();

        let messages = vec![
            ChatMessage::system(BRIEF_SYS),
            ChatMessage::user(pack_hits(&hits)),
        ];
        let request = CompletionRequest::new(messages)
            .with_temperature(ctx.config.temperature_small);
        let brief = match ctx.llm_small.complete(request).await {
            Ok(response) => response.content,
            Err(e) => {
                tracing::warn!("Web brief compression failed, keeping sources only: {e}");
                String::new()
            }
        };

        Ok(StateUpdate {
            web_ctx: Some(EvidenceBrief { brief, sources }),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::testing::{context, ScriptedLlm, StubSearch};

    #[tokio::test]
    async fn search_failure_degrades_to_empty_brief() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(&dir, ScriptedLlm::new(["unused"]));
        ctx.search = std::sync::Arc::new(StubSearch {
            hits: Err("boom".to_string()),
        });

        let update = ResearchStep
            .run(&ConversationState::default(), &ctx)
            .await
            .unwrap();
        let web_ctx = update.web_ctx.unwrap();
        assert!(web_ctx.brief.is_empty());
        assert!(web_ctx.sources.is_empty());
    }

    #[tokio::test]
    async fn hits_are_compressed_with_sources_kept() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(&dir, ScriptedLlm::new(["- build volume gradually (source: a)"]));
        ctx.search = std::sync::Arc::new(StubSearch {
            hits: Ok(vec![SearchHit {
                title: "Polarized training".to_string(),
                url: "https://example.org/polarized".to_string(),
                content: "Keep 80% of sessions easy.".to_string(),
            }]),
        });

        let update = ResearchStep
            .run(&ConversationState::default(), &ctx)
            .await
            .unwrap();
        let web_ctx = update.web_ctx.unwrap();
        assert!(web_ctx.brief.contains("volume"));
        assert_eq!(web_ctx.sources.len(), 1);
        assert_eq!(
            web_ctx.sources[0].url.as_deref(),
            Some("https://example.org/polarized")
        );
    }

    #[test]
    fn excerpts_are_capped() {
        let hits = vec![SearchHit {
            title: "t".to_string(),
            url: "u".to_string(),
            content: "x".repeat(5000),
        }];
        let packed = pack_hits(&hits);
        assert!(packed.len() < 2000);
    }
}
