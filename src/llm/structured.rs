//! Structured output — closed-schema JSON decoded from a completion.
//!
//! The model is instructed to emit only JSON; this module strips markdown
//! fences and decodes into the requested schema type. A response that does
//! not match the schema is an `LlmError::SchemaMismatch`, never a fabricated
//! default.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::error::LlmError;
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};

/// Run a completion and decode the response into `T`.
pub async fn complete_structured<T: DeserializeOwned>(
    llm: &Arc<dyn LlmProvider>,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u64,
) -> Result<T, LlmError> {
    let request = CompletionRequest::new(messages)
        .with_temperature(temperature)
        .with_max_tokens(max_tokens);
    let response = llm.complete(request).await?;
    decode(&response.content)
}

/// Decode a (possibly fenced) JSON payload into `T`.
pub fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, LlmError> {
    let cleaned = strip_fences(raw);
    serde_json::from_str(cleaned).map_err(|e| LlmError::SchemaMismatch {
        reason: format!("{e} — raw: {}", truncate(cleaned, 200)),
    })
}

/// Strip a leading ```/```json fence and the matching trailing fence.
fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
