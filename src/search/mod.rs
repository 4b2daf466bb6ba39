//! Web search — evidence gathering for plan generation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::SpecField;
use crate::error::SearchError;

/// One search hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub content: String,
}

/// Web-search interface.
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, SearchError>;
}

/// Build the domain-specific search query from the questionnaire answers.
pub fn build_query(specs: &BTreeMap<SpecField, String>, modify_query: &[String]) -> String {
    let sport = specs
        .get(&SpecField::Sport)
        .map(String::as_str)
        .unwrap_or("endurance sports");
    let goal = specs
        .get(&SpecField::Goal)
        .map(String::as_str)
        .unwrap_or("build_base");
    let mut remarks = specs
        .get(&SpecField::AdditionalRemarks)
        .map(String::as_str)
        .unwrap_or("none")
        .to_string();
    if !modify_query.is_empty() {
        remarks.push('\n');
        remarks.push_str(&modify_query.join(" "));
    }

    format!(
        "{sport} training best practices for goal being {goal}\n\
         Provide recent, evidence-based guidance.\n\
         Additional specification : {remarks}\n"
    )
}

/// Tavily-style HTTP search client.
pub struct TavilyClient {
    client: reqwest::Client,
    api_key: secrecy::SecretString,
    endpoint: String,
}

#[derive(Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: usize,
}

#[derive(Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

impl TavilyClient {
    pub fn new(api_key: secrecy::SecretString) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            endpoint: "https://api.tavily.com/search".to_string(),
        }
    }
}

#[async_trait]
impl WebSearch for TavilyClient {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, SearchError> {
        use secrecy::ExposeSecret;

        let body = TavilyRequest {
            api_key: self.api_key.expose_secret(),
            query,
            max_results: 5,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| SearchError::RequestFailed(e.to_string()))?
            .error_for_status()
            .map_err(|e| SearchError::RequestFailed(e.to_string()))?;

        let decoded: TavilyResponse = response
            .json()
            .await
            .map_err(|e| SearchError::BadResponse(e.to_string()))?;
        Ok(decoded.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_uses_defaults_when_specs_missing() {
        let query = build_query(&BTreeMap::new(), &[]);
        assert!(query.contains("endurance sports training best practices"));
        assert!(query.contains("build_base"));
        assert!(query.contains("Additional specification : none"));
    }

    #[test]
    fn query_folds_in_specs_and_modify_requests() {
        let specs = BTreeMap::from([
            (SpecField::Sport, "trail running".to_string()),
            (SpecField::Goal, "50k finish".to_string()),
            (SpecField::AdditionalRemarks, "downhill technique".to_string()),
        ]);
        let modify = vec!["more strength work".to_string()];
        let query = build_query(&specs, &modify);
        assert!(query.contains("trail running training best practices"));
        assert!(query.contains("50k finish"));
        assert!(query.contains("downhill technique\nmore strength work"));
    }
}
