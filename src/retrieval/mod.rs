//! Document retrieval — nearest-neighbor passages from the training corpus.
//!
//! The embedding index itself is an external collaborator; this module only
//! defines the narrow interface the retriever step talks to.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RetrievalError;

/// One retrieved passage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedPassage {
    /// Source document title (or filename).
    pub source: String,
    /// The passage text.
    pub text: String,
}

/// Retrieval interface: top-k passages for a query.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str, k: usize)
        -> Result<Vec<RetrievedPassage>, RetrievalError>;
}

/// HTTP retriever talking to an external index service.
pub struct HttpRetriever {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct RetrieveRequest<'a> {
    query: &'a str,
    k: usize,
}

#[derive(Deserialize)]
struct RetrieveResponse {
    #[serde(default)]
    passages: Vec<RetrievedPassage>,
}

impl HttpRetriever {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Retriever for HttpRetriever {
    async fn retrieve(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<RetrievedPassage>, RetrievalError> {
        let url = format!("{}/retrieve", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .json(&RetrieveRequest { query, k })
            .send()
            .await
            .map_err(|e| RetrievalError::RequestFailed(e.to_string()))?
            .error_for_status()
            .map_err(|e| RetrievalError::RequestFailed(e.to_string()))?;

        let decoded: RetrieveResponse = response
            .json()
            .await
            .map_err(|e| RetrievalError::BadResponse(e.to_string()))?;
        Ok(decoded.passages)
    }
}
