//! Checkpointing — durable-enough state storage between turns.
//!
//! The contract: a state saved after step N is exactly what the next turn for
//! the same thread resumes from, and threads never observe each other's
//! state. The in-memory store satisfies this for a single-process deployment;
//! other backends implement the same trait.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::GraphError;
use crate::graph::state::ConversationState;

/// Thread-keyed state store.
#[async_trait]
pub trait Checkpointer: Send + Sync {
    /// Persist the state for a thread, replacing any previous checkpoint.
    async fn save(&self, thread_id: &str, state: &ConversationState) -> Result<(), GraphError>;

    /// Load the last checkpoint for a thread, if one exists.
    async fn load(&self, thread_id: &str) -> Result<Option<ConversationState>, GraphError>;
}

/// In-memory checkpointer.
#[derive(Default)]
pub struct InMemoryCheckpointer {
    states: RwLock<HashMap<String, ConversationState>>,
}

impl InMemoryCheckpointer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Checkpointer for InMemoryCheckpointer {
    async fn save(&self, thread_id: &str, state: &ConversationState) -> Result<(), GraphError> {
        let mut states = self.states.write().await;
        states.insert(thread_id.to_string(), state.clone());
        Ok(())
    }

    async fn load(&self, thread_id: &str) -> Result<Option<ConversationState>, GraphError> {
        let states = self.states.read().await;
        Ok(states.get(thread_id).cloned())
    }
}
