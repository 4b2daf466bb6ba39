//! Coach Assist — conversational endurance-coaching core.

pub mod config;
pub mod domain;
pub mod error;
pub mod graph;
pub mod llm;
pub mod nodes;
pub mod retrieval;
pub mod search;
pub mod store;
pub mod telemetry;
