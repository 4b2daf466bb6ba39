//! The conversation graph: state, routing, topology and checkpointing.

pub mod checkpoint;
pub mod engine;
pub mod routes;
pub mod state;

pub use checkpoint::{Checkpointer, InMemoryCheckpointer};
pub use engine::{Engine, Graph, GraphBuilder, StepId, Target, TurnInput, TurnOutput};
pub use routes::RouteLabel;
pub use state::{ConversationState, Message, StateUpdate};
