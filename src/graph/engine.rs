//! Graph engine — the validated step/edge topology and the turn driver.
//!
//! The topology is closed: steps are an enum, routers declare their label
//! sets, and `Graph::build` rejects a conditional edge whose mapping does not
//! cover its router's labels. A turn resumes from the thread's checkpoint,
//! runs steps until an END edge suspends the conversation, and checkpoints
//! after every applied step so a later failure never loses earlier progress.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::StartMode;
use crate::error::{Error, GraphError};
use crate::graph::checkpoint::Checkpointer;
use crate::graph::routes::{
    RouteLabel, Router, ROUTE_AFTER_GARMIN, ROUTE_AFTER_MODIFY, ROUTE_AFTER_QUESTION,
    ROUTE_AFTER_WELCOME, ROUTE_PLAN_ENTRY, ROUTE_START,
};
use crate::graph::state::{ConversationState, Message, StateUpdate, Visibility};
use crate::nodes::{
    coach::CoachStep, discuss::DiscussStep, garmin::GarminStep, modify::ModifyStep,
    persist::LoadStep, persist::SaveStep, questionnaire::QuestionnaireStep,
    research::ResearchStep, retriever::RetrieverStep, summary::SummaryStep,
    welcome::WelcomeStep, NodeContext, PlanEntryStep, Step,
};

/// Every step the conversation graph can execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepId {
    Welcome,
    Questionnaire,
    PlanEntry,
    Garmin,
    Search,
    Retriever,
    Coach,
    Save,
    Summary,
    Load,
    Discuss,
    Modify,
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Welcome => "welcome",
            Self::Questionnaire => "questionnaire",
            Self::PlanEntry => "new_plan_entry",
            Self::Garmin => "garmin",
            Self::Search => "search",
            Self::Retriever => "retriever",
            Self::Coach => "coach",
            Self::Save => "save",
            Self::Summary => "summary",
            Self::Load => "load",
            Self::Discuss => "discuss",
            Self::Modify => "modify",
        };
        f.write_str(s)
    }
}

fn step_impl(id: StepId) -> &'static dyn Step {
    match id {
        StepId::Welcome => &WelcomeStep,
        StepId::Questionnaire => &QuestionnaireStep,
        StepId::PlanEntry => &PlanEntryStep,
        StepId::Garmin => &GarminStep,
        StepId::Search => &ResearchStep,
        StepId::Retriever => &RetrieverStep,
        StepId::Coach => &CoachStep,
        StepId::Save => &SaveStep,
        StepId::Summary => &SummaryStep,
        StepId::Load => &LoadStep,
        StepId::Discuss => &DiscussStep,
        StepId::Modify => &ModifyStep,
    }
}

/// Where an edge leads: another step, or suspension of the turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Step(StepId),
    End,
}

enum Edge {
    Unconditional(Target),
    Conditional {
        router: Router,
        mapping: Vec<(RouteLabel, Target)>,
    },
}

/// The validated conversation topology.
pub struct Graph {
    entry: Edge,
    edges: HashMap<StepId, Edge>,
}

/// Builder mirroring the construction order: nodes are implicit (the closed
/// enum), edges are declared one by one, `build` validates.
pub struct GraphBuilder {
    entry: Option<Edge>,
    edges: HashMap<StepId, Edge>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            entry: None,
            edges: HashMap::new(),
        }
    }

    pub fn entry(mut self, router: Router, mapping: Vec<(RouteLabel, Target)>) -> Self {
        self.entry = Some(Edge::Conditional { router, mapping });
        self
    }

    pub fn edge(mut self, from: StepId, to: Target) -> Self {
        self.edges.insert(from, Edge::Unconditional(to));
        self
    }

    pub fn conditional_edge(
        mut self,
        from: StepId,
        router: Router,
        mapping: Vec<(RouteLabel, Target)>,
    ) -> Self {
        self.edges.insert(from, Edge::Conditional { router, mapping });
        self
    }

    pub fn build(self) -> Result<Graph, GraphError> {
        let entry = self.entry.ok_or_else(|| GraphError::MissingEdge {
            step: "entry".to_string(),
        })?;
        let graph = Graph {
            entry,
            edges: self.edges,
        };
        graph.validate()?;
        Ok(graph)
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    /// The shipped coaching topology.
    pub fn standard() -> Result<Self, GraphError> {
        use RouteLabel as L;
        use StepId as S;
        use Target::{End, Step};

        GraphBuilder::new()
            .entry(
                ROUTE_START,
                vec![
                    (L::Welcome, Step(S::Welcome)),
                    (L::NewPlan, Step(S::Questionnaire)),
                    (L::Load, Step(S::Load)),
                    (L::Discuss, Step(S::Modify)),
                ],
            )
            .conditional_edge(
                S::Welcome,
                ROUTE_AFTER_WELCOME,
                vec![
                    (L::Await, End),
                    (L::NewPlan, Step(S::Questionnaire)),
                    (L::Load, Step(S::Load)),
                    (L::Discuss, Step(S::Modify)),
                ],
            )
            .conditional_edge(
                S::Questionnaire,
                ROUTE_AFTER_QUESTION,
                vec![(L::Continue, End), (L::Coach, Step(S::PlanEntry))],
            )
            .conditional_edge(
                S::PlanEntry,
                ROUTE_PLAN_ENTRY,
                vec![
                    (L::Garmin, Step(S::Garmin)),
                    (L::Search, Step(S::Search)),
                    (L::Coach, Step(S::Retriever)),
                ],
            )
            .conditional_edge(
                S::Garmin,
                ROUTE_AFTER_GARMIN,
                vec![(L::Search, Step(S::Search)), (L::Coach, Step(S::Retriever))],
            )
            .edge(S::Search, Step(S::Retriever))
            .edge(S::Retriever, Step(S::Coach))
            .edge(S::Coach, Step(S::Save))
            .edge(S::Save, Step(S::Summary))
            .edge(S::Summary, End)
            .edge(S::Load, Step(S::Discuss))
            .edge(S::Discuss, End)
            .conditional_edge(
                S::Modify,
                ROUTE_AFTER_MODIFY,
                vec![
                    (L::Continue, Step(S::Discuss)),
                    (L::Modify, Step(S::PlanEntry)),
                ],
            )
            .build()
    }

    fn validate(&self) -> Result<(), GraphError> {
        let conditionals = std::iter::once(("entry".to_string(), &self.entry))
            .chain(self.edges.iter().map(|(step, edge)| (step.to_string(), edge)));

        for (name, edge) in conditionals {
            let Edge::Conditional { router, mapping } = edge else {
                continue;
            };
            for label in router.labels {
                if !mapping.iter().any(|(l, _)| l == label) {
                    return Err(GraphError::UnroutedLabel {
                        step: name.to_string(),
                        label: label.to_string(),
                    });
                }
            }
        }

        // Every step a mapping can reach must have an outgoing edge.
        let mut reachable: Vec<Target> = Vec::new();
        let all_edges = std::iter::once(&self.entry).chain(self.edges.values());
        for edge in all_edges {
            match edge {
                Edge::Unconditional(target) => reachable.push(*target),
                Edge::Conditional { mapping, .. } => {
                    reachable.extend(mapping.iter().map(|(_, t)| *t))
                }
            }
        }
        for target in reachable {
            if let Target::Step(step) = target {
                if !self.edges.contains_key(&step) {
                    return Err(GraphError::MissingEdge {
                        step: step.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    fn follow(&self, edge: &Edge, state: &ConversationState) -> Result<Target, GraphError> {
        match edge {
            Edge::Unconditional(target) => Ok(*target),
            Edge::Conditional { router, mapping } => {
                let label = (router.decide)(state);
                mapping
                    .iter()
                    .find(|(l, _)| *l == label)
                    .map(|(_, target)| *target)
                    .ok_or_else(|| GraphError::UnroutedLabel {
                        step: router.name.to_string(),
                        label: label.to_string(),
                    })
            }
        }
    }

    fn entry_target(&self, state: &ConversationState) -> Result<Target, GraphError> {
        self.follow(&self.entry, state)
    }

    fn next_target(
        &self,
        from: StepId,
        state: &ConversationState,
    ) -> Result<Target, GraphError> {
        let edge = self.edges.get(&from).ok_or_else(|| GraphError::MissingEdge {
            step: from.to_string(),
        })?;
        self.follow(edge, state)
    }
}

/// One user turn's worth of input.
#[derive(Debug, Clone, Default)]
pub struct TurnInput {
    /// The user's utterance, absent on a bare kick-off turn.
    pub text: Option<String>,
    /// Entry intent chosen in the front end, bypassing classification.
    pub start_route: Option<StartMode>,
    /// Consent flags, supplied once at session start.
    pub garmin_consent: Option<bool>,
    pub search_consent: Option<bool>,
}

impl TurnInput {
    pub fn say(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }
}

/// What one turn produced for the user.
#[derive(Debug, Clone)]
pub struct TurnOutput {
    /// User-visible messages emitted during the turn, in order.
    pub messages: Vec<String>,
}

/// Turn driver: checkpointed state in, steps until suspension, state out.
pub struct Engine {
    graph: Graph,
    checkpointer: Arc<dyn Checkpointer>,
    ctx: NodeContext,
}

impl Engine {
    pub fn new(graph: Graph, checkpointer: Arc<dyn Checkpointer>, ctx: NodeContext) -> Self {
        Self {
            graph,
            checkpointer,
            ctx,
        }
    }

    /// Run one turn for a thread.
    pub async fn run_turn(&self, thread_id: &str, input: TurnInput) -> Result<TurnOutput, Error> {
        let mut state = self
            .checkpointer
            .load(thread_id)
            .await?
            .unwrap_or_default();

        let window = self.ctx.config.message_window;
        if let Some(route) = input.start_route {
            state.start_route = Some(route);
        }
        if let Some(consent) = input.garmin_consent {
            state.garmin_consent = consent;
        }
        if let Some(consent) = input.search_consent {
            state.search_consent = consent;
        }
        if let Some(text) = input.text {
            state.apply(
                StateUpdate {
                    messages: vec![Message::user(text)],
                    ..Default::default()
                },
                window,
            );
        }
        self.checkpointer.save(thread_id, &state).await?;

        let mut visible = Vec::new();
        let mut target = self.graph.entry_target(&state)?;
        let mut executed = 0usize;

        while let Target::Step(step_id) = target {
            if executed >= self.ctx.config.step_budget {
                return Err(GraphError::StepBudgetExceeded {
                    budget: self.ctx.config.step_budget,
                }
                .into());
            }
            executed += 1;

            tracing::debug!(step = %step_id, "Running step");
            let update = step_impl(step_id).run(&state, &self.ctx).await?;
            visible.extend(
                update
                    .messages
                    .iter()
                    .filter(|m| m.visibility == Visibility::User)
                    .map(|m| m.content.clone()),
            );
            state.apply(update, window);
            self.checkpointer.save(thread_id, &state).await?;

            target = self.graph.next_target(step_id, &state)?;
        }

        Ok(TurnOutput { messages: visible })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::graph::checkpoint::InMemoryCheckpointer;
    use crate::nodes::testing::{context, ScriptedLlm};

    #[test]
    fn standard_topology_validates() {
        assert!(Graph::standard().is_ok());
    }

    #[tokio::test]
    async fn turn_stops_at_the_step_budget() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(&dir, ScriptedLlm::new(["First question?"]));
        ctx.config.step_budget = 1;

        let engine = Engine::new(
            Graph::standard().unwrap(),
            Arc::new(InMemoryCheckpointer::new()),
            ctx,
        );
        let input = TurnInput {
            start_route: Some(StartMode::Make),
            ..Default::default()
        };

        // Welcome consumes the budget; the questionnaire step would be #2.
        let result = engine.run_turn("t", input).await;
        assert!(matches!(
            result,
            Err(Error::Graph(GraphError::StepBudgetExceeded { budget: 1 }))
        ));
    }

    #[test]
    fn missing_label_mapping_is_a_build_error() {
        use RouteLabel as L;
        use StepId as S;
        use Target::{End, Step};

        // ROUTE_AFTER_MODIFY declares {Continue, Modify}; map only one.
        let result = GraphBuilder::new()
            .entry(ROUTE_START, vec![
                (L::Welcome, Step(S::Modify)),
                (L::NewPlan, Step(S::Modify)),
                (L::Load, Step(S::Modify)),
                (L::Discuss, Step(S::Modify)),
            ])
            .conditional_edge(
                S::Modify,
                ROUTE_AFTER_MODIFY,
                vec![(L::Continue, End)],
            )
            .build();
        assert!(matches!(
            result,
            Err(GraphError::UnroutedLabel { ref label, .. }) if label == "modify"
        ));
    }

    #[test]
    fn reachable_step_without_outgoing_edge_is_a_build_error() {
        use RouteLabel as L;
        use StepId as S;
        use Target::Step;

        let result = GraphBuilder::new()
            .entry(ROUTE_START, vec![
                (L::Welcome, Step(S::Welcome)),
                (L::NewPlan, Step(S::Questionnaire)),
                (L::Load, Step(S::Load)),
                (L::Discuss, Step(S::Modify)),
            ])
            .build();
        assert!(matches!(result, Err(GraphError::MissingEdge { .. })));
    }
}
