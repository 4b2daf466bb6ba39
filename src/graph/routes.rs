//! Routing functions — pure, total functions of conversation state.
//!
//! Each router declares the closed set of labels it can return; the graph
//! builder checks every declared label against the edge table before any
//! conversation runs, so an undeclared label is a construction error, not a
//! runtime one.

use crate::domain::{ModifyMode, StartMode};
use crate::graph::state::ConversationState;

/// Labels a routing function may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteLabel {
    /// Greet / classify entry intent.
    Welcome,
    /// Suspend the turn and wait for the user.
    Await,
    /// Enter the plan-creation flow.
    NewPlan,
    /// Load the persisted plan.
    Load,
    /// Discuss the current plan.
    Discuss,
    /// Stay in the current sub-flow (questionnaire not finished, or keep
    /// discussing).
    Continue,
    /// Proceed toward plan generation.
    Coach,
    /// Fetch telemetry first.
    Garmin,
    /// Gather web evidence first.
    Search,
    /// Regenerate the plan with the new modify request.
    Modify,
}

impl std::fmt::Display for RouteLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Welcome => "welcome",
            Self::Await => "await",
            Self::NewPlan => "new_plan",
            Self::Load => "load",
            Self::Discuss => "discuss",
            Self::Continue => "continue",
            Self::Coach => "coach",
            Self::Garmin => "garmin",
            Self::Search => "search",
            Self::Modify => "modify",
        };
        f.write_str(s)
    }
}

/// A routing function together with the labels it is declared to return.
#[derive(Clone, Copy)]
pub struct Router {
    pub name: &'static str,
    pub labels: &'static [RouteLabel],
    pub decide: fn(&ConversationState) -> RouteLabel,
}

/// Entry routing, evaluated at the top of every turn.
pub const ROUTE_START: Router = Router {
    name: "route_start",
    labels: &[
        RouteLabel::Welcome,
        RouteLabel::NewPlan,
        RouteLabel::Load,
        RouteLabel::Discuss,
    ],
    decide: route_start,
};

fn route_start(state: &ConversationState) -> RouteLabel {
    match state.mode {
        Some(StartMode::Make) => RouteLabel::NewPlan,
        Some(StartMode::Discuss) => {
            if state.plan.is_empty() {
                RouteLabel::Load
            } else {
                RouteLabel::Discuss
            }
        }
        None => RouteLabel::Welcome,
    }
}

/// After the welcome step: either the classification resolved a mode, or the
/// turn suspends awaiting the user's choice.
pub const ROUTE_AFTER_WELCOME: Router = Router {
    name: "route_after_welcome",
    labels: &[
        RouteLabel::Await,
        RouteLabel::NewPlan,
        RouteLabel::Load,
        RouteLabel::Discuss,
    ],
    decide: route_after_welcome,
};

fn route_after_welcome(state: &ConversationState) -> RouteLabel {
    match state.mode {
        None => RouteLabel::Await,
        Some(StartMode::Make) => RouteLabel::NewPlan,
        Some(StartMode::Discuss) => {
            if state.plan.is_empty() {
                RouteLabel::Load
            } else {
                RouteLabel::Discuss
            }
        }
    }
}

/// After the questionnaire step: keep interviewing, or proceed toward
/// generation once the cursor reaches the end of the field list.
pub const ROUTE_AFTER_QUESTION: Router = Router {
    name: "route_after_question",
    labels: &[RouteLabel::Continue, RouteLabel::Coach],
    decide: route_after_question,
};

fn route_after_question(state: &ConversationState) -> RouteLabel {
    match state.question_idx {
        Some(idx) if idx >= state.fields.len() => RouteLabel::Coach,
        _ => RouteLabel::Continue,
    }
}

/// Plan-creation entry: a pure function of the two consent flags.
pub const ROUTE_PLAN_ENTRY: Router = Router {
    name: "route_plan_entry",
    labels: &[RouteLabel::Garmin, RouteLabel::Search, RouteLabel::Coach],
    decide: route_plan_entry,
};

fn route_plan_entry(state: &ConversationState) -> RouteLabel {
    if state.garmin_consent {
        RouteLabel::Garmin
    } else if state.search_consent {
        RouteLabel::Search
    } else {
        RouteLabel::Coach
    }
}

/// After telemetry: continue to web search when consented, else straight to
/// retrieval.
pub const ROUTE_AFTER_GARMIN: Router = Router {
    name: "route_after_garmin",
    labels: &[RouteLabel::Search, RouteLabel::Coach],
    decide: route_after_garmin,
};

fn route_after_garmin(state: &ConversationState) -> RouteLabel {
    if state.search_consent {
        RouteLabel::Search
    } else {
        RouteLabel::Coach
    }
}

/// After the modify classifier: a literal `continue` keeps discussing,
/// anything else regenerates.
pub const ROUTE_AFTER_MODIFY: Router = Router {
    name: "route_after_modify",
    labels: &[RouteLabel::Continue, RouteLabel::Modify],
    decide: route_after_modify,
};

fn route_after_modify(state: &ConversationState) -> RouteLabel {
    if state.modify_mode == ModifyMode::Continue {
        RouteLabel::Continue
    } else {
        RouteLabel::Modify
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SpecField, TrainingItem};

    fn state() -> ConversationState {
        ConversationState::default()
    }

    fn some_plan() -> Vec<TrainingItem> {
        vec![TrainingItem {
            date: crate::domain::parse_plan_date("05-08-2025").unwrap(),
            description: "easy run".to_string(),
        }]
    }

    #[test]
    fn start_routes_to_welcome_without_mode() {
        assert_eq!(route_start(&state()), RouteLabel::Welcome);
    }

    #[test]
    fn start_routes_make_to_new_plan() {
        let mut s = state();
        s.mode = Some(StartMode::Make);
        assert_eq!(route_start(&s), RouteLabel::NewPlan);
    }

    #[test]
    fn start_routes_discuss_to_load_when_no_plan() {
        let mut s = state();
        s.mode = Some(StartMode::Discuss);
        assert_eq!(route_start(&s), RouteLabel::Load);
        s.plan = some_plan();
        assert_eq!(route_start(&s), RouteLabel::Discuss);
    }

    #[test]
    fn question_route_continues_below_len_and_coaches_at_len() {
        let mut s = state();
        assert_eq!(route_after_question(&s), RouteLabel::Continue);
        let len = s.fields.len();
        for idx in 0..len {
            s.question_idx = Some(idx);
            assert_eq!(route_after_question(&s), RouteLabel::Continue, "idx {idx}");
        }
        s.question_idx = Some(len);
        assert_eq!(route_after_question(&s), RouteLabel::Coach);
    }

    #[test]
    fn question_route_respects_elided_field_list() {
        let mut s = state();
        s.fields = SpecField::ALL
            .iter()
            .copied()
            .filter(|f| !SpecField::TELEMETRY_DERIVED.contains(f))
            .collect();
        s.question_idx = Some(6);
        assert_eq!(route_after_question(&s), RouteLabel::Coach);
    }

    #[test]
    fn plan_entry_is_pure_in_the_consent_flags() {
        let cases = [
            (false, false, RouteLabel::Coach),
            (false, true, RouteLabel::Search),
            (true, false, RouteLabel::Garmin),
            (true, true, RouteLabel::Garmin),
        ];
        for (garmin, search, expected) in cases {
            let mut s = state();
            s.garmin_consent = garmin;
            s.search_consent = search;
            assert_eq!(route_plan_entry(&s), expected, "garmin={garmin} search={search}");
        }
    }

    #[test]
    fn after_garmin_honors_search_consent() {
        let mut s = state();
        assert_eq!(route_after_garmin(&s), RouteLabel::Coach);
        s.search_consent = true;
        assert_eq!(route_after_garmin(&s), RouteLabel::Search);
    }

    #[test]
    fn modify_route_continue_vs_anything_else() {
        let mut s = state();
        s.modify_mode = ModifyMode::Continue;
        assert_eq!(route_after_modify(&s), RouteLabel::Continue);
        s.modify_mode = ModifyMode::Modify;
        assert_eq!(route_after_modify(&s), RouteLabel::Modify);
        // Out-of-enum classifier output maps to Modify at parse time.
        let parsed: ModifyMode = serde_json::from_str("\"revamp\"").unwrap();
        s.modify_mode = parsed;
        assert_eq!(route_after_modify(&s), RouteLabel::Modify);
    }
}
