//! Conversation state — the single aggregate threaded through the graph.
//!
//! Steps return a partial [`StateUpdate`]; [`ConversationState::apply`] merges
//! it using one fixed policy per field: history appends (bounded to the last K
//! messages), specs shallow-merge key by key, the plan is replaced wholesale,
//! modify requests accumulate, and everything else overwrites when present.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{ModifyMode, SpecField, StartMode, TrainingItem};

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Assistant,
}

/// Whether a message is rendered to the end user or kept internal to the
/// model context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    User,
    Internal,
}

/// One transcript message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: Sender,
    pub content: String,
    pub visibility: Visibility,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            content: content.into(),
            visibility: Visibility::User,
        }
    }

    pub fn user_internal(content: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            content: content.into(),
            visibility: Visibility::Internal,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            sender: Sender::Assistant,
            content: content.into(),
            visibility: Visibility::User,
        }
    }

    pub fn assistant_internal(content: impl Into<String>) -> Self {
        Self {
            sender: Sender::Assistant,
            content: content.into(),
            visibility: Visibility::Internal,
        }
    }
}

/// A compressed, citation-annotated evidence summary (web or retrieval).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceBrief {
    pub brief: String,
    pub sources: Vec<Citation>,
}

/// One cited source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub title: String,
    pub url: Option<String>,
}

/// The aggregate conversation state for one thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    /// Transcript, bounded to the last K messages (replay window).
    pub messages: Vec<Message>,
    /// Questionnaire answers keyed by field.
    pub specs: BTreeMap<SpecField, String>,
    /// Index of the question currently awaiting an answer. `None` means
    /// nothing has been asked yet; `Some(fields.len())` means the
    /// questionnaire is complete. Monotonically non-decreasing.
    pub question_idx: Option<usize>,
    /// Per-session questionnaire field list. Telemetry consent elides the two
    /// volume fields on first questionnaire entry, for this session only.
    pub fields: Vec<SpecField>,
    /// Entry intent, set once welcome/classification resolves it.
    pub mode: Option<StartMode>,
    /// Last modify-intent classification.
    pub modify_mode: ModifyMode,
    /// Accumulated verbatim modification requests.
    pub modify_query: Vec<String>,
    /// Current candidate/accepted training plan.
    pub plan: Vec<TrainingItem>,
    /// Rationale accompanying the last generated plan.
    pub justification: Option<String>,
    /// Web-search evidence brief.
    pub web_ctx: Option<EvidenceBrief>,
    /// Retrieval evidence brief.
    pub rag_ctx: Option<EvidenceBrief>,
    /// Telemetry summary JSON, verbatim, for the coach prompt.
    pub garmin_data: Option<String>,
    /// Consent flags, set once at session start.
    pub garmin_consent: bool,
    pub search_consent: bool,
    /// Entry-point hint supplied by the front end.
    pub start_route: Option<StartMode>,
    /// Whether the welcome greeting has been emitted.
    pub welcomed: bool,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            specs: BTreeMap::new(),
            question_idx: None,
            fields: SpecField::ALL.to_vec(),
            mode: None,
            modify_mode: ModifyMode::Continue,
            modify_query: Vec::new(),
            plan: Vec::new(),
            justification: None,
            web_ctx: None,
            rag_ctx: None,
            garmin_data: None,
            garmin_consent: false,
            search_consent: false,
            start_route: None,
            welcomed: false,
        }
    }
}

impl ConversationState {
    /// Merge a partial update into this state.
    ///
    /// `message_window` is the replay bound K: after appending, only the last
    /// K messages are retained.
    pub fn apply(&mut self, update: StateUpdate, message_window: usize) {
        // Destructured exhaustively so a new field cannot be added without
        // choosing its merge policy here.
        let StateUpdate {
            messages,
            specs,
            question_idx,
            fields,
            mode,
            modify_mode,
            modify_query,
            plan,
            justification,
            web_ctx,
            rag_ctx,
            garmin_data,
            welcomed,
        } = update;

        // append, bounded replay window
        self.messages.extend(messages);
        if self.messages.len() > message_window {
            let excess = self.messages.len() - message_window;
            self.messages.drain(..excess);
        }

        // shallow-merge, last write wins per key
        for (field, answer) in specs {
            self.specs.insert(field, answer);
        }

        // overwrite-if-present
        if let Some(idx) = question_idx {
            self.question_idx = Some(idx);
        }
        if let Some(fields) = fields {
            self.fields = fields;
        }
        if let Some(mode) = mode {
            self.mode = Some(mode);
        }
        if let Some(modify_mode) = modify_mode {
            self.modify_mode = modify_mode;
        }

        // append
        self.modify_query.extend(modify_query);

        // full replacement
        if let Some(plan) = plan {
            self.plan = plan;
        }

        if let Some(justification) = justification {
            self.justification = Some(justification);
        }
        if let Some(web_ctx) = web_ctx {
            self.web_ctx = Some(web_ctx);
        }
        if let Some(rag_ctx) = rag_ctx {
            self.rag_ctx = Some(rag_ctx);
        }
        if let Some(garmin_data) = garmin_data {
            self.garmin_data = Some(garmin_data);
        }
        if let Some(welcomed) = welcomed {
            self.welcomed = welcomed;
        }
    }

    /// The last user utterance, if any.
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.sender == Sender::User)
            .map(|m| m.content.as_str())
    }
}

/// Partial state update produced by one step. Only the fields a step changes
/// are set; the merge policy per field lives in `ConversationState::apply`.
#[derive(Debug, Clone, Default)]
pub struct StateUpdate {
    pub messages: Vec<Message>,
    pub specs: BTreeMap<SpecField, String>,
    pub question_idx: Option<usize>,
    pub fields: Option<Vec<SpecField>>,
    pub mode: Option<StartMode>,
    pub modify_mode: Option<ModifyMode>,
    pub modify_query: Vec<String>,
    pub plan: Option<Vec<TrainingItem>>,
    pub justification: Option<String>,
    pub web_ctx: Option<EvidenceBrief>,
    pub rag_ctx: Option<EvidenceBrief>,
    pub garmin_data: Option<String>,
    pub welcomed: Option<bool>,
}
