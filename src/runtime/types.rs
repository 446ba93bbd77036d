use std::collections::HashMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::flow::constants::keys;

/// Where interpretation stopped within one turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NextPosition {
    /// Control returns to the caller; this node id is the resume point.
    Suspend(String),
    /// The flow reached an end node or a dead end.
    Complete,
}

/// Inbound shape of one turn.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TurnRequest {
    pub flow_id: String,
    pub session_id: String,
    #[serde(default)]
    pub user_input: String,
}

/// Outbound shape of one turn.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub position: TurnPosition,
    /// Everything emitted during the turn, in order.
    pub emitted: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "node", rename_all = "snake_case")]
pub enum TurnPosition {
    Paused(String),
    Completed,
}

/// The mutable execution context carried through one turn. Exclusively owned
/// for the turn's duration; moved back into the session state afterwards.
#[derive(Debug)]
pub struct TurnContext {
    pub session_id: String,
    pub variables: HashMap<String, Value>,
    /// Set when an interaction prompt was emitted and the session now waits
    /// at that node; cleared once the node is passed.
    pub prompt_sent_at: Option<Instant>,
}

impl TurnContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            variables: HashMap::new(),
            prompt_sent_at: None,
        }
    }

    pub fn user_input(&self) -> String {
        self.variables
            .get(keys::USER_INPUT)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    pub fn set_user_input(&mut self, text: &str) {
        self.variables
            .insert(keys::USER_INPUT.to_string(), Value::String(text.to_string()));
    }
}
