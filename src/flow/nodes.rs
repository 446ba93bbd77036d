use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One step in a flow graph, tagged by kind.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FlowNode {
    pub id: String,
    #[serde(flatten)]
    pub kind: NodeKind,
}

/// The closed set of node kinds. A definition carrying any other tag fails
/// at deserialization, so the interpreter only ever sees valid kinds.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    Start,
    End,
    Interaction(InteractionNode),
    ExternalAction(ExternalActionNode),
    Generation(GenerationNode),
    Branch(BranchNode),
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Start => "start",
            NodeKind::End => "end",
            NodeKind::Interaction(_) => "interaction",
            NodeKind::ExternalAction(_) => "external_action",
            NodeKind::Generation(_) => "generation",
            NodeKind::Branch(_) => "branch",
        }
    }
}

/// Prompts the user and waits for a reply on the next turn.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InteractionNode {
    pub prompt: String,
    /// Regex the reply must match; mismatch re-prompts without advancing.
    #[serde(default)]
    pub validation_pattern: Option<String>,
    /// Soft boundary from prompt emission to reply arrival, checked by the driver.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    #[serde(default)]
    pub fallback_node: Option<String>,
}

/// Fires an outbound POST and chains on the outcome within the same turn.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExternalActionNode {
    pub request_url: String,
    /// Arbitrary JSON tree; string values may contain `[key]` placeholders.
    #[serde(default)]
    pub request_body: Value,
    #[serde(default)]
    pub on_success_node: Option<String>,
    #[serde(default)]
    pub on_error_node: Option<String>,
}

/// Calls a generation backend with a stored system prompt.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationNode {
    pub template_id: String,
    #[serde(default)]
    pub model: ModelConfig,
    /// When false the output silently becomes the next node's input.
    #[serde(default = "default_show_conversation")]
    pub show_conversation: bool,
    #[serde(default)]
    pub fallback_node: Option<String>,
}

fn default_show_conversation() -> bool {
    true
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub stream: bool,
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: None,
            max_tokens: None,
            stream: false,
        }
    }
}

/// Ordered multi-way branch; the first case whose expression holds wins.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BranchNode {
    #[serde(default)]
    pub cases: Vec<BranchCase>,
    #[serde(default)]
    pub default_node: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BranchCase {
    pub expression: String,
    pub target_node: String,
    #[serde(default)]
    pub label: Option<String>,
}
