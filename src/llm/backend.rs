use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::flow::nodes::{GenerationNode, ModelConfig};

/// One generation call: system prompt, user text, and model configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub model: String,
    pub system: String,
    pub user: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub stream: bool,
}

impl GenerationRequest {
    pub fn from_node(node: &GenerationNode, system: String, user: String) -> Self {
        let ModelConfig {
            model,
            temperature,
            max_tokens,
            stream,
        } = node.model.clone();
        Self {
            model,
            system,
            user,
            temperature,
            max_tokens,
            stream,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationReply {
    pub content: String,
    #[serde(default)]
    pub metadata: Option<Value>,
}

/// A pluggable text-generation backend, keyed in the registry by a
/// normalized backend name.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationReply>;
}
