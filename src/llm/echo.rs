use async_trait::async_trait;

use crate::error::Result;
use crate::llm::backend::{GenerationBackend, GenerationReply, GenerationRequest};

/// Deterministic local backend for tests and offline flows.
#[derive(Default, Clone)]
pub struct EchoBackend;

#[async_trait]
impl GenerationBackend for EchoBackend {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationReply> {
        Ok(GenerationReply {
            content: format!("[Echo] {}", request.user),
            metadata: None,
        })
    }
}
