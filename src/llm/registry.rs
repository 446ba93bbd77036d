use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use tracing::debug;

use crate::error::{ConvoFlowError, Result};
use crate::llm::backend::{GenerationBackend, GenerationReply, GenerationRequest};

/// User-facing model names mapped to canonical backend keys. Several GPT
/// variants route to one backend, DeepSeek variants to another.
static MODEL_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("openai", "openai"),
        ("gpt-4o", "openai"),
        ("gpt-4o-mini", "openai"),
        ("gpt-o3-mini", "openai"),
        ("deepseek", "deepseek"),
        ("deepseek-chat", "deepseek"),
        ("deepseek-reasoner", "deepseek"),
    ])
});

/// Resolves a user-facing model name to its canonical backend key.
pub fn resolve_model_alias(model: &str) -> Option<&'static str> {
    MODEL_ALIASES.get(model.to_lowercase().as_str()).copied()
}

/// Holds the registered generation backends and routes requests to them by
/// normalized model identifier.
#[derive(Default)]
pub struct BackendRegistry {
    backends: HashMap<String, Arc<dyn GenerationBackend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        key: impl Into<String>,
        backend: Arc<dyn GenerationBackend>,
    ) -> &mut Self {
        self.backends.insert(key.into().to_lowercase(), backend);
        self
    }

    pub fn with_backend(
        mut self,
        key: impl Into<String>,
        backend: Arc<dyn GenerationBackend>,
    ) -> Self {
        self.register(key, backend);
        self
    }

    /// Routes by alias table first, then by exact registered key, so test
    /// backends can be addressed directly by their key.
    pub async fn generate(&self, request: GenerationRequest) -> Result<GenerationReply> {
        let normalized = request.model.to_lowercase();
        let key = resolve_model_alias(&normalized)
            .map(str::to_string)
            .unwrap_or(normalized);
        let backend = self
            .backends
            .get(&key)
            .ok_or_else(|| ConvoFlowError::UnsupportedModel(request.model.clone()))?;
        debug!(model = %request.model, backend = %key, "dispatching generation request");
        backend.generate(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_normalize_to_backend_keys() {
        assert_eq!(resolve_model_alias("gpt-4o"), Some("openai"));
        assert_eq!(resolve_model_alias("GPT-4o-Mini"), Some("openai"));
        assert_eq!(resolve_model_alias("deepseek-reasoner"), Some("deepseek"));
        assert_eq!(resolve_model_alias("openai"), Some("openai"));
        assert_eq!(resolve_model_alias("claude-9"), None);
    }

    #[tokio::test]
    async fn unknown_model_is_rejected() {
        let registry = BackendRegistry::new();
        let request = GenerationRequest {
            model: "unknown-model".to_string(),
            system: String::new(),
            user: "hi".to_string(),
            temperature: None,
            max_tokens: None,
            stream: false,
        };
        let err = registry.generate(request).await.expect_err("should fail");
        assert!(matches!(err, ConvoFlowError::UnsupportedModel(_)));
    }
}
