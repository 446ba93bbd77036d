use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{ConvoFlowError, Result};

/// A stored prompt template; generation nodes reference it by id to obtain
/// their system prompt.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub system_prompt: String,
}

#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn get(&self, template_id: &str) -> Result<PromptTemplate>;
}

#[derive(Default)]
pub struct InMemoryTemplateStore {
    templates: RwLock<HashMap<String, PromptTemplate>>,
}

impl InMemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, template: PromptTemplate) {
        self.templates
            .write()
            .insert(template.id.clone(), template);
    }
}

#[async_trait]
impl TemplateStore for InMemoryTemplateStore {
    async fn get(&self, template_id: &str) -> Result<PromptTemplate> {
        self.templates
            .read()
            .get(template_id)
            .cloned()
            .ok_or_else(|| ConvoFlowError::TemplateNotFound(template_id.to_string()))
    }
}
