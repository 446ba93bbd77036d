use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{ConvoFlowError, Result};
use crate::flow::types::Flow;

/// Read access to stored flow definitions, resolved once per turn.
#[async_trait]
pub trait FlowStore: Send + Sync {
    async fn get(&self, flow_id: &str) -> Result<Arc<Flow>>;
}

/// In-memory flow registry. Doubles as a cache in front of a durable store
/// and as the store itself in tests and embedded callers.
#[derive(Default)]
pub struct InMemoryFlowStore {
    flows: RwLock<HashMap<String, Arc<Flow>>>,
}

impl InMemoryFlowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, flow: Flow) {
        self.flows.write().insert(flow.id.clone(), Arc::new(flow));
    }

    pub fn remove(&self, flow_id: &str) -> bool {
        self.flows.write().remove(flow_id).is_some()
    }

    pub fn ids(&self) -> Vec<String> {
        self.flows.read().keys().cloned().collect()
    }
}

#[async_trait]
impl FlowStore for InMemoryFlowStore {
    async fn get(&self, flow_id: &str) -> Result<Arc<Flow>> {
        self.flows
            .read()
            .get(flow_id)
            .cloned()
            .ok_or_else(|| ConvoFlowError::FlowNotFound(flow_id.to_string()))
    }
}
