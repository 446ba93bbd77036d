//! Append-only per-session conversation log.
//!
//! A best-effort side channel for audit: callers log and swallow failures, a
//! broken history store never fails a turn.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: String,
    pub text: String,
}

#[async_trait]
pub trait HistoryLog: Send + Sync {
    async fn append(&self, session_id: &str, role: &str, text: &str) -> Result<()>;
}

#[derive(Default)]
pub struct InMemoryHistory {
    entries: Mutex<HashMap<String, Vec<HistoryEntry>>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self, session_id: &str) -> Vec<HistoryEntry> {
        self.entries
            .lock()
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl HistoryLog for InMemoryHistory {
    async fn append(&self, session_id: &str, role: &str, text: &str) -> Result<()> {
        self.entries
            .lock()
            .entry(session_id.to_string())
            .or_default()
            .push(HistoryEntry {
                role: role.to_string(),
                text: text.to_string(),
            });
        Ok(())
    }
}

#[cfg(feature = "redis-store")]
pub mod redis {
    use async_trait::async_trait;
    use redis::AsyncCommands;

    use crate::error::{ConvoFlowError, Result};

    use super::HistoryLog;

    const KEY_PREFIX: &str = "history";

    /// Per-session Redis list with a sliding TTL.
    pub struct RedisHistory {
        client: redis::Client,
        ttl_seconds: i64,
    }

    impl RedisHistory {
        pub fn new(client: redis::Client, ttl_seconds: i64) -> Self {
            Self {
                client,
                ttl_seconds,
            }
        }
    }

    #[async_trait]
    impl HistoryLog for RedisHistory {
        async fn append(&self, session_id: &str, role: &str, text: &str) -> Result<()> {
            let mut conn = self
                .client
                .get_multiplexed_async_connection()
                .await
                .map_err(|e| ConvoFlowError::Transport(e.to_string()))?;
            let key = format!("{KEY_PREFIX}:{session_id}");
            let entry = serde_json::json!({ "role": role, "content": text }).to_string();
            let _: () = conn
                .rpush(&key, entry)
                .await
                .map_err(|e| ConvoFlowError::Transport(e.to_string()))?;
            let _: () = conn
                .expire(&key, self.ttl_seconds)
                .await
                .map_err(|e| ConvoFlowError::Transport(e.to_string()))?;
            Ok(())
        }
    }
}
