//! Explicit per-session execution state, owned by the turn driver.
//!
//! One state per session id: the paused node, the latest input, and the
//! open-ended variables map that every node kind reads and writes. Created
//! lazily on first turn, removed on completion, evictable after idling.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde_json::Value;

#[derive(Clone, Debug)]
pub struct SessionState {
    /// `None` means the flow has not started, or completed and was reset.
    pub current_node: Option<String>,
    pub last_input: Option<String>,
    pub variables: HashMap<String, Value>,
    /// When the pending interaction prompt was emitted, if any.
    pub prompt_sent_at: Option<Instant>,
    touched_at: Instant,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            current_node: None,
            last_input: None,
            variables: HashMap::new(),
            prompt_sent_at: None,
            touched_at: Instant::now(),
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Concurrent map of session states. A state is taken out for the duration
/// of its turn, so a turn mutates it without holding the lock; the caller is
/// expected to serialize turns per session.
#[derive(Default)]
pub struct SessionRegistry {
    inner: RwLock<HashMap<String, SessionState>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes the state for this session, creating a fresh one when absent.
    pub fn take_or_create(&self, session_id: &str) -> SessionState {
        self.inner
            .write()
            .remove(session_id)
            .unwrap_or_else(SessionState::new)
    }

    pub fn restore(&self, session_id: &str, mut state: SessionState) {
        state.touched_at = Instant::now();
        self.inner.write().insert(session_id.to_string(), state);
    }

    pub fn remove(&self, session_id: &str) -> Option<SessionState> {
        self.inner.write().remove(session_id)
    }

    pub fn current_node(&self, session_id: &str) -> Option<String> {
        self.inner
            .read()
            .get(session_id)
            .and_then(|s| s.current_node.clone())
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Drops sessions idle for longer than `max_idle`; returns how many were
    /// evicted.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let mut guard = self.inner.write();
        let before = guard.len();
        guard.retain(|_, state| state.touched_at.elapsed() <= max_idle);
        before - guard.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_or_create_starts_fresh_and_round_trips() {
        let registry = SessionRegistry::new();
        let mut state = registry.take_or_create("s1");
        assert!(state.current_node.is_none());

        state.current_node = Some("node-7".to_string());
        registry.restore("s1", state);
        assert_eq!(registry.current_node("s1").as_deref(), Some("node-7"));

        let taken = registry.take_or_create("s1");
        assert_eq!(taken.current_node.as_deref(), Some("node-7"));
        assert!(registry.is_empty());
    }

    #[test]
    fn idle_sessions_are_evicted() {
        let registry = SessionRegistry::new();
        registry.restore("old", SessionState::new());
        std::thread::sleep(Duration::from_millis(20));
        registry.restore("fresh", SessionState::new());

        let evicted = registry.evict_idle(Duration::from_millis(10));
        assert_eq!(evicted, 1);
        assert_eq!(registry.len(), 1);
        assert!(registry.take_or_create("old").current_node.is_none());
    }
}
