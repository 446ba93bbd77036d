//! Outbound message channel to the external participant.
//!
//! The interpreter never talks to the transport directly; it writes through a
//! per-turn [`OutboundSink`] that forwards to the transport and records every
//! emitted line, so request/response callers get the turn's text back even
//! without a live channel. Send failures are logged and never fail the turn.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::Result;
use crate::flow::constants::roles;
use crate::history::HistoryLog;

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, session_id: &str, text: &str) -> Result<()>;

    fn is_open(&self, _session_id: &str) -> bool {
        true
    }
}

/// Discards everything; for embeddings that only consume the returned
/// `emitted` lines.
#[derive(Default, Clone)]
pub struct NullTransport;

#[async_trait]
impl Transport for NullTransport {
    async fn send(&self, _session_id: &str, _text: &str) -> Result<()> {
        Ok(())
    }
}

/// Collects sent messages per session; used by tests.
#[derive(Default)]
pub struct BufferTransport {
    messages: Mutex<HashMap<String, Vec<String>>>,
}

impl BufferTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self, session_id: &str) -> Vec<String> {
        self.messages
            .lock()
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl Transport for BufferTransport {
    async fn send(&self, session_id: &str, text: &str) -> Result<()> {
        self.messages
            .lock()
            .entry(session_id.to_string())
            .or_default()
            .push(text.to_string());
        Ok(())
    }
}

/// Per-turn outbound writer: records each line, appends it to the
/// conversation history as the assistant, and forwards it to the transport
/// when the session channel is open.
pub struct OutboundSink {
    transport: Arc<dyn Transport>,
    history: Arc<dyn HistoryLog>,
    session_id: String,
    lines: Mutex<Vec<String>>,
}

impl OutboundSink {
    pub fn new(
        transport: Arc<dyn Transport>,
        history: Arc<dyn HistoryLog>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            history,
            session_id: session_id.into(),
            lines: Mutex::new(Vec::new()),
        }
    }

    pub async fn send(&self, text: &str) {
        self.lines.lock().push(text.to_string());
        if let Err(err) = self
            .history
            .append(&self.session_id, roles::ASSISTANT, text)
            .await
        {
            warn!(session = %self.session_id, error = %err, "history append failed");
        }
        if !self.transport.is_open(&self.session_id) {
            debug!(session = %self.session_id, "no open channel, message buffered only");
            return;
        }
        if let Err(err) = self.transport.send(&self.session_id, text).await {
            warn!(session = %self.session_id, error = %err, "transport send failed");
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines.into_inner()
    }
}
