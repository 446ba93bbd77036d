//! The outward-facing per-turn orchestration.
//!
//! Each external input resolves (flow, session) to its paused node, or to
//! the start successor on first turn, runs the interpreter, and persists the
//! resulting position. Interaction resume handling (timeout boundary and
//! input validation) lives here: the engine has no internal timers, so the
//! driver compares elapsed time at resume.

use std::sync::Arc;
use std::time::{Duration, Instant};

use regex::Regex;
use tracing::{error, warn};

use crate::action::ActionInvoker;
use crate::error::{ConvoFlowError, Result};
use crate::flow::constants::{notices, roles};
use crate::flow::nodes::{InteractionNode, NodeKind};
use crate::flow::registry::FlowStore;
use crate::flow::types::Flow;
use crate::history::{HistoryLog, InMemoryHistory};
use crate::llm::registry::BackendRegistry;
use crate::placeholder;
use crate::template::TemplateStore;
use crate::transport::{NullTransport, OutboundSink, Transport};

use super::interpreter::NodeInterpreter;
use super::session::{SessionRegistry, SessionState};
use super::types::{NextPosition, TurnContext, TurnOutcome, TurnPosition, TurnRequest};

pub struct TurnDriver {
    flows: Arc<dyn FlowStore>,
    templates: Arc<dyn TemplateStore>,
    backends: Arc<BackendRegistry>,
    actions: Arc<dyn ActionInvoker>,
    sessions: SessionRegistry,
    transport: Arc<dyn Transport>,
    history: Arc<dyn HistoryLog>,
    max_iterations: u32,
}

impl TurnDriver {
    pub fn new(
        flows: Arc<dyn FlowStore>,
        templates: Arc<dyn TemplateStore>,
        backends: Arc<BackendRegistry>,
        actions: Arc<dyn ActionInvoker>,
    ) -> Self {
        Self {
            flows,
            templates,
            backends,
            actions,
            sessions: SessionRegistry::new(),
            transport: Arc::new(NullTransport),
            history: Arc::new(InMemoryHistory::new()),
            max_iterations: 256,
        }
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_history(mut self, history: Arc<dyn HistoryLog>) -> Self {
        self.history = history;
        self
    }

    /// Caps node dispatches per turn (default 256).
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    fn interpreter(&self) -> NodeInterpreter {
        NodeInterpreter::new(
            Arc::clone(&self.templates),
            Arc::clone(&self.backends),
            Arc::clone(&self.actions),
            Arc::clone(&self.history),
        )
        .with_max_iterations(self.max_iterations)
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Drops sessions idle for longer than `max_idle`.
    pub fn evict_idle_sessions(&self, max_idle: Duration) -> usize {
        self.sessions.evict_idle(max_idle)
    }

    /// Processes one turn to completion. Fatal errors are reported to the
    /// transport and returned; the session position is left unchanged so a
    /// corrected retry is possible.
    pub async fn handle_turn(&self, request: TurnRequest) -> Result<TurnOutcome> {
        let sink = OutboundSink::new(
            Arc::clone(&self.transport),
            Arc::clone(&self.history),
            request.session_id.clone(),
        );
        match self.run_turn(&request, &sink).await {
            Ok(position) => Ok(TurnOutcome {
                position,
                emitted: sink.into_lines(),
            }),
            Err(err) => {
                error!(
                    flow = %request.flow_id,
                    session = %request.session_id,
                    error = %err,
                    "turn failed"
                );
                sink.send(&format!("Error processing turn: {err}")).await;
                Err(err)
            }
        }
    }

    async fn run_turn(&self, request: &TurnRequest, sink: &OutboundSink) -> Result<TurnPosition> {
        let flow = self.flows.get(&request.flow_id).await?;
        if let Err(err) = self
            .history
            .append(&request.session_id, roles::USER, &request.user_input)
            .await
        {
            warn!(session = %request.session_id, error = %err, "history append failed");
        }

        let mut state = self.sessions.take_or_create(&request.session_id);
        let resume_node = state.current_node.clone();
        state.last_input = Some(request.user_input.clone());

        match self.drive(&flow, request, &mut state, sink).await {
            Ok(NextPosition::Suspend(node_id)) => {
                state.current_node = Some(node_id.clone());
                self.sessions.restore(&request.session_id, state);
                Ok(TurnPosition::Paused(node_id))
            }
            Ok(NextPosition::Complete) => {
                // execution state is cleared once the flow finishes
                Ok(TurnPosition::Completed)
            }
            Err(err) => {
                state.current_node = resume_node;
                self.sessions.restore(&request.session_id, state);
                Err(err)
            }
        }
    }

    async fn drive(
        &self,
        flow: &Flow,
        request: &TurnRequest,
        state: &mut SessionState,
        sink: &OutboundSink,
    ) -> Result<NextPosition> {
        let mut ctx = TurnContext::new(request.session_id.clone());
        ctx.variables = std::mem::take(&mut state.variables);
        ctx.prompt_sent_at = state.prompt_sent_at;

        let result = match state.current_node.clone() {
            None => {
                ctx.set_user_input(&request.user_input);
                let start = flow
                    .start_node()
                    .ok_or_else(|| ConvoFlowError::NodeNotFound {
                        flow: flow.id.clone(),
                        node: "start".to_string(),
                    })?;
                match flow.successor(&start.id) {
                    Some(next) => {
                        let next = next.to_string();
                        self.interpreter().advance(flow, &next, &mut ctx, sink).await
                    }
                    None => {
                        sink.send(notices::DEAD_END).await;
                        Ok(NextPosition::Complete)
                    }
                }
            }
            Some(node_id) => {
                let node = flow
                    .node(&node_id)
                    .ok_or_else(|| ConvoFlowError::NodeNotFound {
                        flow: flow.id.clone(),
                        node: node_id.clone(),
                    })?;
                match &node.kind {
                    // Resuming at an interaction whose prompt is pending:
                    // the arriving input answers that prompt.
                    NodeKind::Interaction(inter) if ctx.prompt_sent_at.is_some() => {
                        let inter = inter.clone();
                        let node_id = node.id.clone();
                        self.resume_interaction(flow, &node_id, &inter, request, &mut ctx, sink)
                            .await
                    }
                    _ => {
                        ctx.set_user_input(&request.user_input);
                        self.interpreter().advance(flow, &node_id, &mut ctx, sink).await
                    }
                }
            }
        };

        state.variables = std::mem::take(&mut ctx.variables);
        state.prompt_sent_at = ctx.prompt_sent_at;
        result
    }

    async fn resume_interaction(
        &self,
        flow: &Flow,
        node_id: &str,
        inter: &InteractionNode,
        request: &TurnRequest,
        ctx: &mut TurnContext,
        sink: &OutboundSink,
    ) -> Result<NextPosition> {
        // Timeout boundary, measured from prompt emission to response
        // arrival; checked before the response is forwarded.
        if let (Some(limit), Some(sent_at)) = (inter.timeout_seconds, ctx.prompt_sent_at) {
            if sent_at.elapsed() > Duration::from_secs(limit) {
                if let Some(fallback) = &inter.fallback_node {
                    warn!(node = %node_id, "interaction timed out, taking fallback");
                    ctx.prompt_sent_at = None;
                    ctx.set_user_input(&request.user_input);
                    return self.interpreter().advance(flow, fallback, ctx, sink).await;
                }
                // no fallback configured: proceed with normal advancement
            }
        }

        if let Some(pattern) = &inter.validation_pattern {
            match Regex::new(pattern) {
                Ok(re) => {
                    if !re.is_match(&request.user_input) {
                        let prompt = placeholder::resolve_str(&inter.prompt, &ctx.variables);
                        sink.send(notices::INVALID_INPUT).await;
                        if !prompt.is_empty() {
                            sink.send(&prompt).await;
                        }
                        ctx.prompt_sent_at = Some(Instant::now());
                        return Ok(NextPosition::Suspend(node_id.to_string()));
                    }
                }
                Err(err) => {
                    warn!(node = %node_id, error = %err, "invalid validation pattern, skipping validation");
                }
            }
        }

        ctx.prompt_sent_at = None;
        ctx.set_user_input(&request.user_input);
        match flow.successor(node_id) {
            Some(next) => {
                let next = next.to_string();
                self.interpreter().advance(flow, &next, ctx, sink).await
            }
            None => {
                sink.send(notices::DEAD_END).await;
                Ok(NextPosition::Complete)
            }
        }
    }
}
