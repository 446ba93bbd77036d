//! The single-step flow interpreter: dispatches on node kind and decides
//! whether to auto-chain or suspend.
//!
//! Node kinds whose action is fully synchronous and needs no new external
//! input (external action, branch, hidden generation) continue within the
//! same call; kinds that must wait for input (interaction, visible
//! generation) return control with the resume point recorded. Getting this
//! backward causes either silently skipped turns or per-turn stalls, so the
//! split is fixed here and nowhere else.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::action::ActionInvoker;
use crate::error::{ConvoFlowError, Result};
use crate::flow::constants::{keys, notices, roles};
use crate::flow::nodes::{GenerationNode, NodeKind};
use crate::flow::types::Flow;
use crate::history::HistoryLog;
use crate::llm::backend::GenerationRequest;
use crate::llm::registry::BackendRegistry;
use crate::placeholder;
use crate::template::TemplateStore;
use crate::transport::OutboundSink;

use super::branch;
use super::types::{NextPosition, TurnContext};

const DEFAULT_MAX_ITERATIONS: u32 = 256;

pub struct NodeInterpreter {
    templates: Arc<dyn TemplateStore>,
    backends: Arc<BackendRegistry>,
    actions: Arc<dyn ActionInvoker>,
    history: Arc<dyn HistoryLog>,
    max_iterations: u32,
}

impl NodeInterpreter {
    pub fn new(
        templates: Arc<dyn TemplateStore>,
        backends: Arc<BackendRegistry>,
        actions: Arc<dyn ActionInvoker>,
        history: Arc<dyn HistoryLog>,
    ) -> Self {
        Self {
            templates,
            backends,
            actions,
            history,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Advances from `entry` until the flow suspends or completes.
    ///
    /// Auto-chaining runs as a loop here rather than recursion; the context
    /// is exclusively borrowed for the whole turn either way.
    pub async fn advance(
        &self,
        flow: &Flow,
        entry: &str,
        ctx: &mut TurnContext,
        sink: &OutboundSink,
    ) -> Result<NextPosition> {
        let mut current = entry.to_string();
        let mut iterations = 0u32;
        loop {
            // cyclic auto-chaining graphs must fail, not spin the turn
            if iterations >= self.max_iterations {
                return Err(ConvoFlowError::MaxIterationsExceeded(self.max_iterations));
            }
            iterations += 1;
            let node = flow
                .node(&current)
                .ok_or_else(|| ConvoFlowError::NodeNotFound {
                    flow: flow.id.clone(),
                    node: current.clone(),
                })?;
            debug!(flow = %flow.id, node = %node.id, kind = node.kind.name(), "dispatching node");

            match &node.kind {
                NodeKind::Start => {
                    // Resolved once at session init; handled here only so a
                    // malformed edge back to start cannot wedge the turn.
                    match flow.successor(&node.id) {
                        Some(next) => current = next.to_string(),
                        None => {
                            sink.send(notices::DEAD_END).await;
                            return Ok(NextPosition::Complete);
                        }
                    }
                }
                NodeKind::End => {
                    info!(flow = %flow.id, node = %node.id, "flow completed");
                    sink.send(&format!("Flow completed at end node: {}", node.id))
                        .await;
                    return Ok(NextPosition::Complete);
                }
                NodeKind::Interaction(inter) => {
                    let prompt = placeholder::resolve_str(&inter.prompt, &ctx.variables);
                    if !prompt.is_empty() {
                        sink.send(&prompt).await;
                    }
                    ctx.prompt_sent_at = Some(Instant::now());
                    return Ok(NextPosition::Suspend(node.id.clone()));
                }
                NodeKind::ExternalAction(action) => {
                    let url = placeholder::resolve_str(&action.request_url, &ctx.variables);
                    let body = placeholder::resolve_value(&action.request_body, &ctx.variables);
                    let outcome = self.actions.invoke(&url, &body).await;
                    ctx.variables
                        .insert(keys::LAST_RESPONSE.to_string(), outcome.payload);
                    if outcome.success {
                        info!(node = %node.id, url = %url, "external action succeeded");
                        let next = action
                            .on_success_node
                            .clone()
                            .or_else(|| flow.successor(&node.id).map(str::to_string));
                        match next {
                            Some(target) => current = target,
                            None => {
                                sink.send(notices::DEAD_END).await;
                                return Ok(NextPosition::Complete);
                            }
                        }
                    } else {
                        warn!(node = %node.id, url = %url, "external action failed");
                        match &action.on_error_node {
                            Some(target) => current = target.clone(),
                            None => return Ok(NextPosition::Complete),
                        }
                    }
                }
                NodeKind::Generation(generation) => {
                    match self.run_generation(generation, ctx).await {
                        Ok(text) => {
                            ctx.variables.insert(
                                keys::GENERATED_TEXT.to_string(),
                                Value::String(text.clone()),
                            );
                            if generation.show_conversation {
                                sink.send(&text).await;
                                match flow.successor(&node.id) {
                                    Some(next) => {
                                        // the successor has not run yet, so no
                                        // prompt is pending there
                                        ctx.prompt_sent_at = None;
                                        return Ok(NextPosition::Suspend(next.to_string()));
                                    }
                                    None => {
                                        sink.send(notices::DEAD_END).await;
                                        return Ok(NextPosition::Complete);
                                    }
                                }
                            } else {
                                // silent multi-hop: the output becomes the
                                // next node's input
                                if let Err(err) = self
                                    .history
                                    .append(&ctx.session_id, roles::ASSISTANT, &text)
                                    .await
                                {
                                    warn!(session = %ctx.session_id, error = %err, "history append failed");
                                }
                                ctx.set_user_input(&text);
                                match flow.successor(&node.id) {
                                    Some(next) => current = next.to_string(),
                                    None => return Ok(NextPosition::Complete),
                                }
                            }
                        }
                        Err(err) => match &generation.fallback_node {
                            Some(target) => {
                                warn!(node = %node.id, error = %err, "generation failed, taking fallback");
                                current = target.clone();
                            }
                            None => return Err(err),
                        },
                    }
                }
                NodeKind::Branch(branch_node) => {
                    match branch::resolve(
                        &branch_node.cases,
                        branch_node.default_node.as_deref(),
                        &ctx.variables,
                    ) {
                        Some(target) => {
                            info!(node = %node.id, target = %target, "branch resolved");
                            current = target;
                        }
                        None => {
                            info!(node = %node.id, "no branch case matched, flow ends");
                            sink.send(notices::DEAD_END).await;
                            return Ok(NextPosition::Complete);
                        }
                    }
                }
            }
        }
    }

    async fn run_generation(&self, node: &GenerationNode, ctx: &TurnContext) -> Result<String> {
        let template = self.templates.get(&node.template_id).await?;
        let request =
            GenerationRequest::from_node(node, template.system_prompt, ctx.user_input());
        let reply = self.backends.generate(request).await?;
        Ok(reply.content)
    }
}
