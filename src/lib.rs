pub mod action;
pub mod error;
pub mod expr;
pub mod flow;
pub mod history;
pub mod llm;
pub mod placeholder;
pub mod runtime;
pub mod template;
pub mod transport;
pub mod utils;

pub use action::{ActionInvoker, ActionOutcome};
pub use error::{ConvoFlowError, Result};
pub use flow::{
    BranchCase, BranchNode, ExternalActionNode, Flow, FlowEdge, FlowNode, FlowStore,
    GenerationNode, InMemoryFlowStore, InteractionNode, ModelConfig, NodeKind,
};
pub use history::{HistoryEntry, HistoryLog, InMemoryHistory};
pub use llm::{
    BackendRegistry, EchoBackend, GenerationBackend, GenerationReply, GenerationRequest,
};
pub use runtime::{
    NextPosition, NodeInterpreter, SessionRegistry, SessionState, TurnContext, TurnDriver,
    TurnOutcome, TurnPosition, TurnRequest,
};
pub use template::{InMemoryTemplateStore, PromptTemplate, TemplateStore};
pub use transport::{BufferTransport, NullTransport, OutboundSink, Transport};
pub use utils::LoggingConfig;

#[cfg(feature = "http-client")]
pub use action::HttpActionInvoker;
#[cfg(feature = "http-client")]
pub use llm::OpenAiCompatBackend;
#[cfg(feature = "redis-store")]
pub use history::redis::RedisHistory;
