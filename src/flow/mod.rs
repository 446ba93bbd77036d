pub mod constants;
pub mod nodes;
pub mod registry;
pub mod types;

pub use nodes::{
    BranchCase, BranchNode, ExternalActionNode, FlowNode, GenerationNode, InteractionNode,
    ModelConfig, NodeKind,
};
pub use registry::{FlowStore, InMemoryFlowStore};
pub use types::{Flow, FlowEdge};
