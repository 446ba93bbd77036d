use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConvoFlowError>;

#[derive(Debug, Error)]
pub enum ConvoFlowError {
    #[error("flow `{0}` not found")]
    FlowNotFound(String),
    #[error("node `{node}` not found in flow `{flow}`")]
    NodeNotFound { flow: String, node: String },
    #[error("template `{0}` not found")]
    TemplateNotFound(String),
    #[error("unsupported model `{0}`")]
    UnsupportedModel(String),
    #[error("generation failed: {0}")]
    GenerationFailed(String),
    #[error("exceeded {0} node dispatches in a single turn")]
    MaxIterationsExceeded(u32),
    #[error("invalid flow definition: {0}")]
    FlowParse(#[from] serde_json::Error),
    #[error("transport error: {0}")]
    Transport(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
