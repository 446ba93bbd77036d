pub mod backend;
pub mod echo;
#[cfg(feature = "http-client")]
pub mod http;
pub mod registry;

pub use backend::{GenerationBackend, GenerationReply, GenerationRequest};
pub use echo::EchoBackend;
#[cfg(feature = "http-client")]
pub use http::OpenAiCompatBackend;
pub use registry::{resolve_model_alias, BackendRegistry};
