//! External action invocation: an authenticated outbound POST whose outcome
//! steers the flow.
//!
//! Any response that arrives counts as success regardless of its status code.
//! That mirrors the deployed behavior flows already depend on, so it is kept
//! as-is rather than fixed; only transport-level failures report
//! `success = false`.

use async_trait::async_trait;
use serde_json::Value;

#[derive(Clone, Debug)]
pub struct ActionOutcome {
    pub success: bool,
    pub payload: Value,
}

impl ActionOutcome {
    pub fn success(payload: Value) -> Self {
        Self {
            success: true,
            payload,
        }
    }

    pub fn failure(payload: Value) -> Self {
        Self {
            success: false,
            payload,
        }
    }
}

#[async_trait]
pub trait ActionInvoker: Send + Sync {
    async fn invoke(&self, url: &str, body: &Value) -> ActionOutcome;
}

#[cfg(feature = "http-client")]
pub use http::HttpActionInvoker;

#[cfg(feature = "http-client")]
mod http {
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::{json, Value};
    use tracing::{info, warn};

    use super::{ActionInvoker, ActionOutcome};

    /// Environment variable holding the bearer credential for outbound calls.
    pub const BEARER_TOKEN_ENV: &str = "CONVOFLOW_BEARER_TOKEN";

    pub struct HttpActionInvoker {
        client: reqwest::Client,
        bearer_token: Option<String>,
    }

    impl HttpActionInvoker {
        pub fn new() -> Self {
            Self {
                client: pooled_client(),
                bearer_token: None,
            }
        }

        pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
            let token = token.into();
            self.bearer_token = if token.is_empty() { None } else { Some(token) };
            self
        }

        /// Reads the bearer credential from `CONVOFLOW_BEARER_TOKEN`.
        pub fn from_env() -> Self {
            let token = std::env::var(BEARER_TOKEN_ENV).unwrap_or_default();
            if token.is_empty() {
                warn!("no bearer token configured, external actions run unauthenticated");
            }
            Self::new().with_bearer_token(token)
        }
    }

    impl Default for HttpActionInvoker {
        fn default() -> Self {
            Self::new()
        }
    }

    fn pooled_client() -> reqwest::Client {
        reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to build HTTP client with custom config")
    }

    #[async_trait]
    impl ActionInvoker for HttpActionInvoker {
        async fn invoke(&self, url: &str, body: &Value) -> ActionOutcome {
            let mut request = self.client.post(url).json(body);
            if let Some(token) = &self.bearer_token {
                request = request.bearer_auth(token);
            }
            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    let payload = response.json::<Value>().await.unwrap_or(Value::Null);
                    info!(url, %status, "external action response received");
                    ActionOutcome::success(payload)
                }
                Err(err) => {
                    warn!(url, error = %err, "external action request failed");
                    ActionOutcome::failure(json!({ "error": err.to_string() }))
                }
            }
        }
    }
}
