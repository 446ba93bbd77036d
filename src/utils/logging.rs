use std::env;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Logging setup for binaries and long-running hosts embedding the engine.
pub struct LoggingConfig;

impl LoggingConfig {
    /// Initializes the tracing subscriber.
    ///
    /// Environment variables:
    /// - `RUST_LOG`: standard level filter (error, warn, info, debug, trace)
    /// - `CONVOFLOW_DEBUG`: verbose output with targets and source locations
    ///
    /// ```no_run
    /// use convoflow::utils::LoggingConfig;
    ///
    /// fn main() {
    ///     LoggingConfig::init();
    /// }
    /// ```
    pub fn init() {
        let is_debug = env::var("CONVOFLOW_DEBUG").is_ok();

        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => {
                if is_debug {
                    EnvFilter::new("convoflow=debug,info")
                } else {
                    EnvFilter::new("convoflow=info,warn")
                }
            }
        };

        let fmt_layer = if is_debug {
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_thread_ids(true)
        } else {
            fmt::layer()
                .with_target(false)
                .with_file(false)
                .with_line_number(false)
                .with_thread_ids(false)
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();

        if is_debug {
            tracing::debug!("debug logging enabled");
        }
    }

    /// Initializes with an explicit filter string, ignoring the environment.
    pub fn init_with_filter(filter: &str) {
        let env_filter = EnvFilter::new(filter);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer())
            .init();
    }

    pub fn is_debug() -> bool {
        env::var("CONVOFLOW_DEBUG").is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_flag_follows_environment() {
        env::remove_var("CONVOFLOW_DEBUG");
        assert!(!LoggingConfig::is_debug());

        env::set_var("CONVOFLOW_DEBUG", "1");
        assert!(LoggingConfig::is_debug());

        env::remove_var("CONVOFLOW_DEBUG");
    }
}
