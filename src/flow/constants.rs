//! Well-known context keys and outbound notice texts.

/// Context keys read and written by the node kinds.
pub mod keys {
    /// Latest user text; overwritten by hidden generation output.
    pub const USER_INPUT: &str = "user_input";
    /// Payload of the most recent external action call.
    pub const LAST_RESPONSE: &str = "last_response";
    /// Most recent generation output.
    pub const GENERATED_TEXT: &str = "generated_text";
}

/// History roles.
pub mod roles {
    pub const USER: &str = "user";
    pub const ASSISTANT: &str = "assistant";
}

/// Texts emitted to the transport at terminal positions.
pub mod notices {
    pub const DEAD_END: &str = "Flow ended. No further nodes.";
    pub const INVALID_INPUT: &str = "Invalid input. Please try again.";
}
