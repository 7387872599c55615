use thiserror::Error;

/// Errors emitted by the agent loop.
///
/// Only `Config` escapes [`crate::AgentLoop::run`]; the others are folded into
/// the outcome or the round history.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AgentError {
    /// Settings are missing or out of range.
    #[error("invalid agent settings: {0}")]
    Config(String),

    /// The page context could not be captured; fatal for the invocation.
    #[error("page capture failed: {0}")]
    Capture(String),

    /// The completion call failed or returned an unusable payload; costs one round.
    #[error("API error: {0}")]
    Api(String),

    /// The model reply is not an action batch; surfaced as plain text.
    #[error("unparseable model reply: {0}")]
    Parse(String),

    /// The round budget ran out before `done`.
    #[error("round budget of {0} exhausted")]
    BudgetExhausted(u32),
}

impl AgentError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn capture(message: impl Into<String>) -> Self {
        Self::Capture(message.into())
    }

    pub fn api(message: impl Into<String>) -> Self {
        Self::Api(message.into())
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }
}
