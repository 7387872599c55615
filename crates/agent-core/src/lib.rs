//! Agent loop for TabPilot.
//!
//! Captures the active page, asks the model for an action batch, executes it
//! and feeds the results back, for at most `max_rounds` rounds.
//!
//! - [`AgentLoop`]: the orchestrator
//! - [`CompletionClient`]: transport of the completion call
//! - [`SettingsSource`]: persisted settings, read once per invocation

pub mod config;
pub mod controller;
pub mod errors;
pub mod llm;
pub mod prompt;
pub mod reply;
pub mod trace;
pub mod types;

pub use config::{AgentSettings, SettingsSource};
pub use controller::{AgentLoop, CaptureRetry};
pub use errors::AgentError;
pub use llm::{
    ChatMessage, CompletionClient, CompletionRequest, ContentPart, MessageContent,
    OpenAiCompletionClient, Role,
};
pub use reply::{extract_json_object, parse_reply, ModelReply};
pub use trace::TraceContext;
pub use types::{
    AgentOutcome, BrowserState, CurrentState, HistoryEntry, LoopPhase, OutcomeStatus, RoundState,
};
