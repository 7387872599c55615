//! Settings read once at the start of every invocation.

use std::fmt;
use std::time::Duration;

use perceiver_structural::CaptureOptions;
use serde::{Deserialize, Serialize};

use crate::errors::AgentError;

/// Settings for the agent loop and its completion client.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentSettings {
    /// Bearer token for the completion API.
    pub api_key: String,

    /// Model identifier sent with every completion request.
    /// Default: "gpt-4o"
    pub model_id: String,

    /// API root; requests go to `<base_url>/chat/completions`.
    pub base_url: String,

    /// Round budget. Default: 10
    pub max_rounds: u32,

    pub temperature: f32,

    /// Send a screenshot with every user message. Default: true
    pub vision: bool,

    /// Paint index overlays before the screenshot. Default: true
    pub highlight: bool,

    /// Pixels around the viewport still considered visible; negative disables the check.
    pub viewport_expansion: i32,

    /// Timeout of one completion request in seconds. Default: 120
    pub request_timeout_secs: u64,

    /// Log prompt and reply bodies at debug level.
    pub log_prompts: bool,

    /// Characters kept by `extract_content`. Default: 20000
    pub extract_char_limit: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model_id: "gpt-4o".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            max_rounds: 10,
            temperature: 0.0,
            vision: true,
            highlight: true,
            viewport_expansion: 0,
            request_timeout_secs: 120,
            log_prompts: false,
            extract_char_limit: 20_000,
        }
    }
}

impl fmt::Debug for AgentSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let api_key = if self.api_key.is_empty() {
            "<unset>"
        } else {
            "<redacted>"
        };
        f.debug_struct("AgentSettings")
            .field("api_key", &api_key)
            .field("model_id", &self.model_id)
            .field("base_url", &self.base_url)
            .field("max_rounds", &self.max_rounds)
            .field("temperature", &self.temperature)
            .field("vision", &self.vision)
            .field("highlight", &self.highlight)
            .field("viewport_expansion", &self.viewport_expansion)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("log_prompts", &self.log_prompts)
            .field("extract_char_limit", &self.extract_char_limit)
            .finish()
    }
}

impl AgentSettings {
    /// Checks what every invocation needs; the API key is checked by the client.
    pub fn validate(&self) -> Result<(), AgentError> {
        if self.max_rounds == 0 {
            return Err(AgentError::config("max_rounds must be at least 1"));
        }
        if self.model_id.trim().is_empty() {
            return Err(AgentError::config("model_id must not be empty"));
        }
        if self.base_url.trim().is_empty() {
            return Err(AgentError::config("base_url must not be empty"));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(AgentError::config(format!(
                "temperature {} is outside 0.0..=2.0",
                self.temperature
            )));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn capture_options(&self) -> CaptureOptions {
        CaptureOptions {
            do_highlight: self.highlight,
            focus_index: None,
            viewport_expansion: self.viewport_expansion,
        }
    }

    /// Builder: set the round budget.
    pub fn max_rounds(mut self, rounds: u32) -> Self {
        self.max_rounds = rounds;
        self
    }

    /// Builder: set vision mode.
    pub fn vision(mut self, enabled: bool) -> Self {
        self.vision = enabled;
        self
    }
}

/// Read-only access to persisted settings.
pub trait SettingsSource: Send + Sync {
    fn settings(&self) -> Result<AgentSettings, AgentError>;
}

impl SettingsSource for AgentSettings {
    fn settings(&self) -> Result<AgentSettings, AgentError> {
        Ok(self.clone())
    }
}
