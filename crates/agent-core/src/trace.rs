//! Per-invocation tracing context handed to the loop.

use tabpilot_core_types::InvocationId;
use tracing::{debug, info_span, Span};

/// Span every log line of one invocation is recorded under, plus whether
/// prompt and reply bodies may be logged.
#[derive(Debug, Clone)]
pub struct TraceContext {
    pub invocation: InvocationId,
    pub span: Span,
    pub log_prompts: bool,
}

impl TraceContext {
    pub fn new(goal: &str, log_prompts: bool) -> Self {
        let invocation = InvocationId::new();
        let span = info_span!("agent", invocation = %invocation, goal = %goal);
        Self {
            invocation,
            span,
            log_prompts,
        }
    }

    /// A context that records nothing.
    pub fn disabled() -> Self {
        Self {
            invocation: InvocationId::new(),
            span: Span::none(),
            log_prompts: false,
        }
    }

    /// Logs a prompt or reply body when enabled.
    pub fn body(&self, round: u32, kind: &'static str, body: &str) {
        if self.log_prompts {
            debug!(parent: &self.span, round, kind, body, "model exchange");
        }
    }
}
