//! Agent loop controller: COLLECTING -> PROMPTING -> EXECUTING, repeated in
//! bounded rounds until `done`, an empty batch, plain text, a fatal capture
//! failure or the end of the round budget.

use std::sync::Arc;
use std::time::Duration;

use action_primitives::{
    parse_raw_action, ActionExecutor, ChannelError, PageChannel, RawAction, TabControl,
};
use perceiver_structural::CaptureOptions;
use tabpilot_core_types::{ActionResult, PageData, ScrollInfo};
use tracing::{debug, info, warn, Instrument};

use crate::config::{AgentSettings, SettingsSource};
use crate::errors::AgentError;
use crate::llm::{ChatMessage, CompletionClient, CompletionRequest, MessageContent};
use crate::prompt::{system_prompt, user_message};
use crate::reply::parse_reply;
use crate::trace::TraceContext;
use crate::types::{AgentOutcome, BrowserState, LoopPhase, OutcomeStatus, RoundState};

/// Fixed-delay retry for page capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRetry {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for CaptureRetry {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay: Duration::from_millis(1000),
        }
    }
}

/// Drives one goal at a time against the active tab.
pub struct AgentLoop {
    settings: Arc<dyn SettingsSource>,
    client: Arc<dyn CompletionClient>,
    tabs: Arc<dyn TabControl>,
    executor: ActionExecutor,
    retry: CaptureRetry,
}

impl AgentLoop {
    pub fn new(
        settings: Arc<dyn SettingsSource>,
        client: Arc<dyn CompletionClient>,
        tabs: Arc<dyn TabControl>,
    ) -> Self {
        Self {
            settings,
            client,
            executor: ActionExecutor::new(Arc::clone(&tabs)),
            tabs,
            retry: CaptureRetry::default(),
        }
    }

    pub fn with_capture_retry(mut self, retry: CaptureRetry) -> Self {
        self.retry = retry;
        self
    }

    /// Runs the loop for `goal`. Only invalid settings are returned as an
    /// error; every other ending is an [`AgentOutcome`].
    pub async fn run(&self, goal: &str, trace: &TraceContext) -> Result<AgentOutcome, AgentError> {
        let settings = self.settings.settings()?;
        settings.validate()?;
        self.run_rounds(goal, &settings, trace)
            .instrument(trace.span.clone())
            .await
    }

    async fn run_rounds(
        &self,
        goal: &str,
        settings: &AgentSettings,
        trace: &TraceContext,
    ) -> Result<AgentOutcome, AgentError> {
        let system = system_prompt();
        let mut state = RoundState::new(settings.max_rounds);
        info!(budget = state.budget, model = %settings.model_id, "agent loop started");

        while state.has_budget() {
            let round = state.begin_round();

            let browser = match self.collect(settings).await {
                Ok(browser) => browser,
                Err(err) => {
                    warn!(round, error = %err, "capture failed, stopping");
                    state.phase = LoopPhase::Failed;
                    return Ok(finish(state, OutcomeStatus::CaptureFailed, err.to_string()));
                }
            };
            debug!(
                round,
                url = %browser.page.url,
                elements = browser.page.element_count(),
                "page captured"
            );

            state.phase = LoopPhase::Prompting;
            let request = self.build_request(settings, &system, goal, &browser, &state);
            if let Some(user) = request.messages.last() {
                trace.body(round, "prompt", &user.content.text());
            }

            let raw = match self.client.complete(&request).await {
                Ok(raw) => raw,
                Err(err) => {
                    warn!(round, error = %err, "completion failed, retrying next round");
                    state.record(None, ActionResult::failure(err.to_string()));
                    state.close_round();
                    continue;
                }
            };
            trace.body(round, "reply", &raw);

            state.phase = LoopPhase::Executing;
            let reply = match parse_reply(&raw) {
                Ok(reply) => reply,
                Err(err) => {
                    info!(round, reason = %err, "reply is not an action batch");
                    state.phase = LoopPhase::Done;
                    return Ok(finish(state, OutcomeStatus::PlainText, raw));
                }
            };

            let current = &reply.current_state;
            info!(
                round,
                evaluation = current.evaluation_previous_goal.as_deref().unwrap_or(""),
                next_goal = current.next_goal.as_deref().unwrap_or(""),
                actions = reply.actions.len(),
                "model replied"
            );
            if let Some(memory) = current.memory.clone() {
                state.memory = Some(memory);
            }

            if reply.actions.is_empty() {
                state.phase = LoopPhase::Done;
                return Ok(finish(
                    state,
                    OutcomeStatus::NoActions,
                    "Model returned no actions".to_string(),
                ));
            }

            for entry in reply.actions {
                if let Some(text) = self.run_entry(&mut state, entry, &browser).await {
                    info!(round, "done");
                    state.phase = LoopPhase::Done;
                    return Ok(finish(state, OutcomeStatus::Done, text));
                }
            }
            state.close_round();
        }

        warn!(budget = state.budget, "round budget exhausted");
        state.phase = LoopPhase::Failed;
        let message = AgentError::BudgetExhausted(state.budget).to_string();
        Ok(finish(state, OutcomeStatus::BudgetExhausted, message))
    }

    /// Parses and executes one batch entry; returns the completion text when it was `done`.
    async fn run_entry(
        &self,
        state: &mut RoundState,
        entry: RawAction,
        browser: &BrowserState,
    ) -> Option<String> {
        let wire = entry.to_json();
        let action = match parse_raw_action(entry) {
            Ok(action) => action,
            Err(err) => {
                info!(
                    round = state.round,
                    category = err.category(),
                    error = %err,
                    "rejected action"
                );
                state.record(Some(wire), ActionResult::failure(err.to_string()));
                return None;
            }
        };

        let result = self.executor.execute(&action, &browser.page.xpaths).await;
        let done = action.is_done() && result.success;
        let text = result.message.clone().unwrap_or_default();
        state.record(Some(action.to_wire()), result);
        done.then_some(text)
    }

    fn build_request(
        &self,
        settings: &AgentSettings,
        system: &str,
        goal: &str,
        browser: &BrowserState,
        state: &RoundState,
    ) -> CompletionRequest {
        let text = user_message(goal, browser, &state.previous, state.memory.as_deref());
        let content = match browser.screenshot.as_deref() {
            Some(png) if settings.vision => MessageContent::with_screenshot(text, png),
            _ => MessageContent::Text(text),
        };
        CompletionRequest {
            model: settings.model_id.clone(),
            messages: vec![ChatMessage::system(system), ChatMessage::user(content)],
            temperature: settings.temperature,
        }
    }

    /// COLLECTING: capture with retry, screenshot, then overlay removal.
    async fn collect(&self, settings: &AgentSettings) -> Result<BrowserState, AgentError> {
        let options = settings.capture_options();
        let (channel, page) = self.capture_with_retry(&options).await?;

        let screenshot = if settings.vision {
            match self.tabs.screenshot().await {
                Ok(png) => Some(png),
                Err(err) => {
                    warn!(error = %err, "screenshot failed, continuing without it");
                    None
                }
            }
        } else {
            None
        };

        if options.do_highlight {
            if let Err(err) = channel.remove_highlights().await {
                warn!(error = %err, "could not remove highlights");
            }
        }

        let scroll = match channel.scroll_info().await {
            Ok(scroll) => scroll,
            Err(err) => {
                debug!(error = %err, "scroll info unavailable");
                ScrollInfo::default()
            }
        };
        let tabs = match self.tabs.list_tabs().await {
            Ok(tabs) => tabs,
            Err(err) => {
                debug!(error = %err, "tab list unavailable");
                Vec::new()
            }
        };

        Ok(BrowserState {
            page,
            scroll,
            tabs,
            screenshot,
        })
    }

    async fn capture_with_retry(
        &self,
        options: &CaptureOptions,
    ) -> Result<(PageChannel, PageData), AgentError> {
        let attempts = self.retry.attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            let channel = self
                .tabs
                .active_channel()
                .await
                .map_err(|err| AgentError::capture(err.to_string()))?;

            match capture_once(&channel, options).await {
                Ok(page) => return Ok((channel, page)),
                Err(err) if err.is_transient() => {
                    warn!(attempt, attempts, error = %err, "page capture failed, retrying");
                    last_error = err.to_string();
                    if attempt < attempts {
                        tokio::time::sleep(self.retry.delay).await;
                    }
                }
                Err(err) => return Err(AgentError::capture(err.to_string())),
            }
        }
        Err(AgentError::capture(format!(
            "{last_error} after {attempts} attempts"
        )))
    }
}

async fn capture_once(
    channel: &PageChannel,
    options: &CaptureOptions,
) -> Result<PageData, ChannelError> {
    // leftovers from an interrupted round
    if let Err(err) = channel.remove_highlights().await {
        if err.is_unreachable() {
            return Err(err);
        }
    }
    channel.get_page_data(options.clone()).await
}

fn finish(state: RoundState, status: OutcomeStatus, message: String) -> AgentOutcome {
    AgentOutcome {
        status,
        message,
        rounds: state.round,
        history: state.history,
    }
}
