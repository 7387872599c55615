//! Core data types for one agent invocation.

use serde::{Deserialize, Serialize};
use tabpilot_core_types::{ActionResult, PageData, ScrollInfo, TabInfo};

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopPhase {
    Collecting,
    Prompting,
    Executing,
    Done,
    Failed,
}

/// One recorded action outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Round number (1-indexed).
    pub round: u32,

    /// The action as sent by the model, or `None` for round-level failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    pub result: ActionResult,
}

impl HistoryEntry {
    pub fn new(round: u32, action: Option<String>, result: ActionResult) -> Self {
        Self {
            round,
            action,
            result,
        }
    }

    /// `success: ...` or `error: ...`, as shown to the model.
    pub fn feedback_line(&self) -> String {
        let label = self.action.as_deref().unwrap_or("round");
        if self.result.success {
            format!("{label} -> success: {}", self.result.summary())
        } else {
            format!("{label} -> error: {}", self.result.summary())
        }
    }
}

/// State owned by one in-flight invocation.
#[derive(Debug, Clone)]
pub struct RoundState {
    pub round: u32,
    pub budget: u32,
    pub phase: LoopPhase,
    pub history: Vec<HistoryEntry>,
    /// Results of the last finished round, fed back in the next prompt.
    pub previous: Vec<HistoryEntry>,
    /// `memory` from the latest parsed reply.
    pub memory: Option<String>,
}

impl RoundState {
    pub fn new(budget: u32) -> Self {
        Self {
            round: 0,
            budget,
            phase: LoopPhase::Collecting,
            history: Vec::new(),
            previous: Vec::new(),
            memory: None,
        }
    }

    pub fn has_budget(&self) -> bool {
        self.round < self.budget
    }

    /// Starts the next round at COLLECTING.
    pub fn begin_round(&mut self) -> u32 {
        self.round += 1;
        self.phase = LoopPhase::Collecting;
        self.round
    }

    pub fn record(&mut self, action: Option<String>, result: ActionResult) {
        self.history
            .push(HistoryEntry::new(self.round, action, result));
    }

    /// Makes the current round's entries the feedback for the next prompt.
    pub fn close_round(&mut self) {
        let round = self.round;
        self.previous = self
            .history
            .iter()
            .filter(|entry| entry.round == round)
            .cloned()
            .collect();
    }
}

/// Everything captured during COLLECTING.
#[derive(Debug, Clone)]
pub struct BrowserState {
    pub page: PageData,
    pub scroll: ScrollInfo,
    pub tabs: Vec<TabInfo>,
    /// Base64 PNG, present in vision mode.
    pub screenshot: Option<String>,
}

/// `current_state` block of a model reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrentState {
    pub page_summary: Option<String>,
    pub evaluation_previous_goal: Option<String>,
    pub memory: Option<String>,
    pub next_goal: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// A `done` action executed.
    Done,
    /// The model returned an empty batch.
    NoActions,
    /// The model reply was not an action batch; `message` holds it verbatim.
    PlainText,
    BudgetExhausted,
    CaptureFailed,
}

/// Final result of an invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentOutcome {
    pub status: OutcomeStatus,
    pub message: String,
    pub rounds: u32,
    pub history: Vec<HistoryEntry>,
}

impl AgentOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_round_keeps_only_the_latest_round() {
        let mut state = RoundState::new(3);
        state.begin_round();
        state.record(Some("a".into()), ActionResult::ok("one"));
        state.close_round();
        state.begin_round();
        state.record(Some("b".into()), ActionResult::failure("two"));
        state.close_round();

        assert_eq!(state.history.len(), 2);
        assert_eq!(state.previous.len(), 1);
        assert_eq!(state.previous[0].feedback_line(), "b -> error: two");
        assert!(state.has_budget());
        state.begin_round();
        assert!(!state.has_budget());
    }
}
