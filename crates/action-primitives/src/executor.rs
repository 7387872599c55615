//! Routes validated actions to the tab surface or the active page.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use tabpilot_core_types::{ActionResult, TabId};
use tracing::{debug, info};

use crate::errors::ActionError;
use crate::schema::{Action, ActionScope};
use crate::tabs::TabControl;

/// Executes one action at a time and never fails: errors become failed results.
#[derive(Clone)]
pub struct ActionExecutor {
    tabs: Arc<dyn TabControl>,
}

impl ActionExecutor {
    pub fn new(tabs: Arc<dyn TabControl>) -> Self {
        Self { tabs }
    }

    pub fn tabs(&self) -> &Arc<dyn TabControl> {
        &self.tabs
    }

    pub async fn execute(
        &self,
        action: &Action,
        locators: &BTreeMap<u32, String>,
    ) -> ActionResult {
        let start = Instant::now();
        let kind = action.kind();
        info!(action = kind.wire_name(), index = ?action.target_index(), "executing action");

        let result = match self.dispatch(action, locators).await {
            Ok(result) => result,
            Err(err) => ActionResult::failure(err.to_string()),
        };

        debug!(
            action = kind.wire_name(),
            success = result.success,
            latency_ms = start.elapsed().as_millis() as u64,
            "action finished"
        );
        result
    }

    async fn dispatch(
        &self,
        action: &Action,
        locators: &BTreeMap<u32, String>,
    ) -> Result<ActionResult, ActionError> {
        match action.kind().scope() {
            ActionScope::Local => Ok(ActionResult::neutral()),
            ActionScope::Tab => self.run_tab_action(action).await,
            ActionScope::Page => {
                let channel = self.tabs.active_channel().await?;
                Ok(channel.execute_action(action.clone(), locators.clone()).await?)
            }
        }
    }

    async fn run_tab_action(&self, action: &Action) -> Result<ActionResult, ActionError> {
        match action {
            Action::Done(p) => Ok(ActionResult::ok(p.text.clone())),
            Action::GoToUrl(p) => {
                self.tabs.navigate(&p.url).await?;
                Ok(ActionResult::ok(format!("Navigated to {}", p.url)))
            }
            Action::SearchGoogle(p) => {
                self.tabs.search(&p.query).await?;
                Ok(ActionResult::ok(format!("Searched for '{}' in Google", p.query)))
            }
            Action::SwitchTab(p) => {
                let tab = self.tabs.switch_tab(TabId(p.tab_id)).await?;
                Ok(ActionResult::ok(format!("Switched to tab {} ({})", tab.id, tab.url)))
            }
            Action::OpenTab(p) => {
                let tab = self.tabs.open_tab(&p.url).await?;
                Ok(ActionResult::ok(format!("Opened new tab {} with {}", tab.id, tab.url)))
            }
            other => Err(ActionError::Internal(format!(
                "'{}' is not a tab action",
                other.kind().wire_name()
            ))),
        }
    }
}
