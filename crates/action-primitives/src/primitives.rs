//! In-page action primitives
//!
//! Each primitive runs against a [`PageContext`] on the page side of the
//! channel:
//! 1. click - click an indexed element
//! 2. type_text - fill an input, textarea or contenteditable
//! 3. scroll - scroll the window or to a piece of text
//! 4. select - list or pick dropdown options
//! 5. extract - read the page text, send keys

mod click;
mod extract;
mod scroll;
mod select;
mod type_text;

pub use click::*;
pub use extract::*;
pub use scroll::*;
pub use select::*;
pub use type_text::*;

use std::collections::BTreeMap;
use std::time::Duration;

use tabpilot_core_types::ActionResult;
use tracing::debug;

use crate::{
    errors::ActionError,
    page::PageContext,
    schema::Action,
    types::{ElementBox, ElementTarget},
};

/// Tunables for in-page primitives.
#[derive(Clone, Debug)]
pub struct PrimitiveConfig {
    /// Wait after a smooth scroll before acting on the target.
    pub scroll_settle: Duration,
    /// Maximum characters returned by `extract_content`.
    pub extract_char_limit: usize,
}

impl Default for PrimitiveConfig {
    fn default() -> Self {
        Self {
            scroll_settle: Duration::from_millis(350),
            extract_char_limit: 20_000,
        }
    }
}

/// Runs one in-page action. Tab-level kinds are rejected.
pub async fn run_page_action(
    page: &dyn PageContext,
    action: &Action,
    locators: &BTreeMap<u32, String>,
    cfg: &PrimitiveConfig,
) -> Result<ActionResult, ActionError> {
    match action {
        Action::ClickElement(p) => {
            let target = ElementTarget::for_index(p.index, p.xpath.as_deref(), locators);
            execute_click(page, p.index, &target, cfg).await
        }
        Action::InputText(p) => {
            let target = ElementTarget::for_index(p.index, p.xpath.as_deref(), locators);
            execute_type_text(page, p.index, &target, &p.text, cfg).await
        }
        Action::Scroll(p) => execute_scroll(page, p.amount).await,
        Action::ScrollToText(p) => execute_scroll_to_text(page, &p.text, cfg).await,
        Action::SendKeys(p) => execute_send_keys(page, &p.keys).await,
        Action::ExtractContent(p) => execute_extract(page, p.goal.as_deref(), cfg).await,
        Action::GetDropdownOptions(p) => {
            let target = ElementTarget::for_index(p.index, None, locators);
            execute_dropdown_options(page, p.index, &target, cfg).await
        }
        Action::SelectDropdownOption(p) => {
            let target = ElementTarget::for_index(p.index, None, locators);
            execute_select(page, p.index, &target, &p.text, cfg).await
        }
        other => Err(ActionError::Internal(format!(
            "'{}' is not an in-page action",
            other.kind().wire_name()
        ))),
    }
}

/// Resolves the target and brings it fully into the viewport.
pub(crate) async fn prepare_target(
    page: &dyn PageContext,
    target: &ElementTarget,
    cfg: &PrimitiveConfig,
) -> Result<ElementBox, ActionError> {
    let element = page
        .locate(target)
        .await?
        .ok_or(ActionError::ElementNotFound)?;

    if !element.in_viewport() {
        debug!(target = ?target, "target outside viewport, scrolling into view");
        page.scroll_into_view(target).await?;
        tokio::time::sleep(cfg.scroll_settle).await;
    }
    Ok(element)
}
