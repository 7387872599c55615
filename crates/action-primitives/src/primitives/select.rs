//! Select primitives - List and pick dropdown options

use crate::{
    errors::ActionError,
    page::PageContext,
    primitives::{prepare_target, PrimitiveConfig},
    types::ElementTarget,
};
use tabpilot_core_types::ActionResult;
use tracing::{debug, info};

pub async fn execute_dropdown_options(
    page: &dyn PageContext,
    index: u32,
    target: &ElementTarget,
    cfg: &PrimitiveConfig,
) -> Result<ActionResult, ActionError> {
    info!(index, target = ?target, "Executing dropdown_options primitive");

    prepare_target(page, target, cfg).await?;
    let options = page.dropdown_options(target).await?;
    debug!(count = options.len(), "dropdown options read");

    if options.is_empty() {
        return Ok(ActionResult::ok(format!(
            "Dropdown with index {index} has no options"
        )));
    }
    let mut lines: Vec<String> = options
        .iter()
        .map(|option| format!("{}: text={:?} value={:?}", option.index, option.text, option.value))
        .collect();
    lines.push("Use the exact text in select_dropdown_option".to_string());
    Ok(ActionResult::ok(lines.join("\n")))
}

pub async fn execute_select(
    page: &dyn PageContext,
    index: u32,
    target: &ElementTarget,
    text: &str,
    cfg: &PrimitiveConfig,
) -> Result<ActionResult, ActionError> {
    info!(index, target = ?target, item = %text, "Executing select primitive");

    prepare_target(page, target, cfg).await?;
    let value = page.select_option(target, text).await?;

    Ok(ActionResult::ok(format!(
        "Selected option '{text}' with value '{value}' in dropdown {index}"
    )))
}
