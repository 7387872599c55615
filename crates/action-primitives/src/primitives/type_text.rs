//! Type text primitive - Fill an input field

use crate::{
    errors::ActionError,
    page::PageContext,
    primitives::{prepare_target, PrimitiveConfig},
    types::ElementTarget,
};
use tabpilot_core_types::ActionResult;
use tracing::info;

pub async fn execute_type_text(
    page: &dyn PageContext,
    index: u32,
    target: &ElementTarget,
    text: &str,
    cfg: &PrimitiveConfig,
) -> Result<ActionResult, ActionError> {
    info!(
        index,
        target = ?target,
        text_len = text.chars().count(),
        "Executing type_text primitive"
    );

    prepare_target(page, target, cfg).await?;
    page.input_text(target, text).await?;

    Ok(ActionResult::ok(format!(
        "Input '{text}' into element with index {index}"
    )))
}
