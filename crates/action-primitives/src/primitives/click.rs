//! Click primitive - Click an indexed element

use crate::{
    errors::ActionError,
    page::PageContext,
    primitives::{prepare_target, PrimitiveConfig},
    types::ElementTarget,
};
use std::time::Instant;
use tabpilot_core_types::ActionResult;
use tracing::{debug, info};

/// Execute click primitive
///
/// Steps:
/// 1. Resolve the target (xpath or positional fallback)
/// 2. Scroll it into view when it is not fully visible
/// 3. Dispatch the click
pub async fn execute_click(
    page: &dyn PageContext,
    index: u32,
    target: &ElementTarget,
    cfg: &PrimitiveConfig,
) -> Result<ActionResult, ActionError> {
    let start_instant = Instant::now();
    info!(index, target = ?target, "Executing click primitive");

    let element = prepare_target(page, target, cfg).await?;
    debug!(tag = %element.tag, "click target resolved");

    page.click(target).await?;

    info!(
        index,
        latency_ms = start_instant.elapsed().as_millis() as u64,
        "Click completed successfully"
    );
    Ok(ActionResult::ok(format!(
        "Clicked element with index {index} (<{}>)",
        element.tag
    )))
}
