//! Scroll primitives - Scroll the window or to a piece of text

use crate::{errors::ActionError, page::PageContext, primitives::PrimitiveConfig};
use tabpilot_core_types::ActionResult;
use tracing::info;

pub async fn execute_scroll(
    page: &dyn PageContext,
    amount: Option<i64>,
) -> Result<ActionResult, ActionError> {
    info!(amount = ?amount, "Executing scroll primitive");
    page.scroll_by(amount).await?;

    let message = match amount {
        None => "Scrolled down one page".to_string(),
        Some(pixels) if pixels < 0 => format!("Scrolled up by {} pixels", pixels.unsigned_abs()),
        Some(pixels) => format!("Scrolled down by {pixels} pixels"),
    };
    Ok(ActionResult::ok(message))
}

pub async fn execute_scroll_to_text(
    page: &dyn PageContext,
    text: &str,
    cfg: &PrimitiveConfig,
) -> Result<ActionResult, ActionError> {
    info!(text, "Executing scroll_to_text primitive");
    page.scroll_to_text(text).await?;
    tokio::time::sleep(cfg.scroll_settle).await;
    Ok(ActionResult::ok(format!("Scrolled to text: {text}")))
}
