//! Page text extraction and keyboard input

use crate::{errors::ActionError, page::PageContext, primitives::PrimitiveConfig};
use tabpilot_core_types::ActionResult;
use tracing::info;

pub async fn execute_extract(
    page: &dyn PageContext,
    goal: Option<&str>,
    cfg: &PrimitiveConfig,
) -> Result<ActionResult, ActionError> {
    info!(goal = ?goal, "Executing extract primitive");
    let text = page.extract_text().await?;
    let text = truncate_chars(text.trim(), cfg.extract_char_limit);

    let header = match goal {
        Some(goal) if !goal.trim().is_empty() => format!("Extracted page content for '{goal}':"),
        _ => "Extracted page content:".to_string(),
    };
    Ok(ActionResult::ok(format!("{header}\n{text}")))
}

pub async fn execute_send_keys(
    page: &dyn PageContext,
    keys: &str,
) -> Result<ActionResult, ActionError> {
    info!(keys, "Executing send_keys primitive");
    page.send_keys(keys).await?;
    Ok(ActionResult::ok(format!("Sent keys: {keys}")))
}

pub(crate) fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{} [truncated]", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::truncate_chars;

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé [truncated]");
        assert_eq!(truncate_chars("short", 10), "short");
    }
}
