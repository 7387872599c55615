//! Prompt templates for the agent loop.
//!
//! The system message is fixed per process (instructions plus the action
//! catalog); the user message is rebuilt every round from the captured state.

use std::fmt::Write;

use action_primitives::action_catalog;

use crate::types::{BrowserState, HistoryEntry};

/// Instructions preceding the action catalog in the system message.
pub const SYSTEM_INSTRUCTIONS: &str = r#"You are a browser automation agent. You accomplish the user's goal by choosing actions against the current page, one round at a time.

## Input
Each round you receive:
1. The goal.
2. The current URL, title, open tabs and scroll position.
3. The interactive elements of the page, one per line:
   [12]<button type="submit">Search</button>
   Only elements with a number in brackets can be targeted; use that number as `index`.
   Lines starting with [] are plain text for context.
4. The results of the actions you chose in the previous round.
5. A screenshot with the same numbers drawn on the elements, when available.

## Response format
Respond with a single JSON object and nothing else:
{
  "current_state": {
    "page_summary": "what the page shows that matters for the goal",
    "evaluation_previous_goal": "Success|Failed|Unknown - short reason",
    "memory": "facts to carry into the next round",
    "next_goal": "what the actions below should achieve"
  },
  "action": [ {"<action_name>": {<parameters>}} ]
}

## Rules
- Every action object has exactly one key: the action name.
- Actions run in order. Indices refer to the elements listed this round only; after a navigation or a page change, wait for the next round before using new indices.
- Use go_to_url for known addresses and search_google for queries. Never type a URL into a search box.
- If an element is missing, scroll or extract the page content before giving up.
- Use done as the last action once the goal is met, or when it cannot be met, with the answer or the reason in `text`.
"#;

/// Fixed instructions followed by every action's description and example.
pub fn system_prompt() -> String {
    let mut prompt = String::from(SYSTEM_INSTRUCTIONS);
    prompt.push_str("\n## Available actions\n");
    for entry in action_catalog() {
        let _ = writeln!(
            prompt,
            "- {}: {}\n  Example: {}",
            entry.name, entry.description, entry.example
        );
    }
    prompt
}

/// Goal, serialized page state, previous results and carried memory.
pub fn user_message(
    goal: &str,
    state: &BrowserState,
    previous: &[HistoryEntry],
    memory: Option<&str>,
) -> String {
    let mut message = String::new();
    let _ = writeln!(message, "Goal: {goal}");
    let _ = writeln!(message);

    if !previous.is_empty() {
        let _ = writeln!(message, "Previous action results:");
        for entry in previous {
            let _ = writeln!(message, "- {}", entry.feedback_line());
        }
        let _ = writeln!(message);
    }

    if let Some(memory) = memory.filter(|memory| !memory.trim().is_empty()) {
        let _ = writeln!(message, "Memory: {memory}");
        let _ = writeln!(message);
    }

    let _ = writeln!(message, "Current URL: {}", state.page.url);
    let _ = writeln!(message, "Title: {}", state.page.title);
    if !state.tabs.is_empty() {
        let _ = writeln!(message, "Open tabs:");
        for tab in &state.tabs {
            let marker = if tab.active { " (active)" } else { "" };
            let _ = writeln!(message, "- [{}] {} {}{marker}", tab.id, tab.title, tab.url);
        }
    }
    let _ = writeln!(message);

    let _ = writeln!(message, "Interactive elements:");
    if state.scroll.pixels_above > 0 {
        let _ = writeln!(
            message,
            "... {} pixels above - scroll up to see more ...",
            state.scroll.pixels_above
        );
    } else {
        let _ = writeln!(message, "[Start of page]");
    }
    if state.page.clickable_elements.trim().is_empty() {
        let _ = writeln!(message, "(no interactive elements found)");
    } else {
        let _ = writeln!(message, "{}", state.page.clickable_elements);
    }
    if state.scroll.pixels_below > 0 {
        let _ = write!(
            message,
            "... {} pixels below - scroll down to see more ...",
            state.scroll.pixels_below
        );
    } else {
        let _ = write!(message, "[End of page]");
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabpilot_core_types::{ActionResult, PageData, ScrollInfo, TabId, TabInfo};

    fn state() -> BrowserState {
        BrowserState {
            page: PageData {
                title: "Shop".into(),
                url: "https://shop.test/".into(),
                clickable_elements: "[0]<button>Buy</button>".into(),
                xpaths: Default::default(),
            },
            scroll: ScrollInfo {
                pixels_above: 0,
                pixels_below: 800,
            },
            tabs: vec![TabInfo {
                id: TabId(0),
                url: "https://shop.test/".into(),
                title: "Shop".into(),
                active: true,
            }],
            screenshot: None,
        }
    }

    #[test]
    fn system_prompt_lists_every_action() {
        let prompt = system_prompt();
        for entry in action_catalog() {
            assert!(prompt.contains(&format!("- {}:", entry.name)), "{}", entry.name);
        }
    }

    #[test]
    fn user_message_tags_previous_results() {
        let click = r#"{"click_element":{"index":0}}"#;
        let previous = vec![
            HistoryEntry::new(1, Some(click.into()), ActionResult::ok("Clicked")),
            HistoryEntry::new(1, Some(r#"{"scroll":{}}"#.into()), ActionResult::failure("boom")),
        ];
        let message = user_message("buy it", &state(), &previous, Some("cart has 1 item"));

        assert!(message.starts_with("Goal: buy it\n"));
        assert!(message.contains(r#"- {"click_element":{"index":0}} -> success: Clicked"#));
        assert!(message.contains(r#"- {"scroll":{}} -> error: boom"#));
        assert!(message.contains("Memory: cart has 1 item"));
        assert!(message.contains("- [0] Shop https://shop.test/ (active)"));
        assert!(message.contains("[Start of page]\n[0]<button>Buy</button>\n"));
        assert!(message.ends_with("... 800 pixels below - scroll down to see more ..."));
    }

    #[test]
    fn first_round_has_no_feedback_section() {
        let message = user_message("g", &state(), &[], None);
        assert!(!message.contains("Previous action results"));
        assert!(!message.contains("Memory:"));
    }
}
