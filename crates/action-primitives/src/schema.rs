//! The closed action vocabulary.
//!
//! Every action travels as a JSON object with exactly one key, the wire name of
//! its kind, whose value holds that kind's parameters:
//! `{"click_element": {"index": 3}}`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Where an action is carried out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionScope {
    /// Browser/tab management, no page context needed.
    Tab,
    /// Runs inside the active page through the page-context channel.
    Page,
    /// No side effects.
    Local,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    GoToUrl,
    SearchGoogle,
    ClickElement,
    InputText,
    Scroll,
    ScrollToText,
    SendKeys,
    ExtractContent,
    SwitchTab,
    OpenTab,
    GetDropdownOptions,
    SelectDropdownOption,
    Done,
    NoOp,
}

impl ActionKind {
    pub const ALL: [ActionKind; 14] = [
        ActionKind::GoToUrl,
        ActionKind::SearchGoogle,
        ActionKind::ClickElement,
        ActionKind::InputText,
        ActionKind::Scroll,
        ActionKind::ScrollToText,
        ActionKind::SendKeys,
        ActionKind::ExtractContent,
        ActionKind::SwitchTab,
        ActionKind::OpenTab,
        ActionKind::GetDropdownOptions,
        ActionKind::SelectDropdownOption,
        ActionKind::Done,
        ActionKind::NoOp,
    ];

    pub fn wire_name(self) -> &'static str {
        match self {
            ActionKind::GoToUrl => "go_to_url",
            ActionKind::SearchGoogle => "search_google",
            ActionKind::ClickElement => "click_element",
            ActionKind::InputText => "input_text",
            ActionKind::Scroll => "scroll",
            ActionKind::ScrollToText => "scroll_to_text",
            ActionKind::SendKeys => "send_keys",
            ActionKind::ExtractContent => "extract_content",
            ActionKind::SwitchTab => "switch_tab",
            ActionKind::OpenTab => "open_tab",
            ActionKind::GetDropdownOptions => "get_dropdown_options",
            ActionKind::SelectDropdownOption => "select_dropdown_option",
            ActionKind::Done => "done",
            ActionKind::NoOp => "no_op",
        }
    }

    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.wire_name() == name)
    }

    pub fn scope(self) -> ActionScope {
        match self {
            ActionKind::GoToUrl
            | ActionKind::SearchGoogle
            | ActionKind::SwitchTab
            | ActionKind::OpenTab
            | ActionKind::Done => ActionScope::Tab,
            ActionKind::NoOp => ActionScope::Local,
            _ => ActionScope::Page,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ActionKind::GoToUrl => "Navigate the current tab to a URL",
            ActionKind::SearchGoogle => "Search Google in the current tab",
            ActionKind::ClickElement => "Click the element with the given index",
            ActionKind::InputText => "Type text into the input element with the given index",
            ActionKind::Scroll => {
                "Scroll the page by amount pixels (negative scrolls up); omit amount to scroll one page down"
            }
            ActionKind::ScrollToText => "Scroll until the given text is visible",
            ActionKind::SendKeys => {
                "Send a key or chord to the focused element, e.g. Enter, Escape, Control+a"
            }
            ActionKind::ExtractContent => "Extract the visible text content of the page",
            ActionKind::SwitchTab => "Switch to the tab with the given id",
            ActionKind::OpenTab => "Open a URL in a new tab",
            ActionKind::GetDropdownOptions => "List the options of the dropdown with the given index",
            ActionKind::SelectDropdownOption => {
                "Select the option with the given visible text in the dropdown with the given index"
            }
            ActionKind::Done => "Finish the task and report the result text",
            ActionKind::NoOp => "Do nothing this step",
        }
    }

    pub fn example(self) -> &'static str {
        match self {
            ActionKind::GoToUrl => r#"{"go_to_url": {"url": "https://example.com"}}"#,
            ActionKind::SearchGoogle => r#"{"search_google": {"query": "rust async book"}}"#,
            ActionKind::ClickElement => r#"{"click_element": {"index": 12}}"#,
            ActionKind::InputText => r#"{"input_text": {"index": 4, "text": "hello"}}"#,
            ActionKind::Scroll => r#"{"scroll": {"amount": 600}}"#,
            ActionKind::ScrollToText => r#"{"scroll_to_text": {"text": "Pricing"}}"#,
            ActionKind::SendKeys => r#"{"send_keys": {"keys": "Enter"}}"#,
            ActionKind::ExtractContent => r#"{"extract_content": {"goal": "product prices"}}"#,
            ActionKind::SwitchTab => r#"{"switch_tab": {"tab_id": 2}}"#,
            ActionKind::OpenTab => r#"{"open_tab": {"url": "https://example.com"}}"#,
            ActionKind::GetDropdownOptions => r#"{"get_dropdown_options": {"index": 7}}"#,
            ActionKind::SelectDropdownOption => {
                r#"{"select_dropdown_option": {"index": 7, "text": "Germany"}}"#
            }
            ActionKind::Done => r#"{"done": {"text": "The cheapest flight costs $120"}}"#,
            ActionKind::NoOp => r#"{"no_op": {}}"#,
        }
    }
}

/// Decoded parameter record of one action kind.
pub trait ActionParams: DeserializeOwned + Serialize {
    /// Semantic checks beyond the shape serde enforces.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

fn non_empty(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("'{field}' must not be empty"))
    } else {
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GoToUrlParams {
    pub url: String,
}

impl ActionParams for GoToUrlParams {
    fn validate(&self) -> Result<(), String> {
        non_empty("url", &self.url)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchGoogleParams {
    pub query: String,
}

impl ActionParams for SearchGoogleParams {
    fn validate(&self) -> Result<(), String> {
        non_empty("query", &self.query)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClickElementParams {
    pub index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xpath: Option<String>,
}

impl ActionParams for ClickElementParams {}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputTextParams {
    pub index: u32,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xpath: Option<String>,
}

impl ActionParams for InputTextParams {}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScrollParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
}

impl ActionParams for ScrollParams {}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScrollToTextParams {
    pub text: String,
}

impl ActionParams for ScrollToTextParams {
    fn validate(&self) -> Result<(), String> {
        non_empty("text", &self.text)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendKeysParams {
    pub keys: String,
}

impl ActionParams for SendKeysParams {
    fn validate(&self) -> Result<(), String> {
        non_empty("keys", &self.keys)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractContentParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
}

impl ActionParams for ExtractContentParams {}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SwitchTabParams {
    pub tab_id: u32,
}

impl ActionParams for SwitchTabParams {}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpenTabParams {
    pub url: String,
}

impl ActionParams for OpenTabParams {
    fn validate(&self) -> Result<(), String> {
        non_empty("url", &self.url)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GetDropdownOptionsParams {
    pub index: u32,
}

impl ActionParams for GetDropdownOptionsParams {}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectDropdownOptionParams {
    pub index: u32,
    pub text: String,
}

impl ActionParams for SelectDropdownOptionParams {
    fn validate(&self) -> Result<(), String> {
        non_empty("text", &self.text)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DoneParams {
    pub text: String,
}

impl ActionParams for DoneParams {}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoOpParams {}

impl ActionParams for NoOpParams {}

/// One validated action. Serializes back to the single-key wire format.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    GoToUrl(GoToUrlParams),
    SearchGoogle(SearchGoogleParams),
    ClickElement(ClickElementParams),
    InputText(InputTextParams),
    Scroll(ScrollParams),
    ScrollToText(ScrollToTextParams),
    SendKeys(SendKeysParams),
    ExtractContent(ExtractContentParams),
    SwitchTab(SwitchTabParams),
    OpenTab(OpenTabParams),
    GetDropdownOptions(GetDropdownOptionsParams),
    SelectDropdownOption(SelectDropdownOptionParams),
    Done(DoneParams),
    NoOp(NoOpParams),
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::GoToUrl(_) => ActionKind::GoToUrl,
            Action::SearchGoogle(_) => ActionKind::SearchGoogle,
            Action::ClickElement(_) => ActionKind::ClickElement,
            Action::InputText(_) => ActionKind::InputText,
            Action::Scroll(_) => ActionKind::Scroll,
            Action::ScrollToText(_) => ActionKind::ScrollToText,
            Action::SendKeys(_) => ActionKind::SendKeys,
            Action::ExtractContent(_) => ActionKind::ExtractContent,
            Action::SwitchTab(_) => ActionKind::SwitchTab,
            Action::OpenTab(_) => ActionKind::OpenTab,
            Action::GetDropdownOptions(_) => ActionKind::GetDropdownOptions,
            Action::SelectDropdownOption(_) => ActionKind::SelectDropdownOption,
            Action::Done(_) => ActionKind::Done,
            Action::NoOp(_) => ActionKind::NoOp,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Action::Done(_))
    }

    /// Element index the action targets, if any.
    pub fn target_index(&self) -> Option<u32> {
        match self {
            Action::ClickElement(p) => Some(p.index),
            Action::InputText(p) => Some(p.index),
            Action::GetDropdownOptions(p) => Some(p.index),
            Action::SelectDropdownOption(p) => Some(p.index),
            _ => None,
        }
    }

    pub fn to_wire(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{{\"{}\":{{}}}}", self.kind().wire_name()))
    }
}

/// Catalog entry consumed by prompt assembly.
#[derive(Clone, Copy, Debug)]
pub struct CatalogEntry {
    pub kind: ActionKind,
    pub name: &'static str,
    pub description: &'static str,
    pub example: &'static str,
}

pub fn action_catalog() -> impl Iterator<Item = CatalogEntry> {
    ActionKind::ALL.into_iter().map(|kind| CatalogEntry {
        kind,
        name: kind.wire_name(),
        description: kind.description(),
        example: kind.example(),
    })
}
