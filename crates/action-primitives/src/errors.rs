//! Error types for action primitives

use cdp_adapter::AdapterError;
use perceiver_structural::PerceiverError;
use tabpilot_core_types::TabId;
use thiserror::Error;

/// Failures of an in-page or tab-level operation. Converted to a failed
/// `ActionResult` at the executor boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// Neither the locator xpath nor the fallback list produced an element
    #[error("Element not found")]
    ElementNotFound,

    /// Target exists but cannot take the requested input
    #[error("Element not interactable: {0}")]
    NotInteractable(String),

    /// Dropdown option was not found
    #[error("Option not found in dropdown: {0}")]
    OptionNotFound(String),

    /// Text to scroll to does not occur on the page
    #[error("Text not found on page: {0}")]
    TextNotFound(String),

    /// Parameters were decoded but cannot be carried out
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// Tab management failure
    #[error("Tab error: {0}")]
    Tab(String),

    /// Page-context channel failure
    #[error("Page channel error: {0}")]
    Channel(String),

    /// CDP communication or script evaluation error
    #[error("CDP I/O error: {0}")]
    CdpIo(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AdapterError> for ActionError {
    fn from(err: AdapterError) -> Self {
        ActionError::CdpIo(err.to_string())
    }
}

impl From<PerceiverError> for ActionError {
    fn from(err: PerceiverError) -> Self {
        ActionError::CdpIo(err.to_string())
    }
}

/// Page-context channel failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The page side is gone (queue closed or reply dropped)
    #[error("page context unreachable")]
    Unreachable,

    #[error("page context did not answer within {0} ms")]
    Timeout(u64),

    #[error("unexpected response to {0}")]
    UnexpectedResponse(&'static str),

    /// The page side answered with an error
    #[error("{0}")]
    Remote(String),
}

impl ChannelError {
    /// Unreachable or timed out; worth retrying the capture.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, ChannelError::Unreachable | ChannelError::Timeout(_))
    }

    /// Worth another capture attempt: unreachable, timed out, or a page-side
    /// failure such as an execution context torn down by a navigation.
    pub fn is_transient(&self) -> bool {
        self.is_unreachable() || matches!(self, ChannelError::Remote(_))
    }
}

impl From<ChannelError> for ActionError {
    fn from(err: ChannelError) -> Self {
        ActionError::Channel(err.to_string())
    }
}

/// Tab-management failures.
#[derive(Debug, Error, Clone)]
pub enum TabError {
    #[error("no active tab")]
    NoActiveTab,

    #[error("tab {0} does not exist")]
    UnknownTab(TabId),

    #[error("invalid url '{0}'")]
    InvalidUrl(String),

    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

impl From<TabError> for ActionError {
    fn from(err: TabError) -> Self {
        ActionError::Tab(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_not_found_message_is_stable() {
        assert_eq!(ActionError::ElementNotFound.to_string(), "Element not found");
    }

    #[test]
    fn channel_errors_classify_unreachable() {
        assert!(ChannelError::Unreachable.is_unreachable());
        assert!(ChannelError::Timeout(5).is_unreachable());
        assert!(!ChannelError::Remote("boom".into()).is_unreachable());
    }

    #[test]
    fn page_side_failures_are_transient() {
        assert!(ChannelError::Remote("Execution context was destroyed.".into()).is_transient());
        assert!(ChannelError::Timeout(5).is_transient());
        assert!(!ChannelError::UnexpectedResponse("get_page_data").is_transient());
    }
}
