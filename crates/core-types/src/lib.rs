use std::collections::BTreeMap;
use std::fmt;

use uuid::Uuid;

/// Identifier of one agent invocation, used to correlate log records.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct InvocationId(pub String);

impl InvocationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for InvocationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InvocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Browser tab identifier as exposed to the model (small, stable integers).
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(transparent))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct TabId(pub u32);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Uniform outcome of one executed action.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActionResult {
    pub success: bool,
    #[cfg_attr(
        feature = "serde-full",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub message: Option<String>,
    #[cfg_attr(
        feature = "serde-full",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub error: Option<String>,
}

impl ActionResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
        }
    }

    /// Success without a message.
    pub fn neutral() -> Self {
        Self {
            success: true,
            message: None,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
        }
    }

    /// Text shown back to the model for this result.
    pub fn summary(&self) -> &str {
        if self.success {
            self.message.as_deref().unwrap_or("ok")
        } else {
            self.error.as_deref().unwrap_or("unknown error")
        }
    }
}

/// One open browser tab.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TabInfo {
    pub id: TabId,
    pub url: String,
    pub title: String,
    pub active: bool,
}

/// Scroll offsets of the page relative to the viewport.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(rename_all = "camelCase"))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScrollInfo {
    pub pixels_above: u32,
    pub pixels_below: u32,
}

/// Result of one page capture: the serialized clickable elements plus the
/// locator map valid for exactly that capture.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(rename_all = "camelCase"))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageData {
    pub title: String,
    pub url: String,
    pub clickable_elements: String,
    pub xpaths: BTreeMap<u32, String>,
}

impl PageData {
    pub fn element_count(&self) -> usize {
        self.xpaths.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_prefers_message_or_error() {
        assert_eq!(ActionResult::ok("clicked").summary(), "clicked");
        assert_eq!(ActionResult::neutral().summary(), "ok");
        assert_eq!(ActionResult::failure("boom").summary(), "boom");
        assert!(!ActionResult::failure("boom").success);
    }

    #[test]
    fn invocation_ids_are_unique() {
        assert_ne!(InvocationId::new(), InvocationId::new());
    }

    #[cfg(feature = "serde-full")]
    #[test]
    fn page_data_uses_camel_case_keys() {
        let mut data = PageData::default();
        data.xpaths.insert(0, "html/body/button".into());
        let value = serde_json::to_value(&data).unwrap();
        assert!(value.get("clickableElements").is_some());
        assert_eq!(value["xpaths"]["0"], "html/body/button");
    }
}
