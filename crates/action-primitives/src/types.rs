//! Core types for in-page targeting.

use std::collections::BTreeMap;

use perceiver_structural::{Rect, Viewport};
use serde::{Deserialize, Serialize};

/// Elements considered interactive by the positional fallback lookup.
pub const FALLBACK_SELECTOR: &str = "a, button, input, select, textarea, [role=\"button\"], \
[role=\"link\"], [onclick], [tabindex]:not([tabindex=\"-1\"])";

/// How an in-page operation finds its element.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementTarget {
    /// Locator from the capture (or given explicitly by the model).
    Xpath(String),
    /// Position in `document.querySelectorAll(FALLBACK_SELECTOR)`.
    Fallback(usize),
}

impl ElementTarget {
    /// Explicit xpath wins, then the locator map, then the positional fallback.
    pub fn for_index(index: u32, explicit: Option<&str>, locators: &BTreeMap<u32, String>) -> Self {
        if let Some(xpath) = explicit.filter(|x| !x.trim().is_empty()) {
            return ElementTarget::Xpath(xpath.to_string());
        }
        match locators.get(&index) {
            Some(xpath) => ElementTarget::Xpath(xpath.clone()),
            None => ElementTarget::Fallback(index as usize),
        }
    }
}

/// Where a located element currently sits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElementBox {
    pub tag: String,
    pub rect: Rect,
    pub viewport: Viewport,
}

impl ElementBox {
    pub fn in_viewport(&self) -> bool {
        self.rect.within_viewport(&self.viewport)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropdownOption {
    pub index: usize,
    pub text: String,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_resolution_order() {
        let mut locators = BTreeMap::new();
        locators.insert(1, "html/body/button".to_string());

        assert_eq!(
            ElementTarget::for_index(1, Some("//a"), &locators),
            ElementTarget::Xpath("//a".into())
        );
        assert_eq!(
            ElementTarget::for_index(1, None, &locators),
            ElementTarget::Xpath("html/body/button".into())
        );
        assert_eq!(
            ElementTarget::for_index(5, None, &locators),
            ElementTarget::Fallback(5)
        );
    }

    #[test]
    fn element_box_viewport_check() {
        let viewport = Viewport {
            width: 800.0,
            height: 600.0,
            ..Default::default()
        };
        let inside = ElementBox {
            tag: "button".into(),
            rect: Rect::new(10.0, 10.0, 50.0, 20.0),
            viewport,
        };
        let partial = ElementBox {
            rect: Rect::new(10.0, 590.0, 50.0, 20.0),
            ..inside.clone()
        };
        assert!(inside.in_viewport());
        assert!(!partial.in_viewport());
    }
}
