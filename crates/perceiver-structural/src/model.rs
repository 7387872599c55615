use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Client rectangle in viewport coordinates (CSS pixels).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Whether the rect overlaps the viewport grown by `margin` on every side.
    pub fn intersects_viewport(&self, viewport: &Viewport, margin: f64) -> bool {
        self.x < viewport.width + margin
            && self.x + self.width > -margin
            && self.y < viewport.height + margin
            && self.y + self.height > -margin
    }

    /// Whether the rect lies fully inside the viewport.
    pub fn within_viewport(&self, viewport: &Viewport) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.x + self.width <= viewport.width
            && self.y + self.height <= viewport.height
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub scroll_x: f64,
    #[serde(default)]
    pub scroll_y: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    #[default]
    Element,
    Text,
}

/// Computed style fields the indexer cares about.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputedStyle {
    pub display: String,
    pub visibility: String,
    pub opacity: f64,
    pub cursor: String,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: "block".into(),
            visibility: "visible".into(),
            opacity: 1.0,
            cursor: "auto".into(),
        }
    }
}

/// Raw facts about one live node, recorded by a single page walk.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProbeNode {
    pub id: String,
    pub kind: NodeKind,
    pub tag: String,
    pub attrs: BTreeMap<String, String>,
    pub text: Option<String>,
    pub children: Vec<String>,
    pub style: ComputedStyle,
    pub rects: Vec<Rect>,
    /// Pointer handlers registered as properties or listeners.
    pub listeners: bool,
    pub shadow_root: bool,
    /// Id of the element hit-tested at this node's visual centre.
    pub hit: Option<String>,
}

impl ProbeNode {
    pub fn element(id: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: NodeKind::Element,
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn text(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: NodeKind::Text,
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn with_children<I, S>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.children = children.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn with_rect(mut self, rect: Rect) -> Self {
        self.rects.push(rect);
        self
    }

    pub fn with_style(mut self, style: ComputedStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_hit(mut self, hit: impl Into<String>) -> Self {
        self.hit = Some(hit.into());
        self
    }

    pub fn with_listeners(mut self) -> Self {
        self.listeners = true;
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }
}

/// Everything one probe collected: the node table plus the viewport it was taken in.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeSnapshot {
    pub root_id: String,
    pub viewport: Viewport,
    pub nodes: HashMap<String, ProbeNode>,
}

impl ProbeSnapshot {
    pub fn new(root_id: impl Into<String>, viewport: Viewport) -> Self {
        Self {
            root_id: root_id.into(),
            viewport,
            nodes: HashMap::new(),
        }
    }

    pub fn insert(&mut self, node: ProbeNode) {
        self.nodes.insert(node.id.clone(), node);
    }
}

/// One node of a capture, after the indexer has decided its flags.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNode {
    pub id: String,
    pub kind: NodeKind,
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    pub text: Option<String>,
    pub children: Vec<String>,
    pub is_visible: bool,
    pub is_interactive: bool,
    pub is_top_element: bool,
    pub shadow_root: bool,
    pub highlight_index: Option<u32>,
    pub rects: Vec<Rect>,
    pub viewport_offset: (f64, f64),
    pub xpath: String,
}

/// Options for one capture.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureOptions {
    pub do_highlight: bool,
    /// Paint only this index; ignored when negative.
    pub focus_index: Option<i64>,
    /// Pixels added around the viewport; negative disables the viewport check.
    pub viewport_expansion: i32,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            do_highlight: true,
            focus_index: None,
            viewport_expansion: 0,
        }
    }
}

impl CaptureOptions {
    pub fn viewport_check_enabled(&self) -> bool {
        self.viewport_expansion >= 0
    }
}

/// Overlay to paint for one indexed element.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HighlightBox {
    pub index: u32,
    pub tag: String,
    pub rects: Vec<Rect>,
}

/// Output of the indexer: a flat node map rooted at `root_id`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Capture {
    pub root_id: String,
    pub map: HashMap<String, RawNode>,
    pub highlights: Vec<HighlightBox>,
}

impl Capture {
    /// Highlight indices in ascending order.
    pub fn indices(&self) -> Vec<u32> {
        let mut indices: Vec<u32> = self
            .map
            .values()
            .filter_map(|node| node.highlight_index)
            .collect();
        indices.sort_unstable();
        indices
    }
}
