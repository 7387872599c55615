//! Text protocol the model reads.
//!
//! One line per indexed element (`[3]<a href="/x">Docs</a>`) and one line per
//! visible free-standing text node (`[]Welcome`), in document order.

use crate::tree::{DomTree, NodeData, NodeId};

/// Attributes rendered when present, in this order.
pub const DEFAULT_INCLUDE_ATTRIBUTES: &[&str] = &[
    "title",
    "type",
    "name",
    "role",
    "tabindex",
    "aria-label",
    "placeholder",
    "value",
    "alt",
    "aria-expanded",
    "href",
];

impl DomTree {
    pub fn serialize_clickable<S: AsRef<str>>(&self, include_attrs: &[S]) -> String {
        let mut lines: Vec<String> = Vec::new();
        for id in self.preorder() {
            match self.data(id) {
                NodeData::Element(element) => {
                    let Some(index) = element.highlight_index else {
                        continue;
                    };
                    if !(element.is_interactive && element.is_visible) {
                        continue;
                    }
                    let mut line = format!("[{index}]<{}", element.tag);
                    for name in include_attrs {
                        let name = name.as_ref();
                        if let Some(value) = element.attr(name).filter(|v| !v.is_empty()) {
                            line.push_str(&format!(" {name}=\"{}\"", value.replace('"', "&quot;")));
                        }
                    }
                    line.push('>');
                    line.push_str(&self.inner_text_until_highlight(id));
                    line.push_str(&format!("</{}>", element.tag));
                    lines.push(line);
                }
                NodeData::Text(text) => {
                    if text.is_visible && !self.has_highlighted_ancestor(id) {
                        let trimmed = text.text.trim();
                        if !trimmed.is_empty() {
                            lines.push(format!("[]{trimmed}"));
                        }
                    }
                }
            }
        }
        lines.join("\n")
    }

    /// Visible descendant text, trimmed and space-joined, collected depth-first
    /// and cut off at the first descendant element that has its own index.
    pub fn inner_text_until_highlight(&self, id: NodeId) -> String {
        let mut parts: Vec<&str> = Vec::new();
        for node in self.descendants(id) {
            match self.data(node) {
                NodeData::Element(element) => {
                    if element.highlight_index.is_some() {
                        break;
                    }
                }
                NodeData::Text(text) => {
                    let trimmed = text.text.trim();
                    if text.is_visible && !trimmed.is_empty() {
                        parts.push(trimmed);
                    }
                }
            }
        }
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use crate::tree::fixtures::*;
    use crate::tree::DomTree;

    const NO_ATTRS: &[&str] = &[];

    #[test]
    fn renders_indexed_elements_and_free_text() {
        let map = map(vec![
            element("r", "div", &["a", "b"]),
            indexed("a", "button", 0, &["ta"]),
            text("ta", "Go"),
            element("b", "span", &["tb"]),
            text("tb", "hi"),
        ]);
        let tree = DomTree::from_capture("r", &map).unwrap();
        assert_eq!(tree.serialize_clickable(NO_ATTRS), "[0]<button>Go</button>\n[]hi");
    }

    #[test]
    fn serialization_is_deterministic() {
        let map = map(vec![
            element("r", "div", &["a", "t1", "b"]),
            indexed("a", "a", 0, &["x"]),
            text("x", " Home "),
            text("t1", "Welcome"),
            indexed("b", "input", 1, &[]),
        ]);
        let tree = DomTree::from_capture("r", &map).unwrap();
        let first = tree.serialize_clickable(&["type"]);
        for _ in 0..5 {
            assert_eq!(tree.serialize_clickable(&["type"]), first);
        }
        let rebuilt = DomTree::from_capture("r", &map).unwrap();
        assert_eq!(rebuilt.serialize_clickable(&["type"]), first);
        assert_eq!(first, "[0]<a>Home</a>\n[]Welcome\n[1]<input></input>");
    }

    #[test]
    fn inner_text_stops_at_nested_indexed_element() {
        let map = map(vec![
            element("r", "div", &["card"]),
            indexed("card", "div", 0, &["t1", "link", "t2"]),
            text("t1", "Title"),
            indexed("link", "a", 1, &["t3"]),
            text("t3", "More"),
            text("t2", "Footer"),
        ]);
        let tree = DomTree::from_capture("r", &map).unwrap();
        assert_eq!(
            tree.serialize_clickable(NO_ATTRS),
            "[0]<div>Title</div>\n[1]<a>More</a>"
        );
    }

    #[test]
    fn attributes_follow_include_order_and_escape_quotes() {
        let mut input = indexed("i", "input", 0, &[]);
        input.attributes.insert("type".into(), "text".into());
        input.attributes.insert("placeholder".into(), "say \"hi\"".into());
        input.attributes.insert("name".into(), String::new());
        let map = map(vec![element("r", "form", &["i"]), input]);
        let tree = DomTree::from_capture("r", &map).unwrap();
        assert_eq!(
            tree.serialize_clickable(&["placeholder", "name", "type"]),
            "[0]<input placeholder=\"say &quot;hi&quot;\" type=\"text\"></input>"
        );
    }

    #[test]
    fn hidden_text_and_unindexed_elements_are_omitted() {
        let mut hidden = text("h", "secret");
        hidden.is_visible = false;
        let map = map(vec![element("r", "div", &["h", "d"]), element("d", "div", &[])]);
        let mut map = map;
        map.insert("h".into(), hidden);
        let tree = DomTree::from_capture("r", &map).unwrap();
        assert_eq!(tree.serialize_clickable(NO_ATTRS), "");
    }
}
