//! Owned node tree built from a capture.
//!
//! Nodes live in a dense arena; children and parents are referenced by
//! [`NodeId`]. The tree is built top-down from the capture map, so it is acyclic
//! and has exactly one root.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::warn;

use crate::errors::PerceiverError;
use crate::model::{NodeKind, RawNode};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ElementData {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    pub xpath: String,
    pub is_visible: bool,
    pub is_interactive: bool,
    pub is_top_element: bool,
    pub shadow_root: bool,
    pub highlight_index: Option<u32>,
}

impl ElementData {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextData {
    pub text: String,
    pub is_visible: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeData {
    Element(ElementData),
    Text(TextData),
}

#[derive(Clone, Debug)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Clone, Debug)]
pub struct DomTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl DomTree {
    /// Builds the tree rooted at `root_id`. Unknown or repeated child ids are dropped;
    /// only a missing root is an error.
    pub fn from_capture(
        root_id: &str,
        map: &HashMap<String, RawNode>,
    ) -> Result<Self, PerceiverError> {
        let root_raw = map
            .get(root_id)
            .ok_or_else(|| PerceiverError::RootMissing(root_id.to_string()))?;

        let mut tree = DomTree {
            nodes: Vec::with_capacity(map.len()),
            root: NodeId(0),
        };
        let mut seen: HashSet<&str> = HashSet::new();
        let mut stack: Vec<(&RawNode, Option<NodeId>)> = vec![(root_raw, None)];

        while let Some((raw, parent)) = stack.pop() {
            if !seen.insert(raw.id.as_str()) {
                warn!(target: "perceiver", id = %raw.id, "node reachable twice; dropped");
                continue;
            }
            let id = NodeId(tree.nodes.len());
            tree.nodes.push(Node {
                data: node_data(raw),
                parent,
                children: Vec::new(),
            });
            if let Some(parent) = parent {
                tree.nodes[parent.0].children.push(id);
            }

            if raw.kind == NodeKind::Element {
                for child_id in raw.children.iter().rev() {
                    match map.get(child_id) {
                        Some(child) => stack.push((child, Some(id))),
                        None => {
                            warn!(target: "perceiver", child = %child_id, "unknown child id; dropped")
                        }
                    }
                }
            }
        }

        Ok(tree)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0].data
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.nodes[id.0].data {
            NodeData::Element(element) => Some(element),
            NodeData::Text(_) => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// All nodes in document pre-order.
    pub fn preorder(&self) -> Preorder<'_> {
        Preorder {
            tree: self,
            stack: vec![self.root],
        }
    }

    /// Descendants of `id` in pre-order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Preorder<'_> {
        Preorder {
            tree: self,
            stack: self.children(id).iter().rev().copied().collect(),
        }
    }

    pub fn has_highlighted_ancestor(&self, id: NodeId) -> bool {
        let mut current = self.parent(id);
        while let Some(ancestor) = current {
            if self
                .element(ancestor)
                .is_some_and(|element| element.highlight_index.is_some())
            {
                return true;
            }
            current = self.parent(ancestor);
        }
        false
    }

    /// First file input at `id`, then among its descendants, then (root call
    /// only) among its siblings and their descendants.
    pub fn get_file_upload_element(&self, id: NodeId, check_siblings: bool) -> Option<NodeId> {
        if self.is_file_input(id) {
            return Some(id);
        }
        if let Some(found) = self.descendants(id).find(|node| self.is_file_input(*node)) {
            return Some(found);
        }
        if check_siblings {
            let parent = self.parent(id)?;
            for sibling in self.children(parent).iter().copied() {
                if sibling == id {
                    continue;
                }
                if let Some(found) = self.get_file_upload_element(sibling, false) {
                    return Some(found);
                }
            }
        }
        None
    }

    fn is_file_input(&self, id: NodeId) -> bool {
        self.element(id).is_some_and(|element| {
            element.tag == "input"
                && element
                    .attr("type")
                    .is_some_and(|kind| kind.eq_ignore_ascii_case("file"))
        })
    }

    /// Node carrying `index`, if any.
    pub fn find_by_index(&self, index: u32) -> Option<NodeId> {
        self.preorder().find(|id| {
            self.element(*id)
                .is_some_and(|element| element.highlight_index == Some(index))
        })
    }

    /// Highlight index -> xpath for every indexed element.
    pub fn locator_map(&self) -> BTreeMap<u32, String> {
        self.preorder()
            .filter_map(|id| self.element(id))
            .filter_map(|element| {
                element
                    .highlight_index
                    .map(|index| (index, element.xpath.clone()))
            })
            .collect()
    }
}

pub struct Preorder<'a> {
    tree: &'a DomTree,
    stack: Vec<NodeId>,
}

impl Iterator for Preorder<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(id).iter().rev().copied());
        Some(id)
    }
}

fn node_data(raw: &RawNode) -> NodeData {
    match raw.kind {
        NodeKind::Text => NodeData::Text(TextData {
            text: raw.text.clone().unwrap_or_default(),
            is_visible: raw.is_visible,
        }),
        NodeKind::Element => NodeData::Element(ElementData {
            tag: raw.tag.clone(),
            attributes: raw.attributes.clone(),
            xpath: raw.xpath.clone(),
            is_visible: raw.is_visible,
            is_interactive: raw.is_interactive,
            is_top_element: raw.is_top_element,
            shadow_root: raw.shadow_root,
            highlight_index: raw.highlight_index,
        }),
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn builds_arena_with_parent_links() {
        let map = map(vec![
            element("r", "div", &["a", "missing", "b"]),
            indexed("a", "button", 0, &["t"]),
            text("t", "Go"),
            element("b", "span", &[]),
        ]);
        let tree = DomTree::from_capture("r", &map).unwrap();
        assert_eq!(tree.len(), 4);
        let root = tree.root();
        assert_eq!(tree.children(root).len(), 2);
        let a = tree.children(root)[0];
        let t = tree.children(a)[0];
        assert_eq!(tree.parent(t), Some(a));
        assert!(tree.has_highlighted_ancestor(t));
        assert!(!tree.has_highlighted_ancestor(a));
        assert_eq!(tree.find_by_index(0), Some(a));
    }

    #[test]
    fn repeated_ids_do_not_create_cycles() {
        let map = map(vec![element("r", "div", &["c"]), element("c", "div", &["r", "c"])]);
        let tree = DomTree::from_capture("r", &map).unwrap();
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.preorder().count(), 2);
    }

    #[test]
    fn missing_root_is_an_error() {
        let map = map(vec![element("r", "div", &[])]);
        assert!(DomTree::from_capture("x", &map).is_err());
    }

    #[test]
    fn file_upload_search_checks_siblings_from_root_call() {
        let mut upload = element("f", "input", &[]);
        upload.attributes.insert("type".into(), "FILE".into());
        let map = map(vec![
            element("r", "form", &["l", "w"]),
            element("l", "label", &[]),
            element("w", "div", &["f"]),
            upload,
        ]);
        let tree = DomTree::from_capture("r", &map).unwrap();
        let root = tree.root();
        let label = tree.children(root)[0];
        let found = tree.get_file_upload_element(label, true).unwrap();
        assert_eq!(tree.element(found).unwrap().tag, "input");
        assert_eq!(tree.get_file_upload_element(label, false), None);
        assert_eq!(tree.get_file_upload_element(root, true), Some(found));
    }

    #[test]
    fn locator_map_lists_indexed_xpaths() {
        let map = map(vec![
            element("r", "html", &["a", "b"]),
            indexed("a", "button", 0, &[]),
            indexed("b", "a", 1, &[]),
        ]);
        let tree = DomTree::from_capture("r", &map).unwrap();
        let locators = tree.locator_map();
        assert_eq!(locators.len(), 2);
        assert_eq!(locators[&0], "html/button[1]");
        assert_eq!(locators[&1], "html/a[2]");
    }
}
