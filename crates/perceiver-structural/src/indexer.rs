//! Single-pass DOM indexer: decides visibility, interactivity and top-most-ness
//! for every node, assigns highlight indices in document pre-order and plans
//! the highlight overlay.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::errors::PerceiverError;
use crate::model::{
    Capture, CaptureOptions, HighlightBox, NodeKind, ProbeNode, RawNode, Viewport,
};
use crate::ports::LiveDom;

/// Elements dropped together with their subtrees.
const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "meta", "link", "head",
];

/// Indexed as one unit; their descendants are not walked.
const OPAQUE_TAGS: &[&str] = &["svg"];

const INTERACTIVE_TAGS: &[&str] = &[
    "a", "button", "input", "select", "textarea", "details", "summary", "label", "option",
    "optgroup",
];

const INTERACTIVE_ROLES: &[&str] = &[
    "button",
    "link",
    "checkbox",
    "radio",
    "textbox",
    "combobox",
    "listbox",
    "option",
    "menuitem",
    "menuitemcheckbox",
    "menuitemradio",
    "tab",
    "switch",
    "slider",
    "spinbutton",
    "searchbox",
    "gridcell",
    "treeitem",
];

const HANDLER_ATTRIBUTES: &[&str] = &[
    "onclick",
    "onmousedown",
    "onmouseup",
    "onpointerdown",
    "ontouchstart",
];

/// Walks `dom` once and produces the capture for `opts`.
pub fn index_dom<D>(dom: &D, opts: &CaptureOptions) -> Result<Capture, PerceiverError>
where
    D: LiveDom + ?Sized,
{
    let root_id = dom.root_id().to_string();
    if dom.node(&root_id).is_none() {
        return Err(PerceiverError::RootMissing(root_id));
    }
    let viewport = dom.viewport();

    let (order, parents) = walk(dom, &root_id);
    let kept: HashSet<&str> = order.iter().map(|node| node.id.as_str()).collect();

    let mut map: HashMap<String, RawNode> = HashMap::with_capacity(order.len());
    let mut xpaths: HashMap<&str, String> = HashMap::new();
    let mut highlights = Vec::new();
    let mut next_index: u32 = 0;

    for node in order.iter().copied() {
        let parent = parents.get(node.id.as_str()).copied();
        let children: Vec<String> = node
            .children
            .iter()
            .filter(|child| kept.contains(child.as_str()))
            .cloned()
            .collect();

        let raw = match node.kind {
            NodeKind::Text => {
                let is_visible = parent
                    .and_then(|pid| map.get(pid))
                    .map(|p| p.is_visible)
                    .unwrap_or(false);
                RawNode {
                    id: node.id.clone(),
                    kind: NodeKind::Text,
                    tag: String::new(),
                    attributes: Default::default(),
                    text: node.text.clone(),
                    children: Vec::new(),
                    is_visible,
                    is_interactive: false,
                    is_top_element: false,
                    shadow_root: false,
                    highlight_index: None,
                    rects: Vec::new(),
                    viewport_offset: (viewport.scroll_x, viewport.scroll_y),
                    xpath: String::new(),
                }
            }
            NodeKind::Element => {
                if node.id == root_id {
                    xpaths.insert(node.id.as_str(), xpath_step(&node.tag, None));
                }
                assign_child_xpaths(dom, node, &children, &mut xpaths);

                let parent_node = parent.and_then(|pid| dom.node(pid));
                let is_visible = element_visible(node, &viewport, opts);
                let is_interactive = element_interactive(node, parent_node);
                let is_top_element =
                    is_visible && is_top_most(node, &viewport, opts, &parents);

                let highlight_index = if is_visible && is_interactive && is_top_element {
                    let index = next_index;
                    next_index += 1;
                    Some(index)
                } else {
                    None
                };

                if let Some(index) = highlight_index {
                    let wanted = match opts.focus_index {
                        Some(focus) if focus >= 0 => i64::from(index) == focus,
                        _ => true,
                    };
                    if opts.do_highlight && wanted {
                        highlights.push(HighlightBox {
                            index,
                            tag: node.tag.clone(),
                            rects: node.rects.iter().copied().filter(|r| !r.is_empty()).collect(),
                        });
                    }
                }

                RawNode {
                    id: node.id.clone(),
                    kind: NodeKind::Element,
                    tag: node.tag.clone(),
                    attributes: node.attrs.clone(),
                    text: None,
                    children,
                    is_visible,
                    is_interactive,
                    is_top_element,
                    shadow_root: node.shadow_root,
                    highlight_index,
                    rects: node.rects.clone(),
                    viewport_offset: (viewport.scroll_x, viewport.scroll_y),
                    xpath: xpaths.get(node.id.as_str()).cloned().unwrap_or_default(),
                }
            }
        };
        map.insert(raw.id.clone(), raw);
    }

    debug!(
        target: "perceiver",
        nodes = map.len(),
        indexed = next_index,
        "dom indexed"
    );

    Ok(Capture {
        root_id,
        map,
        highlights,
    })
}

/// Pre-order walk from the root. Returns the kept nodes in document order plus
/// a child -> parent map. Missing or repeated child ids are skipped.
fn walk<'a, D>(dom: &'a D, root_id: &str) -> (Vec<&'a ProbeNode>, HashMap<&'a str, &'a str>)
where
    D: LiveDom + ?Sized,
{
    let mut order = Vec::new();
    let mut parents: HashMap<&str, &str> = HashMap::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut stack: Vec<(&str, Option<&'a str>)> = Vec::new();

    let Some(root) = dom.node(root_id) else {
        return (order, parents);
    };
    stack.push((root.id.as_str(), None));

    while let Some((id, parent)) = stack.pop() {
        let Some(node) = dom.node(id) else {
            warn!(target: "perceiver", child = id, "child id missing from live tree; skipped");
            continue;
        };
        if !seen.insert(node.id.as_str()) {
            warn!(target: "perceiver", child = id, "node referenced twice; skipped");
            continue;
        }
        match node.kind {
            NodeKind::Text => {
                if node.text.as_deref().map(str::trim).unwrap_or("").is_empty() {
                    continue;
                }
            }
            NodeKind::Element => {
                if parent.is_some() && SKIPPED_TAGS.contains(&node.tag.as_str()) {
                    continue;
                }
            }
        }
        if let Some(parent) = parent {
            parents.insert(node.id.as_str(), parent);
        }
        order.push(node);

        if node.kind == NodeKind::Element && !OPAQUE_TAGS.contains(&node.tag.as_str()) {
            for child in node.children.iter().rev() {
                stack.push((child.as_str(), Some(node.id.as_str())));
            }
        }
    }

    (order, parents)
}

fn assign_child_xpaths<'a, D>(
    dom: &'a D,
    parent: &ProbeNode,
    children: &[String],
    xpaths: &mut HashMap<&'a str, String>,
) where
    D: LiveDom + ?Sized,
{
    let Some(base) = xpaths.get(parent.id.as_str()).cloned() else {
        return;
    };
    let elements: Vec<&'a ProbeNode> = children
        .iter()
        .filter_map(|id| dom.node(id))
        .filter(|node| node.kind == NodeKind::Element)
        .collect();

    let mut totals: HashMap<&str, usize> = HashMap::new();
    for node in &elements {
        *totals.entry(node.tag.as_str()).or_default() += 1;
    }
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for node in elements {
        let position = seen.entry(node.tag.as_str()).or_default();
        *position += 1;
        let step = if totals.get(node.tag.as_str()).copied().unwrap_or(0) > 1 {
            xpath_step(&node.tag, Some(*position))
        } else {
            xpath_step(&node.tag, None)
        };
        xpaths.insert(node.id.as_str(), format!("{base}/{step}"));
    }
}

fn xpath_step(tag: &str, position: Option<usize>) -> String {
    let name = if tag == "svg" {
        "*[name()='svg']".to_string()
    } else {
        tag.to_string()
    };
    match position {
        Some(n) => format!("{name}[{n}]"),
        None => name,
    }
}

fn style_visible(node: &ProbeNode) -> bool {
    let style = &node.style;
    style.display != "none"
        && style.visibility != "hidden"
        && style.visibility != "collapse"
        && style.opacity > 0.0
        && node.rects.iter().any(|rect| !rect.is_empty())
}

fn element_visible(node: &ProbeNode, viewport: &Viewport, opts: &CaptureOptions) -> bool {
    if !style_visible(node) {
        return false;
    }
    if !opts.viewport_check_enabled() {
        return true;
    }
    let margin = f64::from(opts.viewport_expansion);
    node.rects
        .iter()
        .filter(|rect| !rect.is_empty())
        .any(|rect| rect.intersects_viewport(viewport, margin))
}

fn element_interactive(node: &ProbeNode, parent: Option<&ProbeNode>) -> bool {
    if node.attr("disabled").is_some() {
        return false;
    }
    if node.tag == "input"
        && node
            .attr("type")
            .is_some_and(|kind| kind.eq_ignore_ascii_case("hidden"))
    {
        return false;
    }
    if INTERACTIVE_TAGS.contains(&node.tag.as_str()) {
        return true;
    }
    if let Some(role) = node.attr("role") {
        if INTERACTIVE_ROLES.contains(&role.trim().to_ascii_lowercase().as_str()) {
            return true;
        }
    }
    if let Some(tabindex) = node.attr("tabindex") {
        if tabindex.trim().parse::<i32>().is_ok_and(|value| value >= 0) {
            return true;
        }
    }
    if let Some(editable) = node.attr("contenteditable") {
        if matches!(
            editable.trim().to_ascii_lowercase().as_str(),
            "" | "true" | "plaintext-only"
        ) {
            return true;
        }
    }
    if node.listeners || HANDLER_ATTRIBUTES.iter().any(|attr| node.attr(attr).is_some()) {
        return true;
    }
    // cursor is inherited; only the element introducing the pointer counts
    node.style.cursor == "pointer"
        && parent.map_or(true, |parent| parent.style.cursor != "pointer")
}

fn is_top_most(
    node: &ProbeNode,
    viewport: &Viewport,
    opts: &CaptureOptions,
    parents: &HashMap<&str, &str>,
) -> bool {
    let Some(rect) = node.rects.iter().find(|rect| !rect.is_empty()) else {
        return false;
    };
    match node.hit.as_deref() {
        Some(hit) => is_self_or_ancestor(&node.id, hit, parents),
        None => {
            let (cx, cy) = rect.center();
            let outside = cx < 0.0 || cy < 0.0 || cx >= viewport.width || cy >= viewport.height;
            !opts.viewport_check_enabled() || outside
        }
    }
}

fn is_self_or_ancestor(id: &str, hit: &str, parents: &HashMap<&str, &str>) -> bool {
    let mut current = Some(hit);
    while let Some(candidate) = current {
        if candidate == id {
            return true;
        }
        current = parents.get(candidate).copied();
    }
    false
}
