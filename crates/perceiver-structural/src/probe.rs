//! In-page scripts: the one-pass DOM probe and the highlight overlay.

use serde_json::Value;

use crate::errors::PerceiverError;
use crate::model::{HighlightBox, ProbeSnapshot};

pub const HIGHLIGHT_CONTAINER_ID: &str = "tabpilot-highlight-container";

/// Walks the document once and returns a `ProbeSnapshot` as JSON.
pub const PROBE_SCRIPT: &str = r#"(() => {
  const SKIP = new Set(['script', 'style', 'noscript', 'template', 'meta', 'link', 'head']);
  const HANDLERS = ['onclick', 'onmousedown', 'onmouseup', 'onpointerdown', 'ontouchstart'];
  const ids = new Map();
  let next = 0;
  const idOf = (node) => {
    let id = ids.get(node);
    if (id === undefined) {
      id = 'n' + next++;
      ids.set(node, id);
    }
    return id;
  };
  const hitAt = (x, y) => {
    let hit = document.elementFromPoint(x, y);
    while (hit && hit.shadowRoot) {
      const inner = hit.shadowRoot.elementFromPoint(x, y);
      if (!inner || inner === hit) break;
      hit = inner;
    }
    return hit;
  };
  const vw = window.innerWidth;
  const vh = window.innerHeight;
  const root = document.documentElement;
  const rootId = idOf(root);
  const nodes = {};
  const elements = [];
  const stack = [root];
  while (stack.length) {
    const node = stack.pop();
    const id = idOf(node);
    if (node.nodeType === Node.TEXT_NODE) {
      nodes[id] = { id, kind: 'text', text: node.nodeValue };
      continue;
    }
    const el = node;
    const tag = el.tagName.toLowerCase();
    const attrs = {};
    for (const attr of el.attributes) attrs[attr.name] = attr.value;
    const cs = window.getComputedStyle(el);
    const opacity = parseFloat(cs.opacity);
    const rects = Array.from(el.getClientRects()).map((r) => ({
      x: r.x, y: r.y, width: r.width, height: r.height,
    }));
    const kids = [];
    if (tag !== 'svg') {
      for (const child of el.childNodes) {
        if (child.nodeType === Node.TEXT_NODE) {
          if (!child.nodeValue || !child.nodeValue.trim()) continue;
        } else if (child.nodeType === Node.ELEMENT_NODE) {
          if (SKIP.has(child.tagName.toLowerCase())) continue;
        } else {
          continue;
        }
        kids.push(child);
      }
    }
    nodes[id] = {
      id,
      kind: 'element',
      tag,
      attrs,
      children: kids.map(idOf),
      style: {
        display: cs.display,
        visibility: cs.visibility,
        opacity: isNaN(opacity) ? 1 : opacity,
        cursor: cs.cursor,
      },
      rects,
      listeners: HANDLERS.some((h) => typeof el[h] === 'function'),
      shadowRoot: !!el.shadowRoot,
    };
    elements.push([el, id, rects]);
    for (let i = kids.length - 1; i >= 0; i--) stack.push(kids[i]);
  }
  for (const [el, id, rects] of elements) {
    const rect = rects.find((r) => r.width > 0 && r.height > 0);
    if (!rect) continue;
    const cx = rect.x + rect.width / 2;
    const cy = rect.y + rect.height / 2;
    if (cx < 0 || cy < 0 || cx >= vw || cy >= vh) continue;
    let hit = hitAt(cx, cy);
    while (hit && !ids.has(hit)) {
      hit = hit.parentNode instanceof ShadowRoot ? hit.parentNode.host : hit.parentNode;
    }
    if (hit) nodes[id].hit = ids.get(hit);
  }
  return {
    rootId,
    viewport: { width: vw, height: vh, scrollX: window.scrollX, scrollY: window.scrollY },
    nodes,
  };
})()"#;

const PAINT_TEMPLATE: &str = r#"(() => {
  const boxes = __BOXES__;
  const colors = ['#FF0000', '#00A000', '#0000FF', '#FFA500', '#800080', '#008080',
    '#FF69B4', '#4B0082', '#FF4500', '#2E8B57', '#DC143C', '#4682B4'];
  let container = document.getElementById('__CONTAINER__');
  if (!container) {
    container = document.createElement('div');
    container.id = '__CONTAINER__';
    Object.assign(container.style, {
      position: 'fixed', top: '0', left: '0', width: '0', height: '0',
      pointerEvents: 'none', zIndex: '2147483647',
    });
    document.documentElement.appendChild(container);
  }
  for (const box of boxes) {
    const color = colors[box.index % colors.length];
    const group = document.createElement('div');
    group.dataset.tabpilotIndex = String(box.index);
    box.rects.forEach((r, i) => {
      const overlay = document.createElement('div');
      Object.assign(overlay.style, {
        position: 'fixed', left: r.x + 'px', top: r.y + 'px',
        width: r.width + 'px', height: r.height + 'px',
        border: '2px solid ' + color, backgroundColor: color + '1A',
        boxSizing: 'border-box', pointerEvents: 'none',
      });
      group.appendChild(overlay);
      if (i === 0) {
        const label = document.createElement('div');
        label.textContent = String(box.index);
        Object.assign(label.style, {
          position: 'fixed', left: r.x + 'px', top: Math.max(0, r.y - 16) + 'px',
          background: color, color: '#fff', font: 'bold 11px sans-serif',
          padding: '0 3px', borderRadius: '2px', pointerEvents: 'none',
        });
        group.appendChild(label);
      }
    });
    container.appendChild(group);
  }
  return boxes.length;
})()"#;

pub fn parse_snapshot(raw: Value) -> Result<ProbeSnapshot, PerceiverError> {
    let snapshot: ProbeSnapshot =
        serde_json::from_value(raw).map_err(|err| PerceiverError::Malformed(err.to_string()))?;
    if !snapshot.nodes.contains_key(&snapshot.root_id) {
        return Err(PerceiverError::RootMissing(snapshot.root_id));
    }
    Ok(snapshot)
}

pub fn paint_script(boxes: &[HighlightBox]) -> Result<String, PerceiverError> {
    let payload =
        serde_json::to_string(boxes).map_err(|err| PerceiverError::internal(err.to_string()))?;
    Ok(PAINT_TEMPLATE
        .replace("__BOXES__", &payload)
        .replace("__CONTAINER__", HIGHLIGHT_CONTAINER_ID))
}

pub fn remove_script(index: Option<u32>) -> String {
    match index {
        None => format!(
            "(() => {{ const c = document.getElementById('{HIGHLIGHT_CONTAINER_ID}'); if (c) c.remove(); return true; }})()"
        ),
        Some(index) => format!(
            "(() => {{ const c = document.getElementById('{HIGHLIGHT_CONTAINER_ID}'); \
             const g = c && c.querySelector('[data-tabpilot-index=\"{index}\"]'); \
             if (g) g.remove(); return !!g; }})()"
        ),
    }
}
