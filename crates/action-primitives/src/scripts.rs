//! Script builders for in-page operations.
//!
//! Every operation script resolves its target with the same prelude and
//! answers `{ok: true, ...}` or `{ok: false, error}`.

use serde::Deserialize;
use serde_json::Value;

use crate::errors::ActionError;
use crate::types::{ElementTarget, FALLBACK_SELECTOR};

fn resolver_prelude(target: &ElementTarget) -> Result<String, ActionError> {
    let target =
        serde_json::to_string(target).map_err(|err| ActionError::Internal(err.to_string()))?;
    let selector = serde_json::to_string(FALLBACK_SELECTOR)
        .map_err(|err| ActionError::Internal(err.to_string()))?;
    Ok(format!(
        r#"const target = {target};
  const resolve = () => {{
    if (target.xpath !== undefined) {{
      try {{
        return document.evaluate(target.xpath, document, null,
          XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue;
      }} catch (_) {{
        return null;
      }}
    }}
    return document.querySelectorAll({selector})[target.fallback] || null;
  }};
  const el = resolve();
  if (!el) return {{ ok: false, error: 'not_found' }};"#
    ))
}

fn wrap(prelude: &str, body: &str) -> String {
    format!("(() => {{\n  {prelude}\n  {body}\n}})()")
}

pub fn locate(target: &ElementTarget) -> Result<String, ActionError> {
    Ok(wrap(
        &resolver_prelude(target)?,
        r#"const r = el.getBoundingClientRect();
  return {
    ok: true,
    tag: el.tagName.toLowerCase(),
    rect: { x: r.x, y: r.y, width: r.width, height: r.height },
    viewport: { width: window.innerWidth, height: window.innerHeight,
      scrollX: window.scrollX, scrollY: window.scrollY },
  };"#,
    ))
}

pub fn scroll_into_view(target: &ElementTarget) -> Result<String, ActionError> {
    Ok(wrap(
        &resolver_prelude(target)?,
        r#"el.scrollIntoView({ behavior: 'smooth', block: 'center', inline: 'center' });
  return { ok: true };"#,
    ))
}

pub fn click(target: &ElementTarget) -> Result<String, ActionError> {
    Ok(wrap(
        &resolver_prelude(target)?,
        r#"if (typeof el.focus === 'function') el.focus();
  const r = el.getBoundingClientRect();
  const init = { bubbles: true, cancelable: true, view: window,
    clientX: r.x + r.width / 2, clientY: r.y + r.height / 2 };
  el.dispatchEvent(new MouseEvent('mousedown', init));
  el.dispatchEvent(new MouseEvent('mouseup', init));
  el.click();
  return { ok: true };"#,
    ))
}

pub fn input_text(target: &ElementTarget, text: &str) -> Result<String, ActionError> {
    let text = serde_json::to_string(text).map_err(|err| ActionError::Internal(err.to_string()))?;
    let body = format!(
        r#"const text = {text};
  if (el.isContentEditable) {{
    el.focus();
    el.textContent = text;
    el.dispatchEvent(new InputEvent('input', {{ bubbles: true }}));
    return {{ ok: true }};
  }}
  if (!(el instanceof HTMLInputElement || el instanceof HTMLTextAreaElement)) {{
    return {{ ok: false, error: 'not_editable', tag: el.tagName.toLowerCase() }};
  }}
  el.focus();
  const proto = el instanceof HTMLTextAreaElement
    ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;
  const desc = Object.getOwnPropertyDescriptor(proto, 'value');
  if (desc && desc.set) desc.set.call(el, text); else el.value = text;
  el.dispatchEvent(new Event('input', {{ bubbles: true }}));
  el.dispatchEvent(new Event('change', {{ bubbles: true }}));
  return {{ ok: true }};"#
    );
    Ok(wrap(&resolver_prelude(target)?, &body))
}

pub fn dropdown_options(target: &ElementTarget) -> Result<String, ActionError> {
    Ok(wrap(
        &resolver_prelude(target)?,
        r#"if (!(el instanceof HTMLSelectElement)) {
    return { ok: false, error: 'not_select', tag: el.tagName.toLowerCase() };
  }
  return {
    ok: true,
    options: Array.from(el.options).map((o, index) => ({
      index, text: o.text.trim(), value: o.value,
    })),
  };"#,
    ))
}

pub fn select_option(target: &ElementTarget, text: &str) -> Result<String, ActionError> {
    let text = serde_json::to_string(text).map_err(|err| ActionError::Internal(err.to_string()))?;
    let body = format!(
        r#"if (!(el instanceof HTMLSelectElement)) {{
    return {{ ok: false, error: 'not_select', tag: el.tagName.toLowerCase() }};
  }}
  const wanted = {text}.trim();
  const option = Array.from(el.options).find((o) => o.text.trim() === wanted);
  if (!option) return {{ ok: false, error: 'option_not_found' }};
  el.value = option.value;
  el.dispatchEvent(new Event('input', {{ bubbles: true }}));
  el.dispatchEvent(new Event('change', {{ bubbles: true }}));
  return {{ ok: true, value: option.value }};"#
    );
    Ok(wrap(&resolver_prelude(target)?, &body))
}

pub fn scroll_by(amount: Option<i64>) -> String {
    let amount = match amount {
        Some(pixels) => pixels.to_string(),
        None => "window.innerHeight".to_string(),
    };
    format!("(() => {{ window.scrollBy(0, {amount}); return {{ ok: true }}; }})()")
}

pub fn scroll_to_text(text: &str) -> Result<String, ActionError> {
    let text = serde_json::to_string(text).map_err(|err| ActionError::Internal(err.to_string()))?;
    Ok(format!(
        r#"(() => {{
  const wanted = {text}.toLowerCase();
  const walker = document.createTreeWalker(document.body, NodeFilter.SHOW_TEXT);
  while (walker.nextNode()) {{
    const node = walker.currentNode;
    const parent = node.parentElement;
    if (!parent || !node.nodeValue.toLowerCase().includes(wanted)) continue;
    const r = parent.getBoundingClientRect();
    if (r.width === 0 && r.height === 0) continue;
    parent.scrollIntoView({{ behavior: 'smooth', block: 'center' }});
    return {{ ok: true }};
  }}
  return {{ ok: false, error: 'text_not_found' }};
}})()"#
    ))
}

pub const SCROLL_INFO: &str = r#"(() => {
  const doc = document.documentElement;
  const above = Math.round(window.scrollY);
  const below = Math.round(doc.scrollHeight - window.scrollY - window.innerHeight);
  return { ok: true, pixelsAbove: Math.max(0, above), pixelsBelow: Math.max(0, below) };
})()"#;

pub const EXTRACT_TEXT: &str = r#"(() => {
  return { ok: true, text: document.body ? document.body.innerText : '' };
})()"#;

/// Generic `{ok, error}` envelope every operation script returns.
#[derive(Debug, Deserialize)]
pub(crate) struct ScriptReply {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
}

/// Splits a script result into the success payload or a typed error.
pub(crate) fn check_reply(value: Value) -> Result<Value, ActionError> {
    let reply: ScriptReply = serde_json::from_value(value.clone())
        .map_err(|err| ActionError::CdpIo(format!("malformed script reply: {err}")))?;
    if reply.ok {
        return Ok(value);
    }
    let tag = reply.tag.unwrap_or_default();
    Err(match reply.error.as_deref() {
        Some("not_found") => ActionError::ElementNotFound,
        Some("not_editable") => {
            ActionError::NotInteractable(format!("<{tag}> does not accept text input"))
        }
        Some("not_select") => ActionError::NotInteractable(format!("<{tag}> is not a dropdown")),
        Some("option_not_found") => ActionError::OptionNotFound(String::new()),
        Some("text_not_found") => ActionError::TextNotFound(String::new()),
        Some(other) => ActionError::CdpIo(other.to_string()),
        None => ActionError::CdpIo("script reported failure".into()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prelude_embeds_target_and_selector() {
        let script = click(&ElementTarget::Xpath("html/body/button[2]".into())).unwrap();
        assert!(script.contains(r#"{"xpath":"html/body/button[2]"}"#));
        assert!(script.contains("querySelectorAll(\"a, button"));

        let fallback = click(&ElementTarget::Fallback(4)).unwrap();
        assert!(fallback.contains(r#"{"fallback":4}"#));
    }

    #[test]
    fn text_is_json_escaped() {
        let script = input_text(&ElementTarget::Fallback(0), "he said \"hi\"\n").unwrap();
        assert!(script.contains(r#""he said \"hi\"\n""#));
    }

    #[test]
    fn replies_map_to_errors() {
        assert_eq!(
            check_reply(json!({"ok": false, "error": "not_found"})).unwrap_err(),
            ActionError::ElementNotFound
        );
        assert!(matches!(
            check_reply(json!({"ok": false, "error": "not_select", "tag": "div"})),
            Err(ActionError::NotInteractable(msg)) if msg.contains("<div>")
        ));
        assert!(check_reply(json!({"ok": true, "value": "de"})).is_ok());
        assert!(check_reply(json!(null)).is_err());
    }

    #[test]
    fn scroll_by_defaults_to_one_page() {
        assert!(scroll_by(None).contains("window.innerHeight"));
        assert!(scroll_by(Some(-300)).contains("scrollBy(0, -300)"));
    }
}
