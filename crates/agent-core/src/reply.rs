//! Parsing of the model's reply into an action batch.

use std::fmt;

use action_primitives::RawAction;
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;

use crate::errors::AgentError;
use crate::types::CurrentState;

/// A reply that carried an action batch. Entries are validated one by one
/// at execution time.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelReply {
    pub current_state: CurrentState,
    pub actions: Vec<RawAction>,
}

/// Finds the first balanced JSON object in a reply that may wrap it in a
/// fence or surround it with prose.
pub fn extract_json_object(raw: &str) -> Option<String> {
    raw.match_indices('{').find_map(|(start, _)| {
        let end = balanced_end(&raw[start..])?;
        let candidate = &raw[start..start + end];
        serde_json::from_str::<de::IgnoredAny>(candidate)
            .ok()
            .map(|_| candidate.to_string())
    })
}

/// Byte length of the object opening at the start of `text`, if it closes.
fn balanced_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (idx, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(idx + 1);
                }
            }
            _ => {}
        }
    }
    None
}

#[derive(Deserialize)]
struct ReplyBody {
    #[serde(default)]
    current_state: Option<CurrentState>,
    #[serde(default, deserialize_with = "present")]
    action: Option<Batch>,
    #[serde(default, deserialize_with = "present")]
    actions: Option<Batch>,
}

/// Distinguishes an explicit `null` batch from an absent one.
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Batch>, D::Error> {
    Batch::deserialize(deserializer).map(Some)
}

/// The batch field: an array of entries, one bare entry, or `null`.
struct Batch(Vec<RawAction>);

impl<'de> Deserialize<'de> for Batch {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(BatchVisitor)
    }
}

struct BatchVisitor;

impl<'de> Visitor<'de> for BatchVisitor {
    type Value = Batch;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an array of action objects")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Batch, A::Error> {
        let mut entries = Vec::new();
        while let Some(entry) = seq.next_element::<RawAction>()? {
            entries.push(entry);
        }
        Ok(Batch(entries))
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Batch, A::Error> {
        let entry = RawAction::deserialize(de::value::MapAccessDeserializer::new(map))?;
        Ok(Batch(vec![entry]))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Batch, E> {
        Ok(Batch(Vec::new()))
    }
}

/// Parses `{current_state?, action | actions}`. The batch field may hold an
/// array or a single action object.
pub fn parse_reply(raw: &str) -> Result<ModelReply, AgentError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AgentError::parse("empty reply"));
    }
    let candidate =
        extract_json_object(trimmed).ok_or_else(|| AgentError::parse("no JSON object in reply"))?;
    let body: ReplyBody = serde_json::from_str(&candidate)
        .map_err(|err| AgentError::parse(format!("invalid reply: {err}")))?;

    let Batch(actions) = body
        .action
        .or(body.actions)
        .ok_or_else(|| AgentError::parse("reply has neither 'action' nor 'actions'"))?;
    Ok(ModelReply {
        current_state: body.current_state.unwrap_or_default(),
        actions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_from_fenced_block() {
        let input = "Here you go:\n```json\n{\"action\":[]}\n```";
        let extracted = extract_json_object(input).unwrap();
        assert_eq!(extracted, "{\"action\":[]}");
    }

    #[test]
    fn extracts_from_inline_object() {
        let input = "text { \"foo\": {\"bar\": 1} } more";
        assert_eq!(
            extract_json_object(input).as_deref(),
            Some("{ \"foo\": {\"bar\": 1} }")
        );
        assert!(extract_json_object("no braces").is_none());
    }

    #[test]
    fn accepts_action_or_actions() {
        let reply = parse_reply(
            r#"{"current_state":{"memory":"on page 2","next_goal":"click"},
                "action":[{"click_element":{"index":1}}]}"#,
        )
        .unwrap();
        assert_eq!(reply.current_state.memory.as_deref(), Some("on page 2"));
        assert_eq!(
            reply.actions,
            vec![RawAction::from(json!({"click_element": {"index": 1}}))]
        );

        let reply = parse_reply(r#"```json
{"actions":[{"scroll":{}},{"done":{"text":"ok"}}]}
```"#)
        .unwrap();
        assert_eq!(reply.actions.len(), 2);
        assert_eq!(reply.current_state, CurrentState::default());
    }

    #[test]
    fn trailing_prose_after_the_object_is_ignored() {
        let reply = parse_reply(
            r#"{"action":[{"click_element":{"index":4}}]} I clicked {the} button because it matched."#,
        )
        .unwrap();
        assert_eq!(reply.actions.len(), 1);

        let input = r#"Note {this}: {"action":[{"input_text":{"index":1,"text":"a } b"}}]} done"#;
        assert_eq!(
            extract_json_object(input).as_deref(),
            Some(r#"{"action":[{"input_text":{"index":1,"text":"a } b"}}]}"#)
        );
    }

    #[test]
    fn repeated_keys_inside_an_entry_survive_the_batch() {
        let reply = parse_reply(
            r#"{"action":[{"click_element":{"index":1},"click_element":{"index":2}}]}"#,
        )
        .unwrap();
        let RawAction::Object(entries) = &reply.actions[0] else {
            panic!("expected an object entry");
        };
        assert_eq!(entries.len(), 2);

        let single = parse_reply(r#"{"action":{"scroll":{},"scroll":{}}}"#).unwrap();
        assert!(matches!(&single.actions[0], RawAction::Object(entries) if entries.len() == 2));
    }

    #[test]
    fn non_array_batch_is_a_parse_error() {
        assert!(matches!(
            parse_reply(r#"{"action": 5}"#),
            Err(AgentError::Parse(_))
        ));
        assert!(parse_reply(r#"{"action": null}"#).unwrap().actions.is_empty());
    }

    #[test]
    fn empty_batch_is_not_an_error() {
        let reply = parse_reply(r#"{"action": []}"#).unwrap();
        assert!(reply.actions.is_empty());
    }

    #[test]
    fn prose_is_a_parse_error() {
        assert!(matches!(
            parse_reply("I could not find the button."),
            Err(AgentError::Parse(_))
        ));
        assert!(matches!(
            parse_reply(r#"{"thoughts": "hmm"}"#),
            Err(AgentError::Parse(_))
        ));
    }
}
