//! Pure validation of one action object from model output.

use std::fmt;

use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::schema::*;

/// Why an action object was rejected. Every input maps to exactly one of these
/// or to a valid [`Action`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid action format: {0}")]
    InvalidFormat(String),

    #[error("unknown action '{0}'")]
    UnknownAction(String),

    #[error("invalid parameters for '{action}': {reason}")]
    SchemaViolation { action: String, reason: String },
}

impl ParseError {
    /// Stable category name, e.g. for CLI output.
    pub fn category(&self) -> &'static str {
        match self {
            ParseError::InvalidFormat(_) => "InvalidFormat",
            ParseError::UnknownAction(_) => "UnknownAction",
            ParseError::SchemaViolation { .. } => "SchemaViolation",
        }
    }
}

/// One batch entry as the model wrote it. Object keys stay in written order
/// and repeated keys are kept, where a `serde_json::Map` would merge them.
#[derive(Debug, Clone, PartialEq)]
pub enum RawAction {
    Object(Vec<(String, Value)>),
    Other(Value),
}

impl RawAction {
    /// Compact JSON text of the entry, repeated keys included.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("null"))
    }
}

impl From<Value> for RawAction {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(object) => RawAction::Object(object.into_iter().collect()),
            other => RawAction::Other(other),
        }
    }
}

impl Serialize for RawAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RawAction::Object(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            RawAction::Other(value) => value.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for RawAction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(RawActionVisitor)
    }
}

struct RawActionVisitor;

impl<'de> Visitor<'de> for RawActionVisitor {
    type Value = RawAction;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("any JSON value")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<RawAction, A::Error> {
        let mut entries = Vec::new();
        while let Some((key, value)) = map.next_entry::<String, Value>()? {
            entries.push((key, value));
        }
        Ok(RawAction::Object(entries))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<RawAction, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element::<Value>()? {
            items.push(item);
        }
        Ok(RawAction::Other(Value::Array(items)))
    }

    fn visit_bool<E: de::Error>(self, value: bool) -> Result<RawAction, E> {
        Ok(RawAction::Other(Value::Bool(value)))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<RawAction, E> {
        Ok(RawAction::Other(Value::from(value)))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<RawAction, E> {
        Ok(RawAction::Other(Value::from(value)))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<RawAction, E> {
        Ok(RawAction::Other(Value::from(value)))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<RawAction, E> {
        Ok(RawAction::Other(Value::String(value.to_string())))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<RawAction, E> {
        Ok(RawAction::Other(Value::String(value)))
    }

    fn visit_unit<E: de::Error>(self) -> Result<RawAction, E> {
        Ok(RawAction::Other(Value::Null))
    }
}

pub fn parse_action(raw: &str) -> Result<Action, ParseError> {
    let entry: RawAction = serde_json::from_str(raw.trim())
        .map_err(|err| ParseError::InvalidFormat(format!("not valid JSON: {err}")))?;
    parse_raw_action(entry)
}

pub fn parse_action_value(value: Value) -> Result<Action, ParseError> {
    parse_raw_action(RawAction::from(value))
}

pub fn parse_raw_action(entry: RawAction) -> Result<Action, ParseError> {
    let entries = match entry {
        RawAction::Object(entries) => entries,
        RawAction::Other(value) => {
            return Err(ParseError::InvalidFormat(format!(
                "expected a JSON object, got {}",
                type_name(&value)
            )))
        }
    };
    if entries.len() != 1 {
        return Err(ParseError::InvalidFormat(format!(
            "expected exactly one action key, got {}",
            entries.len()
        )));
    }
    let Some((name, params)) = entries.into_iter().next() else {
        return Err(ParseError::InvalidFormat("empty action object".into()));
    };
    let kind = ActionKind::from_wire(&name).ok_or(ParseError::UnknownAction(name))?;

    let action = match kind {
        ActionKind::GoToUrl => Action::GoToUrl(decode(kind, params)?),
        ActionKind::SearchGoogle => Action::SearchGoogle(decode(kind, params)?),
        ActionKind::ClickElement => Action::ClickElement(decode(kind, params)?),
        ActionKind::InputText => Action::InputText(decode(kind, params)?),
        ActionKind::Scroll => Action::Scroll(decode(kind, params)?),
        ActionKind::ScrollToText => Action::ScrollToText(decode(kind, params)?),
        ActionKind::SendKeys => Action::SendKeys(decode(kind, params)?),
        ActionKind::ExtractContent => Action::ExtractContent(decode(kind, params)?),
        ActionKind::SwitchTab => Action::SwitchTab(decode(kind, params)?),
        ActionKind::OpenTab => Action::OpenTab(decode(kind, params)?),
        ActionKind::GetDropdownOptions => Action::GetDropdownOptions(decode(kind, params)?),
        ActionKind::SelectDropdownOption => Action::SelectDropdownOption(decode(kind, params)?),
        ActionKind::Done => Action::Done(decode(kind, params)?),
        ActionKind::NoOp => Action::NoOp(decode(kind, params)?),
    };
    Ok(action)
}

fn decode<P: ActionParams>(kind: ActionKind, params: Value) -> Result<P, ParseError> {
    let violation = |reason: String| ParseError::SchemaViolation {
        action: kind.wire_name().to_string(),
        reason,
    };
    let params = match params {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };
    let decoded: P = serde_json::from_value(params).map_err(|err| violation(err.to_string()))?;
    decoded.validate().map_err(violation)?;
    Ok(decoded)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
