//! Key chord parsing for `Input.dispatchKeyEvent`.

use crate::error::{AdapterError, AdapterErrorKind};

const MOD_ALT: i64 = 1;
const MOD_CTRL: i64 = 2;
const MOD_META: i64 = 4;
const MOD_SHIFT: i64 = 8;

/// A key plus its modifier bitmask, e.g. `Control+a` or `Enter`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyChord {
    pub key: String,
    pub modifiers: i64,
}

impl KeyChord {
    /// Parses `Mod+Mod+Key`. The last segment is the key; a lone `+` is the plus key.
    pub fn parse(raw: &str) -> Result<Self, AdapterError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(AdapterError::new(AdapterErrorKind::InvalidInput).with_hint("empty key"));
        }
        if raw == "+" {
            return Ok(Self {
                key: "+".into(),
                modifiers: 0,
            });
        }

        let parts: Vec<&str> = raw.split('+').map(str::trim).collect();
        let (key, mods) = match parts.split_last() {
            Some((key, mods)) if !key.is_empty() => (*key, mods),
            _ => {
                return Err(AdapterError::new(AdapterErrorKind::InvalidInput)
                    .with_hint(format!("malformed key chord '{raw}'")))
            }
        };

        let mut modifiers = 0;
        for name in mods {
            modifiers |= match name.to_ascii_lowercase().as_str() {
                "alt" | "option" => MOD_ALT,
                "control" | "ctrl" => MOD_CTRL,
                "meta" | "cmd" | "command" => MOD_META,
                "shift" => MOD_SHIFT,
                other => {
                    return Err(AdapterError::new(AdapterErrorKind::InvalidInput)
                        .with_hint(format!("unknown modifier '{other}'")))
                }
            };
        }

        Ok(Self {
            key: normalize_key(key),
            modifiers,
        })
    }

    /// Text the key produces when pressed without command modifiers.
    pub fn text(&self) -> Option<String> {
        if self.modifiers & (MOD_CTRL | MOD_META | MOD_ALT) != 0 {
            return None;
        }
        match self.key.as_str() {
            "Enter" => Some("\r".into()),
            "Tab" => Some("\t".into()),
            "Space" => Some(" ".into()),
            key if key.chars().count() == 1 => Some(key.to_string()),
            _ => None,
        }
    }
}

fn normalize_key(key: &str) -> String {
    match key.to_ascii_lowercase().as_str() {
        "enter" | "return" => "Enter".into(),
        "esc" | "escape" => "Escape".into(),
        "tab" => "Tab".into(),
        "space" => "Space".into(),
        "backspace" => "Backspace".into(),
        "delete" | "del" => "Delete".into(),
        "up" | "arrowup" => "ArrowUp".into(),
        "down" | "arrowdown" => "ArrowDown".into(),
        "left" | "arrowleft" => "ArrowLeft".into(),
        "right" | "arrowright" => "ArrowRight".into(),
        "pageup" => "PageUp".into(),
        "pagedown" => "PageDown".into(),
        "home" => "Home".into(),
        "end" => "End".into(),
        _ => key.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_chord_with_modifiers() {
        let chord = KeyChord::parse("Control+Shift+a").unwrap();
        assert_eq!(chord.key, "a");
        assert_eq!(chord.modifiers, MOD_CTRL | MOD_SHIFT);
        assert_eq!(chord.text(), None);
    }

    #[test]
    fn normalizes_named_keys() {
        let chord = KeyChord::parse("enter").unwrap();
        assert_eq!(chord.key, "Enter");
        assert_eq!(chord.text().as_deref(), Some("\r"));
        assert_eq!(KeyChord::parse("+").unwrap().key, "+");
    }

    #[test]
    fn rejects_unknown_modifier_and_empty_input() {
        assert!(KeyChord::parse("Hyper+x").is_err());
        assert!(KeyChord::parse("  ").is_err());
        assert!(KeyChord::parse("Control+").is_err());
    }
}
