//! Key names as they appear in action profiles.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ActionError;

/// A single key the input collaborator knows how to press.
///
/// Parsed case-insensitively from names such as `"space"`, `"q"`, `"F1"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Key {
    Space,
    Enter,
    Tab,
    Escape,
    /// Function key `F1`..`F12`.
    Function(u8),
    /// A printable ASCII character, stored lower-case.
    Char(char),
}

impl FromStr for Key {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        let key = match name.as_str() {
            "space" => Self::Space,
            "enter" | "return" => Self::Enter,
            "tab" => Self::Tab,
            "esc" | "escape" => Self::Escape,
            _ => {
                let mut chars = name.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_ascii_graphic() => Self::Char(c),
                    (Some('f'), Some(_)) => match name[1..].parse::<u8>() {
                        Ok(n @ 1..=12) => Self::Function(n),
                        _ => return Err(ActionError::UnknownKey(s.to_string())),
                    },
                    _ => return Err(ActionError::UnknownKey(s.to_string())),
                }
            }
        };
        Ok(key)
    }
}

impl TryFrom<String> for Key {
    type Error = ActionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.to_string()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Space => write!(f, "space"),
            Self::Enter => write!(f, "enter"),
            Self::Tab => write!(f, "tab"),
            Self::Escape => write!(f, "escape"),
            Self::Function(n) => write!(f, "f{n}"),
            Self::Char(c) => write!(f, "{c}"),
        }
    }
}
