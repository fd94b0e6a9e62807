//! Emoji identity - One canonical key for unicode and custom emojis.
//!
//! Custom emojis are identified by id only, so renaming an emoji keeps its
//! bindings. Unicode emojis are identified by their text. The two spaces are
//! distinct variants and never compare equal.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical identity of a reaction emoji.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum EmojiKey {
    /// A unicode emoji, keyed by its text
    Unicode(String),
    /// A guild custom emoji, keyed by id
    Custom(u64),
}

impl fmt::Display for EmojiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unicode(s) => write!(f, "{s}"),
            Self::Custom(id) => write!(f, "custom:{id}"),
        }
    }
}

/// An emoji as typed by a user: its identity plus the text that renders it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEmoji {
    /// Identity used as the mapping key
    pub key: EmojiKey,
    /// Rendered form, `<:name:id>`, `<a:name:id>` or the unicode text
    pub display: String,
}

/// Parses one emoji token.
///
/// `<:name:id>` and `<a:name:id>` become [`EmojiKey::Custom`]; any other token with
/// at least one non-ASCII character and no whitespace is taken as a unicode emoji.
/// Whether a unicode token is a real emoji is only known once the platform accepts
/// it as a reaction.
pub fn parse_emoji(token: &str) -> Result<ParsedEmoji> {
    let token = token.trim();

    if let Some(inner) = token.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
        let inner = inner.strip_prefix("a:").or_else(|| inner.strip_prefix(':'));
        let id = inner
            .and_then(|rest| rest.rsplit_once(':'))
            .filter(|(name, _)| !name.is_empty())
            .and_then(|(_, id)| id.parse::<u64>().ok());

        return id
            .map(|id| ParsedEmoji {
                key: EmojiKey::Custom(id),
                display: token.to_string(),
            })
            .ok_or_else(|| invalid(token));
    }

    if token.is_ascii() || token.chars().any(char::is_whitespace) {
        return Err(invalid(token));
    }

    Ok(ParsedEmoji {
        key: EmojiKey::Unicode(token.to_string()),
        display: token.to_string(),
    })
}

fn invalid(token: &str) -> Error {
    Error::InvalidInput {
        message: format!("`{token}` is not an emoji"),
    }
}

/// Splits a whitespace-separated emoji list and parses every entry.
pub fn parse_emoji_list(input: &str) -> Result<Vec<ParsedEmoji>> {
    input.split_whitespace().map(parse_emoji).collect()
}

/// Parses a whitespace-separated list of role mentions (`<@&id>`) or raw ids.
pub fn parse_role_list(input: &str) -> Result<Vec<u64>> {
    input
        .split_whitespace()
        .map(|token| {
            let raw = token
                .strip_prefix("<@&")
                .and_then(|t| t.strip_suffix('>'))
                .unwrap_or(token);
            raw.parse::<u64>().map_err(|_| Error::InvalidInput {
                message: format!("`{token}` is not a role"),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_custom_emoji() {
        let parsed = parse_emoji("<:pepe:123456>").unwrap();
        assert_eq!(parsed.key, EmojiKey::Custom(123_456));
        assert_eq!(parsed.display, "<:pepe:123456>");

        let animated = parse_emoji("<a:dance:99>").unwrap();
        assert_eq!(animated.key, EmojiKey::Custom(99));
    }

    #[test]
    fn test_parse_unicode_emoji() {
        let parsed = parse_emoji(" ✅ ").unwrap();
        assert_eq!(parsed.key, EmojiKey::Unicode("✅".to_string()));
        assert_eq!(parsed.display, "✅");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_emoji("").is_err());
        assert!(parse_emoji("hello").is_err());
        assert!(parse_emoji("<:nope>").is_err());
        assert!(parse_emoji("<::12>").is_err());
        assert!(parse_emoji("<:x:notanid>").is_err());
    }

    #[test]
    fn test_parse_keycap_emoji() {
        let parsed = parse_emoji("1\u{fe0f}\u{20e3}").unwrap();
        assert!(matches!(parsed.key, EmojiKey::Unicode(_)));
    }

    #[test]
    fn test_custom_and_unicode_never_collide() {
        // A unicode key whose text happens to look like an id stays distinct
        assert_ne!(EmojiKey::Unicode("123".to_string()), EmojiKey::Custom(123));
    }

    #[test]
    fn test_emoji_key_wire_format() {
        let value = serde_json::to_value(EmojiKey::Custom(5)).unwrap();
        assert_eq!(value, serde_json::json!({"kind": "custom", "value": 5}));
    }

    #[test]
    fn test_parse_lists() {
        let emojis = parse_emoji_list("✅ <:pepe:1>  🎮").unwrap();
        assert_eq!(emojis.len(), 3);

        let roles = parse_role_list("<@&10> 20").unwrap();
        assert_eq!(roles, vec![10, 20]);
        assert!(parse_role_list("<@&x>").is_err());
    }
}
