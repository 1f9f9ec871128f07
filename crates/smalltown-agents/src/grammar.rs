//! Token grammar shared by every decision-service reply.
//!
//! Replies are free text carrying `KEY: value` lines, for example:
//!
//! ```text
//! ACTION: SPEAK
//! TARGET: Hong
//! MESSAGE: "Lovely morning, isn't it?"
//! ```
//!
//! Each extractor returns `None` when its key is absent or malformed. Keys
//! with a fixed vocabulary match case-insensitively; quoted values must use
//! straight double quotes and stay on one line.

use std::sync::LazyLock;

use regex::Regex;
use smalltown_types::{Direction, Position};

/// A compiled pattern. `None` only if the literal below fails to compile.
pub type Pattern = LazyLock<Option<Regex>>;

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        static $name: Pattern = LazyLock::new(|| Regex::new($re).ok());
    };
}

pattern!(ACTION, r"(?i)\bACTION:\s*(MOVE|INTERACT|SPEAK|IDLE|PURSUE_GOAL|WANDER)\b");
pattern!(DIRECTION, r"(?i)\bDIRECTION:\s*(UP|DOWN|LEFT|RIGHT)\b");
pattern!(DESTINATION, r"(?i)\bDESTINATION:\s*\(?\s*(-?\d+)\s*,\s*(-?\d+)\s*\)?");
pattern!(TARGET, r"\bTARGET:[ \t]*(.+)");
pattern!(MESSAGE, r#"\bMESSAGE:\s*"(.+)""#);
pattern!(INTERACTION, r#"\bINTERACTION:\s*"(.+)""#);
pattern!(GOAL, r#"\bGOAL:\s*"(.+)""#);
pattern!(PRIORITY, r"\bPRIORITY:\s*(\d+)");

/// First capture group of `pattern` in `text`.
pub fn capture<'t>(pattern: &Pattern, text: &'t str) -> Option<&'t str> {
    pattern
        .as_ref()?
        .captures(text)?
        .get(1)
        .map(|m| m.as_str())
}

/// The `ACTION` token, upper-cased.
pub fn action_token(text: &str) -> Option<String> {
    capture(&ACTION, text).map(str::to_ascii_uppercase)
}

/// The `DIRECTION` field.
pub fn direction(text: &str) -> Option<Direction> {
    capture(&DIRECTION, text).and_then(Direction::from_token)
}

/// The `DESTINATION` field, written `(x, y)` or `x, y`.
pub fn destination(text: &str) -> Option<Position> {
    let caps = DESTINATION.as_ref()?.captures(text)?;
    let x = caps.get(1)?.as_str().parse().ok()?;
    let y = caps.get(2)?.as_str().parse().ok()?;
    Some(Position::new(x, y))
}

/// The `TARGET` field with surrounding quotes and brackets removed.
pub fn target(text: &str) -> Option<String> {
    let raw = capture(&TARGET, text)?;
    let cleaned = raw
        .trim()
        .trim_matches(|c| matches!(c, '"' | '\'' | '[' | ']'))
        .trim();
    (!cleaned.is_empty()).then(|| cleaned.to_owned())
}

/// The quoted `MESSAGE` field.
pub fn message(text: &str) -> Option<String> {
    capture(&MESSAGE, text).map(str::to_owned)
}

/// The quoted `INTERACTION` field.
pub fn interaction(text: &str) -> Option<String> {
    capture(&INTERACTION, text).map(str::to_owned)
}

/// The quoted `GOAL` field.
pub fn goal(text: &str) -> Option<String> {
    capture(&GOAL, text).map(str::to_owned)
}

/// The integer `PRIORITY` field.
pub fn priority(text: &str) -> Option<u32> {
    capture(&PRIORITY, text).and_then(|p| p.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_token_is_case_insensitive() {
        assert_eq!(action_token("action: move"), Some("MOVE".to_owned()));
        assert_eq!(action_token("ACTION: PURSUE_GOAL"), Some("PURSUE_GOAL".to_owned()));
        assert_eq!(action_token("ACTION: DANCE"), None);
    }

    #[test]
    fn quoted_fields_require_quotes() {
        assert_eq!(message(r#"MESSAGE: "hi there""#), Some("hi there".to_owned()));
        assert_eq!(message("MESSAGE: hi there"), None);
        assert_eq!(goal(r#"GOAL: "open the bakery""#), Some("open the bakery".to_owned()));
    }

    #[test]
    fn target_strips_decoration() {
        assert_eq!(target("TARGET: [Hong]\nMESSAGE: \"x\""), Some("Hong".to_owned()));
        assert_eq!(target("TARGET: \"Old Wang\""), Some("Old Wang".to_owned()));
        assert_eq!(target("TARGET:   \n"), None);
    }

    #[test]
    fn destination_accepts_both_forms() {
        assert_eq!(destination("DESTINATION: (3, 4)"), Some(Position::new(3, 4)));
        assert_eq!(destination("destination: 7,1"), Some(Position::new(7, 1)));
        assert_eq!(destination("DESTINATION: home"), None);
    }

    #[test]
    fn numbers_and_directions() {
        assert_eq!(priority("PRIORITY: 3"), Some(3));
        assert_eq!(priority("PRIORITY: high"), None);
        assert_eq!(direction("DIRECTION: left"), Some(Direction::Left));
    }
}
