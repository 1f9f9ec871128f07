//! Reading events out of decision-service replies.
//!
//! Two formats are accepted. The line grammar the event prompt asks for:
//!
//! ```text
//! TYPE: TOWN
//! SCOPE: GLOBAL
//! DESCRIPTION: "A travelling circus arrives"
//! DURATION: 30
//! IMPACT: {mood: 10, sociability: 5}
//! ```
//!
//! and a JSON object with `description`, `type`, `scope`, `duration`,
//! `impact`, and `affectedAgents` keys, optionally wrapped in a code fence.
//! [`interpret_event_reply`] tries both and otherwise uses the raw text as
//! the description.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use smalltown_agents::grammar::{Pattern, capture};
use smalltown_types::{EventKind, EventScope, ImpactDelta, MS_PER_SECOND};
use tracing::debug;

/// Largest magnitude accepted for a single impact component.
pub const MAX_IMPACT: i32 = 100;
const MIN_IMPACT: i32 = -100;

static TYPE: Pattern =
    LazyLock::new(|| Regex::new(r"(?i)\bTYPE:\s*(SOCIAL|ENVIRONMENTAL|PERSONAL|TOWN)\b").ok());
static SCOPE: Pattern =
    LazyLock::new(|| Regex::new(r"(?i)\bSCOPE:\s*(INDIVIDUAL|LOCAL|GLOBAL)\b").ok());
static DESCRIPTION: Pattern = LazyLock::new(|| Regex::new(r#"\bDESCRIPTION:\s*"(.+)""#).ok());
static DURATION: Pattern = LazyLock::new(|| Regex::new(r"\bDURATION:\s*(\d+)").ok());
static IMPACT: Pattern = LazyLock::new(|| Regex::new(r"\bIMPACT:\s*\{([^}]*)\}").ok());
static MOOD: Pattern = LazyLock::new(|| Regex::new(r"(?i)\bmood:\s*(-?\d+)").ok());
static ENERGY: Pattern = LazyLock::new(|| Regex::new(r"(?i)\benergy:\s*(-?\d+)").ok());
static SOCIABILITY: Pattern = LazyLock::new(|| Regex::new(r"(?i)\bsociability:\s*(-?\d+)").ok());

/// An event as described by a reply, before it is placed in the world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEvent {
    /// Category.
    pub kind: EventKind,
    /// Blast radius.
    pub scope: EventScope,
    /// What happens.
    pub description: String,
    /// Duration, if the reply gave one.
    pub duration_ms: Option<u64>,
    /// Attribute changes, each component within [`MAX_IMPACT`].
    pub impact: ImpactDelta,
    /// Residents the reply named as affected.
    pub affected_names: Vec<String>,
}

/// Parse the `TYPE`/`SCOPE`/`DESCRIPTION` line grammar.
///
/// Returns `None` unless all three required keys are present. `DURATION`
/// is read as minutes.
pub fn parse_event_grammar(text: &str) -> Option<ParsedEvent> {
    let kind = EventKind::from_label(&capture(&TYPE, text)?.to_ascii_lowercase())?;
    let scope = EventScope::from_label(&capture(&SCOPE, text)?.to_ascii_lowercase())?;
    let description = capture(&DESCRIPTION, text)?.trim().to_owned();
    let duration_ms = capture(&DURATION, text)
        .and_then(|d| d.parse::<u64>().ok())
        .map(minutes_to_ms);
    let impact = capture(&IMPACT, text).map(parse_impact).unwrap_or_default();
    Some(ParsedEvent {
        kind,
        scope,
        description,
        duration_ms,
        impact,
        affected_names: Vec::new(),
    })
}

fn parse_impact(body: &str) -> ImpactDelta {
    let component = |pattern: &Pattern| {
        capture(pattern, body)
            .and_then(|v| v.parse::<i32>().ok())
            .map_or(0, clamp_impact)
    };
    ImpactDelta {
        mood: component(&MOOD),
        energy: component(&ENERGY),
        sociability: component(&SOCIABILITY),
    }
}

fn clamp_impact(value: i32) -> i32 {
    value.clamp(MIN_IMPACT, MAX_IMPACT)
}

const fn minutes_to_ms(minutes: u64) -> u64 {
    minutes.saturating_mul(60).saturating_mul(MS_PER_SECOND)
}

// ---------------------------------------------------------------------------
// JSON form
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct EventJson {
    description: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    scope: Option<String>,
    duration: Option<f64>,
    impact: Option<serde_json::Value>,
    affected_agents: Vec<serde_json::Value>,
}

/// The outermost `{ ... }` slice of `text`, skipping code fences and prose.
pub fn json_object_slice(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| text.get(start..=end)).flatten()
}

/// Read an integer from a JSON number or numeric string, rounding floats.
pub(crate) fn json_int(value: Option<&serde_json::Value>) -> i32 {
    let number = match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    // Clamped to a small range first, so the cast cannot truncate.
    #[allow(clippy::cast_possible_truncation)]
    let value = number
        .filter(|n| n.is_finite())
        .map_or(0, |n| n.round().clamp(-1_000.0, 1_000.0) as i32);
    clamp_impact(value)
}

/// Read an impact delta from a JSON object.
pub(crate) fn json_impact(value: Option<&serde_json::Value>) -> ImpactDelta {
    let Some(serde_json::Value::Object(map)) = value else {
        return ImpactDelta::default();
    };
    ImpactDelta {
        mood: json_int(map.get("mood")),
        energy: json_int(map.get("energy")),
        sociability: json_int(map.get("sociability")),
    }
}

/// Parse the JSON form. Requires a non-empty `description`.
pub fn parse_event_json(text: &str) -> Option<ParsedEvent> {
    let parsed: EventJson = serde_json::from_str(json_object_slice(text)?).ok()?;
    let description = parsed.description.filter(|d| !d.trim().is_empty())?;
    let kind = parsed
        .kind
        .and_then(|k| EventKind::from_label(&k.to_ascii_lowercase()))
        .unwrap_or(EventKind::Environmental);
    let scope = parsed
        .scope
        .and_then(|s| EventScope::from_label(&s.to_ascii_lowercase()))
        .unwrap_or(EventScope::Local);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let duration_ms = parsed
        .duration
        .filter(|d| d.is_finite() && *d > 0.0)
        .map(|d| minutes_to_ms(d.round().min(10_000.0) as u64));
    let affected_names = parsed
        .affected_agents
        .into_iter()
        .filter_map(|v| match v {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
            _ => None,
        })
        .collect();
    Some(ParsedEvent {
        kind,
        scope,
        description: description.trim().to_owned(),
        duration_ms,
        impact: json_impact(parsed.impact.as_ref()),
        affected_names,
    })
}

/// Interpret any reply as an event.
///
/// Tries the line grammar, then JSON, then treats the trimmed text as the
/// description of a local environmental event. Returns `None` only for an
/// empty reply.
pub fn interpret_event_reply(text: &str) -> Option<ParsedEvent> {
    if let Some(event) = parse_event_grammar(text) {
        return Some(event);
    }
    if let Some(event) = parse_event_json(text) {
        return Some(event);
    }
    let description = text.trim();
    if description.is_empty() {
        return None;
    }
    debug!(reply = description, "event reply not structured, using raw text");
    Some(ParsedEvent {
        kind: EventKind::Environmental,
        scope: EventScope::Local,
        description: description.to_owned(),
        duration_ms: None,
        impact: ImpactDelta::default(),
        affected_names: Vec::new(),
    })
}
