//! Agent reactions to events.
//!
//! The reaction prompt asks for a JSON object:
//!
//! ```json
//! {"action": "...", "detail": "...", "stateChange": {"mood": 3},
//!  "emotionChange": "relieved", "triggeredEvent": null}
//! ```
//!
//! Anything that does not parse becomes a reaction with action `unknown`
//! and the raw reply as its detail.

use serde::Deserialize;
use smalltown_types::{AgentId, ImpactDelta};

use crate::parse::{json_impact, json_object_slice};

/// Action label used when a reply cannot be read.
pub const UNKNOWN_ACTION: &str = "unknown";

/// What an agent did in response to an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reaction {
    /// Who reacted.
    pub agent_id: AgentId,
    /// Short action label.
    pub action: String,
    /// One-sentence description.
    pub detail: String,
    /// Attribute changes to apply, clamped by the caller.
    pub state_change: ImpactDelta,
    /// New emotion, if the agent reported one.
    pub emotion_change: Option<String>,
    /// Description of a follow-on event this reaction sets off.
    pub triggered_event: Option<String>,
}

impl Reaction {
    /// One line for chain history and logs.
    pub fn summary(&self, name: &str) -> String {
        if self.detail.is_empty() {
            format!("{name}: {}", self.action)
        } else {
            format!("{name}: {} ({})", self.action, self.detail)
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ReactionJson {
    action: Option<serde_json::Value>,
    detail: Option<serde_json::Value>,
    state_change: Option<serde_json::Value>,
    emotion_change: Option<serde_json::Value>,
    triggered_event: Option<serde_json::Value>,
}

/// Parse a reaction reply. Never fails.
pub fn parse_reaction(agent_id: AgentId, reply: &str) -> Reaction {
    let parsed = json_object_slice(reply)
        .and_then(|slice| serde_json::from_str::<ReactionJson>(slice).ok());
    let Some(parsed) = parsed else {
        return Reaction {
            agent_id,
            action: UNKNOWN_ACTION.to_owned(),
            detail: reply.trim().to_owned(),
            state_change: ImpactDelta::default(),
            emotion_change: None,
            triggered_event: None,
        };
    };
    Reaction {
        agent_id,
        action: text(parsed.action.as_ref()).unwrap_or_default(),
        detail: text(parsed.detail.as_ref()).unwrap_or_default(),
        state_change: json_impact(parsed.state_change.as_ref()),
        emotion_change: text(parsed.emotion_change.as_ref()),
        triggered_event: triggered(parsed.triggered_event.as_ref()),
    }
}

fn text(value: Option<&serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_owned())
        }
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn triggered(value: Option<&serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::Object(map) => text(map.get("description"))
            .or_else(|| Some(serde_json::Value::Object(map.clone()).to_string())),
        serde_json::Value::Bool(_) | serde_json::Value::Null => None,
        other => text(Some(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_reaction_in_code_fence() {
        let id = AgentId::new();
        let reply = "```json\n{\"action\": \"help\", \"detail\": \"Ming carries water\", \
                     \"stateChange\": {\"mood\": 4, \"energy\": -6}, \
                     \"emotionChange\": \"determined\", \
                     \"triggeredEvent\": {\"description\": \"A bucket brigade forms\"}}\n```";
        let reaction = parse_reaction(id, reply);
        assert_eq!(reaction.agent_id, id);
        assert_eq!(reaction.action, "help");
        assert_eq!(reaction.detail, "Ming carries water");
        assert_eq!(
            reaction.state_change,
            ImpactDelta {
                mood: 4,
                energy: -6,
                sociability: 0,
            }
        );
        assert_eq!(reaction.emotion_change.as_deref(), Some("determined"));
        assert_eq!(
            reaction.triggered_event.as_deref(),
            Some("A bucket brigade forms")
        );
    }

    #[test]
    fn non_json_reply_becomes_unknown() {
        let reaction = parse_reaction(AgentId::new(), "I shrug and go home.");
        assert_eq!(reaction.action, UNKNOWN_ACTION);
        assert_eq!(reaction.detail, "I shrug and go home.");
        assert!(reaction.triggered_event.is_none());
    }

    #[test]
    fn empty_or_false_trigger_is_ignored() {
        let id = AgentId::new();
        let none = parse_reaction(id, r#"{"action": "wave", "triggeredEvent": ""}"#);
        assert!(none.triggered_event.is_none());
        let flag = parse_reaction(id, r#"{"action": "wave", "triggeredEvent": false}"#);
        assert!(flag.triggered_event.is_none());
        let plain = parse_reaction(id, r#"{"action": "shout", "triggeredEvent": "Alarm bells"}"#);
        assert_eq!(plain.triggered_event.as_deref(), Some("Alarm bells"));
    }

    #[test]
    fn summary_includes_detail_when_present() {
        let mut reaction = parse_reaction(AgentId::new(), r#"{"action": "wave"}"#);
        assert_eq!(reaction.summary("Hong"), "Hong: wave");
        reaction.detail = "from the porch".to_owned();
        assert_eq!(reaction.summary("Hong"), "Hong: wave (from the porch)");
    }
}
