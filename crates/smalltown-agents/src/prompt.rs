//! Prompt template loading and rendering via `minijinja`.
//!
//! Every prompt the town sends to a decision service comes from one of the
//! templates in [`PromptKind`]. The defaults are compiled in. Operators can
//! point [`PromptEngine::from_dir`] at a directory holding files of the same
//! names to tune wording without recompiling.

use std::path::Path;

use minijinja::Environment;
use serde::Serialize;
use smalltown_types::{Attributes, Position};

use crate::agent::Agent;
use crate::error::AgentError;
use crate::interaction::InteractionContext;

/// The templates the engine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    /// Per-agent decision: what to do next.
    Decision,
    /// One line of conversation.
    Dialogue,
    /// A general interaction with another agent.
    Interaction,
    /// A new town event for an event chain.
    Event,
    /// An agent's reaction to an event.
    Reaction,
}

impl PromptKind {
    /// Every template.
    pub const ALL: [Self; 5] = [
        Self::Decision,
        Self::Dialogue,
        Self::Interaction,
        Self::Event,
        Self::Reaction,
    ];

    /// Template name, also the file stem on disk.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Decision => "decision",
            Self::Dialogue => "dialogue",
            Self::Interaction => "interaction",
            Self::Event => "event",
            Self::Reaction => "reaction",
        }
    }

    const fn builtin_source(self) -> &'static str {
        match self {
            Self::Decision => include_str!("../templates/decision.j2"),
            Self::Dialogue => include_str!("../templates/dialogue.j2"),
            Self::Interaction => include_str!("../templates/interaction.j2"),
            Self::Event => include_str!("../templates/event.j2"),
            Self::Reaction => include_str!("../templates/reaction.j2"),
        }
    }
}

/// Template view of an agent.
#[derive(Debug, Clone, Serialize)]
pub struct Persona<'a> {
    /// Display name.
    pub name: &'a str,
    /// Personality description.
    pub personality: &'a str,
    /// Mood word.
    pub mood: &'a str,
    /// Character traits.
    pub traits: &'a [String],
    /// Current tile.
    pub position: Position,
    /// Current attributes.
    pub attributes: Attributes,
    /// What the agent is doing.
    pub current_action: &'a str,
}

impl<'a> Persona<'a> {
    /// View `agent` for templating.
    pub fn of(agent: &'a Agent) -> Self {
        Self {
            name: &agent.name,
            personality: &agent.personality,
            mood: &agent.mood,
            traits: &agent.traits,
            position: agent.position,
            attributes: agent.attributes,
            current_action: &agent.current_action,
        }
    }
}

/// Manages prompt templates.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl std::fmt::Debug for PromptEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptEngine").finish_non_exhaustive()
    }
}

impl PromptEngine {
    /// An engine using the compiled-in templates.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Template`] if a built-in template fails to parse.
    pub fn builtin() -> Result<Self, AgentError> {
        let mut env = new_environment();
        for kind in PromptKind::ALL {
            env.add_template_owned(kind.name(), kind.builtin_source().to_owned())
                .map_err(|e| {
                    AgentError::Template(format!("failed to add {} template: {e}", kind.name()))
                })?;
        }
        Ok(Self { env })
    }

    /// An engine reading `<name>.j2` files from `dir`. Files that are missing
    /// fall back to the built-in template of the same name.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Template`] if a file cannot be read or parsed.
    pub fn from_dir(dir: &Path) -> Result<Self, AgentError> {
        let mut env = new_environment();
        for kind in PromptKind::ALL {
            let path = dir.join(format!("{}.j2", kind.name()));
            let source = if path.exists() {
                std::fs::read_to_string(&path).map_err(|e| {
                    AgentError::Template(format!("failed to read {}: {e}", path.display()))
                })?
            } else {
                kind.builtin_source().to_owned()
            };
            env.add_template_owned(kind.name(), source).map_err(|e| {
                AgentError::Template(format!("failed to add {} template: {e}", kind.name()))
            })?;
        }
        Ok(Self { env })
    }

    /// Render `kind` with a serializable context.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Template`] on a missing template or render failure.
    pub fn render<C: Serialize>(&self, kind: PromptKind, context: C) -> Result<String, AgentError> {
        self.env
            .get_template(kind.name())
            .map_err(|e| AgentError::Template(format!("missing {} template: {e}", kind.name())))?
            .render(context)
            .map_err(|e| AgentError::Template(format!("{} render failed: {e}", kind.name())))
    }

    /// Render a dialogue or interaction prompt.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Template`] on render failure.
    pub fn render_exchange(
        &self,
        kind: PromptKind,
        initiator: &Agent,
        target: &Agent,
        context: &InteractionContext,
    ) -> Result<String, AgentError> {
        self.render(
            kind,
            minijinja::context! {
                initiator => Persona::of(initiator),
                target => Persona::of(target),
                location => context.location,
                time_of_day => context.time_of_day.label(),
                recent_events => context.recent_events,
                previous_lines => context.previous_lines,
            },
        )
    }
}

fn new_environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use smalltown_types::{SimTime, TimeOfDay};

    use super::*;
    use crate::agent::tests::make_agent;

    fn context() -> InteractionContext {
        InteractionContext {
            location: "park".to_owned(),
            time_of_day: TimeOfDay::Afternoon,
            recent_events: vec!["Rain started".to_owned()],
            previous_lines: vec!["Ben: Hello!".to_owned()],
            now: SimTime::ZERO,
            range: 1,
        }
    }

    #[test]
    fn builtin_templates_parse() {
        assert!(PromptEngine::builtin().is_ok());
    }

    #[test]
    fn dialogue_prompt_mentions_both_parties() {
        let engine = PromptEngine::builtin().unwrap();
        let ana = make_agent("Ana", 0, 0);
        let ben = make_agent("Ben", 1, 0);
        let prompt = engine
            .render_exchange(PromptKind::Dialogue, &ana, &ben, &context())
            .unwrap();
        assert!(prompt.starts_with("You are Ana, talking with Ben."));
        assert!(prompt.contains("- Location: park"));
        assert!(prompt.contains("- Time: afternoon"));
        assert!(prompt.contains("- Rain started"));
        assert!(prompt.contains("Ben: Hello!"));
        assert!(prompt.contains("MESSAGE: \"what you say\""));
    }

    #[test]
    fn interaction_prompt_names_target() {
        let engine = PromptEngine::builtin().unwrap();
        let ana = make_agent("Ana", 0, 0);
        let ben = make_agent("Ben", 1, 0);
        let prompt = engine
            .render_exchange(PromptKind::Interaction, &ana, &ben, &context())
            .unwrap();
        assert!(prompt.contains("TARGET: Ben"));
    }

    #[test]
    fn directory_overrides_fall_back_to_builtin() {
        let dir = std::env::temp_dir().join(format!(
            "smalltown_prompt_override_{}_{:?}",
            std::process::id(),
            std::thread::current().id(),
        ));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("dialogue.j2"), "Hi from {{ initiator.name }}").unwrap();

        let engine = PromptEngine::from_dir(&dir).unwrap();
        let ana = make_agent("Ana", 0, 0);
        let ben = make_agent("Ben", 1, 0);
        let dialogue = engine
            .render_exchange(PromptKind::Dialogue, &ana, &ben, &context())
            .unwrap();
        assert_eq!(dialogue, "Hi from Ana");
        let interaction = engine
            .render_exchange(PromptKind::Interaction, &ana, &ben, &context())
            .unwrap();
        assert!(interaction.contains("TARGET: Ben"));

        std::fs::remove_dir_all(&dir).ok();
    }
}
