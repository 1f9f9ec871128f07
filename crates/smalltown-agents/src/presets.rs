//! The four residents a fresh town starts with.

use std::collections::BTreeMap;

use smalltown_types::{AgentState, Attributes, Position};

use crate::agent::AgentProfile;

fn schedule(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(time, activity)| ((*time).to_owned(), (*activity).to_owned()))
        .collect()
}

fn needs(energy: i32, social: i32, fun: i32) -> BTreeMap<String, i32> {
    BTreeMap::from([
        ("energy".to_owned(), energy),
        ("social".to_owned(), social),
        ("fun".to_owned(), fun),
    ])
}

fn traits(items: &[&str]) -> Vec<String> {
    items.iter().map(|t| (*t).to_owned()).collect()
}

/// Default resident profiles, in roster order.
pub fn default_residents() -> Vec<AgentProfile> {
    vec![
        AgentProfile {
            name: "Ming".to_owned(),
            personality: "lively, curious, friendly".to_owned(),
            mood: "cheerful".to_owned(),
            traits: traits(&["kind", "creative", "loves making friends"]),
            schedule: schedule(&[
                ("08:00", "breakfast"),
                ("09:00", "explore the town"),
                ("12:00", "lunch"),
                ("14:00", "chat with friends"),
                ("18:00", "dinner"),
                ("21:00", "rest"),
            ]),
            needs: needs(80, 60, 70),
            position: Position::new(5, 5),
            state: AgentState::Idle,
            attributes: Attributes::clamped(100, 50, 70),
            current_action: "exploring the town".to_owned(),
            llm_profile: "deepseek-v3".to_owned(),
        },
        AgentProfile {
            name: "Hong".to_owned(),
            personality: "gentle, attentive, helpful".to_owned(),
            mood: "content".to_owned(),
            traits: traits(&["patient", "thoughtful", "tidy"]),
            schedule: schedule(&[
                ("07:30", "morning exercise"),
                ("08:30", "breakfast"),
                ("09:30", "tidy the house"),
                ("12:00", "lunch"),
                ("13:30", "read"),
                ("17:00", "help the neighbors"),
                ("19:00", "dinner"),
                ("20:30", "rest"),
            ]),
            needs: needs(90, 70, 60),
            position: Position::new(3, 3),
            state: AgentState::Idle,
            attributes: Attributes::clamped(100, 60, 80),
            current_action: "sorting belongings".to_owned(),
            llm_profile: "qwen-max".to_owned(),
        },
        AgentProfile {
            name: "Old Wang".to_owned(),
            personality: "hardworking, meticulous, responsible".to_owned(),
            mood: "focused".to_owned(),
            traits: traits(&["diligent", "disciplined", "dependable"]),
            schedule: schedule(&[
                ("06:00", "open the shop"),
                ("12:00", "lunch"),
                ("13:00", "restock"),
                ("18:00", "close the shop"),
                ("19:00", "rest"),
            ]),
            needs: needs(70, 30, 40),
            position: Position::new(1, 1),
            state: AgentState::Working,
            attributes: Attributes::clamped(100, 80, 40),
            current_action: "running the shop".to_owned(),
            llm_profile: "qwq-plus".to_owned(),
        },
        AgentProfile {
            name: "Zhang".to_owned(),
            personality: "outgoing, optimistic, loves performing".to_owned(),
            mood: "upbeat".to_owned(),
            traits: traits(&["funny", "theatrical", "optimistic"]),
            schedule: schedule(&[
                ("08:00", "workout"),
                ("09:00", "perform"),
                ("12:00", "lunch"),
                ("14:00", "play with friends"),
                ("18:00", "dinner"),
                ("21:00", "rest"),
            ]),
            needs: needs(95, 95, 100),
            position: Position::new(7, 1),
            state: AgentState::Resting,
            attributes: Attributes::clamped(100, 90, 90),
            current_action: "resting".to_owned(),
            llm_profile: "llama-4-scout-17b-16e-instruct".to_owned(),
        },
    ]
}
