//! Boundary to the game engine, which runs outside this crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::errors::EngineResult;

/// What the agent sees after a reset or a step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Rendered frame, base64 encoded, when the engine sends one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Local view as a grid of material/creature names.
    #[serde(default)]
    pub text_grid: Vec<Vec<String>>,
    /// Vitals and items, e.g. `health`, `food`, `wood`.
    #[serde(default)]
    pub inventory: BTreeMap<String, i64>,
}

impl Observation {
    /// Renders the grid one row per line, cells separated by commas.
    pub fn layout(&self) -> String {
        self.text_grid
            .iter()
            .map(|row| row.join(", "))
            .collect::<Vec<_>>()
            .join(";\n")
    }
}

/// Result of applying one action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub observation: Observation,
    pub reward: f64,
    pub done: bool,
    #[serde(default)]
    pub info: Value,
}

/// Read-only player state reported by the engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerStatus {
    #[serde(default)]
    pub sleeping: bool,
    /// Set when vitals changed on their own (hunger, thirst, fatigue) during
    /// the last step rather than because of the action.
    #[serde(default)]
    pub status_changed: bool,
    #[serde(default)]
    pub achievements: BTreeMap<String, u32>,
    #[serde(default)]
    pub internal_counters: BTreeMap<String, f64>,
}

/// The game engine as the episode driver sees it.
///
/// `player` answers from the state reported by the most recent `reset` or
/// `step` and never talks to the engine.
#[async_trait]
pub trait GameEngine: Send {
    async fn reset(&mut self) -> EngineResult<Observation>;

    async fn step(&mut self, action_id: u32) -> EngineResult<StepOutcome>;

    fn player(&self) -> &PlayerStatus;
}
