use crafter_core::{Observation, PlayerStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Represents a request sent from the agent to the engine bridge.
///
/// Each request is one JSON object on its own line.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineRequest {
    /// Start a new episode.
    Reset,
    /// Apply one action by engine id.
    Step { action: u32 },
    /// Ask the bridge to exit.
    Close,
}

/// Represents a response sent from the engine bridge back to the agent.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EngineResponse {
    Ok(EnginePayload),
    Error { message: String },
}

/// State reported after `reset` or `step`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct EnginePayload {
    #[serde(default)]
    pub observation: Observation,
    #[serde(default)]
    pub reward: f64,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub info: Value,
    #[serde(default)]
    pub player: PlayerStatus,
}
