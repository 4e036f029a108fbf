#![allow(dead_code)]

use async_trait::async_trait;
use crafter_core::errors::{EngineResult, TransientKind, TransportError, TransportResult};
use crafter_core::{
    ActionCatalog, ActionSelector, ChatTransport, GameEngine, LlmClient, ModelProfile,
    Observation, PlayerStatus, PromptBuilder, RetryPolicy, StepOutcome, Turn,
};
use crafter_core::config::AgentType;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// A recorded call to the scripted transport
#[derive(Debug, Clone)]
pub struct Call {
    pub at: Instant,
    pub turns: Vec<Turn>,
    pub json_format: bool,
}

/// Transport that replays a script, then repeats `tail` forever.
#[derive(Clone)]
pub struct ScriptedTransport {
    script: Arc<Mutex<VecDeque<TransportResult<String>>>>,
    tail: Option<String>,
    pub calls: Arc<Mutex<Vec<Call>>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<TransportResult<String>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            tail: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn repeating(text: &str) -> Self {
        let mut transport = Self::new(Vec::new());
        transport.tail = Some(text.to_string());
        transport
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn complete(&self, turns: &[Turn], json_format: bool) -> TransportResult<String> {
        self.calls.lock().unwrap().push(Call {
            at: Instant::now(),
            turns: turns.to_vec(),
            json_format,
        });
        if let Some(reply) = self.script.lock().unwrap().pop_front() {
            return reply;
        }
        match &self.tail {
            Some(text) => Ok(text.clone()),
            None => Err(TransportError::fatal("script exhausted")),
        }
    }
}

pub fn rate_limited() -> TransportResult<String> {
    Err(TransportError::transient(TransientKind::RateLimit, "429 Too Many Requests"))
}

pub fn policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 100,
        base_delay: Duration::from_millis(1_000),
        max_delay: Duration::from_millis(10_000),
    }
}

pub fn selector(transport: ScriptedTransport, max_attempts: u32) -> ActionSelector<ScriptedTransport> {
    let client = LlmClient::new(
        transport,
        policy(),
        ModelProfile {
            supports_system_role: true,
            context_budget: 128_000,
        },
    );
    ActionSelector::new(client, PromptBuilder::new(AgentType::Plain, 64), max_attempts)
}

pub fn grid(cell: &str) -> Vec<Vec<String>> {
    vec![vec![cell.to_string(); 3]; 3]
}

pub fn observation(cell: &str, health: i64) -> Observation {
    let mut inventory = BTreeMap::new();
    inventory.insert("health".to_string(), health);
    inventory.insert("food".to_string(), 9);
    Observation {
        image: None,
        text_grid: grid(cell),
        inventory,
    }
}

/// One scripted engine step
#[derive(Debug, Clone)]
pub struct FakeStep {
    pub outcome: StepOutcome,
    pub player: PlayerStatus,
}

/// Engine that replays scripted steps and records the action ids it was given.
pub struct FakeEngine {
    pub initial: Observation,
    pub initial_player: PlayerStatus,
    pub steps: VecDeque<FakeStep>,
    pub actions: Arc<Mutex<Vec<u32>>>,
    player: PlayerStatus,
}

impl FakeEngine {
    pub fn new(initial: Observation, steps: Vec<FakeStep>) -> Self {
        Self {
            initial,
            initial_player: PlayerStatus::default(),
            steps: steps.into(),
            actions: Arc::new(Mutex::new(Vec::new())),
            player: PlayerStatus::default(),
        }
    }
}

#[async_trait]
impl GameEngine for FakeEngine {
    async fn reset(&mut self) -> EngineResult<Observation> {
        self.player = self.initial_player.clone();
        Ok(self.initial.clone())
    }

    async fn step(&mut self, action_id: u32) -> EngineResult<StepOutcome> {
        self.actions.lock().unwrap().push(action_id);
        let step = self.steps.pop_front().unwrap_or_else(|| FakeStep {
            outcome: StepOutcome {
                observation: self.initial.clone(),
                reward: 0.0,
                done: true,
                info: serde_json::Value::Null,
            },
            player: PlayerStatus::default(),
        });
        self.player = step.player;
        Ok(step.outcome)
    }

    fn player(&self) -> &PlayerStatus {
        &self.player
    }
}

pub fn step(observation: Observation, reward: f64, done: bool, player: PlayerStatus) -> FakeStep {
    FakeStep {
        outcome: StepOutcome {
            observation,
            reward,
            done,
            info: serde_json::Value::Null,
        },
        player,
    }
}

pub fn catalog() -> ActionCatalog {
    ActionCatalog::crafter()
}
