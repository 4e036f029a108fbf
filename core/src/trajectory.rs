//! Trajectory records and the files they are written to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::catalog::ActionCatalog;
use crate::engine::Observation;
use crate::errors::AgentResult;
use crate::types::ActionResponse;

/// Game state as stored in a trajectory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub text_grid: Vec<Vec<String>>,
    pub inventory: BTreeMap<String, i64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub internal_counters: BTreeMap<String, f64>,
}

impl StateSnapshot {
    pub fn new(observation: &Observation, internal_counters: &BTreeMap<String, f64>) -> Self {
        Self {
            text_grid: observation.text_grid.clone(),
            inventory: observation.inventory.clone(),
            internal_counters: internal_counters.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcomes {
    pub success: u32,
    pub fail: u32,
}

/// Running count of how often each action had a visible effect
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionTally(BTreeMap<String, Outcomes>);

impl ActionTally {
    pub fn new(catalog: &ActionCatalog) -> Self {
        Self(
            catalog
                .names()
                .map(|name| (name.to_string(), Outcomes::default()))
                .collect(),
        )
    }

    pub fn record(&mut self, action: &str, success: bool) {
        let entry = self.0.entry(action.to_string()).or_default();
        if success {
            entry.success += 1;
        } else {
            entry.fail += 1;
        }
    }

    pub fn get(&self, action: &str) -> Outcomes {
        self.0.get(action).copied().unwrap_or_default()
    }
}

/// One accepted step of an agent run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    #[serde(rename = "s_t")]
    pub state: StateSnapshot,
    #[serde(rename = "a_t")]
    pub action: ActionResponse,
    #[serde(rename = "r_t")]
    pub reward: f64,
    #[serde(rename = "cumulative_r_t")]
    pub cumulative_reward: f64,
    #[serde(rename = "s_t+1")]
    pub next_state: StateSnapshot,
    pub done: bool,
    pub action_counter: ActionTally,
}

/// Log of an agent episode, written as one JSON document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryLog {
    pub seed: u64,
    pub started_at: DateTime<Utc>,
    pub log: Vec<Transition>,
}

impl TrajectoryLog {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            started_at: Utc::now(),
            log: Vec::new(),
        }
    }

    pub fn push(&mut self, transition: Transition) {
        self.log.push(transition);
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// Writes the whole log, replacing any previous file at `path`.
    pub fn save(&self, path: &Path) -> AgentResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    pub fn load(path: &Path) -> AgentResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Fresh file name under `dir` for a run with `seed`.
pub fn run_log_path(dir: &Path, seed: u64) -> PathBuf {
    dir.join(format!("{}_seed_{}.json", uuid::Uuid::new_v4(), seed))
}

/// One step of a human-played recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedStep {
    #[serde(rename = "s_t")]
    pub state: StateSnapshot,
    #[serde(rename = "a_t")]
    pub action: String,
    #[serde(rename = "s_t+1")]
    pub next_state: StateSnapshot,
}

/// Appends recorded steps to a JSON-lines file, one step per line.
pub struct JsonlRecorder {
    path: PathBuf,
    writer: BufWriter<File>,
    written: usize,
}

impl JsonlRecorder {
    /// Creates `dir/trajectory_<uuid>.jsonl`.
    pub fn create(dir: &Path) -> AgentResult<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("trajectory_{}.jsonl", uuid::Uuid::new_v4()));
        let writer = BufWriter::new(File::create(&path)?);
        Ok(Self {
            path,
            writer,
            written: 0,
        })
    }

    pub fn append(&mut self, step: &RecordedStep) -> AgentResult<()> {
        serde_json::to_writer(&mut self.writer, step)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.written += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn written(&self) -> usize {
        self.written
    }
}
