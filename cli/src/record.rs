//! Human play-through recorder.
//!
//! Steps are appended to a JSON-lines file as they happen, so a crash or a
//! quit never loses what was already played.

use anyhow::{Context, Result};
use colored::*;
use crafter_core::trajectory::{JsonlRecorder, RecordedStep, StateSnapshot};
use crafter_core::{ActionCatalog, GameEngine, UnifiedConfig};
use crafter_ipc::StdioEngine;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Select;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{info, warn};

use crate::cli::OnDeath;
use crate::output::{print_initial_state, print_observation, print_unlocked};

const QUIT: &str = "quit";

pub async fn run_record(
    config: &UnifiedConfig,
    on_death: OnDeath,
    out_dir: &Path,
) -> Result<()> {
    let seed = config.engine.seed;
    let mut recorder = JsonlRecorder::create(out_dir).context("Failed to create recording file")?;
    let mut engine = StdioEngine::launch(&config.engine.command, &config.engine.args, seed)
        .await
        .context("Failed to start game engine")?;
    info!(path = %recorder.path().display(), seed, "Recording trajectory");

    let catalog = ActionCatalog::crafter();
    let result = record_session(&mut engine, &catalog, &mut recorder, seed, on_death).await;

    println!(
        "Recorded {} steps to {}",
        recorder.written(),
        recorder.path().display()
    );
    if let Err(e) = engine.shutdown().await {
        warn!(error = %e, "Engine did not shut down cleanly");
    }
    result
}

async fn record_session<E: GameEngine>(
    engine: &mut E,
    catalog: &ActionCatalog,
    recorder: &mut JsonlRecorder,
    seed: u64,
    on_death: OnDeath,
) -> Result<()> {
    let mut observation = engine.reset().await?;
    let mut achievements = BTreeSet::new();
    let mut total_reward = 0.0;
    let mut episode_end = EpisodeEnd::default();
    print_initial_state(seed, &observation);

    let mut choices: Vec<String> = catalog.names().map(str::to_string).collect();
    choices.push(QUIT.to_string());

    loop {
        // A sleeping player can only idle. Those steps are not recorded.
        let (action, record) = if engine.player().sleeping {
            println!("{}", "Sleeping...".dimmed());
            (catalog.idle_action().to_string(), false)
        } else {
            let items = choices.clone();
            let index = tokio::task::spawn_blocking(move || prompt_action(&items)).await??;
            if choices[index] == QUIT {
                return Ok(());
            }
            (choices[index].clone(), true)
        };

        let before = StateSnapshot::new(&observation, &engine.player().internal_counters);
        let action_id = catalog
            .action_id(&action)
            .unwrap_or_else(|| catalog.idle_id());
        let outcome = engine.step(action_id).await?;
        let after = StateSnapshot::new(&outcome.observation, &engine.player().internal_counters);

        if record {
            recorder.append(&RecordedStep {
                state: before,
                action,
                next_state: after,
            })?;
        }

        total_reward += outcome.reward;
        if outcome.reward != 0.0 {
            println!(
                "{} {} (total {})",
                "Reward:".blue(),
                outcome.reward,
                total_reward
            );
        }
        let unlocked = newly_unlocked(&mut achievements, engine);
        print_unlocked(&unlocked);
        print_observation(&outcome.observation);
        observation = outcome.observation;

        if episode_end.observe(outcome.done) {
            match on_death {
                OnDeath::Quit => {
                    println!("{}", "Episode over.".red().bold());
                    return Ok(());
                }
                OnDeath::Reset => {
                    println!("{}", "Episode over, starting a new one.".yellow());
                    observation = engine.reset().await?;
                    episode_end = EpisodeEnd::default();
                    achievements.clear();
                    total_reward = 0.0;
                    print_initial_state(seed, &observation);
                }
                OnDeath::Continue => {
                    println!("{}", "Episode over, continuing.".yellow());
                }
            }
        }
    }
}

/// Tracks the engine's `done` flag so the end of an episode is handled once,
/// even when play continues past it.
#[derive(Debug, Default)]
struct EpisodeEnd {
    was_done: bool,
}

impl EpisodeEnd {
    /// True only on the step where `done` first becomes set.
    fn observe(&mut self, done: bool) -> bool {
        let ended = done && !self.was_done;
        self.was_done = done;
        ended
    }
}

fn prompt_action(choices: &[String]) -> Result<usize> {
    Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Next action")
        .items(choices)
        .default(0)
        .interact()
        .context("Failed to read action")
}

fn newly_unlocked<E: GameEngine>(seen: &mut BTreeSet<String>, engine: &E) -> Vec<String> {
    engine
        .player()
        .achievements
        .iter()
        .filter(|(_, count)| **count > 0)
        .filter_map(|(name, _)| seen.insert(name.clone()).then(|| name.clone()))
        .collect()
}
