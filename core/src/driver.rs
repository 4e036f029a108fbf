use std::collections::{BTreeSet, VecDeque};
use tracing::{debug, info};

use crate::catalog::ActionCatalog;
use crate::engine::{GameEngine, Observation};
use crate::errors::AgentResult;
use crate::prompt::GameSnapshot;
use crate::selector::{ActionSelector, Selection};
use crate::trajectory::{ActionTally, StateSnapshot, TrajectoryLog, Transition};
use crate::transport::ChatTransport;
use crate::types::ActionResponse;

const VITALS: &[&str] = &["health", "food", "drink", "energy"];

/// What happened during one step, for display by the caller
#[derive(Debug, Clone)]
pub struct StepReport {
    pub step: u32,
    pub selection: Selection,
    pub action_id: u32,
    pub reward: f64,
    pub total_reward: f64,
    pub done: bool,
    /// Whether the action had a visible effect on the game state.
    pub success: bool,
    /// Achievements unlocked for the first time this episode.
    pub unlocked: Vec<String>,
    pub observation: Observation,
}

/// How an episode ended
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeSummary {
    pub steps: u32,
    pub total_reward: f64,
    pub done: bool,
    pub achievements: Vec<String>,
}

/// Plays episodes by alternating between the action selector and the engine.
///
/// Requests for step `n + 1` are only made once step `n` has been applied.
pub struct EpisodeDriver<E, T> {
    engine: E,
    selector: ActionSelector<T>,
    catalog: ActionCatalog,
    history_size: usize,
    step_budget: u32,
    observation: Observation,
    state: StateSnapshot,
    history: VecDeque<ActionResponse>,
    total_reward: f64,
    time_step: u32,
    done: bool,
    tally: ActionTally,
    achievements: BTreeSet<String>,
    log: TrajectoryLog,
}

impl<E: GameEngine, T: ChatTransport> EpisodeDriver<E, T> {
    pub fn new(
        engine: E,
        selector: ActionSelector<T>,
        catalog: ActionCatalog,
        history_size: usize,
        step_budget: u32,
    ) -> Self {
        let tally = ActionTally::new(&catalog);
        Self {
            engine,
            selector,
            catalog,
            history_size,
            step_budget,
            observation: Observation::default(),
            state: StateSnapshot::default(),
            history: VecDeque::new(),
            total_reward: 0.0,
            time_step: 0,
            done: false,
            tally,
            achievements: BTreeSet::new(),
            log: TrajectoryLog::new(0),
        }
    }

    /// Starts a new episode and returns the first observation.
    pub async fn reset(&mut self, seed: u64) -> AgentResult<&Observation> {
        let observation = self.engine.reset().await?;
        self.state = StateSnapshot::new(&observation, &self.engine.player().internal_counters);
        self.observation = observation;
        self.history.clear();
        self.total_reward = 0.0;
        self.time_step = 0;
        self.done = false;
        self.tally = ActionTally::new(&self.catalog);
        self.achievements = unlocked_achievements(self.engine.player().achievements.iter());
        self.log = TrajectoryLog::new(seed);
        info!(seed, "Episode reset");
        Ok(&self.observation)
    }

    /// Chooses the next action without touching the engine.
    ///
    /// A sleeping player cannot act, so the idle action is returned without
    /// asking the model.
    pub async fn act(&self) -> AgentResult<Selection> {
        if self.engine.player().sleeping {
            debug!("Player is asleep, skipping model call");
            return Ok(Selection {
                response: ActionResponse::named(self.catalog.idle_action()),
                attempts: 0,
                fell_back: false,
            });
        }

        let history: Vec<ActionResponse> = self.history.iter().cloned().collect();
        let snapshot = GameSnapshot {
            text_grid: &self.observation.text_grid,
            inventory: &self.observation.inventory,
            recent_actions: &history,
            total_reward: self.total_reward,
        };
        Ok(self.selector.select(&self.catalog, &snapshot).await?)
    }

    /// Applies a selected action to the engine and records the transition.
    pub async fn apply(&mut self, selection: Selection) -> AgentResult<StepReport> {
        let action_name = selection.response.chosen_action.clone();
        let action_id = self
            .catalog
            .action_id(&action_name)
            .unwrap_or_else(|| self.catalog.idle_id());

        let outcome = self.engine.step(action_id).await?;
        self.total_reward += outcome.reward;

        let player = self.engine.player();
        let next_state = StateSnapshot::new(&outcome.observation, &player.internal_counters);
        let success = action_had_effect(&self.state, &next_state, player.status_changed);
        self.tally.record(&action_name, success);

        let unlocked: Vec<String> = unlocked_achievements(player.achievements.iter())
            .into_iter()
            .filter(|name| !self.achievements.contains(name))
            .collect();
        self.achievements.extend(unlocked.iter().cloned());

        self.log.push(Transition {
            state: std::mem::replace(&mut self.state, next_state.clone()),
            action: selection.response.clone(),
            reward: outcome.reward,
            cumulative_reward: self.total_reward,
            next_state,
            done: outcome.done,
            action_counter: self.tally.clone(),
        });

        self.history.push_back(selection.response.clone());
        while self.history.len() > self.history_size {
            self.history.pop_front();
        }

        self.time_step += 1;
        self.done = outcome.done;
        self.observation = outcome.observation.clone();

        debug!(
            step = self.time_step,
            action = %action_name,
            reward = outcome.reward,
            success,
            "Step applied"
        );

        Ok(StepReport {
            step: self.time_step,
            selection,
            action_id,
            reward: outcome.reward,
            total_reward: self.total_reward,
            done: outcome.done,
            success,
            unlocked,
            observation: outcome.observation,
        })
    }

    /// Runs one episode until the engine reports done or the step budget is spent.
    pub async fn run_episode<F>(&mut self, seed: u64, mut on_step: F) -> AgentResult<EpisodeSummary>
    where
        F: FnMut(&StepReport),
    {
        self.reset(seed).await?;
        while !self.is_finished() {
            let selection = self.act().await?;
            let report = self.apply(selection).await?;
            on_step(&report);
        }
        let summary = self.summary();
        info!(
            steps = summary.steps,
            total_reward = summary.total_reward,
            done = summary.done,
            "Episode finished"
        );
        Ok(summary)
    }

    /// True once the engine reported done or the step budget is used up.
    pub fn is_finished(&self) -> bool {
        self.done || self.time_step >= self.step_budget
    }

    pub fn summary(&self) -> EpisodeSummary {
        EpisodeSummary {
            steps: self.time_step,
            total_reward: self.total_reward,
            done: self.done,
            achievements: self.achievements.iter().cloned().collect(),
        }
    }

    pub fn log(&self) -> &TrajectoryLog {
        &self.log
    }

    pub fn tally(&self) -> &ActionTally {
        &self.tally
    }

    /// Gives the engine back, e.g. to shut down its process.
    pub fn into_engine(self) -> E {
        self.engine
    }
}

fn unlocked_achievements<'a>(
    counts: impl Iterator<Item = (&'a String, &'a u32)>,
) -> BTreeSet<String> {
    counts
        .filter(|(_, count)| **count > 0)
        .map(|(name, _)| name.clone())
        .collect()
}

/// An action counts as effective if the view changed, or if a vital changed
/// during a step where the engine reported no passive status change.
pub fn action_had_effect(before: &StateSnapshot, after: &StateSnapshot, status_changed: bool) -> bool {
    if before.text_grid != after.text_grid {
        return true;
    }
    if before.inventory == after.inventory || status_changed {
        return false;
    }
    VITALS
        .iter()
        .any(|vital| before.inventory.get(*vital) != after.inventory.get(*vital))
}
