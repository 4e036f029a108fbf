use clap::{Parser, Subcommand, ValueEnum};
use crafter_core::config::{AgentType, UnifiedConfig};
use std::path::PathBuf;

/// LLM agent and trajectory recorder for the Crafter game
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to config file (defaults to ~/.config/crafter-agent/config.toml)
    #[arg(short, long, global = true, env = "CRAFTER_AGENT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output, including every turn sent to the model
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Let the model play one episode and save its trajectory
    Play {
        /// World seed passed to the engine
        #[arg(long)]
        seed: Option<u64>,

        /// Maximum number of steps before stopping
        #[arg(long)]
        steps: Option<u32>,

        /// Prompt flavour: plain or cot
        #[arg(long)]
        agent_type: Option<AgentType>,

        /// Model registry key to use
        #[arg(short, long)]
        model: Option<String>,

        /// Tell the model why an answer was rejected when retrying
        #[arg(long, default_value_t = false)]
        feedback_on_retry: bool,
    },

    /// Play the game yourself and record the trajectory
    Record {
        /// World seed passed to the engine
        #[arg(long)]
        seed: Option<u64>,

        /// What to do when the episode ends
        #[arg(long, value_enum, default_value_t = OnDeath::Quit)]
        on_death: OnDeath,

        /// Directory the JSONL recording is written to
        #[arg(long, default_value = "data")]
        out_dir: PathBuf,
    },

    /// Validate the configuration and print it
    CheckConfig,
}

impl Command {
    /// Folds command-line overrides into the loaded configuration.
    pub fn apply_to(&self, config: &mut UnifiedConfig) {
        match self {
            Command::Play {
                seed,
                steps,
                agent_type,
                model,
                feedback_on_retry,
            } => {
                if let Some(seed) = seed {
                    config.engine.seed = *seed;
                }
                if let Some(steps) = steps {
                    config.agent.step_budget = *steps;
                }
                if let Some(agent_type) = agent_type {
                    config.agent.agent_type = *agent_type;
                }
                if let Some(model) = model {
                    config.agent.model = model.clone();
                }
                if *feedback_on_retry {
                    config.agent.feedback_on_retry = true;
                }
            }
            Command::Record { seed, .. } => {
                if let Some(seed) = seed {
                    config.engine.seed = *seed;
                }
            }
            Command::CheckConfig => {}
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OnDeath {
    Continue,
    Reset,
    Quit,
}
