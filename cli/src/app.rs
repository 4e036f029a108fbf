use anyhow::{Context, Result};
use crafter_core::trajectory::run_log_path;
use crafter_core::{
    ActionCatalog, ActionSelector, EpisodeDriver, LlmClient, OpenAiTransport, PromptBuilder,
    UnifiedConfig,
};
use crafter_ipc::StdioEngine;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::output::{print_initial_state, print_step, print_summary};

type AgentDriver = EpisodeDriver<StdioEngine, OpenAiTransport>;

/// Lets the configured model play one episode against the engine bridge.
///
/// The trajectory log is written however the episode ends, including on
/// Ctrl-C and on errors.
pub async fn run_play(config: &UnifiedConfig) -> Result<()> {
    let model = config.active_model()?;
    let client = LlmClient::from_config(model, &config.retry)
        .context("Failed to create model client")?;
    let prompts = PromptBuilder::new(config.agent.agent_type, config.agent.map_size);
    let selector = ActionSelector::new(client, prompts, config.agent.max_selection_attempts)
        .with_feedback_on_retry(config.agent.feedback_on_retry);

    let seed = config.engine.seed;
    let engine = StdioEngine::launch(&config.engine.command, &config.engine.args, seed)
        .await
        .context("Failed to start game engine")?;

    info!(
        model = %config.agent.model,
        agent_type = ?config.agent.agent_type,
        seed,
        step_budget = config.agent.step_budget,
        "Starting episode"
    );

    let mut driver = EpisodeDriver::new(
        engine,
        selector,
        ActionCatalog::crafter(),
        config.agent.history_size,
        config.agent.step_budget,
    );

    let result = play_episode(&mut driver, seed).await;

    let path = run_log_path(&config.agent.log_dir, seed);
    match driver.log().save(&path) {
        Ok(()) => println!(
            "Saved {} steps to {}",
            driver.log().len(),
            path.display()
        ),
        Err(e) => error!(path = %path.display(), error = %e, "Failed to save trajectory log"),
    }
    print_summary(&driver.summary());

    if let Err(e) = driver.into_engine().shutdown().await {
        warn!(error = %e, "Engine did not shut down cleanly");
    }

    result
}

async fn play_episode(driver: &mut AgentDriver, seed: u64) -> Result<()> {
    let observation = driver.reset(seed).await.context("Failed to reset game")?;
    print_initial_state(seed, observation);

    let mut interrupts = watch_interrupts();
    while !driver.is_finished() {
        if *interrupts.borrow() > 0 {
            warn!("Interrupted, stopping between steps");
            return Ok(());
        }

        let spinner = spinner("Choosing next action...")?;
        let selection = tokio::select! {
            selection = driver.act() => selection,
            Ok(_) = interrupts.wait_for(|count| *count >= 2) => {
                spinner.finish_and_clear();
                warn!("Interrupted twice, abandoning the request in flight");
                return Ok(());
            }
        };
        spinner.finish_and_clear();

        let report = driver.apply(selection?).await?;
        print_step(&report);
    }

    Ok(())
}

/// Counts Ctrl-C presses. The first one ends the episode once the current
/// step is applied, the second one also cancels the pending model request.
fn watch_interrupts() -> watch::Receiver<u32> {
    let (tx, rx) = watch::channel(0);
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            tx.send_modify(|count| *count += 1);
            warn!("Interrupt received, finishing the current step (Ctrl-C again to abort)");
        }
    });
    rx
}

fn spinner(message: &'static str) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner} {msg}")?,
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(120));
    Ok(spinner)
}
