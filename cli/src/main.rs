use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use crafter_core::config::{get_default_config_file, UnifiedConfig};

mod app;
mod cli;
mod logging;
mod output;
mod record;

use crate::cli::{Args, Command};
use crate::logging::{init_logging, log_error};

#[tokio::main]
async fn main() -> Result<()> {
    // API keys may live in a local .env file
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(args.verbose);

    let loaded = match &args.config {
        Some(path) => UnifiedConfig::load_from_file(path),
        None => UnifiedConfig::load(),
    };
    let mut config = loaded.context("Failed to load configuration")?;
    args.command.apply_to(&mut config);

    if let Err(e) = config.validate() {
        log_error(&format!("Invalid configuration: {}", e));
        return Err(e.into());
    }

    match &args.command {
        Command::Play { .. } => app::run_play(&config).await,
        Command::Record {
            on_death, out_dir, ..
        } => record::run_record(&config, *on_death, out_dir).await,
        Command::CheckConfig => check_config(&args, &config),
    }
}

fn check_config(args: &Args, config: &UnifiedConfig) -> Result<()> {
    let source = args.config.clone().or_else(get_default_config_file);
    match source {
        Some(path) if path.exists() => println!("{} {}", "Config file:".cyan(), path.display()),
        _ => println!("{}", "No config file found, using defaults".yellow()),
    }

    let mut shown = config.clone();
    for model in shown.models.values_mut() {
        if model.api_key.is_some() {
            model.api_key = Some("<redacted>".to_string());
        }
    }
    println!("{}", toml::to_string_pretty(&shown)?);

    let model = config.active_model()?;
    if model.resolve_api_key().is_none() {
        println!(
            "{}",
            format!("Warning: no API key found for model `{}`", config.agent.model).yellow()
        );
    }
    println!(
        "{} worst-case backoff is {}s per request and {}s per step ({} selection attempts)",
        "OK:".green().bold(),
        config.retry.worst_case_wait().as_secs(),
        config.worst_case_step_wait().as_secs(),
        config.agent.max_selection_attempts
    );
    Ok(())
}
