use colored::*;
use crafter_core::{EpisodeSummary, Observation, StepReport};

/// Print the first observation of an episode
pub fn print_initial_state(seed: u64, observation: &Observation) {
    println!("{} seed {}", "Episode start:".cyan().bold(), seed);
    print_observation(observation);
    println!();
}

/// Print one applied step as the agent saw it
pub fn print_step(report: &StepReport) {
    let action = &report.selection.response.chosen_action;
    let mut header = format!(
        "{} {} {} {}",
        "Step".yellow().bold(),
        report.step,
        "->".dimmed(),
        action.green().bold()
    );
    if report.selection.fell_back {
        header.push_str(&format!(
            " {}",
            format!("(fallback after {} attempts)", report.selection.attempts).red()
        ));
    } else if report.selection.attempts == 0 {
        header.push_str(&format!(" {}", "(asleep)".dimmed()));
    } else if report.selection.attempts > 1 {
        header.push_str(&format!(
            " {}",
            format!("({} attempts)", report.selection.attempts).yellow()
        ));
    }
    println!("{}", header);

    if let Some(justification) = report.selection.response.extra.get("justification") {
        if let Some(text) = justification.as_str() {
            println!("  {} {}", "Why:".blue(), text);
        }
    }

    print_observation(&report.observation);
    println!(
        "  {} {} (total {})",
        "Reward:".blue(),
        report.reward,
        report.total_reward
    );
    print_unlocked(&report.unlocked);
    println!();
}

pub fn print_unlocked(unlocked: &[String]) {
    for achievement in unlocked {
        println!("  {} {}", "Achievement unlocked:".magenta().bold(), achievement);
    }
}

pub fn print_observation(observation: &Observation) {
    println!("{}", "Observation:".blue());
    for line in observation.layout().lines() {
        println!("  {}", line);
    }
    let inventory = observation
        .inventory
        .iter()
        .map(|(item, count)| format!("{}={}", item, count))
        .collect::<Vec<_>>()
        .join(", ");
    println!("{} {}", "Inventory:".blue(), inventory);
}

pub fn print_summary(summary: &EpisodeSummary) {
    println!("{}", "Episode summary".cyan().bold());
    println!("  Steps:        {}", summary.steps);
    println!("  Total reward: {}", summary.total_reward);
    println!(
        "  Ended:        {}",
        if summary.done {
            "engine reported done".normal()
        } else {
            "step budget or interrupt".yellow()
        }
    );
    if summary.achievements.is_empty() {
        println!("  Achievements: none");
    } else {
        println!("  Achievements: {}", summary.achievements.join(", "));
    }
}
