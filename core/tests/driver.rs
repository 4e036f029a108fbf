mod common;

use common::*;
use crafter_core::{EpisodeDriver, PlayerStatus};
use std::collections::BTreeMap;

fn driver(
    engine: FakeEngine,
    transport: ScriptedTransport,
    step_budget: u32,
) -> EpisodeDriver<FakeEngine, ScriptedTransport> {
    EpisodeDriver::new(engine, selector(transport, 20), catalog(), 5, step_budget)
}

#[tokio::test(start_paused = true)]
async fn sleeping_player_never_reaches_the_model() {
    let mut engine = FakeEngine::new(observation("grass", 9), vec![]);
    engine.initial_player = PlayerStatus {
        sleeping: true,
        ..PlayerStatus::default()
    };
    let transport = ScriptedTransport::new(vec![]);
    let mut driver = driver(engine, transport.clone(), 10);

    driver.reset(1).await.unwrap();
    let selection = driver.act().await.unwrap();

    assert_eq!(selection.response.chosen_action, "idle");
    assert_eq!(selection.attempts, 0);
    assert!(!selection.fell_back);
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn episode_records_transitions_until_done() {
    let mut achievements = BTreeMap::new();
    achievements.insert("collect_wood".to_string(), 1);
    let engine = FakeEngine::new(
        observation("grass", 9),
        vec![
            step(observation("sand", 9), 0.0, false, PlayerStatus::default()),
            step(
                observation("sand", 9),
                1.0,
                true,
                PlayerStatus {
                    achievements,
                    ..PlayerStatus::default()
                },
            ),
        ],
    );
    let actions = engine.actions.clone();
    let transport = ScriptedTransport::new(vec![
        Ok(r#"{"chosen_action": "move_left"}"#.to_string()),
        Ok(r#"{"chosen_action": "do (mine, collect, attack)", "justification": "tree ahead"}"#.to_string()),
    ]);
    let mut driver = driver(engine, transport.clone(), 100);

    let mut reports = Vec::new();
    let summary = driver
        .run_episode(43, |report| reports.push(report.clone()))
        .await
        .unwrap();

    assert_eq!(summary.steps, 2);
    assert!(summary.done);
    assert_eq!(summary.total_reward, 1.0);
    assert_eq!(summary.achievements, vec!["collect_wood".to_string()]);
    assert_eq!(*actions.lock().unwrap(), vec![1, 5]);

    assert!(reports[0].success);
    assert!(!reports[1].success);
    assert_eq!(reports[1].unlocked, vec!["collect_wood".to_string()]);

    let log = driver.log();
    assert_eq!(log.seed, 43);
    assert_eq!(log.len(), 2);
    let last = &log.log[1];
    assert_eq!(last.action.extra["justification"], "tree ahead");
    assert_eq!(last.cumulative_reward, 1.0);
    assert!(last.done);
    assert_eq!(last.state, log.log[0].next_state);
    assert_eq!(last.action_counter.get("move_left").success, 1);
    assert_eq!(last.action_counter.get("do (mine, collect, attack)").fail, 1);

    // The second prompt carries the first accepted action as history
    let second_prompt = &transport.calls()[1].turns[1].content;
    assert!(second_prompt.contains(r#"[{"chosen_action":"move_left"}]"#));
}

#[tokio::test(start_paused = true)]
async fn step_budget_stops_the_episode() {
    let engine = FakeEngine::new(
        observation("grass", 9),
        (0..10)
            .map(|_| step(observation("grass", 9), 0.0, false, PlayerStatus::default()))
            .collect(),
    );
    let transport = ScriptedTransport::repeating(r#"{"chosen_action": "idle"}"#);
    let mut driver = driver(engine, transport.clone(), 3);

    let summary = driver.run_episode(0, |_| {}).await.unwrap();

    assert_eq!(summary.steps, 3);
    assert!(!summary.done);
    assert_eq!(transport.call_count(), 3);
    assert_eq!(driver.tally().get("idle").fail, 3);
}

#[tokio::test(start_paused = true)]
async fn history_window_is_bounded() {
    let engine = FakeEngine::new(
        observation("grass", 9),
        (0..8)
            .map(|_| step(observation("grass", 9), 0.0, false, PlayerStatus::default()))
            .collect(),
    );
    let transport = ScriptedTransport::repeating(r#"{"chosen_action": "move_up"}"#);
    let mut driver = driver(engine, transport.clone(), 8);

    driver.run_episode(0, |_| {}).await.unwrap();

    let last_prompt = &transport.calls()[7].turns[1].content;
    let expected = format!("[{}]", vec![r#"{"chosen_action":"move_up"}"#; 5].join(","));
    assert!(last_prompt.contains(&expected));
    let too_many = format!("[{}]", vec![r#"{"chosen_action":"move_up"}"#; 6].join(","));
    assert!(!last_prompt.contains(&too_many));
}
