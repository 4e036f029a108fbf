mod common;

use common::*;
use crafter_core::errors::{TransportError, TransientKind};
use crafter_core::{GameSnapshot, Role};
use std::collections::BTreeMap;
use std::time::Duration;

fn snapshot<'a>(
    grid: &'a [Vec<String>],
    inventory: &'a BTreeMap<String, i64>,
) -> GameSnapshot<'a> {
    GameSnapshot {
        text_grid: grid,
        inventory,
        recent_actions: &[],
        total_reward: 0.0,
    }
}

#[tokio::test(start_paused = true)]
async fn accepts_valid_action_first_time() {
    let transport = ScriptedTransport::new(vec![Ok(r#"{"chosen_action": "move_left"}"#.to_string())]);
    let selector = selector(transport.clone(), 20);
    let grid = grid("grass");
    let inventory = BTreeMap::new();

    let selection = selector.select(&catalog(), &snapshot(&grid, &inventory)).await.unwrap();

    assert_eq!(selection.response.chosen_action, "move_left");
    assert_eq!(selection.attempts, 1);
    assert!(!selection.fell_back);
    assert_eq!(transport.call_count(), 1);
    assert!(transport.calls()[0].json_format);
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried_with_growing_delay() {
    let transport = ScriptedTransport::new(vec![
        rate_limited(),
        Err(TransportError::transient(TransientKind::Connection, "reset by peer")),
        Ok("```json\n{\"chosen_action\": \"sleep\", \"justification\": \"tired\"}\n```".to_string()),
    ]);
    let selector = selector(transport.clone(), 20);
    let grid = grid("grass");
    let inventory = BTreeMap::new();

    let selection = selector.select(&catalog(), &snapshot(&grid, &inventory)).await.unwrap();

    assert_eq!(selection.response.chosen_action, "sleep");
    assert_eq!(selection.response.extra["justification"], "tired");
    // Transport retries are invisible to the selector's own attempt count
    assert_eq!(selection.attempts, 1);

    let calls = transport.calls();
    assert_eq!(calls.len(), 3);
    let first = calls[1].at - calls[0].at;
    let second = calls[2].at - calls[1].at;
    assert!(first >= Duration::from_millis(1_000));
    assert!(second >= first);
    assert!(second <= Duration::from_millis(10_000));
}

#[tokio::test(start_paused = true)]
async fn unparseable_answers_fall_back_after_max_attempts() {
    let transport = ScriptedTransport::repeating("I think you should move left!");
    let selector = selector(transport.clone(), 20);
    let grid = grid("grass");
    let inventory = BTreeMap::new();

    let selection = selector.select(&catalog(), &snapshot(&grid, &inventory)).await.unwrap();

    assert!(selection.fell_back);
    assert_eq!(selection.attempts, 20);
    assert_eq!(selection.response.chosen_action, "idle");
    assert!(selection.response.extra.is_empty());
    assert_eq!(transport.call_count(), 20);
}

#[tokio::test(start_paused = true)]
async fn rejected_answers_resend_identical_request() {
    let transport = ScriptedTransport::new(vec![
        Ok(r#"{"chosen_action": "teleport"}"#.to_string()),
        Ok(r#"{"action": "idle"}"#.to_string()),
        Ok(r#"{"chosen_action": "place_table"}"#.to_string()),
    ]);
    let selector = selector(transport.clone(), 20);
    let grid = grid("tree");
    let inventory = BTreeMap::new();

    let selection = selector.select(&catalog(), &snapshot(&grid, &inventory)).await.unwrap();

    assert_eq!(selection.response.chosen_action, "place_table");
    assert_eq!(selection.attempts, 3);
    let calls = transport.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0].turns, calls[1].turns);
    assert_eq!(calls[1].turns, calls[2].turns);
}

#[tokio::test(start_paused = true)]
async fn feedback_on_retry_explains_rejection() {
    let transport = ScriptedTransport::new(vec![
        Ok(r#"{"chosen_action": "teleport"}"#.to_string()),
        Ok(r#"{"chosen_action": "idle"}"#.to_string()),
    ]);
    let selector = selector(transport.clone(), 20).with_feedback_on_retry(true);
    let grid = grid("tree");
    let inventory = BTreeMap::new();

    selector.select(&catalog(), &snapshot(&grid, &inventory)).await.unwrap();

    let calls = transport.calls();
    assert_eq!(calls.len(), 2);
    let retry = &calls[1].turns;
    assert_eq!(retry.len(), calls[0].turns.len() + 2);
    assert_eq!(retry[retry.len() - 2].role, Role::Assistant);
    assert!(retry[retry.len() - 1].content.contains("`teleport` is not one of the available actions"));
}

#[tokio::test(start_paused = true)]
async fn fatal_transport_error_propagates_immediately() {
    let transport = ScriptedTransport::new(vec![Err(TransportError::Http {
        status_code: 401,
        message: "invalid api key".to_string(),
    })]);
    let selector = selector(transport.clone(), 20);
    let grid = grid("grass");
    let inventory = BTreeMap::new();

    let err = selector.select(&catalog(), &snapshot(&grid, &inventory)).await.unwrap_err();

    assert!(matches!(err, TransportError::Http { status_code: 401, .. }));
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn normalized_conversation_is_sent() {
    let transport = ScriptedTransport::new(vec![Ok(r#"{"chosen_action": "idle"}"#.to_string())]);
    let selector = selector(transport.clone(), 20);
    let grid = grid("grass");
    let inventory = BTreeMap::new();

    selector.select(&catalog(), &snapshot(&grid, &inventory)).await.unwrap();

    let turns = &transport.calls()[0].turns;
    // system + merged game info and task turns
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].role, Role::System);
    assert_eq!(turns[1].role, Role::User);
    assert!(turns[1].content.contains("\n\nGiven the following information"));
}
