//! End-to-end tests against a file-backed karma database.
//!
//! Run with: cargo test --test karma_flow

use std::collections::HashMap;
use std::sync::Arc;

use karmabot::karma::{ChatEvent, KarmaEngine, Reply, ScoreStore};
use karmabot::transport::parse_line;

fn open_engine(path: &std::path::Path) -> KarmaEngine {
    let names = HashMap::from([("U1".to_string(), "alice".to_string())]);
    let store = ScoreStore::open(path).expect("Failed to open database");
    KarmaEngine::new(store, "UBOT", Arc::new(names)).expect("Failed to build engine")
}

fn texts(replies: Vec<Reply>) -> Vec<String> {
    replies.into_iter().map(|r| r.text).collect()
}

#[test]
fn test_scores_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("karma.db");

    {
        let mut engine = open_engine(&path);
        engine
            .handle_event(&ChatEvent::message("U2", "<@U1>++ @pizza++", "C1"))
            .unwrap();
    }

    let mut engine = open_engine(&path);
    let replies = engine
        .handle_event(&ChatEvent::message("U3", "<@U1>++ @pizza--", "C1"))
        .unwrap();
    assert_eq!(
        texts(replies),
        vec!["<@U1>'s karma increased to 2", "pizza's karma decreased to 0"]
    );
}

#[test]
fn test_stdin_batch_through_engine() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = open_engine(&dir.path().join("karma.db"));

    let events = parse_line(
        r#"[
            {"type": "hello"},
            {"type": "message", "user": "U2", "text": "<@U1>++", "channel": "C1"},
            {"type": "message", "subtype": "message_changed", "user": "U2", "text": "<@U1>++", "channel": "C1"},
            {"type": "message", "user": "U2", "text": "<@UBOT> lookup <@U1>", "channel": "C2"}
        ]"#,
    )
    .unwrap();

    let replies = engine.handle_batch(&events);
    assert_eq!(
        replies,
        vec![
            Reply::new("C1", "<@U1>'s karma increased to 1"),
            Reply::new("C2", "alice has 1 karma and a giving differential of 0"),
        ]
    );
}

#[test]
fn test_ranking_ties_in_window() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = open_engine(&dir.path().join("karma.db"));

    // @a..@f end up with 10, 10, 8, 8, 8, 3
    for (label, score) in [("a", 10), ("b", 10), ("c", 8), ("d", 8), ("e", 8), ("f", 3)] {
        let text = vec![format!("@{label}++"); score].join(" ");
        engine
            .handle_event(&ChatEvent::message("U2", &text, "C1"))
            .unwrap();
    }

    let replies = texts(
        engine
            .handle_event(&ChatEvent::message("U2", "<@UBOT> top", "C1"))
            .unwrap(),
    );
    assert_eq!(
        replies,
        vec!["*Top users*\n_nothing to show_\n\n*Top things*\n1. a: 10\n1. b: 10\n3. c: 8\n3. d: 8\n3. e: 8"]
    );
}
