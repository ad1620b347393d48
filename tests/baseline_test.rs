//! Task scores through the store match a pure-scoring replay, across the
//! cold-start/z-score boundary, plus retrieval fan-out edges.

mod helpers;

use helpers::{open_store, open_store_with_clock, test_config, CharEmbedder, DAY};
use memelord::clock::ManualClock;
use memelord::memory::store::MemoryStore;
use memelord::memory::types::Category;
use memelord::scoring::{task_score, Baseline, TaskOutcome};
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn store_scores_match_pure_replay_across_the_regime_boundary() {
    let dir = TempDir::new().unwrap();
    let mut store = open_store(&dir);

    // twelve varied outcomes: observations 1-9 score cold-start, 10+ score
    // with z-scores; the replayed baseline must agree on both sides
    let outcomes: Vec<TaskOutcome> = (0..12)
        .map(|i| TaskOutcome {
            tokens_used: 800 + i * 57,
            tool_calls: 3 + i % 4,
            errors: i % 3,
            user_corrections: i % 2,
            completed: i % 4 != 0,
        })
        .collect();

    let mut replay = Baseline::default();
    for (i, outcome) in outcomes.iter().enumerate() {
        let started = store.start_task(&format!("task number {i}")).unwrap();
        let score = store.end_task(&started.task_id, outcome, &[]).unwrap();

        let expected = task_score(&replay, outcome);
        assert!(
            (score - expected).abs() < 1e-9,
            "task {i}: store scored {score}, replay says {expected}"
        );
        assert_eq!(replay.count, i as u64);

        replay = replay.observe(
            outcome.tokens_used as f64,
            outcome.errors as f64,
            outcome.user_corrections as f64,
        );
    }
    assert!(replay.count >= 10, "suite must cross the z-score boundary");
}

#[test]
fn top_k_larger_than_store_returns_everything() {
    let dir = TempDir::new().unwrap();
    let mut store = open_store(&dir);

    for i in 0..3 {
        store
            .insert_raw_memory(&format!("note number {i}"), Category::Insight, 1.0)
            .unwrap();
    }
    store.embed_pending().unwrap();

    // default top_k is 5; only 3 memories exist
    let started = store.start_task("note number").unwrap();
    assert_eq!(started.memories.len(), 3);
}

#[test]
fn configured_top_k_caps_the_fan_out() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir, "narrow-session");
    config.top_k = 2;
    let mut store = MemoryStore::open(config, Arc::new(CharEmbedder::new(8))).unwrap();

    for i in 0..6 {
        store
            .insert_raw_memory(&format!("note number {i}"), Category::Insight, 1.0)
            .unwrap();
    }
    store.embed_pending().unwrap();

    let started = store.start_task("note number").unwrap();
    assert_eq!(started.memories.len(), 2);
}

#[test]
fn recency_breaks_equal_similarity_in_favor_of_the_newer_memory() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(1_000_000));
    let mut store = open_store_with_clock(&dir, Arc::clone(&clock));

    // identical content, so identical similarity; only the recency anchor
    // (created_at, since neither was ever retrieved) differs
    let old = store
        .insert_raw_memory("deploys go through the staging lane", Category::Insight, 1.0)
        .unwrap();
    store.embed_pending().unwrap();

    clock.advance(100 * DAY);
    let new = store
        .insert_raw_memory("deploys go through the staging lane", Category::Insight, 1.0)
        .unwrap();
    store.embed_pending().unwrap();

    let started = store
        .start_task("deploys go through the staging lane")
        .unwrap();
    assert_eq!(started.memories.len(), 2);
    assert_eq!(started.memories[0].id, new);
    assert_eq!(started.memories[1].id, old);
}

#[test]
fn top_by_weight_ranks_without_embeddings() {
    let dir = TempDir::new().unwrap();
    let mut store = open_store(&dir);

    // all three stay pending: weight ranking must not need vectors
    store
        .insert_raw_memory("light", Category::Insight, 0.6)
        .unwrap();
    let heavy = store
        .insert_raw_memory("heavy", Category::User, 2.5)
        .unwrap();
    store
        .insert_raw_memory("middle", Category::Discovery, 1.4)
        .unwrap();

    let top = store.top_by_weight(2).unwrap();
    assert_eq!(top.len(), 2);
    assert_eq!(top[0].id, heavy);
    assert!((top[0].score - 2.5).abs() < 1e-9);

    let stats = store.stats().unwrap();
    assert_eq!(stats.total_memories, 3);
    assert_eq!(stats.top_memories[0].id, heavy);
}
