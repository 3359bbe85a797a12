//! Integration tests for consolidation and pruning
//!
//! Tests verify that:
//! - Reaching the threshold folds the oldest chunk of L2 into one L3 summary
//! - The summarizer sees constituent contents in arrival order
//! - A failing summarizer still yields a fallback summary
//! - Decayed L3 records are pruned from every tier and index
//! - L1 and L2 are never pruned

use std::sync::Arc;

use chrono::{Duration, Utc};

use memgraph::config::{Config, OverflowPolicy};
use memgraph::memory::CONSOLIDATED_GOAL;
use memgraph::testing::{FailingSummarizer, RecordingSummarizer};
use memgraph::{Collaborators, MemoryEngine, MemoryTier, Role};

fn create_test_engine() -> MemoryEngine {
    MemoryEngine::new(Config::default(), Collaborators::local(64)).expect("engine")
}

fn create_recording_engine() -> (MemoryEngine, Arc<RecordingSummarizer>) {
    let summarizer = Arc::new(RecordingSummarizer::new());
    let collaborators = Collaborators {
        summarizer: summarizer.clone(),
        ..Collaborators::local(64)
    };
    let engine = MemoryEngine::new(Config::default(), collaborators).expect("engine");
    (engine, summarizer)
}

async fn ingest_turns(engine: &mut MemoryEngine, n: usize) -> Vec<uuid::Uuid> {
    let mut ids = Vec::with_capacity(n);
    for i in 0..n {
        engine.increment_turn();
        let record = engine
            .ingest(&format!("generic turn {i}"), Role::User, &[])
            .await
            .unwrap();
        ids.push(record.id);
    }
    ids
}

// =============================================================================
// Consolidation
// =============================================================================

#[tokio::test]
async fn test_below_threshold_does_nothing() {
    let mut engine = create_test_engine();
    ingest_turns(&mut engine, 4).await;

    let report = engine.run_maintenance().await.unwrap();

    assert!(!report.changed());
    assert_eq!(engine.stats().l2_recent, 4);
    assert_eq!(engine.stats().l3_consolidated, 0);
}

#[tokio::test]
async fn test_threshold_consolidates_oldest_chunk() {
    let (mut engine, summarizer) = create_recording_engine();
    let ids = ingest_turns(&mut engine, 5).await;

    let report = engine.run_maintenance().await.unwrap();
    let consolidation = report.consolidation.expect("consolidated");

    assert_eq!(consolidation.constituent_ids, ids[..3].to_vec());
    assert!(!consolidation.used_fallback);

    let stats = engine.stats();
    assert_eq!(stats.l2_recent, 2);
    assert_eq!(stats.l3_consolidated, 1);

    let remaining: Vec<_> = engine
        .records(MemoryTier::L2Recent)
        .iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(remaining, ids[3..].to_vec());

    let summary = engine.get(&consolidation.summary_id).unwrap();
    assert_eq!(summary.role, Role::System);
    assert_eq!(summary.tier, MemoryTier::L3Consolidated);
    assert_eq!(summary.content, "summary of 3 turns");
    assert_eq!(summary.metadata.kind.as_deref(), Some(CONSOLIDATED_GOAL));
    assert_eq!(summary.metadata.constituent_ids.as_deref(), Some(&ids[..3]));
    assert_eq!(summary.metadata.creation_turn, 5);

    assert_eq!(
        summarizer.calls(),
        vec![vec![
            "generic turn 0".to_string(),
            "generic turn 1".to_string(),
            "generic turn 2".to_string(),
        ]]
    );
    engine.verify_integrity().unwrap();
}

#[tokio::test]
async fn test_constituents_leave_the_indexes() {
    let (mut engine, _) = create_recording_engine();
    ingest_turns(&mut engine, 5).await;

    engine.run_maintenance().await.unwrap();

    // "generic" still matches the two unconsolidated turns only
    assert_eq!(engine.lookup_keyword("generic").unwrap().len(), 2);
    assert_eq!(engine.lookup_keyword("summary").unwrap().len(), 1);
}

#[tokio::test]
async fn test_summary_keeps_constituent_entities() {
    let mut engine = create_test_engine();
    for (content, entity) in [
        ("Alice joined", "Alice"),
        ("Bob joined", "Bob"),
        ("alice left", "ALICE"),
        ("filler one", "Filler"),
        ("filler two", "Filler"),
    ] {
        engine
            .ingest(content, Role::User, &[entity.to_string()])
            .await
            .unwrap();
    }

    let report = engine.run_maintenance().await.unwrap();
    let summary = engine
        .get(&report.consolidation.unwrap().summary_id)
        .unwrap();

    let entities = summary.entities();
    assert!(entities.iter().any(|e| e == "Alice"));
    assert!(entities.iter().any(|e| e == "Bob"));
    assert!(!entities.iter().any(|e| e == "Filler"));
}

#[tokio::test]
async fn test_failing_summarizer_uses_fallback() {
    let mut config = Config::default();
    config.engine.fallback_summary_chars = 30;
    let collaborators = Collaborators {
        summarizer: Arc::new(FailingSummarizer),
        ..Collaborators::local(64)
    };
    let mut engine = MemoryEngine::new(config, collaborators).unwrap();
    ingest_turns(&mut engine, 5).await;

    let report = engine.run_maintenance().await.unwrap();
    let consolidation = report.consolidation.unwrap();

    assert!(consolidation.used_fallback);
    let summary = engine.get(&consolidation.summary_id).unwrap();
    assert_eq!(summary.content, "generic turn 0 generic turn 1 ...");
    assert_eq!(engine.stats().l2_recent, 2);
    engine.verify_integrity().unwrap();
}

#[tokio::test]
async fn test_overflow_consolidates_before_ingest() {
    let mut config = Config::default();
    config.engine.recency_capacity = 5;
    config.engine.consolidation_threshold = 5;
    let mut engine = MemoryEngine::new(config, Collaborators::local(32)).unwrap();

    let ids = ingest_turns(&mut engine, 6).await;

    let stats = engine.stats();
    assert_eq!(stats.l2_recent, 3);
    assert_eq!(stats.l3_consolidated, 1);
    assert!(ids[..3].iter().all(|id| engine.get(id).is_none()));
    assert!(ids[3..].iter().all(|id| engine.get(id).is_some()));
    engine.verify_integrity().unwrap();
}

#[tokio::test]
async fn test_overflow_discard_drops_oldest() {
    let mut config = Config::default();
    config.engine.recency_capacity = 5;
    config.engine.consolidation_threshold = 5;
    config.engine.overflow_policy = OverflowPolicy::Discard;
    let mut engine = MemoryEngine::new(config, Collaborators::local(32)).unwrap();

    let ids = ingest_turns(&mut engine, 6).await;

    assert_eq!(engine.stats().l2_recent, 5);
    assert!(engine.get(&ids[0]).is_none());
    assert!(engine.lookup_keyword("0").unwrap().is_empty());
    engine.verify_integrity().unwrap();
}

// =============================================================================
// Pruning
// =============================================================================

#[tokio::test]
async fn test_decayed_summaries_are_pruned_everywhere() {
    let (mut engine, _) = create_recording_engine();
    ingest_turns(&mut engine, 5).await;
    let summary_id = engine
        .run_maintenance()
        .await
        .unwrap()
        .consolidation
        .unwrap()
        .summary_id;

    let report = engine
        .run_maintenance_at(Utc::now() + Duration::hours(48))
        .await
        .unwrap();

    assert_eq!(report.prune.decayed, 1);
    assert_eq!(report.prune.pruned, vec![summary_id]);
    assert!(report.consolidation.is_none());
    assert!(engine.get(&summary_id).is_none());
    assert!(engine.lookup_keyword("summary").unwrap().is_empty());
    assert_eq!(engine.stats().l3_consolidated, 0);
    engine.verify_integrity().unwrap();
}

#[tokio::test]
async fn test_fresh_summaries_survive() {
    let (mut engine, _) = create_recording_engine();
    ingest_turns(&mut engine, 5).await;
    engine.run_maintenance().await.unwrap();

    let report = engine
        .run_maintenance_at(Utc::now() + Duration::hours(1))
        .await
        .unwrap();

    assert!(report.prune.pruned.is_empty());
    assert_eq!(engine.stats().l3_consolidated, 1);
    let summary = &engine.records(MemoryTier::L3Consolidated)[0];
    assert!(summary.relevance_score < 1.0);
}

#[tokio::test]
async fn test_fast_and_recent_tiers_are_exempt() {
    let mut engine = create_test_engine();
    let promoted = engine.ingest("My name is Ada", Role::User, &[]).await.unwrap();
    let recent = engine.ingest("I like tea", Role::User, &[]).await.unwrap();

    let report = engine
        .run_maintenance_at(Utc::now() + Duration::days(365))
        .await
        .unwrap();

    assert!(report.prune.pruned.is_empty());
    assert_eq!(report.prune.decayed, 0);
    assert_eq!(engine.get(&promoted.id).unwrap().relevance_score, 1.0);
    assert_eq!(engine.get(&recent.id).unwrap().relevance_score, 1.0);
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_generic_turns_then_maintenance() {
    let mut engine = create_test_engine();
    engine
        .ingest("My name is Priranshu.", Role::User, &["Priranshu".to_string()])
        .await
        .unwrap();
    for i in 0..5 {
        engine.increment_turn();
        engine
            .ingest(&format!("Generic conversation turn {i}"), Role::User, &[])
            .await
            .unwrap();
    }

    let report = engine.run_maintenance().await.unwrap();

    assert!(report.consolidation.is_some());
    let stats = engine.stats();
    assert_eq!(stats.l1_fast, 1);
    assert_eq!(stats.l2_recent, 2);
    assert_eq!(stats.l3_consolidated, 1);
    assert_eq!(stats.l4_entities, 1);

    let results = engine.retrieve("My name is Priranshu.", 3).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].record.tier, MemoryTier::L1Fast);
    engine.verify_integrity().unwrap();
}
