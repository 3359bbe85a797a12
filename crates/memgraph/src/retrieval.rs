//! Ranked retrieval
//!
//! Retrieval runs in two stages:
//! 1. Fast path: a query whose normalized form matches an L1 key returns
//!    that single record without any ranking.
//! 2. Ranking: every L1, L2 and L3 record is scored as
//!    `similarity * intent_boost * graph_boost * relevance` and the top `k`
//!    are returned.
//!
//! Returned records receive an access boost and are stamped with the
//! current turn.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::config::{RetrievalConfig, ScoringConfig};
use crate::error::{MemGraphError, Result};
use crate::index::IndexManager;
use crate::memory::{MemoryRecord, apply_access_boost};
use crate::provider::{Embedder, Similarity};
use crate::text::{content_key, query_tokens};
use crate::tiers::TierStore;

/// Score breakdown for a ranked record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ranking {
    /// Similarity between the query and record embeddings
    pub similarity: f32,
    /// `1 + per_token * matching query tokens`
    pub intent_boost: f32,
    /// `1 + graph_boost * connected entities`
    pub graph_boost: f32,
    /// Final score used for ordering
    pub composite: f32,
}

/// A record returned by retrieval, after its access boost
#[derive(Debug, Clone)]
pub struct RetrievedMemory {
    pub record: MemoryRecord,
    /// `None` for fast-path hits, which are never ranked
    pub ranking: Option<Ranking>,
}

/// Result of one retrieval call
#[derive(Debug, Clone, Default)]
pub struct RetrievalOutcome {
    pub memories: Vec<RetrievedMemory>,
    /// Whether the fast path answered
    pub cache_hit: bool,
}

/// Retrieval over one conversation's tiers
pub struct RetrievalEngine<'a> {
    tiers: &'a mut TierStore,
    index: &'a IndexManager,
    embedder: &'a dyn Embedder,
    similarity: &'a dyn Similarity,
    config: RetrievalConfig,
    scoring: ScoringConfig,
}

impl<'a> RetrievalEngine<'a> {
    pub fn new(
        tiers: &'a mut TierStore,
        index: &'a IndexManager,
        embedder: &'a dyn Embedder,
        similarity: &'a dyn Similarity,
        config: RetrievalConfig,
        scoring: ScoringConfig,
    ) -> Self {
        Self {
            tiers,
            index,
            embedder,
            similarity,
            config,
            scoring,
        }
    }

    /// Return at most `k` records for `query`, best first.
    ///
    /// Fails with a collaborator error when embedding or similarity fails,
    /// and with `StateCorruption` when a candidate has no vector index
    /// entry. Nothing is mutated on failure.
    pub async fn retrieve(
        &mut self,
        query: &str,
        k: usize,
        turn: u64,
        now: DateTime<Utc>,
    ) -> Result<RetrievalOutcome> {
        if k == 0 {
            return Ok(RetrievalOutcome::default());
        }

        if let Some(record) = self.tiers.fast_hit(&content_key(query)) {
            apply_access_boost(record, &self.scoring, now);
            record.metadata.last_access_turn = turn;
            debug!(id = %record.short_code(), "Fast cache hit");
            return Ok(RetrievalOutcome {
                memories: vec![RetrievedMemory {
                    record: record.clone(),
                    ranking: None,
                }],
                cache_hit: true,
            });
        }

        let query_embedding = self.embedder.embed(query).await?;
        let mut ranked = self.rank(query, &query_embedding)?;

        ranked.sort_by(|a, b| {
            b.ranking
                .composite
                .total_cmp(&a.ranking.composite)
                .then_with(|| b.last_accessed_at.cmp(&a.last_accessed_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        ranked.truncate(k);

        let mut memories = Vec::with_capacity(ranked.len());
        for candidate in ranked {
            let record = self.tiers.get_mut(&candidate.id).ok_or_else(|| {
                MemGraphError::StateCorruption(format!("ranked record {} vanished", candidate.id))
            })?;
            apply_access_boost(record, &self.scoring, now);
            record.metadata.last_access_turn = turn;
            memories.push(RetrievedMemory {
                record: record.clone(),
                ranking: Some(candidate.ranking),
            });
        }

        debug!(
            returned = memories.len(),
            "Ranked retrieval for query of {} chars",
            query.len()
        );

        Ok(RetrievalOutcome {
            memories,
            cache_hit: false,
        })
    }

    /// Score every candidate without mutating anything
    fn rank(&self, query: &str, query_embedding: &[f32]) -> Result<Vec<Candidate>> {
        let tokens = query_tokens(query);
        let graph = self.tiers.graph();
        let seeds = graph.entities_in(query);
        let connected: BTreeSet<&str> = graph.expand(&seeds);

        self.tiers
            .candidates()
            .map(|record| -> Result<Candidate> {
                let vector = self.index.vector(&record.id).ok_or_else(|| {
                    MemGraphError::StateCorruption(format!(
                        "record {} has no vector index entry",
                        record.short_code()
                    ))
                })?;
                let similarity = self.similarity.similarity(query_embedding, vector)?;

                let content = record.content.to_lowercase();
                let matching = tokens.iter().filter(|t| content.contains(t.as_str())).count();
                let intent_boost = 1.0 + self.config.intent_boost_per_token * matching as f32;

                let linked = record
                    .entities()
                    .iter()
                    .filter(|e| connected.contains(e.to_lowercase().as_str()))
                    .count();
                let graph_boost = 1.0 + self.config.graph_boost * linked as f32;

                Ok(Candidate {
                    id: record.id,
                    last_accessed_at: record.last_accessed_at,
                    ranking: Ranking {
                        similarity,
                        intent_boost,
                        graph_boost,
                        composite: similarity * intent_boost * graph_boost * record.relevance_score,
                    },
                })
            })
            .collect()
    }
}

struct Candidate {
    id: Uuid,
    last_accessed_at: DateTime<Utc>,
    ranking: Ranking,
}
