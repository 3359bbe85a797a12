//! Consolidation of the recency window into summary records
//!
//! Once L2 holds at least `consolidation_threshold` records, the oldest
//! `chunk_size` are folded into one `ConsolidatedGoal` record in L3. The
//! summarizer may fail or stall; the chunk is then summarized by a
//! truncated concatenation instead, so no history is dropped.
//!
//! Collaborator calls happen before any tier is touched. If the pass is
//! cancelled while waiting on them, the window is left as it was.

use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::index::IndexManager;
use crate::memory::{CONSOLIDATED_GOAL, MemoryRecord, MemoryTier, Role};
use crate::provider::{Embedder, Summarizer};
use crate::text::truncate_chars;
use crate::tiers::TierStore;

/// Outcome of a consolidation that ran
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidationReport {
    /// Id of the new L3 record
    pub summary_id: Uuid,
    /// Source ids, oldest first
    pub constituent_ids: Vec<Uuid>,
    /// Whether the deterministic fallback summary was used
    pub used_fallback: bool,
}

/// Folds the oldest recency-window chunk into one L3 record
pub struct Consolidator<'a> {
    tiers: &'a mut TierStore,
    index: &'a mut IndexManager,
    embedder: &'a dyn Embedder,
    summarizer: &'a dyn Summarizer,
    config: &'a EngineConfig,
    summary_timeout: Duration,
}

impl<'a> Consolidator<'a> {
    pub fn new(
        tiers: &'a mut TierStore,
        index: &'a mut IndexManager,
        embedder: &'a dyn Embedder,
        summarizer: &'a dyn Summarizer,
        config: &'a EngineConfig,
        summary_timeout: Duration,
    ) -> Self {
        Self {
            tiers,
            index,
            embedder,
            summarizer,
            config,
            summary_timeout,
        }
    }

    /// Consolidate one chunk if L2 has reached the threshold.
    ///
    /// Returns `None` when the precondition does not hold.
    pub async fn run(&mut self, turn: u64) -> Result<Option<ConsolidationReport>> {
        if self.tiers.len(MemoryTier::L2Recent) < self.config.consolidation_threshold {
            return Ok(None);
        }

        let chunk = self.tiers.oldest_recent(self.config.chunk_size);
        let constituent_ids: Vec<Uuid> = chunk.iter().map(|r| r.id).collect();
        let contents: Vec<String> = chunk.iter().map(|r| r.content.clone()).collect();
        let fallback_embedding = mean_embedding(&chunk);
        let mut entities: Vec<String> = Vec::new();
        for entity in chunk.iter().flat_map(|r| r.entities()) {
            if !entities.contains(entity) {
                entities.push(entity.clone());
            }
        }

        let (summary, used_fallback) = self.summarize(&contents).await;

        let embedding = match self.embedder.embed(&summary).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!("Embedding the consolidation summary failed, averaging constituents: {e}");
                fallback_embedding
            }
        };

        let mut record = MemoryRecord::new(summary, Role::System, embedding, turn);
        record.tier = MemoryTier::L3Consolidated;
        record.metadata.kind = Some(CONSOLIDATED_GOAL.to_string());
        record.metadata.constituent_ids = Some(constituent_ids.clone());
        if !entities.is_empty() {
            record.metadata.entities = Some(entities);
        }
        let summary_id = record.id;

        for constituent in self.tiers.drain_oldest_recent(constituent_ids.len()) {
            self.index.remove(&constituent);
        }
        self.index.index(&record);
        self.tiers.place(record)?;

        info!(
            summary = %summary_id,
            constituents = constituent_ids.len(),
            used_fallback,
            "Consolidated recency window chunk"
        );

        Ok(Some(ConsolidationReport {
            summary_id,
            constituent_ids,
            used_fallback,
        }))
    }

    /// Ask the summarizer, falling back to a truncated concatenation on
    /// error, timeout or an empty reply
    async fn summarize(&self, contents: &[String]) -> (String, bool) {
        let result =
            tokio::time::timeout(self.summary_timeout, self.summarizer.summarize(contents)).await;

        let failure = match result {
            Ok(Ok(summary)) if !summary.trim().is_empty() => return (summary, false),
            Ok(Ok(_)) => "empty summary".to_string(),
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("timed out after {:?}", self.summary_timeout),
        };

        warn!(
            summarizer = self.summarizer.name(),
            "Summarization failed, using fallback summary: {failure}"
        );
        (
            truncate_chars(&contents.join(" "), self.config.fallback_summary_chars),
            true,
        )
    }
}

/// Component-wise mean of the chunk's embeddings
fn mean_embedding(chunk: &[&MemoryRecord]) -> Vec<f32> {
    let Some(first) = chunk.first() else {
        return Vec::new();
    };
    let mut mean = vec![0.0_f32; first.embedding.len()];
    for record in chunk {
        for (acc, value) in mean.iter_mut().zip(&record.embedding) {
            *acc += value;
        }
    }
    let count = chunk.len() as f32;
    for value in &mut mean {
        *value /= count;
    }
    mean
}
