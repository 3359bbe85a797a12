//! Per-conversation memory engine
//!
//! `MemoryEngine` owns every piece of one conversation's state: the tiers,
//! the indexes, the cache-hit counter and the turn counter. All operations
//! take `&mut self`, so a caller sharing an engine must serialize access
//! (see [`crate::session::ConversationRegistry`]).

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::{Config, OverflowPolicy};
use crate::error::{MemGraphError, Result};
use crate::index::IndexManager;
use crate::maintenance::{ConsolidationReport, Consolidator, MaintenanceReport, Pruner};
use crate::memory::{MemoryRecord, MemoryTier, RecordView, Role};
use crate::provider::{Collaborators, Generator, ProviderError};
use crate::retrieval::{RetrievalEngine, RetrievedMemory};
use crate::tiers::{KeywordPromotionPolicy, PromotionPolicy, TierStore};

/// Point-in-time counters for presentation layers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineStats {
    pub l1_fast: usize,
    pub l2_recent: usize,
    pub l3_consolidated: usize,
    /// Entities in the relationship graph
    pub l4_entities: usize,
    /// Undirected links in the relationship graph
    pub l4_links: usize,
    pub cache_hits: u64,
    pub turn: u64,
    /// Latency of the last completed turn, if one was recorded
    pub last_latency_ms: Option<u64>,
}

/// Tiered memory for one conversation
pub struct MemoryEngine {
    config: Config,
    tiers: TierStore,
    index: IndexManager,
    collaborators: Collaborators,
    promotion: Box<dyn PromotionPolicy>,
    turn: u64,
    cache_hits: u64,
    last_retrieval: Vec<RecordView>,
    last_latency: Option<Duration>,
}

impl std::fmt::Debug for MemoryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEngine")
            .field("turn", &self.turn)
            .field("cache_hits", &self.cache_hits)
            .field("records", &self.tiers.record_count())
            .field("embedder", &self.collaborators.embedder.name())
            .finish_non_exhaustive()
    }
}

impl MemoryEngine {
    /// Create an engine with the given collaborators and the keyword
    /// promotion policy from `config.promotion`
    pub fn new(config: Config, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;
        let tiers = TierStore::new(
            config.engine.recency_capacity,
            config.engine.fast_cache_capacity,
        );
        let promotion = Box::new(KeywordPromotionPolicy::from_config(&config.promotion));
        Ok(Self {
            config,
            tiers,
            index: IndexManager::new(),
            collaborators,
            promotion,
            turn: 0,
            cache_hits: 0,
            last_retrieval: Vec::new(),
            last_latency: None,
        })
    }

    /// Create an engine with the collaborators named by the configuration
    pub fn from_config(config: Config) -> Result<Self> {
        let collaborators = Collaborators::from_config(&config)?;
        Self::new(config, collaborators)
    }

    /// Replace the promotion policy
    pub fn with_promotion_policy(mut self, policy: impl PromotionPolicy + 'static) -> Self {
        self.promotion = Box::new(policy);
        self
    }

    /// Store a new turn.
    ///
    /// Blank content is rejected before anything is touched, as is an
    /// embedding failure. Promoted records go straight to L1; all others
    /// are appended to L2. When L2 is full the configured overflow policy
    /// either consolidates first or discards the oldest record.
    pub async fn ingest(
        &mut self,
        content: &str,
        role: Role,
        entities: &[String],
    ) -> Result<MemoryRecord> {
        if content.trim().is_empty() {
            return Err(MemGraphError::InvalidInput("content is empty".to_string()));
        }

        let embedding = self.collaborators.embedder.embed(content).await?;
        let expected = self.collaborators.embedder.dimension();
        if embedding.len() != expected {
            return Err(ProviderError::Embedding(format!(
                "expected {expected} dimensions, got {}",
                embedding.len()
            ))
            .into());
        }

        let mut record = MemoryRecord::new(content.to_string(), role, embedding, self.turn);
        let mut distinct: Vec<String> = Vec::new();
        for entity in entities.iter().map(|e| e.trim()).filter(|e| !e.is_empty()) {
            if !distinct.iter().any(|d| d.eq_ignore_ascii_case(entity)) {
                distinct.push(entity.to_string());
            }
        }
        if !distinct.is_empty() {
            record.metadata.entities = Some(distinct);
        }

        if self.promotion.should_promote(&record) {
            record.tier = MemoryTier::L1Fast;
            debug!(id = %record.short_code(), "Promoted record to L1");
        } else if self.tiers.recent_is_full()
            && self.config.engine.overflow_policy == OverflowPolicy::Consolidate
        {
            debug!("Recency window full, consolidating before ingest");
            self.consolidate().await?;
        }

        if let Some(discarded) = self.tiers.place(record.clone())? {
            warn!(
                id = %discarded.short_code(),
                "Recency window overflow discarded an unconsolidated record"
            );
            self.index.remove(&discarded);
        }
        self.index.index(&record);
        self.tiers.graph_mut().add_entities(record.entities());

        debug!(
            id = %record.short_code(),
            tier = %record.tier,
            turn = self.turn,
            "Ingested record"
        );
        Ok(record)
    }

    /// Return at most `k` records for `query`, best first.
    ///
    /// An exact normalized match against L1 returns that single record and
    /// counts as a cache hit.
    pub async fn retrieve(&mut self, query: &str, k: usize) -> Result<Vec<RetrievedMemory>> {
        if query.trim().is_empty() {
            return Err(MemGraphError::InvalidInput("query is empty".to_string()));
        }

        let outcome = RetrievalEngine::new(
            &mut self.tiers,
            &self.index,
            self.collaborators.embedder.as_ref(),
            self.collaborators.similarity.as_ref(),
            self.config.retrieval,
            self.config.scoring,
        )
        .retrieve(query, k, self.turn, Utc::now())
        .await?;

        if outcome.cache_hit {
            self.cache_hits += 1;
        }
        self.last_retrieval = outcome.memories.iter().map(|m| m.record.to_view()).collect();
        Ok(outcome.memories)
    }

    /// Advance the turn counter by one and return the new turn
    pub fn increment_turn(&mut self) -> u64 {
        self.turn += 1;
        self.turn
    }

    /// Prune L3, then consolidate L2 if it reached the threshold
    pub async fn run_maintenance(&mut self) -> Result<MaintenanceReport> {
        self.run_maintenance_at(Utc::now()).await
    }

    /// Maintenance pass with an explicit clock, for decay
    pub async fn run_maintenance_at(&mut self, now: DateTime<Utc>) -> Result<MaintenanceReport> {
        let prune = Pruner::new(&mut self.tiers, &mut self.index, self.config.scoring).run(now);
        let consolidation = self.consolidate().await?;
        Ok(MaintenanceReport {
            prune,
            consolidation,
        })
    }

    async fn consolidate(&mut self) -> Result<Option<ConsolidationReport>> {
        Consolidator::new(
            &mut self.tiers,
            &mut self.index,
            self.collaborators.embedder.as_ref(),
            self.collaborators.summarizer.as_ref(),
            &self.config.engine,
            Duration::from_secs(self.config.llm.summary_timeout_secs),
        )
        .run(self.turn)
        .await
    }

    /// Clear every tier, index and counter
    pub fn reset(&mut self) {
        self.tiers.clear();
        self.index.clear();
        self.turn = 0;
        self.cache_hits = 0;
        self.last_retrieval.clear();
        self.last_latency = None;
        debug!("Engine reset");
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            l1_fast: self.tiers.len(MemoryTier::L1Fast),
            l2_recent: self.tiers.len(MemoryTier::L2Recent),
            l3_consolidated: self.tiers.len(MemoryTier::L3Consolidated),
            l4_entities: self.tiers.len(MemoryTier::L4Graph),
            l4_links: self.tiers.graph().edge_count(),
            cache_hits: self.cache_hits,
            turn: self.turn,
            last_latency_ms: self
                .last_latency
                .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
        }
    }

    /// Views of the records returned by the last retrieval
    pub fn last_retrieval(&self) -> &[RecordView] {
        &self.last_retrieval
    }

    pub fn record_latency(&mut self, latency: Duration) {
        self.last_latency = Some(latency);
    }

    /// Records whose content contains `word`
    pub fn lookup_keyword(&self, word: &str) -> Result<Vec<&MemoryRecord>> {
        self.resolve(self.index.lookup_keyword(word))
    }

    /// Records tagged with `entity`
    pub fn lookup_entity(&self, entity: &str) -> Result<Vec<&MemoryRecord>> {
        self.resolve(self.index.lookup_entity(entity))
    }

    fn resolve(&self, ids: Vec<Uuid>) -> Result<Vec<&MemoryRecord>> {
        ids.into_iter()
            .map(|id| {
                self.tiers.get(&id).ok_or_else(|| {
                    MemGraphError::StateCorruption(format!("index references missing record {id}"))
                })
            })
            .collect()
    }

    pub fn get(&self, id: &Uuid) -> Option<&MemoryRecord> {
        self.tiers.get(id)
    }

    /// Records held by `tier`; L4 holds entities and lists no records
    pub fn records(&self, tier: MemoryTier) -> Vec<&MemoryRecord> {
        self.tiers.records(tier)
    }

    /// Entities related to `entity` in the relationship graph
    pub fn related_entities(&self, entity: &str) -> Vec<&str> {
        self.tiers.graph().neighbors(entity)
    }

    /// Check the cross-structure invariants: ids are unique across tiers,
    /// every record's `tier` matches its collection and has a vector, and
    /// no index references a missing record.
    pub fn verify_integrity(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for tier in MemoryTier::ALL {
            for record in self.tiers.records(tier) {
                if record.tier != tier {
                    return Err(MemGraphError::StateCorruption(format!(
                        "record {} is marked {} but stored in {}",
                        record.short_code(),
                        record.tier,
                        tier
                    )));
                }
                if !seen.insert(record.id) {
                    return Err(MemGraphError::StateCorruption(format!(
                        "record {} is stored more than once",
                        record.short_code()
                    )));
                }
                if self.index.vector(&record.id).is_none() {
                    return Err(MemGraphError::StateCorruption(format!(
                        "record {} has no vector index entry",
                        record.short_code()
                    )));
                }
            }
        }

        if let Some(orphan) = self
            .index
            .referenced_ids()
            .into_iter()
            .find(|id| !seen.contains(id))
        {
            return Err(MemGraphError::StateCorruption(format!(
                "index references missing record {orphan}"
            )));
        }
        Ok(())
    }

    pub fn turn(&self) -> u64 {
        self.turn
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// The generator collaborator, shared for use outside the engine lock
    pub fn generator(&self) -> Arc<dyn Generator> {
        Arc::clone(&self.collaborators.generator)
    }
}
