//! Decay-based pruning of the consolidated store
//!
//! Only L3 decays and is pruned. L2 is already bounded by its window and
//! L1 by its LRU capacity, so both are exempt from this pass.

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::config::ScoringConfig;
use crate::index::IndexManager;
use crate::memory::apply_decay;
use crate::tiers::TierStore;

/// Outcome of one pruning pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PruneReport {
    /// L3 records decayed by this pass
    pub decayed: usize,
    /// Ids removed from L3 (and from every index)
    pub pruned: Vec<Uuid>,
}

/// Decays L3 and removes records at or below the prune threshold
pub struct Pruner<'a> {
    tiers: &'a mut TierStore,
    index: &'a mut IndexManager,
    config: ScoringConfig,
}

impl<'a> Pruner<'a> {
    pub fn new(tiers: &'a mut TierStore, index: &'a mut IndexManager, config: ScoringConfig) -> Self {
        Self {
            tiers,
            index,
            config,
        }
    }

    pub fn run(&mut self, now: DateTime<Utc>) -> PruneReport {
        let records = self.tiers.consolidated_mut();
        let decayed = records.len();
        for record in records.iter_mut() {
            apply_decay(record, &self.config, now);
        }

        let threshold = self.config.prune_threshold;
        let removed = self
            .tiers
            .remove_consolidated_where(|r| r.relevance_score <= threshold);

        for record in &removed {
            self.index.remove(record);
        }

        if !removed.is_empty() {
            info!(
                pruned = removed.len(),
                remaining = decayed - removed.len(),
                "Pruned decayed consolidated records"
            );
        }

        PruneReport {
            decayed,
            pruned: removed.into_iter().map(|r| r.id).collect(),
        }
    }
}
