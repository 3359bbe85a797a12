//! Tier storage
//!
//! Four tiers, hottest first:
//! - L1: bounded LRU fast cache keyed by the normalized content hash
//! - L2: fixed-capacity recency window, oldest first
//! - L3: unbounded consolidated store
//! - L4: entity relationship graph (entities, not records)
//!
//! A record lives in exactly one collection and its `tier` field always
//! names that collection. Records evicted from L1 are demoted to L3 rather
//! than dropped.

pub mod graph;
pub mod promotion;

use std::collections::VecDeque;
use std::num::NonZeroUsize;

use lru::LruCache;
use tracing::warn;
use uuid::Uuid;

use crate::error::{MemGraphError, Result};
use crate::memory::{MemoryRecord, MemoryTier};
use crate::text::content_key;

pub use graph::EntityGraph;
pub use promotion::{KeywordPromotionPolicy, NoPromotion, PromotionPolicy};

/// Record collections for one conversation
#[derive(Debug)]
pub struct TierStore {
    fast: LruCache<String, MemoryRecord>,
    recent: VecDeque<MemoryRecord>,
    recent_capacity: usize,
    consolidated: Vec<MemoryRecord>,
    graph: EntityGraph,
}

impl TierStore {
    /// Create empty tiers. Zero capacities are raised to one.
    pub fn new(recent_capacity: usize, fast_capacity: usize) -> Self {
        let fast_capacity = NonZeroUsize::new(fast_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            fast: LruCache::new(fast_capacity),
            recent: VecDeque::with_capacity(recent_capacity),
            recent_capacity: recent_capacity.max(1),
            consolidated: Vec::new(),
            graph: EntityGraph::new(),
        }
    }

    /// Store a record in the collection named by its `tier`.
    ///
    /// Returns the record pushed out of the recency window when it
    /// overflows; the caller owns its index cleanup. A record displaced
    /// from L1 is demoted to L3 in place.
    pub fn place(&mut self, record: MemoryRecord) -> Result<Option<MemoryRecord>> {
        match record.tier {
            MemoryTier::L1Fast => {
                let key = content_key(&record.content);
                if let Some((_, mut displaced)) = self.fast.push(key, record) {
                    warn!(
                        id = %displaced.short_code(),
                        "Fast cache displaced a record, demoting to L3"
                    );
                    displaced.tier = MemoryTier::L3Consolidated;
                    self.consolidated.push(displaced);
                }
                Ok(None)
            }
            MemoryTier::L2Recent => {
                self.recent.push_back(record);
                if self.recent.len() > self.recent_capacity {
                    return Ok(self.recent.pop_front());
                }
                Ok(None)
            }
            MemoryTier::L3Consolidated => {
                self.consolidated.push(record);
                Ok(None)
            }
            MemoryTier::L4Graph => Err(MemGraphError::StateCorruption(format!(
                "record {} cannot be stored in the relationship graph",
                record.short_code()
            ))),
        }
    }

    /// Exact-match fast cache lookup. Refreshes the entry's LRU position.
    pub fn fast_hit(&mut self, key: &str) -> Option<&mut MemoryRecord> {
        self.fast.get_mut(key)
    }

    pub fn get(&self, id: &Uuid) -> Option<&MemoryRecord> {
        self.fast
            .iter()
            .map(|(_, r)| r)
            .chain(self.recent.iter())
            .chain(self.consolidated.iter())
            .find(|r| r.id == *id)
    }

    pub fn get_mut(&mut self, id: &Uuid) -> Option<&mut MemoryRecord> {
        self.fast
            .iter_mut()
            .map(|(_, r)| r)
            .chain(self.recent.iter_mut())
            .chain(self.consolidated.iter_mut())
            .find(|r| r.id == *id)
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.get(id).is_some()
    }

    /// Remove a record from whichever collection holds it
    pub fn remove(&mut self, id: &Uuid) -> Option<MemoryRecord> {
        let tier = self.get(id)?.tier;
        match tier {
            MemoryTier::L1Fast => {
                let key = self
                    .fast
                    .iter()
                    .find(|(_, r)| r.id == *id)
                    .map(|(k, _)| k.clone())?;
                self.fast.pop(&key)
            }
            MemoryTier::L2Recent => {
                let pos = self.recent.iter().position(|r| r.id == *id)?;
                self.recent.remove(pos)
            }
            MemoryTier::L3Consolidated => {
                let pos = self.consolidated.iter().position(|r| r.id == *id)?;
                Some(self.consolidated.remove(pos))
            }
            MemoryTier::L4Graph => None,
        }
    }

    /// The oldest `n` recency-window records, oldest first
    pub fn oldest_recent(&self, n: usize) -> Vec<&MemoryRecord> {
        self.recent.iter().take(n).collect()
    }

    /// Remove and return the oldest `n` recency-window records in FIFO order
    pub fn drain_oldest_recent(&mut self, n: usize) -> Vec<MemoryRecord> {
        let n = n.min(self.recent.len());
        self.recent.drain(..n).collect()
    }

    pub fn consolidated_mut(&mut self) -> &mut [MemoryRecord] {
        &mut self.consolidated
    }

    /// Remove every L3 record matching `predicate`, keeping the order of
    /// the survivors
    pub fn remove_consolidated_where<F>(&mut self, mut predicate: F) -> Vec<MemoryRecord>
    where
        F: FnMut(&MemoryRecord) -> bool,
    {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.consolidated)
            .into_iter()
            .partition(|r| predicate(r));
        self.consolidated = kept;
        removed
    }

    /// Ranking candidates: every conversational record in L1, L2 and L3.
    /// Promoted records stay rankable after leaving the recency window.
    pub fn candidates(&self) -> impl Iterator<Item = &MemoryRecord> {
        self.fast
            .iter()
            .map(|(_, r)| r)
            .chain(self.recent.iter())
            .chain(self.consolidated.iter())
    }

    /// Records held by `tier`. The fast cache is listed most recently used
    /// first; L4 holds entities only, so it lists nothing.
    pub fn records(&self, tier: MemoryTier) -> Vec<&MemoryRecord> {
        match tier {
            MemoryTier::L1Fast => self.fast.iter().map(|(_, r)| r).collect(),
            MemoryTier::L2Recent => self.recent.iter().collect(),
            MemoryTier::L3Consolidated => self.consolidated.iter().collect(),
            MemoryTier::L4Graph => Vec::new(),
        }
    }

    /// Every stored record, hottest tier first
    pub fn all_records(&self) -> impl Iterator<Item = &MemoryRecord> {
        self.fast
            .iter()
            .map(|(_, r)| r)
            .chain(self.recent.iter())
            .chain(self.consolidated.iter())
    }

    /// Size of `tier`; for L4 this is the number of graph entities
    pub fn len(&self, tier: MemoryTier) -> usize {
        match tier {
            MemoryTier::L1Fast => self.fast.len(),
            MemoryTier::L2Recent => self.recent.len(),
            MemoryTier::L3Consolidated => self.consolidated.len(),
            MemoryTier::L4Graph => self.graph.len(),
        }
    }

    /// Number of stored records across L1-L3
    pub fn record_count(&self) -> usize {
        self.fast.len() + self.recent.len() + self.consolidated.len()
    }

    pub fn recent_capacity(&self) -> usize {
        self.recent_capacity
    }

    pub fn fast_capacity(&self) -> usize {
        self.fast.cap().get()
    }

    /// Whether one more L2 insertion would overflow the window
    pub fn recent_is_full(&self) -> bool {
        self.recent.len() >= self.recent_capacity
    }

    pub fn graph(&self) -> &EntityGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut EntityGraph {
        &mut self.graph
    }

    pub fn clear(&mut self) {
        self.fast.clear();
        self.recent.clear();
        self.consolidated.clear();
        self.graph.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Role;

    fn create_test_record(content: &str, tier: MemoryTier) -> MemoryRecord {
        let mut record = MemoryRecord::new(content.to_string(), Role::User, vec![1.0], 0);
        record.tier = tier;
        record
    }

    #[test]
    fn test_recent_window_is_fifo_and_bounded() {
        let mut tiers = TierStore::new(2, 4);
        let first = create_test_record("one", MemoryTier::L2Recent);
        let first_id = first.id;

        assert!(tiers.place(first).unwrap().is_none());
        assert!(tiers.place(create_test_record("two", MemoryTier::L2Recent)).unwrap().is_none());
        assert!(tiers.recent_is_full());

        let evicted = tiers
            .place(create_test_record("three", MemoryTier::L2Recent))
            .unwrap()
            .unwrap();
        assert_eq!(evicted.id, first_id);
        assert_eq!(tiers.len(MemoryTier::L2Recent), 2);
        let contents: Vec<_> = tiers
            .records(MemoryTier::L2Recent)
            .iter()
            .map(|r| r.content.as_str())
            .collect();
        assert_eq!(contents, vec!["two", "three"]);
    }

    #[test]
    fn test_fast_cache_hit_by_normalized_key() {
        let mut tiers = TierStore::new(10, 4);
        let record = create_test_record("My name is Ada.", MemoryTier::L1Fast);
        let id = record.id;
        tiers.place(record).unwrap();

        let hit = tiers.fast_hit(&content_key("my name is ada")).unwrap();
        assert_eq!(hit.id, id);
        assert!(tiers.fast_hit(&content_key("my name is bob")).is_none());
    }

    #[test]
    fn test_fast_cache_overflow_demotes_to_consolidated() {
        let mut tiers = TierStore::new(10, 1);
        let old = create_test_record("my name is Ada", MemoryTier::L1Fast);
        let old_id = old.id;
        tiers.place(old).unwrap();
        tiers
            .place(create_test_record("my preference is tea", MemoryTier::L1Fast))
            .unwrap();

        assert_eq!(tiers.len(MemoryTier::L1Fast), 1);
        let demoted = tiers.get(&old_id).unwrap();
        assert_eq!(demoted.tier, MemoryTier::L3Consolidated);
        assert_eq!(tiers.records(MemoryTier::L3Consolidated).len(), 1);
        assert_eq!(tiers.record_count(), 2);
    }

    #[test]
    fn test_same_key_replacement_demotes_previous() {
        let mut tiers = TierStore::new(10, 4);
        let old = create_test_record("My name is Ada", MemoryTier::L1Fast);
        let old_id = old.id;
        tiers.place(old).unwrap();
        tiers
            .place(create_test_record("my name is ada!", MemoryTier::L1Fast))
            .unwrap();

        assert_eq!(tiers.len(MemoryTier::L1Fast), 1);
        assert_eq!(tiers.get(&old_id).unwrap().tier, MemoryTier::L3Consolidated);
    }

    #[test]
    fn test_graph_tier_rejects_records() {
        let mut tiers = TierStore::new(10, 4);
        let result = tiers.place(create_test_record("x", MemoryTier::L4Graph));
        assert!(matches!(result, Err(MemGraphError::StateCorruption(_))));
        assert_eq!(tiers.record_count(), 0);
    }

    #[test]
    fn test_remove_from_each_tier() {
        let mut tiers = TierStore::new(10, 4);
        let ids: Vec<Uuid> = [
            MemoryTier::L1Fast,
            MemoryTier::L2Recent,
            MemoryTier::L3Consolidated,
        ]
        .into_iter()
        .enumerate()
        .map(|(i, tier)| {
            let record = create_test_record(&format!("record {i}"), tier);
            let id = record.id;
            tiers.place(record).unwrap();
            id
        })
        .collect();

        for id in &ids {
            assert_eq!(tiers.remove(id).unwrap().id, *id);
        }
        assert_eq!(tiers.record_count(), 0);
        assert!(tiers.remove(&Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_drain_oldest_recent() {
        let mut tiers = TierStore::new(10, 4);
        for i in 0..5 {
            tiers
                .place(create_test_record(&format!("turn {i}"), MemoryTier::L2Recent))
                .unwrap();
        }
        let drained: Vec<_> = tiers
            .drain_oldest_recent(3)
            .into_iter()
            .map(|r| r.content)
            .collect();
        assert_eq!(drained, vec!["turn 0", "turn 1", "turn 2"]);
        assert_eq!(tiers.len(MemoryTier::L2Recent), 2);
        assert_eq!(tiers.drain_oldest_recent(10).len(), 2);
    }

    #[test]
    fn test_remove_consolidated_where_keeps_order() {
        let mut tiers = TierStore::new(10, 4);
        for (i, score) in [0.9, 0.1, 0.5, 0.2].into_iter().enumerate() {
            let mut record = create_test_record(&format!("c{i}"), MemoryTier::L3Consolidated);
            record.relevance_score = score;
            tiers.place(record).unwrap();
        }

        let removed = tiers.remove_consolidated_where(|r| r.relevance_score <= 0.2);
        assert_eq!(removed.len(), 2);
        let kept: Vec<_> = tiers
            .records(MemoryTier::L3Consolidated)
            .iter()
            .map(|r| r.content.as_str())
            .collect();
        assert_eq!(kept, vec!["c0", "c2"]);
    }

    #[test]
    fn test_clear() {
        let mut tiers = TierStore::new(10, 4);
        tiers.place(create_test_record("a", MemoryTier::L2Recent)).unwrap();
        tiers.graph_mut().add_entities(&["Ada".to_string()]);
        tiers.clear();
        for tier in MemoryTier::ALL {
            assert_eq!(tiers.len(tier), 0);
        }
    }
}
