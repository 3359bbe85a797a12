//! Lookup structures over stored records
//!
//! The index manager holds ids and embeddings only. Records live in the
//! tier store; every insertion or removal there must be mirrored here so
//! no index entry outlives its record.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;
use uuid::Uuid;

use crate::memory::MemoryRecord;
use crate::text::index_tokens;

/// Keyword, entity and vector indexes
#[derive(Debug, Default, Clone)]
pub struct IndexManager {
    keywords: BTreeMap<String, BTreeSet<Uuid>>,
    entities: BTreeMap<String, BTreeSet<Uuid>>,
    vectors: HashMap<Uuid, Vec<f32>>,
}

impl IndexManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a record under each distinct content token, each entity
    /// (case-insensitive) and its embedding
    pub fn index(&mut self, record: &MemoryRecord) {
        let tokens = index_tokens(&record.content);
        for token in &tokens {
            self.keywords
                .entry(token.clone())
                .or_default()
                .insert(record.id);
        }
        for entity in record.entities() {
            self.entities
                .entry(entity.to_lowercase())
                .or_default()
                .insert(record.id);
        }
        self.vectors.insert(record.id, record.embedding.clone());

        debug!(
            id = %record.short_code(),
            tokens = tokens.len(),
            entities = record.entities().len(),
            "Indexed record"
        );
    }

    /// Remove every entry that references `record`
    pub fn remove(&mut self, record: &MemoryRecord) {
        for token in index_tokens(&record.content) {
            remove_from(&mut self.keywords, &token, &record.id);
        }
        for entity in record.entities() {
            remove_from(&mut self.entities, &entity.to_lowercase(), &record.id);
        }
        self.vectors.remove(&record.id);
    }

    /// Ids whose content contains `word` as a token
    pub fn lookup_keyword(&self, word: &str) -> Vec<Uuid> {
        let key = word.to_lowercase();
        let key = key.trim_matches(|c: char| !c.is_alphanumeric());
        self.keywords
            .get(key)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Ids tagged with `entity`
    pub fn lookup_entity(&self, entity: &str) -> Vec<Uuid> {
        self.entities
            .get(&entity.to_lowercase())
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Embedding stored for `id`
    pub fn vector(&self, id: &Uuid) -> Option<&[f32]> {
        self.vectors.get(id).map(Vec::as_slice)
    }

    /// Every id referenced by any index
    pub fn referenced_ids(&self) -> BTreeSet<Uuid> {
        self.keywords
            .values()
            .chain(self.entities.values())
            .flatten()
            .copied()
            .chain(self.vectors.keys().copied())
            .collect()
    }

    /// Whether any index references `id`
    pub fn references(&self, id: &Uuid) -> bool {
        self.vectors.contains_key(id)
            || self.keywords.values().any(|ids| ids.contains(id))
            || self.entities.values().any(|ids| ids.contains(id))
    }

    pub fn keyword_count(&self) -> usize {
        self.keywords.len()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn vector_count(&self) -> usize {
        self.vectors.len()
    }

    pub fn clear(&mut self) {
        self.keywords.clear();
        self.entities.clear();
        self.vectors.clear();
    }
}

fn remove_from(index: &mut BTreeMap<String, BTreeSet<Uuid>>, key: &str, id: &Uuid) {
    if let Some(ids) = index.get_mut(key) {
        ids.remove(id);
        if ids.is_empty() {
            index.remove(key);
        }
    }
}
