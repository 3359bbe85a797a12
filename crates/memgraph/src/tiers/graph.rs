//! L4 relationship graph
//!
//! Undirected co-mention graph over entity names. Two entities are linked
//! when a single record mentions both. Names are stored lower-cased.

use std::collections::{BTreeMap, BTreeSet};

/// Entity co-mention graph
#[derive(Debug, Default, Clone)]
pub struct EntityGraph {
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl EntityGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add every entity as a node and link each co-mentioned pair
    pub fn add_entities(&mut self, entities: &[String]) {
        let names: BTreeSet<String> = entities
            .iter()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();

        for name in &names {
            let neighbors = self.edges.entry(name.clone()).or_default();
            neighbors.extend(names.iter().filter(|other| *other != name).cloned());
        }
    }

    /// Direct neighbors of `entity`
    pub fn neighbors(&self, entity: &str) -> Vec<&str> {
        self.edges
            .get(&entity.to_lowercase())
            .map(|n| n.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Known entities whose name occurs in `text` (case-insensitive)
    pub fn entities_in(&self, text: &str) -> Vec<&str> {
        let lower = text.to_lowercase();
        self.edges
            .keys()
            .filter(|name| lower.contains(name.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// The seeds plus every entity one hop away from them
    pub fn expand<'g>(&'g self, seeds: &[&'g str]) -> BTreeSet<&'g str> {
        let mut expanded = BTreeSet::new();
        for seed in seeds {
            if let Some((name, neighbors)) = self.edges.get_key_value(*seed) {
                expanded.insert(name.as_str());
                expanded.extend(neighbors.iter().map(String::as_str));
            }
        }
        expanded
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.edges.contains_key(&entity.to_lowercase())
    }

    /// Number of entities
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Number of undirected links
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum::<usize>() / 2
    }

    pub fn clear(&mut self) {
        self.edges.clear();
    }
}
