//! Memory record types for the MemGraph engine
//!
//! Defines the atomic unit of stored interaction, the tier it lives in,
//! its metadata, and the external representation handed to presentation
//! layers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{MemGraphError, Result};

/// Metadata `type` value carried by consolidation summaries
pub const CONSOLIDATED_GOAL: &str = "ConsolidatedGoal";

/// A single interaction turn (or a summary of several) held by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Unique identifier, fixed at creation
    pub id: Uuid,
    /// Text payload
    pub content: String,
    /// Who produced the content
    pub role: Role,
    /// Vector produced by the embedding collaborator at creation
    pub embedding: Vec<f32>,
    /// When this record was created
    pub created_at: DateTime<Utc>,
    /// When this record was last returned by retrieval
    pub last_accessed_at: DateTime<Utc>,
    /// How many times this record has been returned by retrieval
    pub access_count: u32,
    /// Which tier currently holds this record
    pub tier: MemoryTier,
    /// Relevance in `[0.0, 1.0]`
    pub relevance_score: f32,
    /// Turn stamps, entities and consolidation lineage
    pub metadata: RecordMetadata,
}

impl MemoryRecord {
    /// Create a fresh record stamped with the current turn.
    ///
    /// New records start in the recency window with full relevance.
    pub fn new(content: String, role: Role, embedding: Vec<f32>, turn: u64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            content,
            role,
            embedding,
            created_at: now,
            last_accessed_at: now,
            access_count: 0,
            tier: MemoryTier::L2Recent,
            relevance_score: 1.0,
            metadata: RecordMetadata::at_turn(turn),
        }
    }

    /// Human-facing code such as `MEM_1A2B3C4D`
    pub fn short_code(&self) -> String {
        let simple = self.id.simple().to_string();
        format!("MEM_{}", simple[..8].to_uppercase())
    }

    /// Entities attached at ingest (or inherited by a summary)
    pub fn entities(&self) -> &[String] {
        self.metadata.entities.as_deref().unwrap_or(&[])
    }

    /// Whether this record is a consolidation summary
    pub fn is_consolidated(&self) -> bool {
        self.metadata.kind.as_deref() == Some(CONSOLIDATED_GOAL)
    }

    /// Build the external representation of this record
    pub fn to_view(&self) -> RecordView {
        RecordView {
            id: self.id,
            tier: self.tier,
            score: round_score(self.relevance_score),
            role: self.role,
            content: self.content.clone(),
            metadata: self.metadata.clone(),
        }
    }

    /// Reconstruct a record from its external representation.
    ///
    /// Timestamps are reset to now and the access count to zero since the
    /// view does not carry them.
    pub fn from_view(view: RecordView, embedding: Vec<f32>) -> Result<Self> {
        if !(0.0..=1.0).contains(&view.score) {
            return Err(MemGraphError::InvalidInput(format!(
                "score {} outside [0, 1]",
                view.score
            )));
        }

        let now = Utc::now();
        Ok(Self {
            id: view.id,
            content: view.content,
            role: view.role,
            embedding,
            created_at: now,
            last_accessed_at: now,
            access_count: 0,
            tier: view.tier,
            relevance_score: view.score,
            metadata: view.metadata,
        })
    }
}

/// Round a score to the fixed precision used in external views
pub fn round_score(score: f32) -> f32 {
    (score * 10_000.0).round() / 10_000.0
}

/// Who produced a record's content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User message
    User,
    /// Assistant message
    Assistant,
    /// Engine-generated content (consolidation summaries)
    System,
}

impl Role {
    /// Convert role to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = MemGraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "system" => Ok(Role::System),
            other => Err(MemGraphError::InvalidInput(format!("Unknown role: {other}"))),
        }
    }
}

/// Storage tier a record occupies, ordered by access cost and volatility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemoryTier {
    /// Exact-match fast cache
    #[serde(rename = "L1_fast")]
    L1Fast,
    /// Fixed-capacity recency window
    #[serde(rename = "L2_recent")]
    L2Recent,
    /// Long-lived summarized records
    #[serde(rename = "L3_consolidated")]
    L3Consolidated,
    /// Entity relationship graph
    #[serde(rename = "L4_graph")]
    L4Graph,
}

impl MemoryTier {
    /// All tiers, hottest first
    pub const ALL: [MemoryTier; 4] = [
        MemoryTier::L1Fast,
        MemoryTier::L2Recent,
        MemoryTier::L3Consolidated,
        MemoryTier::L4Graph,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryTier::L1Fast => "L1_fast",
            MemoryTier::L2Recent => "L2_recent",
            MemoryTier::L3Consolidated => "L3_consolidated",
            MemoryTier::L4Graph => "L4_graph",
        }
    }
}

impl std::fmt::Display for MemoryTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-record metadata.
///
/// Unknown keys survive a serialization round trip through `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetadata {
    /// Turn at which the record was created
    pub creation_turn: u64,
    /// Turn at which the record was last retrieved
    pub last_access_turn: u64,
    /// Entities mentioned by the record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<String>>,
    /// Record kind, e.g. `ConsolidatedGoal`
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Source ids folded into a consolidation summary, oldest first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constituent_ids: Option<Vec<Uuid>>,
    /// Additional free-form keys
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl RecordMetadata {
    /// Metadata for a record created at `turn`
    pub fn at_turn(turn: u64) -> Self {
        Self {
            creation_turn: turn,
            last_access_turn: turn,
            ..Default::default()
        }
    }
}

/// External representation: `{id, tier, score, role, content, metadata}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordView {
    pub id: Uuid,
    pub tier: MemoryTier,
    pub score: f32,
    pub role: Role,
    pub content: String,
    pub metadata: RecordMetadata,
}
