//! Memory records and relevance scoring
//!
//! Defines the record stored in every tier and the decay / access-boost
//! arithmetic applied to its relevance score.

pub mod scoring;
pub mod types;

pub use scoring::{apply_access_boost, apply_decay, decay_factor, elapsed_hours};
pub use types::{
    CONSOLIDATED_GOAL, MemoryRecord, MemoryTier, RecordMetadata, RecordView, Role, round_score,
};
