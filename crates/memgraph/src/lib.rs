//! MemGraph - tiered conversational memory
//!
//! This crate stores conversation turns across four tiers (a fast cache, a
//! recency window, a consolidated store and an entity graph), ranks them
//! against new queries with decaying relevance scores, and periodically
//! folds aging history into summary records.

pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod maintenance;
pub mod memory;
pub mod provider;
pub mod retrieval;
pub mod session;
pub mod testing;
pub mod text;
pub mod tiers;
pub mod turn;

pub use config::Config;
pub use engine::{EngineStats, MemoryEngine};
pub use error::{MemGraphError, Result};
pub use maintenance::MaintenanceReport;
pub use memory::{MemoryRecord, MemoryTier, RecordView, Role};
pub use provider::{Collaborators, ProviderError};
pub use retrieval::{Ranking, RetrievedMemory};
pub use session::{ConversationId, ConversationRegistry};
pub use turn::{TurnReport, TurnRunner};
