//! One conversational turn end to end
//!
//! The runner drives an engine through a full turn: advance the turn
//! counter, store the user message, retrieve context, generate a reply
//! under a timeout, store the reply, run maintenance and record latency.
//!
//! Collaborator failures during retrieval or generation degrade the reply
//! instead of failing the turn; the user message is already committed by
//! then.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::warn;

use crate::engine::MemoryEngine;
use crate::error::{MemGraphError, Result};
use crate::maintenance::MaintenanceReport;
use crate::memory::{MemoryRecord, RecordView, Role};
use crate::provider::{Generator, ProviderError};

/// Reply used when generation fails or times out
pub const DEGRADED_REPLY: &str =
    "I couldn't generate a reply just now, but I've saved your message.";

/// What happened during one turn
#[derive(Debug, Clone, Serialize)]
pub struct TurnReport {
    pub turn: u64,
    pub reply: String,
    /// Why the reply is degraded, if it is
    pub degraded: Option<String>,
    /// Whether retrieval was answered by the fast cache
    pub cache_hit: bool,
    /// Records handed to the generator
    pub active_memories: Vec<RecordView>,
    #[serde(skip)]
    pub maintenance: MaintenanceReport,
    pub latency_ms: u64,
}

/// Drives turns with a generator and a generation timeout
#[derive(Clone)]
pub struct TurnRunner {
    generator: Arc<dyn Generator>,
    timeout: Duration,
}

impl TurnRunner {
    pub fn new(generator: Arc<dyn Generator>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }

    /// Runner using the engine's own generator and configured timeout
    pub fn for_engine(engine: &MemoryEngine) -> Self {
        Self::new(
            engine.generator(),
            Duration::from_secs(engine.config().llm.generation_timeout_secs),
        )
    }

    pub async fn run(&self, engine: &mut MemoryEngine, message: &str) -> Result<TurnReport> {
        self.run_with_entities(engine, message, &[]).await
    }

    /// Run a turn whose user message mentions `entities`
    pub async fn run_with_entities(
        &self,
        engine: &mut MemoryEngine,
        message: &str,
        entities: &[String],
    ) -> Result<TurnReport> {
        if message.trim().is_empty() {
            return Err(MemGraphError::InvalidInput("message is empty".to_string()));
        }

        let start = Instant::now();
        let turn = engine.increment_turn();
        engine.ingest(message, Role::User, entities).await?;

        let mut degraded = None;
        let hits_before = engine.cache_hits();
        let k = engine.config().retrieval.default_k;
        let memories: Vec<MemoryRecord> = match engine.retrieve(message, k).await {
            Ok(retrieved) => retrieved.into_iter().map(|m| m.record).collect(),
            Err(MemGraphError::Collaborator(e)) => {
                warn!("Retrieval failed, replying without memories: {e}");
                degraded = Some(format!("retrieval failed: {e}"));
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        let cache_hit = engine.cache_hits() > hits_before;

        let reply = match tokio::time::timeout(
            self.timeout,
            self.generator.generate(message, &memories),
        )
        .await
        {
            Ok(Ok(reply)) if !reply.trim().is_empty() => {
                if let Err(e) = engine.ingest(&reply, Role::Assistant, &[]).await {
                    warn!("Failed to store assistant reply: {e}");
                }
                reply
            }
            outcome => {
                let reason = match outcome {
                    Ok(Ok(_)) => ProviderError::Generation("empty reply".to_string()),
                    Ok(Err(e)) => e,
                    Err(_) => ProviderError::Timeout(self.timeout.as_secs()),
                };
                warn!(
                    generator = self.generator.name(),
                    "Generation failed, returning degraded reply: {reason}"
                );
                degraded = Some(format!("generation failed: {reason}"));
                DEGRADED_REPLY.to_string()
            }
        };

        let maintenance = engine.run_maintenance().await?;

        let latency = start.elapsed();
        engine.record_latency(latency);

        Ok(TurnReport {
            turn,
            reply,
            degraded,
            cache_hit,
            active_memories: memories.iter().map(MemoryRecord::to_view).collect(),
            maintenance,
            latency_ms: u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
        })
    }
}
