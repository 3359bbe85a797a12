use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{MemGraphError, Result};

/// Main configuration structure for MemGraph
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Tier capacities and consolidation sizing
    #[serde(default)]
    pub engine: EngineConfig,
    /// Decay, access boost and pruning arithmetic
    #[serde(default)]
    pub scoring: ScoringConfig,
    /// Ranking parameters
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Fast-tier promotion heuristic
    #[serde(default)]
    pub promotion: PromotionConfig,
    /// Embedding collaborator selection
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    /// Summarization and generation collaborator selection
    #[serde(default)]
    pub llm: LlmConfig,
}

impl Config {
    /// Load configuration from an explicit path, the default locations, or
    /// fall back to defaults when no file exists.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = config_path {
            tracing::info!("Loading config from: {}", path.display());
            return Self::from_file(path);
        }

        for path in Self::default_paths() {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(&path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Config::default())
    }

    /// Parse and validate a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MemGraphError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| MemGraphError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Candidate config locations, in lookup order
    pub fn default_paths() -> Vec<PathBuf> {
        [
            dirs::home_dir().map(|h| h.join(".memgraph").join("config.toml")),
            dirs::config_dir().map(|c| c.join("memgraph").join("config.toml")),
            Some(PathBuf::from("config.toml")),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| MemGraphError::Serialization(e.to_string()))
    }

    /// Reject settings that would break tier or scoring invariants
    pub fn validate(&self) -> Result<()> {
        let engine = &self.engine;
        if engine.chunk_size == 0 {
            return Err(MemGraphError::Config("engine.chunk_size must be at least 1".into()));
        }
        if engine.consolidation_threshold < engine.chunk_size {
            return Err(MemGraphError::Config(format!(
                "engine.consolidation_threshold ({}) must be >= engine.chunk_size ({})",
                engine.consolidation_threshold, engine.chunk_size
            )));
        }
        if engine.recency_capacity < engine.consolidation_threshold {
            return Err(MemGraphError::Config(format!(
                "engine.recency_capacity ({}) must be >= engine.consolidation_threshold ({})",
                engine.recency_capacity, engine.consolidation_threshold
            )));
        }
        if engine.fast_cache_capacity == 0 {
            return Err(MemGraphError::Config(
                "engine.fast_cache_capacity must be at least 1".into(),
            ));
        }

        let scoring = &self.scoring;
        if !(scoring.hour_length_secs > 0.0) {
            return Err(MemGraphError::Config(
                "scoring.hour_length_secs must be positive".into(),
            ));
        }
        if scoring.decay_rate < 0.0 {
            return Err(MemGraphError::Config(
                "scoring.decay_rate must not be negative".into(),
            ));
        }
        if scoring.access_boost < 0.0 {
            return Err(MemGraphError::Config(
                "scoring.access_boost must not be negative".into(),
            ));
        }
        if !(0.0..=1.0).contains(&scoring.prune_threshold) {
            return Err(MemGraphError::Config(
                "scoring.prune_threshold must be within [0, 1]".into(),
            ));
        }

        if self.embedding.dimension == 0 {
            return Err(MemGraphError::Config(
                "embedding.dimension must be at least 1".into(),
            ));
        }

        Ok(())
    }
}

/// What to do when an ingest would overflow the recency window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Fold the oldest chunk into a consolidated record before appending
    #[default]
    Consolidate,
    /// Drop the oldest record without consolidating it
    Discard,
}

/// Tier capacity and consolidation configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Maximum records in the L2 recency window
    #[serde(default = "default_recency_capacity")]
    pub recency_capacity: usize,
    /// Maximum records in the L1 fast cache before LRU demotion
    #[serde(default = "default_fast_cache_capacity")]
    pub fast_cache_capacity: usize,
    /// Minimum L2 length before a maintenance pass consolidates
    #[serde(default = "default_consolidation_threshold")]
    pub consolidation_threshold: usize,
    /// Number of oldest L2 records folded into one summary
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Character budget of the fallback summary used when summarization fails
    #[serde(default = "default_fallback_summary_chars")]
    pub fallback_summary_chars: usize,
    /// Behavior when an ingest would overflow L2
    #[serde(default)]
    pub overflow_policy: OverflowPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            recency_capacity: default_recency_capacity(),
            fast_cache_capacity: default_fast_cache_capacity(),
            consolidation_threshold: default_consolidation_threshold(),
            chunk_size: default_chunk_size(),
            fallback_summary_chars: default_fallback_summary_chars(),
            overflow_policy: OverflowPolicy::default(),
        }
    }
}

fn default_recency_capacity() -> usize {
    50
}

fn default_fast_cache_capacity() -> usize {
    256
}

fn default_consolidation_threshold() -> usize {
    5
}

fn default_chunk_size() -> usize {
    3
}

fn default_fallback_summary_chars() -> usize {
    200
}

/// Relevance score arithmetic
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ScoringConfig {
    /// Exponential decay rate per hour of inactivity
    #[serde(default = "default_decay_rate")]
    pub decay_rate: f64,
    /// Wall-clock seconds counted as one decay hour (3600 in production,
    /// smaller values accelerate decay)
    #[serde(default = "default_hour_length_secs")]
    pub hour_length_secs: f64,
    /// Score added on every retrieval hit, capped at 1.0
    #[serde(default = "default_access_boost")]
    pub access_boost: f32,
    /// L3 records at or below this decayed score are pruned
    #[serde(default = "default_prune_threshold")]
    pub prune_threshold: f32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            decay_rate: default_decay_rate(),
            hour_length_secs: default_hour_length_secs(),
            access_boost: default_access_boost(),
            prune_threshold: default_prune_threshold(),
        }
    }
}

fn default_decay_rate() -> f64 {
    0.05
}

fn default_hour_length_secs() -> f64 {
    3600.0
}

fn default_access_boost() -> f32 {
    0.1
}

fn default_prune_threshold() -> f32 {
    0.2
}

/// Ranking configuration
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct RetrievalConfig {
    /// Records returned when the caller does not specify `k`
    #[serde(default = "default_k")]
    pub default_k: usize,
    /// Intent boost added per query token found in a candidate
    #[serde(default = "default_intent_boost_per_token")]
    pub intent_boost_per_token: f32,
    /// Boost per candidate entity connected to an entity named in the query
    #[serde(default = "default_graph_boost")]
    pub graph_boost: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_k: default_k(),
            intent_boost_per_token: default_intent_boost_per_token(),
            graph_boost: default_graph_boost(),
        }
    }
}

fn default_k() -> usize {
    3
}

fn default_intent_boost_per_token() -> f32 {
    0.5
}

fn default_graph_boost() -> f32 {
    0.25
}

/// Fast-tier promotion configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PromotionConfig {
    /// Case-insensitive phrases that promote a record to L1 at ingest
    #[serde(default = "default_promotion_triggers")]
    pub triggers: Vec<String>,
}

impl Default for PromotionConfig {
    fn default() -> Self {
        Self {
            triggers: default_promotion_triggers(),
        }
    }
}

fn default_promotion_triggers() -> Vec<String> {
    vec!["my name is".to_string(), "preference".to_string()]
}

/// Embedding collaborator configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// `hash` (built-in) or `fastembed` (requires the `fastembed` feature)
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    /// Vector length produced by the hash embedder
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            dimension: default_embedding_dimension(),
        }
    }
}

fn default_embedding_provider() -> String {
    "hash".to_string()
}

fn default_embedding_dimension() -> usize {
    128
}

/// Summarization and generation collaborator configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// `local` (built-in extractive/template) or `remote`
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    /// Timeout the turn runner imposes on generation
    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,
    /// Timeout imposed on each summarization call
    #[serde(default = "default_summary_timeout_secs")]
    pub summary_timeout_secs: u64,
    /// Remote API configuration
    #[serde(default)]
    pub remote: RemoteLlmConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            generation_timeout_secs: default_generation_timeout_secs(),
            summary_timeout_secs: default_summary_timeout_secs(),
            remote: RemoteLlmConfig::default(),
        }
    }
}

fn default_llm_provider() -> String {
    "local".to_string()
}

fn default_generation_timeout_secs() -> u64 {
    30
}

fn default_summary_timeout_secs() -> u64 {
    30
}

/// Remote OpenAI-compatible API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemoteLlmConfig {
    /// API base URL (`/chat/completions` is appended)
    #[serde(default)]
    pub api_url: String,
    /// Environment variable name for API key
    #[serde(default = "default_remote_api_key_env")]
    pub api_key_env: String,
    /// Model identifier for remote API
    #[serde(default = "default_remote_model")]
    pub model: String,
    /// Request timeout in seconds
    #[serde(default = "default_remote_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RemoteLlmConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            api_key_env: default_remote_api_key_env(),
            model: default_remote_model(),
            timeout_secs: default_remote_timeout_secs(),
        }
    }
}

fn default_remote_api_key_env() -> String {
    "MEMGRAPH_API_KEY".to_string()
}

fn default_remote_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_remote_timeout_secs() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.engine.recency_capacity, 50);
        assert_eq!(config.engine.fast_cache_capacity, 256);
        assert_eq!(config.engine.consolidation_threshold, 5);
        assert_eq!(config.engine.chunk_size, 3);
        assert_eq!(config.engine.fallback_summary_chars, 200);
        assert_eq!(config.engine.overflow_policy, OverflowPolicy::Consolidate);
        assert_eq!(config.scoring.decay_rate, 0.05);
        assert_eq!(config.scoring.hour_length_secs, 3600.0);
        assert!((config.scoring.access_boost - 0.1).abs() < f32::EPSILON);
        assert!((config.scoring.prune_threshold - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.retrieval.default_k, 3);
        assert!((config.retrieval.intent_boost_per_token - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.promotion.triggers, vec!["my name is", "preference"]);
        assert_eq!(config.embedding.provider, "hash");
        assert_eq!(config.embedding.dimension, 128);
        assert_eq!(config.llm.provider, "local");
        assert_eq!(config.llm.remote.api_key_env, "MEMGRAPH_API_KEY");
        assert_eq!(config.llm.remote.model, "gpt-4o-mini");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_deserialization() {
        let toml_str = r#"
[engine]
recency_capacity = 20
fast_cache_capacity = 8
consolidation_threshold = 6
chunk_size = 4
overflow_policy = "discard"

[scoring]
decay_rate = 0.5
hour_length_secs = 1.0

[retrieval]
default_k = 5
graph_boost = 0.0

[promotion]
triggers = ["remember that"]

[llm]
provider = "remote"

[llm.remote]
api_url = "https://api.example.com/v1"
api_key_env = "OPENAI_API_KEY"
model = "gpt-4"
timeout_secs = 60
"#;

        let config: Config = toml::from_str(toml_str).expect("Failed to parse TOML");

        assert_eq!(config.engine.recency_capacity, 20);
        assert_eq!(config.engine.fast_cache_capacity, 8);
        assert_eq!(config.engine.consolidation_threshold, 6);
        assert_eq!(config.engine.chunk_size, 4);
        assert_eq!(config.engine.fallback_summary_chars, 200);
        assert_eq!(config.engine.overflow_policy, OverflowPolicy::Discard);
        assert_eq!(config.scoring.decay_rate, 0.5);
        assert_eq!(config.scoring.hour_length_secs, 1.0);
        assert_eq!(config.retrieval.default_k, 5);
        assert_eq!(config.retrieval.graph_boost, 0.0);
        assert_eq!(config.promotion.triggers, vec!["remember that"]);
        assert_eq!(config.llm.provider, "remote");
        assert_eq!(config.llm.remote.api_url, "https://api.example.com/v1");
        assert_eq!(config.llm.remote.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.llm.remote.timeout_secs, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_partial_deserialization() {
        let toml_str = r#"
[scoring]
hour_length_secs = 60.0
"#;

        let config: Config = toml::from_str(toml_str).expect("Failed to parse partial TOML");

        assert_eq!(config.scoring.hour_length_secs, 60.0);
        assert_eq!(config.scoring.decay_rate, 0.05);
        assert_eq!(config.engine.recency_capacity, 50);
        assert_eq!(config.retrieval.default_k, 3);
    }

    #[test]
    fn test_validate_rejects_inconsistent_sizes() {
        let mut config = Config::default();
        config.engine.chunk_size = 0;
        assert!(matches!(config.validate(), Err(MemGraphError::Config(_))));

        let mut config = Config::default();
        config.engine.consolidation_threshold = 2;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.engine.recency_capacity = 4;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.engine.fast_cache_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_scoring() {
        let mut config = Config::default();
        config.scoring.hour_length_secs = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.scoring.decay_rate = -1.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.scoring.prune_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_round_trips_through_toml() {
        let config = Config::default();
        let rendered = config.to_toml().expect("Failed to render TOML");
        let parsed: Config = toml::from_str(&rendered).expect("Failed to parse rendered TOML");
        assert_eq!(parsed.engine.recency_capacity, config.engine.recency_capacity);
        assert_eq!(parsed.scoring, config.scoring);
        assert_eq!(parsed.retrieval, config.retrieval);
        assert_eq!(parsed.promotion.triggers, config.promotion.triggers);
    }

    #[test]
    fn test_load_from_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        writeln!(file, "[engine]\nrecency_capacity = 10").expect("Failed to write config");

        let config = Config::load(Some(file.path())).expect("Failed to load config");
        assert_eq!(config.engine.recency_capacity, 10);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        writeln!(file, "[engine]\nchunk_size = 0").expect("Failed to write config");

        let result = Config::load(Some(file.path()));
        assert!(matches!(result, Err(MemGraphError::Config(_))));
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let result = Config::load(Some(&dir.path().join("missing.toml")));
        assert!(matches!(result, Err(MemGraphError::Config(_))));
    }
}
