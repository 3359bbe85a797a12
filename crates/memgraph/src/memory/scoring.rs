//! Relevance score arithmetic
//!
//! Scores live in `[0.0, 1.0]`. Decay multiplies by
//! `exp(-decay_rate * elapsed_hours)` where elapsed time is measured from
//! the last access and converted using the configured hour length. Access
//! boosts add a fixed amount, capped at 1.0.

use chrono::{DateTime, Utc};

use crate::config::ScoringConfig;
use crate::memory::types::MemoryRecord;

/// Hours elapsed between `since` and `now`, scaled by the configured hour
/// length. Clock skew (a `now` before `since`) counts as zero.
pub fn elapsed_hours(since: DateTime<Utc>, now: DateTime<Utc>, config: &ScoringConfig) -> f64 {
    let millis = (now - since).num_milliseconds().max(0) as f64;
    millis / 1000.0 / config.hour_length_secs
}

/// Multiplicative decay factor in `(0.0, 1.0]`
pub fn decay_factor(elapsed_hours: f64, decay_rate: f64) -> f64 {
    (-decay_rate * elapsed_hours.max(0.0)).exp().min(1.0)
}

/// Decay a record's relevance based on time since its last access.
///
/// Never increases the score. Returns the new score.
pub fn apply_decay(record: &mut MemoryRecord, config: &ScoringConfig, now: DateTime<Utc>) -> f32 {
    let hours = elapsed_hours(record.last_accessed_at, now, config);
    let factor = decay_factor(hours, config.decay_rate);
    let decayed = (f64::from(record.relevance_score) * factor) as f32;
    record.relevance_score = decayed.clamp(0.0, record.relevance_score);
    record.relevance_score
}

/// Record a retrieval hit: boost the score, stamp the access time and bump
/// the access counter.
///
/// Never decreases the score. Returns the new score.
pub fn apply_access_boost(
    record: &mut MemoryRecord,
    config: &ScoringConfig,
    now: DateTime<Utc>,
) -> f32 {
    let boosted = (record.relevance_score + config.access_boost).min(1.0);
    record.relevance_score = boosted.max(record.relevance_score);
    record.last_accessed_at = now;
    record.access_count = record.access_count.saturating_add(1);
    record.relevance_score
}
