//! Fast-tier promotion at ingest

use crate::config::PromotionConfig;
use crate::memory::MemoryRecord;

/// Decides once, at ingest, whether a record belongs in the fast tier.
///
/// Implementations must be pure: the same record always yields the same
/// answer and nothing is mutated.
pub trait PromotionPolicy: Send + Sync {
    fn should_promote(&self, record: &MemoryRecord) -> bool;
}

/// Promotes records whose content contains any trigger phrase
/// (case-insensitive)
#[derive(Debug, Clone)]
pub struct KeywordPromotionPolicy {
    triggers: Vec<String>,
}

impl KeywordPromotionPolicy {
    pub fn new<I, S>(triggers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            triggers: triggers
                .into_iter()
                .map(|t| t.as_ref().trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &PromotionConfig) -> Self {
        Self::new(&config.triggers)
    }

    pub fn triggers(&self) -> &[String] {
        &self.triggers
    }
}

impl Default for KeywordPromotionPolicy {
    fn default() -> Self {
        Self::from_config(&PromotionConfig::default())
    }
}

impl PromotionPolicy for KeywordPromotionPolicy {
    fn should_promote(&self, record: &MemoryRecord) -> bool {
        let content = record.content.to_lowercase();
        self.triggers.iter().any(|t| content.contains(t.as_str()))
    }
}

/// Never promotes
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPromotion;

impl PromotionPolicy for NoPromotion {
    fn should_promote(&self, _record: &MemoryRecord) -> bool {
        false
    }
}
