//! Built-in summarizer and generator
//!
//! Both run in-process without a model. They make the engine usable out of
//! the box and keep tests deterministic.

use async_trait::async_trait;

use crate::memory::MemoryRecord;
use crate::provider::{Generator, ProviderError, Summarizer};
use crate::text::truncate_chars;

/// Summarizes by quoting the head of the joined contents
#[derive(Debug, Clone)]
pub struct ExtractiveSummarizer {
    max_chars: usize,
}

impl ExtractiveSummarizer {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }
}

impl Default for ExtractiveSummarizer {
    fn default() -> Self {
        Self::new(50)
    }
}

#[async_trait]
impl Summarizer for ExtractiveSummarizer {
    async fn summarize(&self, contents: &[String]) -> Result<String, ProviderError> {
        if contents.is_empty() {
            return Err(ProviderError::Summarization("nothing to summarize".to_string()));
        }
        let joined = contents.join(" ");
        let head: String = joined.chars().take(self.max_chars).collect();
        Ok(format!("User goal intent derived from: {head}..."))
    }

    fn name(&self) -> &'static str {
        "extractive"
    }
}

/// Replies from a fixed template over the retrieved memories
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateGenerator;

impl TemplateGenerator {
    fn recall_name(memories: &[MemoryRecord]) -> Option<(String, &MemoryRecord)> {
        memories.iter().find_map(|memory| {
            // ASCII lowering keeps byte offsets aligned with the input
            let lower = memory.content.to_ascii_lowercase();
            let start = lower.find("my name is ")? + "my name is ".len();
            let name = memory.content[start..]
                .split_whitespace()
                .next()?
                .trim_matches(|c: char| !c.is_alphanumeric());
            (!name.is_empty()).then(|| (name.to_string(), memory))
        })
    }
}

#[async_trait]
impl Generator for TemplateGenerator {
    async fn generate(
        &self,
        query: &str,
        memories: &[MemoryRecord],
    ) -> Result<String, ProviderError> {
        let query_lower = query.to_lowercase();
        if query_lower.contains("name") && !query_lower.contains("my name is") {
            if let Some((name, memory)) = Self::recall_name(memories) {
                return Ok(format!(
                    "Your name is {name}. I recall this from memory {}.",
                    memory.short_code()
                ));
            }
        }

        let codes: Vec<String> = memories.iter().map(MemoryRecord::short_code).collect();
        let context = if codes.is_empty() {
            "no active memories".to_string()
        } else {
            format!("{} active memories ({})", codes.len(), codes.join(", "))
        };
        Ok(format!(
            "This is a generated response for '{}' based on {context}.",
            truncate_chars(query, 80)
        ))
    }

    fn name(&self) -> &'static str {
        "template"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Role;

    fn record(content: &str) -> MemoryRecord {
        MemoryRecord::new(content.to_string(), Role::User, vec![0.0; 4], 0)
    }

    #[tokio::test]
    async fn test_extractive_summary_quotes_head() {
        let summarizer = ExtractiveSummarizer::new(10);
        let summary = summarizer
            .summarize(&["Turn 0 details".to_string(), "Turn 1".to_string()])
            .await
            .unwrap();
        assert_eq!(summary, "User goal intent derived from: Turn 0 det...");
    }

    #[tokio::test]
    async fn test_extractive_summary_rejects_empty() {
        let result = ExtractiveSummarizer::default().summarize(&[]).await;
        assert!(matches!(result, Err(ProviderError::Summarization(_))));
    }

    #[tokio::test]
    async fn test_template_recalls_name() {
        let memory = record("My name is Priranshu.");
        let reply = TemplateGenerator
            .generate("What is my name?", std::slice::from_ref(&memory))
            .await
            .unwrap();
        assert_eq!(
            reply,
            format!("Your name is Priranshu. I recall this from memory {}.", memory.short_code())
        );
    }

    #[tokio::test]
    async fn test_template_lists_memory_codes() {
        let memories = vec![record("I like Rust"), record("I live in Pune")];
        let reply = TemplateGenerator.generate("Tell me more", &memories).await.unwrap();
        assert!(reply.contains("2 active memories"));
        assert!(reply.contains(&memories[0].short_code()));
        assert!(reply.contains(&memories[1].short_code()));
    }

    #[tokio::test]
    async fn test_template_without_memories() {
        let reply = TemplateGenerator.generate("Hello", &[]).await.unwrap();
        assert_eq!(
            reply,
            "This is a generated response for 'Hello' based on no active memories."
        );
    }
}
