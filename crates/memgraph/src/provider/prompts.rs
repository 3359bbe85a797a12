//! Prompts for the remote summarization and generation calls

/// Consolidation prompt.
///
/// Placeholder: {turns} - the chunk's contents, one per line, oldest first
pub const SUMMARIZE_PROMPT: &str = r#"The following conversation turns are about to be archived. Summarize them into a single goal statement that captures what the user is trying to achieve and any facts worth keeping.

Turns:
{turns}

Respond with ONLY the summary, in one or two sentences."#;

/// Reply generation system prompt.
///
/// Placeholder: {memories} - one line per active memory
pub const GENERATION_PROMPT: &str = r#"You are a conversational assistant with long-term memory. Use the following Active Memories to answer the user.
Do NOT explicitly mention "I found this memory", just use the information naturally.
If the memories contradict, trust the one with the higher score.

Active Memories:
{memories}"#;

/// Render the consolidation prompt for a chunk of contents
pub fn summarize_prompt(contents: &[String]) -> String {
    let turns = contents
        .iter()
        .map(|c| format!("- {c}"))
        .collect::<Vec<_>>()
        .join("\n");
    SUMMARIZE_PROMPT.replace("{turns}", &turns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_prompt_lists_turns_in_order() {
        let prompt = summarize_prompt(&["first".to_string(), "second".to_string()]);
        let first = prompt.find("- first").unwrap();
        let second = prompt.find("- second").unwrap();
        assert!(first < second);
        assert!(!prompt.contains("{turns}"));
    }
}
