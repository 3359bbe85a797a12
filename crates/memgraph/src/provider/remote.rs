//! Remote summarizer and generator over OpenAI-compatible APIs
//!
//! One client serves both collaborator roles. The endpoint URL, model and
//! the name of the environment variable holding the API key come from
//! `[llm.remote]`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::RemoteLlmConfig;
use crate::memory::MemoryRecord;
use crate::provider::prompts::{GENERATION_PROMPT, summarize_prompt};
use crate::provider::{Generator, ProviderError, Summarizer};

const MAX_ATTEMPTS: u32 = 3;

/// Remote LLM client
#[derive(Debug)]
pub struct RemoteLlm {
    client: Client,
    config: RemoteLlmConfig,
    api_key: String,
    initial_backoff: Duration,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

impl RemoteLlm {
    /// Create a client from configuration.
    ///
    /// Fails when the API key environment variable is not set.
    pub fn new(config: &RemoteLlmConfig) -> Result<Self, ProviderError> {
        let api_key = env::var(&config.api_key_env).map_err(|_| {
            ProviderError::Config(format!("API key env var '{}' not set", config.api_key_env))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Api(e.to_string()))?;

        info!(
            "RemoteLlm initialized with model: {}, api_url: {}",
            config.model, config.api_url
        );

        Ok(Self {
            client,
            config: config.clone(),
            api_key,
            initial_backoff: Duration::from_secs(1),
        })
    }

    /// Override the first rate-limit backoff delay (doubles per attempt)
    pub fn with_backoff(mut self, initial: Duration) -> Self {
        self.initial_backoff = initial;
        self
    }

    /// POST a chat completion, retrying with exponential backoff on 429
    /// and on transport errors.
    async fn call_api(&self, system: &str, user: &str) -> Result<String, ProviderError> {
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            temperature: 0.2,
            max_tokens: 512,
        };

        let url = format!("{}/chat/completions", self.config.api_url.trim_end_matches('/'));
        debug!("Calling remote API at: {}", url);

        let mut last_error = None;
        let mut delay = self.initial_backoff;

        for attempt in 0..MAX_ATTEMPTS {
            match self
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&request)
                .send()
                .await
            {
                Ok(response) => {
                    let status = response.status();

                    if status == 429 {
                        warn!(
                            "Rate limited on attempt {}/{}, waiting {:?}",
                            attempt + 1,
                            MAX_ATTEMPTS,
                            delay
                        );
                        last_error = Some("rate limited".to_string());
                        if attempt < MAX_ATTEMPTS - 1 {
                            tokio::time::sleep(delay).await;
                            delay *= 2;
                        }
                        continue;
                    }

                    if !status.is_success() {
                        let error_text = response
                            .text()
                            .await
                            .unwrap_or_else(|_| "Unknown error".to_string());
                        return Err(ProviderError::Api(format!(
                            "API returned {status}: {error_text}"
                        )));
                    }

                    let completion: ChatCompletionResponse = response
                        .json()
                        .await
                        .map_err(|e| ProviderError::Api(format!("Malformed response: {e}")))?;

                    return completion
                        .choices
                        .into_iter()
                        .next()
                        .map(|c| c.message.content)
                        .ok_or_else(|| ProviderError::Api("Empty response".to_string()));
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    last_error = Some(err_msg.clone());
                    if attempt < MAX_ATTEMPTS - 1 {
                        warn!(
                            "Request failed on attempt {}/{}, retrying: {}",
                            attempt + 1,
                            MAX_ATTEMPTS,
                            err_msg
                        );
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                    }
                }
            }
        }

        Err(ProviderError::Api(format!(
            "Failed after {} attempts: {}",
            MAX_ATTEMPTS,
            last_error.unwrap_or_else(|| "Unknown error".to_string())
        )))
    }
}

/// One context line per memory: `[MEM_XXXXXXXX] (tier, score): content`
fn memory_lines(memories: &[MemoryRecord]) -> String {
    if memories.is_empty() {
        return "(none)".to_string();
    }
    memories
        .iter()
        .map(|m| {
            format!(
                "[{}] ({}, {:.2}): {}",
                m.short_code(),
                m.tier,
                m.relevance_score,
                m.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl Summarizer for RemoteLlm {
    async fn summarize(&self, contents: &[String]) -> Result<String, ProviderError> {
        let response = self
            .call_api("You are a helpful assistant.", &summarize_prompt(contents))
            .await
            .map_err(|e| ProviderError::Summarization(e.to_string()))?;
        let summary = response.trim();
        if summary.is_empty() {
            return Err(ProviderError::Summarization("empty summary".to_string()));
        }
        debug!("Summary response: {}", summary);
        Ok(summary.to_string())
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}

#[async_trait]
impl Generator for RemoteLlm {
    async fn generate(
        &self,
        query: &str,
        memories: &[MemoryRecord],
    ) -> Result<String, ProviderError> {
        let system = GENERATION_PROMPT.replace("{memories}", &memory_lines(memories));
        self.call_api(&system, query)
            .await
            .map(|reply| reply.trim().to_string())
            .map_err(|e| ProviderError::Generation(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}
