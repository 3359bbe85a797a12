//! Conversation identity and the per-conversation engine registry
//!
//! Each conversation owns one [`MemoryEngine`] behind its own async mutex,
//! so turns against the same conversation are serialized while different
//! conversations proceed independently.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::Config;
use crate::engine::MemoryEngine;
use crate::error::Result;
use crate::provider::Collaborators;

/// Longest accepted conversation id, in bytes
pub const MAX_CONVERSATION_ID_LEN: usize = 128;

/// Why a string was rejected as a conversation id
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversationIdError {
    #[error("conversation id is empty")]
    Empty,

    #[error("conversation id is {len} bytes long, the limit is {MAX_CONVERSATION_ID_LEN}")]
    TooLong { len: usize },

    #[error("conversation id has {found:?} at byte {index}; use ASCII letters, digits, '-' or '_'")]
    BadChar { index: usize, found: char },
}

/// Registry key for one conversation.
///
/// Ids double as log fields and CLI arguments, so they are restricted to
/// short ASCII slugs. Deserializing goes through the same check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConversationId(String);

impl ConversationId {
    pub fn parse(raw: impl Into<String>) -> std::result::Result<Self, ConversationIdError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(ConversationIdError::Empty);
        }
        if raw.len() > MAX_CONVERSATION_ID_LEN {
            return Err(ConversationIdError::TooLong { len: raw.len() });
        }
        if let Some((index, found)) = raw.char_indices().find(|&(_, c)| !is_slug_char(c)) {
            return Err(ConversationIdError::BadChar { index, found });
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_slug_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_')
}

impl FromStr for ConversationId {
    type Err = ConversationIdError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ConversationId {
    type Error = ConversationIdError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ConversationId> for String {
    fn from(id: ConversationId) -> Self {
        id.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A conversation's engine, locked as one unit
pub type SharedEngine = Arc<Mutex<MemoryEngine>>;

/// Engines keyed by conversation
pub struct ConversationRegistry {
    config: Config,
    collaborators: Collaborators,
    conversations: DashMap<ConversationId, SharedEngine>,
}

impl ConversationRegistry {
    /// New engines are built from `config` and share `collaborators`.
    /// The config is validated up front.
    pub fn new(config: Config, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            collaborators,
            conversations: DashMap::new(),
        })
    }

    /// The engine for `id`, created empty on first use
    pub fn get_or_create(&self, id: &ConversationId) -> Result<SharedEngine> {
        let entry = self
            .conversations
            .entry(id.clone())
            .or_try_insert_with(|| {
                debug!(conversation = %id, "Creating conversation engine");
                MemoryEngine::new(self.config.clone(), self.collaborators.clone())
                    .map(|engine| Arc::new(Mutex::new(engine)))
            })?;
        Ok(Arc::clone(entry.value()))
    }

    pub fn get(&self, id: &ConversationId) -> Option<SharedEngine> {
        self.conversations.get(id).map(|e| Arc::clone(e.value()))
    }

    /// Drop a conversation. Holders of its engine keep it alive until they
    /// release it.
    pub fn remove(&self, id: &ConversationId) -> Option<SharedEngine> {
        self.conversations.remove(id).map(|(_, engine)| engine)
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Conversation ids, sorted
    pub fn ids(&self) -> Vec<ConversationId> {
        let mut ids: Vec<_> = self.conversations.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }
}
