//! Conversation State Store: volatile, process-local snapshot storage.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::AgentError;
use crate::state::ConversationSnapshot;

/// Keyed storage for in-progress goal snapshots.
///
/// Injected into the goal agent; nothing here outlives the process.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Register a new conversation. Fails if the id is already active.
    async fn start(&self, id: &str, initial: ConversationSnapshot) -> Result<(), AgentError>;

    /// Copy of the current snapshot, or `None` if the conversation is not active.
    async fn read(&self, id: &str) -> Option<ConversationSnapshot>;

    /// Replace the snapshot of an active conversation.
    async fn write(&self, id: &str, state: ConversationSnapshot) -> Result<(), AgentError>;

    /// Drop a conversation. Ending an unknown id is a no-op.
    async fn end(&self, id: &str);
}

/// `StateStore` backed by a `HashMap` behind a tokio `RwLock`.
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    entries: RwLock<HashMap<String, ConversationSnapshot>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of active conversations.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn start(&self, id: &str, initial: ConversationSnapshot) -> Result<(), AgentError> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(id) {
            return Err(AgentError::DuplicateConversation {
                conversation_id: id.to_string(),
            });
        }
        entries.insert(id.to_string(), initial);
        tracing::debug!(conversation_id = %id, "Conversation started");
        Ok(())
    }

    async fn read(&self, id: &str) -> Option<ConversationSnapshot> {
        self.entries.read().await.get(id).cloned()
    }

    async fn write(&self, id: &str, state: ConversationSnapshot) -> Result<(), AgentError> {
        let mut entries = self.entries.write().await;
        match entries.get_mut(id) {
            Some(slot) => {
                *slot = state;
                tracing::debug!(conversation_id = %id, "Conversation updated");
                Ok(())
            }
            None => Err(AgentError::UnknownConversation {
                conversation_id: id.to_string(),
            }),
        }
    }

    async fn end(&self, id: &str) {
        if self.entries.write().await.remove(id).is_some() {
            tracing::debug!(conversation_id = %id, "Conversation ended");
        }
    }
}
