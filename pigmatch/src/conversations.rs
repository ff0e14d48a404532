//! Conversation threads attached to access requests.
//!
//! The chat transport is an external collaborator: all this crate needs is an append-only
//! thread keyed by request id. [`InMemoryConversationStore`] is the bundled implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::db::models::messages::Message;
use crate::errors::Result;
use crate::types::{AccessRequestId, UserId};

#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Append a message to the request's thread, creating the thread if needed.
    async fn append(&self, request_id: AccessRequestId, author_id: UserId, body: String, at: DateTime<Utc>) -> Result<Message>;

    /// Messages of a thread in append order. Unknown threads are empty.
    async fn thread(&self, request_id: AccessRequestId) -> Result<Vec<Message>>;
}

#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    threads: DashMap<AccessRequestId, Vec<Message>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn append(&self, request_id: AccessRequestId, author_id: UserId, body: String, at: DateTime<Utc>) -> Result<Message> {
        let message = Message {
            id: Uuid::new_v4(),
            request_id,
            author_id,
            body,
            created_at: at,
        };
        self.threads.entry(request_id).or_default().push(message.clone());
        Ok(message)
    }

    async fn thread(&self, request_id: AccessRequestId) -> Result<Vec<Message>> {
        Ok(self.threads.get(&request_id).map(|t| t.clone()).unwrap_or_default())
    }
}
