//! API request/response models for request conversations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::validate_text;
use crate::db::models::messages::Message;
use crate::errors::Result;
use crate::types::{AccessRequestId, MessageId, UserId};

pub const BODY_MAX_CHARS: usize = 2000;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageCreate {
    /// 1 to 2000 characters
    pub body: String,
}

impl MessageCreate {
    pub fn validate(&self) -> Result<()> {
        validate_text("body", &self.body, BODY_MAX_CHARS)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: MessageId,
    #[schema(value_type = String, format = "uuid")]
    pub request_id: AccessRequestId,
    #[schema(value_type = String, format = "uuid")]
    pub author_id: UserId,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl From<Message> for MessageResponse {
    fn from(m: Message) -> Self {
        Self {
            id: m.id,
            request_id: m.request_id,
            author_id: m.author_id,
            body: m.body,
            created_at: m.created_at,
        }
    }
}
