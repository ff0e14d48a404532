use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AccessRequestId, MessageId, UserId};

/// One entry in the conversation thread attached to an access request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub request_id: AccessRequestId,
    pub author_id: UserId,
    pub body: String,
    pub created_at: DateTime<Utc>,
}
