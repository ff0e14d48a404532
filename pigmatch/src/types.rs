//! Common type definitions shared across the crate.
//!
//! This module defines:
//! - Type aliases for entity IDs (UserId, PropertyId, etc.)
//! - The [`Role`] a caller acts under, as asserted by the identity provider
//!
//! # ID Types
//!
//! All entity IDs are UUIDs wrapped in type aliases:
//!
//! - [`UserId`]: landowner or hunter account identifier (issued by the identity provider)
//! - [`PropertyId`]: a landowner's parcel
//! - [`SightingId`]: a reported sighting
//! - [`SubscriptionId`]: a hunter's area of interest
//! - [`AccessRequestId`]: a hunter's request to hunt in connection with a sighting
//! - [`MatchId`]: a confirmed booking
//! - [`MessageId`]: a message in a request's conversation thread

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

// Type aliases for IDs
pub type UserId = Uuid;
pub type PropertyId = Uuid;
pub type SightingId = Uuid;
pub type SubscriptionId = Uuid;
pub type AccessRequestId = Uuid;
pub type MatchId = Uuid;
pub type MessageId = Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

/// The role a caller acts under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Landowner,
    Hunter,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Landowner => "landowner",
            Role::Hunter => "hunter",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "landowner" => Ok(Role::Landowner),
            "hunter" => Ok(Role::Hunter),
            other => Err(format!("unknown role '{other}', expected 'landowner' or 'hunter'")),
        }
    }
}
