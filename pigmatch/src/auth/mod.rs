//! Caller identity.
//!
//! Authentication happens upstream: a trusted proxy sets the user id and role headers named in
//! [`AuthConfig`](crate::config::AuthConfig). [`CurrentUser`] extracts them, rejecting requests
//! without a well-formed identity with `401`. Role checks (`403`) are made by the handlers.

pub mod current_user;

pub use current_user::CurrentUser;
