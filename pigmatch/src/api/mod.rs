//! HTTP adapter: handlers and their request/response models.

pub mod handlers;
pub mod models;
