//! Persistent records and persistence errors.
//!
//! # Modules
//!
//! - [`models`]: Record structures for properties, sightings, subscriptions, matches and messages
//! - [`errors`]: Persistence error types
//!
//! Access requests are modelled with the typestate pattern in [`crate::requests`]; storage
//! backends in [`crate::storage`] persist all of these records.
//!
//! # Migrations
//!
//! PostgreSQL migrations are managed by SQLx and located in the `migrations/` directory.
//! The [`crate::migrator`] function provides access to the migrator:
//!
//! ```ignore
//! pigmatch::migrator().run(&pool).await?;
//! ```

pub mod errors;
pub mod models;
