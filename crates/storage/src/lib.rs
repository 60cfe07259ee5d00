//! Storage layer for the Reel latest-videos feed.
//!
//! This crate provides implementations of the feed ports defined in
//! `reel-core`: a PostgreSQL store for deployments and an in-memory store
//! for demos and tests. Both order a bucket the same way and share the
//! keyset continuation tokens in [`keyset`].
//!
//! # Usage
//!
//! ```ignore
//! use reel_storage::{Database, DatabaseConfig, PgLatestVideoStore};
//!
//! // Connect to the database
//! let config = DatabaseConfig::for_cli(&database_url);
//! let db = Database::connect(&config).await?;
//!
//! // Run migrations
//! db.migrate().await?;
//!
//! // Create the store
//! let store = Arc::new(PgLatestVideoStore::new(&db));
//! ```

pub mod keyset;
pub mod memory;
pub mod postgres;

pub use memory::InMemoryLatestVideoStore;
pub use postgres::{Database, DatabaseConfig, PgLatestVideoStore, PurgeStats};
