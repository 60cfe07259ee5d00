//! PostgreSQL storage adapter.
//!
//! This module implements the feed ports defined in `reel-core`
//! using PostgreSQL as the backing store.
//!
//! # Architecture
//!
//! - [`Database`] - Connection pool and migrations
//! - [`PgLatestVideoStore`] - `BucketStore` and `LatestVideoRepository` over `latest_videos`
//!
//! # Usage
//!
//! ```ignore
//! let config = DatabaseConfig::for_cli(&database_url);
//! let db = Database::connect(&config).await?;
//! db.migrate().await?;
//!
//! let store = Arc::new(PgLatestVideoStore::new(&db));
//! ```

mod database;
mod latest_video_repo;

pub use database::{Database, DatabaseConfig, PurgeStats};
pub use latest_video_repo::PgLatestVideoStore;
