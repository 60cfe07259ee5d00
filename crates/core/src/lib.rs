//! Core domain layer for the Reel latest-videos feed.
//!
//! This crate contains the domain models, port traits (interfaces), and
//! services that page through a day-partitioned video feed. It follows
//! hexagonal architecture principles - this is the innermost layer with
//! no dependencies on infrastructure.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       reel (binary)                         │
//! │                           (CLI)                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │                       reel-storage                          │
//! │                 (PostgreSQL, in-memory)                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │                      reel-core  ← YOU ARE HERE              │
//! │               (models, ports, services)                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`models`] - Domain models (BucketId, BucketSequence, VideoPreview)
//! - [`ports`] - Interface traits and the paging cursor codec
//! - [`services`] - Pagination engine and latest-videos service
//! - [`error`] - Error types per layer
//! - [`metrics`] - Metrics definitions
//!
//! # Key Concepts
//!
//! ## Buckets
//!
//! Videos are partitioned by the UTC day they were added, one bucket per
//! `yyyyMMdd` day. A feed covers a [`models::BucketSequence`] of days,
//! newest first, built from an anchor day and a horizon.
//!
//! ## Ports
//!
//! - [`ports::BucketStore`] - Read a bucket in pages with store-native tokens
//! - [`ports::LatestVideoRepository`] - Write side of the feed
//!
//! ## Cursors
//!
//! A [`ports::PageCursor`] records the bucket being read and the store's
//! position inside it. It is encoded as an opaque URL-safe string and
//! validated against the current bucket sequence when it comes back.
//!
//! ## Page Assembly
//!
//! 1. Resolve the starting bucket from the cursor (or the first bucket)
//! 2. Fetch rows from the current bucket up to the remaining page size
//! 3. Move to the next bucket when the current one is exhausted
//! 4. Stop when the page is full or every bucket has been read
//! 5. Encode where to resume, if anything is left

pub mod error;
pub mod metrics;
pub mod models;
pub mod ports;
pub mod services;
