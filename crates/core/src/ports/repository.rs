//! Port traits for feed repositories.
//!
//! These traits define the write side used by the catalog service.
//! Implementations live in the infrastructure layer (e.g., `reel-storage`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StorageResult;
use crate::models::{BucketId, LatestVideo, VideoPreview};

use super::bucket_store::BucketStore;
use super::pagination::StoreToken;

/// Repository for the latest-videos table.
#[async_trait]
pub trait LatestVideoRepository: Send + Sync {
    /// Insert (or overwrite) a video in its day bucket.
    async fn insert_latest_video(&self, video: &LatestVideo) -> StorageResult<()>;

    /// Number of videos stored in `bucket`.
    async fn count_bucket(&self, bucket: &BucketId) -> StorageResult<u64>;

    /// Token that makes a fetch of `bucket` start at `(added_date, video_id)`.
    ///
    /// The video at that position, if stored, is the first row served.
    async fn start_token(
        &self,
        bucket: &BucketId,
        added_date: DateTime<Utc>,
        video_id: Uuid,
    ) -> StorageResult<StoreToken>;
}

/// Combined read/write access to the latest-videos feed.
///
/// Blanket-implemented for every store that provides both sides.
pub trait LatestVideoStore:
    BucketStore<Row = VideoPreview> + LatestVideoRepository
{
}

impl<T> LatestVideoStore for T where T: BucketStore<Row = VideoPreview> + LatestVideoRepository {}
