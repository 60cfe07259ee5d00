//! Domain models for the latest-videos feed.
//!
//! These models are storage-agnostic and represent the canonical
//! form of feed data within the domain layer.

mod bucket;

pub use bucket::{
    BUCKET_ID_LEN, BucketId, BucketSequence, OrderDirection, build_sequence,
    build_sequence_with_direction,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainResult;

// =============================================================================
// Video Previews
// =============================================================================

/// One entry of the latest-videos feed.
///
/// The pagination engine never inspects these; only the stores order them
/// (`added_date` descending, then `video_id` descending within a bucket).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoPreview {
    /// Video identifier.
    pub video_id: Uuid,
    /// Uploader.
    pub user_id: Uuid,
    /// Display name.
    pub name: String,
    /// Thumbnail location (if any).
    pub preview_image_location: Option<String>,
    /// When the video was added to the catalog.
    pub added_date: DateTime<Utc>,
}

/// A video preview placed in its day bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestVideo {
    /// Day bucket derived from `preview.added_date` (UTC).
    pub bucket: BucketId,
    pub preview: VideoPreview,
}

impl LatestVideo {
    /// Place `preview` in the bucket of its UTC added date.
    pub fn new(preview: VideoPreview) -> DomainResult<Self> {
        let bucket = BucketId::from_date(preview.added_date.date_naive())?;
        Ok(Self { bucket, preview })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn latest_video_bucket_follows_utc_added_date() {
        let preview = VideoPreview {
            video_id: Uuid::nil(),
            user_id: Uuid::nil(),
            name: "late upload".into(),
            preview_image_location: None,
            added_date: Utc.with_ymd_and_hms(2024, 5, 5, 23, 59, 59).unwrap(),
        };

        let latest = LatestVideo::new(preview).unwrap();
        assert_eq!(latest.bucket.as_str(), "20240505");
    }
}
