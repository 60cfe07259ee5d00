//! Latest-videos catalog service.
//!
//! Wraps the [`PaginationEngine`] with the request handling of the
//! latest-videos feed: page size defaults and limits, the rolling day
//! horizon, and the opaque paging state exchanged with clients.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::{DomainError, FeedError, FeedResult};
use crate::metrics::record_cursor_rejected;
use crate::models::{BucketId, BucketSequence, LatestVideo, VideoPreview, build_sequence};
use crate::ports::{LatestVideoStore, PageCursor};

use super::feed::PaginationEngine;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the latest-videos feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    /// Number of day buckets covered by the feed, anchor day included.
    pub horizon_days: u32,
    /// Page size used when the request leaves it unset (0).
    pub default_page_size: i32,
    /// Largest page size a request may ask for.
    pub max_page_size: i32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            horizon_days: 7,
            default_page_size: 10,
            max_page_size: 100,
        }
    }
}

impl FeedConfig {
    /// Create config from environment variables.
    ///
    /// Reads `FEED_HORIZON_DAYS`, `FEED_DEFAULT_PAGE_SIZE` and
    /// `FEED_MAX_PAGE_SIZE`; missing or unparsable values keep the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            horizon_days: env_or("FEED_HORIZON_DAYS", defaults.horizon_days),
            default_page_size: env_or("FEED_DEFAULT_PAGE_SIZE", defaults.default_page_size),
            max_page_size: env_or("FEED_MAX_PAGE_SIZE", defaults.max_page_size),
        }
    }

    /// Same limits with a different horizon.
    pub fn with_horizon_days(mut self, horizon_days: u32) -> Self {
        self.horizon_days = horizon_days;
        self
    }
}

fn env_or<T: FromStr + Copy>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(var = name, value = %raw, "⚠️  Ignoring unparsable setting");
            default
        }),
        Err(_) => default,
    }
}

// =============================================================================
// Requests
// =============================================================================

/// Request for one page of the latest-videos feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LatestVideosRequest {
    /// Requested page size; 0 means "use the configured default".
    pub page_size: i32,
    /// Paging state returned by the previous page, if any.
    pub paging_state: Option<String>,
    /// Newest day of the feed. When unset, a paging state keeps the day it
    /// was issued under and a first page uses today (UTC).
    pub anchor: Option<NaiveDate>,
    /// First page only: start at this video instead of the newest one.
    /// Set together with `starting_video_id`.
    pub starting_added_date: Option<DateTime<Utc>>,
    pub starting_video_id: Option<Uuid>,
}

impl LatestVideosRequest {
    pub fn first_page(page_size: i32) -> Self {
        Self {
            page_size,
            ..Default::default()
        }
    }

    /// First page starting at the video `(added_date, video_id)`, that video included.
    pub fn starting_at(page_size: i32, added_date: DateTime<Utc>, video_id: Uuid) -> Self {
        Self {
            page_size,
            starting_added_date: Some(added_date),
            starting_video_id: Some(video_id),
            ..Default::default()
        }
    }

    /// Request the page following `paging_state`, keeping size and anchor.
    pub fn next(&self, paging_state: String) -> Self {
        Self {
            paging_state: Some(paging_state),
            ..self.clone()
        }
    }
}

/// One page of the latest-videos feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestVideosPage {
    pub videos: Vec<VideoPreview>,
    /// Opaque state for the next page; `None` once the feed is exhausted.
    pub paging_state: Option<String>,
}

/// A new video to publish in the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitVideo {
    pub video_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub preview_image_location: Option<String>,
    /// Defaults to now.
    pub added_date: Option<DateTime<Utc>>,
}

// =============================================================================
// LatestVideosService
// =============================================================================

/// Service serving and feeding the latest-videos feed.
///
/// # Flow
///
/// 1. Resolve the page size (default when 0, bounded by the maximum)
/// 2. Decode the paging state; a bad one is a client error
/// 3. Build the bucket sequence from the anchor day and the horizon
/// 4. Without a paging state, seed the cursor from the starting position
/// 5. Run the pagination engine and encode the next paging state
pub struct LatestVideosService<S: LatestVideoStore> {
    config: FeedConfig,
    store: Arc<S>,
    engine: PaginationEngine<S>,
}

impl<S: LatestVideoStore> LatestVideosService<S> {
    pub fn new(config: FeedConfig, store: Arc<S>) -> Self {
        let engine = PaginationEngine::new(Arc::clone(&store));
        Self {
            config,
            store,
            engine,
        }
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Serve one page of the latest-videos feed.
    #[instrument(
        skip_all,
        fields(page_size = request.page_size, resume = request.paging_state.is_some())
    )]
    pub async fn latest_videos(
        &self,
        request: &LatestVideosRequest,
    ) -> FeedResult<LatestVideosPage> {
        let page_size = self.resolve_page_size(request.page_size)?;

        // Blank paging state is how clients say "first page".
        let resumed = match request.paging_state.as_deref().map(str::trim) {
            Some(state) if !state.is_empty() => {
                let cursor = PageCursor::decode(state).inspect_err(|e| {
                    debug!(error = %e, "Paging state rejected");
                    record_cursor_rejected(e.reason());
                })?;
                Some(cursor)
            }
            _ => None,
        };

        let anchor = match (request.anchor, &resumed) {
            (Some(anchor), _) => anchor,
            (None, Some(cursor)) => issued_anchor(cursor)?,
            (None, None) => Utc::now().date_naive(),
        };
        let sequence = build_sequence(self.config.horizon_days, anchor)?;

        let cursor = match resumed {
            Some(cursor) => Some(cursor),
            None => match self.starting_cursor(request, &sequence).await? {
                Start::Newest => None,
                Start::At(cursor) => Some(cursor),
                Start::BeyondHorizon => {
                    debug!(oldest = %sequence.last(), "Starting position is older than the feed");
                    return Ok(LatestVideosPage {
                        videos: Vec::new(),
                        paging_state: None,
                    });
                }
            },
        };

        let page = self
            .engine
            .fetch_page(&sequence, cursor.as_ref(), i64::from(page_size))
            .await?;

        debug!(
            videos = page.rows.len(),
            from = %sequence.first(),
            to = %sequence.last(),
            has_next = page.next_cursor.is_some(),
            "Latest videos served"
        );

        Ok(LatestVideosPage {
            videos: page.rows,
            paging_state: page.next_cursor.as_ref().map(PageCursor::encode),
        })
    }

    /// Publish a video in the bucket of its added date.
    #[instrument(skip_all, fields(video_id = %video.video_id))]
    pub async fn submit_video(&self, video: SubmitVideo) -> FeedResult<LatestVideo> {
        let name = video.name.trim();
        if name.is_empty() {
            return Err(DomainError::ValidationError("video name must not be blank".into()).into());
        }

        let latest = LatestVideo::new(VideoPreview {
            video_id: video.video_id,
            user_id: video.user_id,
            name: name.to_string(),
            preview_image_location: video.preview_image_location,
            added_date: video.added_date.unwrap_or_else(Utc::now),
        })?;

        self.store.insert_latest_video(&latest).await?;

        info!(bucket = %latest.bucket, name = %latest.preview.name, "🎬 Video published");
        Ok(latest)
    }

    /// Cursor for a first page that starts at the requested video.
    async fn starting_cursor(
        &self,
        request: &LatestVideosRequest,
        sequence: &BucketSequence,
    ) -> FeedResult<Start> {
        let (added_date, video_id) = match (request.starting_added_date, request.starting_video_id)
        {
            (None, None) => return Ok(Start::Newest),
            (Some(added_date), Some(video_id)) => (added_date, video_id),
            _ => {
                return Err(DomainError::ValidationError(
                    "starting added date and starting video id go together".into(),
                )
                .into());
            }
        };

        let bucket = BucketId::from_date(added_date.date_naive())?;
        if &bucket > sequence.first() {
            return Ok(Start::Newest);
        }
        let Some(index) = sequence.position(&bucket) else {
            return Ok(Start::BeyondHorizon);
        };

        let token = self.store.start_token(&bucket, added_date, video_id).await?;
        debug!(bucket = %bucket, index, "Starting from requested video");
        Ok(Start::At(PageCursor::new(index as u32, bucket, Some(token))))
    }

    fn resolve_page_size(&self, requested: i32) -> FeedResult<i32> {
        let page_size = if requested == 0 {
            self.config.default_page_size
        } else {
            requested
        };

        if page_size <= 0 || page_size > self.config.max_page_size {
            return Err(FeedError::InvalidPageSize(i64::from(page_size)));
        }
        Ok(page_size)
    }
}

/// Where a first page begins.
enum Start {
    Newest,
    At(PageCursor),
    BeyondHorizon,
}

/// Anchor day a cursor was issued under: its bucket plus its index in days.
fn issued_anchor(cursor: &PageCursor) -> FeedResult<NaiveDate> {
    cursor
        .bucket_id()
        .date()
        .checked_add_days(Days::new(u64::from(cursor.bucket_index())))
        .ok_or(FeedError::CursorOutOfRange {
            index: cursor.bucket_index(),
            len: 0,
        })
}
