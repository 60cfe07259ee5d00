//! Latest-videos repository implementation for PostgreSQL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{instrument, trace};
use uuid::Uuid;

use reel_core::error::{StorageError, StorageResult};
use reel_core::models::{BucketId, LatestVideo, VideoPreview};
use reel_core::ports::{BucketPage, BucketStore, LatestVideoRepository, StoreToken};

use super::database::Database;
use crate::keyset::{Keyset, finish_page, probe_limit};

/// PostgreSQL implementation of the latest-videos feed.
///
/// One row per video in `latest_videos`, partitioned by the `yyyymmdd`
/// column. Reads use keyset pagination on `(added_date, video_id)`.
pub struct PgLatestVideoStore {
    pool: PgPool,
}

impl PgLatestVideoStore {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }
}

#[async_trait]
impl BucketStore for PgLatestVideoStore {
    type Row = VideoPreview;

    #[instrument(skip_all, fields(bucket = %bucket, max_rows = max_rows, resume = token.is_some()))]
    async fn fetch(
        &self,
        bucket: &BucketId,
        token: Option<&StoreToken>,
        max_rows: usize,
    ) -> StorageResult<BucketPage<VideoPreview>> {
        let limit = i64::try_from(probe_limit(max_rows)?).map_err(|_| {
            StorageError::ContractViolation(format!("fetch size {} is too large", max_rows))
        })?;

        let rows: Vec<LatestVideoRow> = match token {
            None => sqlx::query_as::<_, LatestVideoRow>(
                r#"
                SELECT video_id, user_id, name, preview_image_location, added_date
                FROM latest_videos
                WHERE yyyymmdd = $1
                ORDER BY added_date DESC, video_id DESC
                LIMIT $2
                "#,
            )
            .bind(bucket.as_str())
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?,

            Some(token) => {
                let after = Keyset::decode(token)?;
                let query = if after.inclusive {
                    r#"
                    SELECT video_id, user_id, name, preview_image_location, added_date
                    FROM latest_videos
                    WHERE yyyymmdd = $1
                      AND (added_date, video_id) <= ($2, $3)
                    ORDER BY added_date DESC, video_id DESC
                    LIMIT $4
                    "#
                } else {
                    r#"
                    SELECT video_id, user_id, name, preview_image_location, added_date
                    FROM latest_videos
                    WHERE yyyymmdd = $1
                      AND (added_date, video_id) < ($2, $3)
                    ORDER BY added_date DESC, video_id DESC
                    LIMIT $4
                    "#
                };
                sqlx::query_as::<_, LatestVideoRow>(query)
                .bind(bucket.as_str())
                .bind(after.added_date)
                .bind(after.video_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StorageError::QueryError(e.to_string()))?
            }
        };

        trace!(rows = rows.len(), "Bucket rows loaded");

        finish_page(
            rows.into_iter().map(LatestVideoRow::into_preview).collect(),
            max_rows,
        )
    }
}

#[async_trait]
impl LatestVideoRepository for PgLatestVideoStore {
    async fn insert_latest_video(&self, video: &LatestVideo) -> StorageResult<()> {
        let preview = &video.preview;

        sqlx::query(
            r#"
            INSERT INTO latest_videos (
                yyyymmdd, added_date, video_id, user_id, name, preview_image_location
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (yyyymmdd, added_date, video_id) DO UPDATE SET
                user_id = EXCLUDED.user_id,
                name = EXCLUDED.name,
                preview_image_location = EXCLUDED.preview_image_location
            "#,
        )
        .bind(video.bucket.as_str())
        .bind(preview.added_date)
        .bind(preview.video_id)
        .bind(preview.user_id)
        .bind(&preview.name)
        .bind(&preview.preview_image_location)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        Ok(())
    }

    async fn count_bucket(&self, bucket: &BucketId) -> StorageResult<u64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM latest_videos WHERE yyyymmdd = $1")
            .bind(bucket.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;

        Ok(row.0 as u64)
    }

    async fn start_token(
        &self,
        _bucket: &BucketId,
        added_date: DateTime<Utc>,
        video_id: Uuid,
    ) -> StorageResult<StoreToken> {
        Keyset::starting_at(added_date, video_id).encode()
    }
}

/// Database row representation for a feed entry.
#[derive(sqlx::FromRow)]
struct LatestVideoRow {
    video_id: Uuid,
    user_id: Uuid,
    name: String,
    preview_image_location: Option<String>,
    added_date: DateTime<Utc>,
}

impl LatestVideoRow {
    fn into_preview(self) -> VideoPreview {
        VideoPreview {
            video_id: self.video_id,
            user_id: self.user_id,
            name: self.name,
            preview_image_location: self.preview_image_location,
            added_date: self.added_date,
        }
    }
}
