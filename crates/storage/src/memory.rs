//! In-memory implementation of the latest-videos feed.
//!
//! Backs the CLI's `--in-memory` mode and the integration tests. It keeps
//! the same ordering and keyset tokens as the PostgreSQL store, so a feed
//! pages identically on both.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::trace;
use uuid::Uuid;

use reel_core::error::StorageResult;
use reel_core::models::{BucketId, LatestVideo, VideoPreview};
use reel_core::ports::{BucketPage, BucketStore, LatestVideoRepository, StoreToken};

use crate::keyset::{Keyset, finish_page, probe_limit};

/// Latest-videos feed held in process memory.
///
/// Each bucket is kept sorted newest first (`added_date DESC, video_id DESC`).
#[derive(Default)]
pub struct InMemoryLatestVideoStore {
    buckets: RwLock<BTreeMap<BucketId, Vec<VideoPreview>>>,
}

impl InMemoryLatestVideoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of videos across all buckets.
    pub async fn len(&self) -> usize {
        self.buckets.read().await.values().map(Vec::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Remove every video, returning how many were dropped.
    pub async fn purge(&self) -> u64 {
        let mut buckets = self.buckets.write().await;
        let removed = buckets.values().map(Vec::len).sum::<usize>();
        buckets.clear();
        removed as u64
    }
}

#[async_trait]
impl BucketStore for InMemoryLatestVideoStore {
    type Row = VideoPreview;

    async fn fetch(
        &self,
        bucket: &BucketId,
        token: Option<&StoreToken>,
        max_rows: usize,
    ) -> StorageResult<BucketPage<VideoPreview>> {
        let limit = probe_limit(max_rows)?;
        let after = token.map(Keyset::decode).transpose()?;

        let buckets = self.buckets.read().await;
        let rows = buckets.get(bucket).map(Vec::as_slice).unwrap_or_default();

        // Rows at or before the keyset form a prefix of the sorted bucket.
        let start = match &after {
            Some(keyset) => rows.partition_point(|row| !keyset.precedes(row)),
            None => 0,
        };
        let window: Vec<VideoPreview> = rows[start..].iter().take(limit).cloned().collect();

        trace!(bucket = %bucket, start, rows = window.len(), "Bucket rows loaded");

        finish_page(window, max_rows)
    }
}

#[async_trait]
impl LatestVideoRepository for InMemoryLatestVideoStore {
    async fn insert_latest_video(&self, video: &LatestVideo) -> StorageResult<()> {
        let mut buckets = self.buckets.write().await;
        let rows = buckets.entry(video.bucket.clone()).or_default();
        let preview = &video.preview;
        let key = Keyset::of(preview);

        // Same primary key as the table: (bucket, added_date, video_id).
        match rows.binary_search_by(|row| Keyset::of(row).cmp_desc(&key)) {
            Ok(existing) => rows[existing] = preview.clone(),
            Err(position) => rows.insert(position, preview.clone()),
        }

        Ok(())
    }

    async fn count_bucket(&self, bucket: &BucketId) -> StorageResult<u64> {
        let buckets = self.buckets.read().await;
        Ok(buckets.get(bucket).map_or(0, |rows| rows.len() as u64))
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

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use reel_core::error::StorageError;

    fn video(day: u32, minute: u32, id: u128) -> LatestVideo {
        LatestVideo::new(VideoPreview {
            video_id: Uuid::from_u128(id),
            user_id: Uuid::nil(),
            name: format!("{day}-{minute}-{id}"),
            preview_image_location: None,
            added_date: Utc.with_ymd_and_hms(2024, 2, day, 10, minute, 0).unwrap(),
        })
        .unwrap()
    }

    fn bucket(day: u32) -> BucketId {
        BucketId::parse(&format!("202402{day:02}")).unwrap()
    }

    async fn store_with(videos: &[LatestVideo]) -> InMemoryLatestVideoStore {
        let store = InMemoryLatestVideoStore::new();
        for v in videos {
            store.insert_latest_video(v).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_bucket_is_served_newest_first() {
        let store = store_with(&[video(1, 5, 1), video(1, 20, 2), video(1, 10, 3), video(2, 0, 4)])
            .await;

        let page = store.fetch(&bucket(1), None, 10).await.unwrap();
        let minutes: Vec<_> = page.rows.iter().map(|r| r.added_date.format("%M").to_string()).collect();
        assert_eq!(minutes, vec!["20", "10", "05"]);
        assert!(page.is_exhausted());
    }

    // Test critique: les égalités de date sont départagées par video_id décroissant
    #[tokio::test]
    async fn test_ties_are_broken_by_video_id() {
        let store = store_with(&[video(1, 0, 1), video(1, 0, 3), video(1, 0, 2)]).await;

        let first = store.fetch(&bucket(1), None, 2).await.unwrap();
        let ids: Vec<_> = first.rows.iter().map(|r| r.video_id.as_u128()).collect();
        assert_eq!(ids, vec![3, 2]);

        let rest = store
            .fetch(&bucket(1), first.next_token.as_ref(), 2)
            .await
            .unwrap();
        let ids: Vec<_> = rest.rows.iter().map(|r| r.video_id.as_u128()).collect();
        assert_eq!(ids, vec![1]);
        assert!(rest.is_exhausted());
    }

    #[tokio::test]
    async fn test_no_token_when_bucket_ends_exactly() {
        let store = store_with(&[video(1, 0, 1), video(1, 1, 2)]).await;

        let page = store.fetch(&bucket(1), None, 2).await.unwrap();
        assert_eq!(page.rows.len(), 2);
        assert!(page.is_exhausted());
    }

    #[tokio::test]
    async fn test_keyset_survives_concurrent_insert() {
        let store = store_with(&[video(1, 30, 1), video(1, 20, 2), video(1, 10, 3)]).await;

        let first = store.fetch(&bucket(1), None, 1).await.unwrap();
        // A newer video lands before the next read; it must not shift the scan.
        store.insert_latest_video(&video(1, 59, 9)).await.unwrap();

        let next = store
            .fetch(&bucket(1), first.next_token.as_ref(), 5)
            .await
            .unwrap();
        let ids: Vec<_> = next.rows.iter().map(|r| r.video_id.as_u128()).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[tokio::test]
    async fn test_start_token_serves_the_named_video_first() {
        let store = store_with(&[video(1, 30, 1), video(1, 20, 2), video(1, 10, 3)]).await;
        let start = video(1, 20, 2).preview;

        let token = store
            .start_token(&bucket(1), start.added_date, start.video_id)
            .await
            .unwrap();
        let page = store.fetch(&bucket(1), Some(&token), 5).await.unwrap();
        let ids: Vec<_> = page.rows.iter().map(|r| r.video_id.as_u128()).collect();
        assert_eq!(ids, vec![2, 3]);

        // A position between stored rows starts at the next older one.
        let gap = Utc.with_ymd_and_hms(2024, 2, 1, 10, 25, 0).unwrap();
        let token = store.start_token(&bucket(1), gap, Uuid::nil()).await.unwrap();
        let page = store.fetch(&bucket(1), Some(&token), 1).await.unwrap();
        assert_eq!(page.rows[0].video_id.as_u128(), 2);
        assert!(!page.is_exhausted());
    }

    #[tokio::test]
    async fn test_reinsert_overwrites() {
        let store = store_with(&[video(1, 0, 1)]).await;
        let mut renamed = video(1, 0, 1);
        renamed.preview.name = "renamed".into();
        store.insert_latest_video(&renamed).await.unwrap();

        assert_eq!(store.count_bucket(&bucket(1)).await.unwrap(), 1);
        let page = store.fetch(&bucket(1), None, 5).await.unwrap();
        assert_eq!(page.rows[0].name, "renamed");
    }

    #[tokio::test]
    async fn test_unknown_bucket_is_empty() {
        let store = InMemoryLatestVideoStore::new();
        let page = store.fetch(&bucket(9), None, 5).await.unwrap();
        assert!(page.rows.is_empty());
        assert!(page.is_exhausted());
        assert_eq!(store.count_bucket(&bucket(9)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_bad_token_is_rejected() {
        let store = store_with(&[video(1, 0, 1)]).await;
        let token = StoreToken::new("garbage!").unwrap();
        let err = store.fetch(&bucket(1), Some(&token), 5).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidStoreToken(_)));
    }

    #[tokio::test]
    async fn test_purge_empties_store() {
        let store = store_with(&[video(1, 0, 1), video(2, 0, 2)]).await;
        assert_eq!(store.len().await, 2);
        assert_eq!(store.purge().await, 2);
        assert!(store.is_empty().await);
    }
}
