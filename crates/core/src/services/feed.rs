//! Cross-bucket pagination engine.
//!
//! Presents a day-partitioned feed as one continuous stream. Each call
//! assembles at most one page by reading buckets in sequence order and
//! hands back a [`PageCursor`] for the next call.

use std::sync::Arc;

use tracing::{debug, instrument, trace, warn};

use crate::error::{FeedError, FeedResult, StorageError};
use crate::metrics::{
    PageTimer, record_bucket_transition, record_cursor_rejected, record_page_served,
    record_store_fetch,
};
use crate::models::{BucketId, BucketSequence};
use crate::ports::{BucketStore, FeedPage, PageCursor, StoreToken};

/// Upper bound on the row buffer reserved up front.
const MAX_PREALLOCATED_ROWS: usize = 1024;

// =============================================================================
// PaginationEngine
// =============================================================================

/// Stateless pagination engine over a [`BucketStore`].
///
/// # Design
///
/// All per-feed state travels in the cursor; the engine keeps no fields
/// besides the store handle, so one instance can serve any number of
/// concurrent callers.
///
/// # Flow
///
/// 1. Resolve the starting bucket and store token from the cursor
/// 2. Fetch up to the remaining page size from the current bucket
/// 3. Continue in the same bucket while the store reports more rows
/// 4. Move to the next bucket when the current one is exhausted
/// 5. Stop when the page is full or the sequence is exhausted
///
/// Bucket fetches are strictly sequential. Every fetch either adds rows or
/// ends a bucket, so one call issues at most `page_size + sequence.len()`
/// fetches.
pub struct PaginationEngine<S: BucketStore> {
    store: Arc<S>,
}

impl<S: BucketStore> PaginationEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The underlying bucket store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Assemble one page of at most `page_size` rows.
    ///
    /// Without a cursor, iteration starts at the first bucket. Any store
    /// error aborts the call; no partial page is returned.
    #[instrument(
        skip_all,
        fields(buckets = sequence.len(), page_size = page_size, resume = cursor.is_some())
    )]
    pub async fn fetch_page(
        &self,
        sequence: &BucketSequence,
        cursor: Option<&PageCursor>,
        page_size: i64,
    ) -> FeedResult<FeedPage<S::Row>> {
        let page_size = validate_page_size(page_size)?;

        let (mut bucket_index, mut token): (usize, Option<StoreToken>) = match cursor {
            Some(cursor) => {
                let index = cursor.resolve(sequence).inspect_err(|e| {
                    debug!(error = %e, "Cursor rejected");
                    record_cursor_rejected(rejection_reason(e));
                })?;
                (index, cursor.store_token().cloned())
            }
            None => (0, None),
        };

        let _timer = PageTimer::new();
        let mut rows = Vec::with_capacity(page_size.min(MAX_PREALLOCATED_ROWS));
        let mut remaining = page_size;

        let next_cursor = loop {
            let Some(bucket) = sequence.get(bucket_index) else {
                break None;
            };

            // Page filled exactly at a bucket boundary: resume at the start of this bucket.
            if remaining == 0 {
                break Some(cursor_at(bucket_index, bucket, None)?);
            }

            record_store_fetch();
            let page = self.store.fetch(bucket, token.as_ref(), remaining).await?;
            let fetched = page.rows.len();

            if fetched > remaining {
                return Err(StorageError::ContractViolation(format!(
                    "bucket {} returned {} rows for a request of {}",
                    bucket, fetched, remaining
                ))
                .into());
            }

            rows.extend(page.rows);
            remaining -= fetched;

            trace!(
                bucket = %bucket,
                fetched,
                remaining,
                more = page.next_token.is_some(),
                "Bucket fetched"
            );

            match page.next_token {
                Some(next) if remaining == 0 => {
                    break Some(cursor_at(bucket_index, bucket, Some(next))?);
                }
                Some(next) if fetched > 0 => {
                    token = Some(next);
                    continue;
                }
                Some(_) => {
                    warn!(
                        bucket = %bucket,
                        "⚠️  Store returned a continuation without rows, treating bucket as exhausted"
                    );
                }
                None => {}
            }

            bucket_index += 1;
            token = None;

            if bucket_index == sequence.len() {
                debug!(bucket = %bucket, "Last bucket exhausted");
                break None;
            }

            record_bucket_transition();
            debug!(
                from = %bucket,
                bucket = bucket_index,
                of = sequence.len(),
                collected = rows.len(),
                "Moving to next bucket"
            );
        };

        debug!(
            rows = rows.len(),
            has_next = next_cursor.is_some(),
            "Page assembled"
        );
        record_page_served(next_cursor.is_none());

        Ok(FeedPage { rows, next_cursor })
    }
}

/// Reject non-positive page sizes before any store call.
fn validate_page_size(page_size: i64) -> FeedResult<usize> {
    if page_size <= 0 {
        return Err(FeedError::InvalidPageSize(page_size));
    }
    usize::try_from(page_size).map_err(|_| FeedError::InvalidPageSize(page_size))
}

fn cursor_at(
    index: usize,
    bucket: &BucketId,
    token: Option<StoreToken>,
) -> FeedResult<PageCursor> {
    let index = u32::try_from(index).map_err(|_| {
        StorageError::ContractViolation(format!("bucket index {} does not fit a cursor", index))
    })?;
    Ok(PageCursor::new(index, bucket.clone(), token))
}

fn rejection_reason(error: &FeedError) -> &'static str {
    match error {
        FeedError::CursorDecode(e) => e.reason(),
        FeedError::CursorOutOfRange { .. } => "out_of_range",
        _ => "other",
    }
}
