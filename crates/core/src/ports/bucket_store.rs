//! Port trait for day-partitioned feed storage.
//!
//! This trait defines the only read operation the pagination engine needs.
//! Implementations live in the infrastructure layer (e.g., `reel-storage`).

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::models::BucketId;

use super::pagination::StoreToken;

/// Rows read from one bucket plus the store's continuation marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketPage<R> {
    /// Rows in the bucket's fixed order.
    pub rows: Vec<R>,
    /// Where to continue inside the same bucket; `None` means the bucket is exhausted.
    pub next_token: Option<StoreToken>,
}

impl<R> BucketPage<R> {
    /// A page that ends the bucket.
    pub fn last(rows: Vec<R>) -> Self {
        Self {
            rows,
            next_token: None,
        }
    }

    /// A page followed by more rows in the same bucket.
    pub fn with_next(rows: Vec<R>, token: StoreToken) -> Self {
        Self {
            rows,
            next_token: Some(token),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.next_token.is_none()
    }
}

/// Port trait for reading one bucket at a time.
///
/// # Contract
///
/// - Deterministic ordering: the same bucket and token always yield the
///   next rows in the same order (reverse-chronological for the feed).
/// - At most `max_rows` rows per call.
/// - `next_token == None` means "no more rows in this bucket", never "retry".
/// - Errors are returned as-is; retry policy is the caller's concern.
#[async_trait]
pub trait BucketStore: Send + Sync {
    /// Row type produced by the store.
    type Row: Send;

    /// Fetch up to `max_rows` rows from `bucket`, continuing after `token` if given.
    async fn fetch(
        &self,
        bucket: &BucketId,
        token: Option<&StoreToken>,
        max_rows: usize,
    ) -> StorageResult<BucketPage<Self::Row>>;
}
