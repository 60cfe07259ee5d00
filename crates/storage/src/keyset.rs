//! Keyset continuation tokens shared by the feed stores.
//!
//! Rows inside a bucket are ordered by `added_date DESC, video_id DESC`.
//! A token records the position of the last row handed out, so the next
//! read resumes strictly after it even if rows were inserted in between.
//! A starting position is the one inclusive token: the row it names, if
//! present, is served first.

use std::cmp::Ordering;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use reel_core::error::{StorageError, StorageResult};
use reel_core::models::VideoPreview;
use reel_core::ports::{BucketPage, StoreToken};

/// Position of a row in feed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyset {
    #[serde(rename = "d")]
    pub added_date: DateTime<Utc>,
    #[serde(rename = "v")]
    pub video_id: Uuid,
    /// Serve the row at this position too.
    #[serde(rename = "i", default, skip_serializing_if = "std::ops::Not::not")]
    pub inclusive: bool,
}

impl Keyset {
    pub fn of(row: &VideoPreview) -> Self {
        Self {
            added_date: row.added_date,
            video_id: row.video_id,
            inclusive: false,
        }
    }

    /// Position a client asked to start from.
    pub fn starting_at(added_date: DateTime<Utc>, video_id: Uuid) -> Self {
        Self {
            added_date,
            video_id,
            inclusive: true,
        }
    }

    /// Whether `row` is served by a read resuming from this position.
    pub fn precedes(&self, row: &VideoPreview) -> bool {
        let row_key = (row.added_date, row.video_id);
        let key = (self.added_date, self.video_id);
        if self.inclusive {
            row_key <= key
        } else {
            row_key < key
        }
    }

    /// Compare in feed order: the newer position sorts first.
    pub fn cmp_desc(&self, other: &Self) -> Ordering {
        (other.added_date, other.video_id).cmp(&(self.added_date, self.video_id))
    }

    pub fn encode(&self) -> StorageResult<StoreToken> {
        let json =
            serde_json::to_vec(self).map_err(|e| StorageError::SerializationError(e.to_string()))?;
        StoreToken::new(URL_SAFE_NO_PAD.encode(json))
    }

    pub fn decode(token: &StoreToken) -> StorageResult<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token.as_str())
            .map_err(|e| StorageError::InvalidStoreToken(format!("bad encoding: {}", e)))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| StorageError::InvalidStoreToken(format!("bad keyset: {}", e)))
    }
}

/// Probe limit for a fetch: one row more than asked, to detect a next page.
pub fn probe_limit(max_rows: usize) -> StorageResult<usize> {
    if max_rows == 0 {
        return Err(StorageError::ContractViolation(
            "bucket fetch needs room for at least one row".into(),
        ));
    }
    Ok(max_rows.saturating_add(1))
}

/// Turn up to `max_rows + 1` ordered rows into a bucket page.
///
/// A continuation is only emitted when the probe row shows more rows exist.
pub fn finish_page(
    mut rows: Vec<VideoPreview>,
    max_rows: usize,
) -> StorageResult<BucketPage<VideoPreview>> {
    if rows.len() <= max_rows {
        return Ok(BucketPage::last(rows));
    }

    rows.truncate(max_rows);
    match rows.last() {
        Some(last) => {
            let token = Keyset::of(last).encode()?;
            Ok(BucketPage::with_next(rows, token))
        }
        None => Err(StorageError::ContractViolation(
            "bucket fetch needs room for at least one row".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn preview(minute: u32, id: u128) -> VideoPreview {
        VideoPreview {
            video_id: Uuid::from_u128(id),
            user_id: Uuid::nil(),
            name: format!("v{minute}"),
            preview_image_location: None,
            added_date: Utc.with_ymd_and_hms(2024, 6, 1, 8, minute, 0).unwrap(),
        }
    }

    #[test]
    fn test_token_round_trip() {
        let keyset = Keyset::of(&preview(30, 7));
        let token = keyset.encode().unwrap();
        assert!(!token.as_str().contains(['+', '/', '=']));
        assert_eq!(Keyset::decode(&token).unwrap(), keyset);
    }

    // Test critique: un token de store corrompu est une erreur explicite
    #[test]
    fn test_garbage_token_rejected() {
        for raw in ["!!!", "bm90IGpzb24", ""] {
            let token = StoreToken::new(raw).unwrap();
            let err = Keyset::decode(&token).unwrap_err();
            assert!(matches!(err, StorageError::InvalidStoreToken(_)), "{raw}");
        }
    }

    #[test]
    fn test_precedes_follows_feed_order() {
        let keyset = Keyset::of(&preview(30, 5));
        assert!(keyset.precedes(&preview(29, 9)));
        assert!(keyset.precedes(&preview(30, 4)));
        assert!(!keyset.precedes(&preview(30, 5)));
        assert!(!keyset.precedes(&preview(31, 1)));

        let newer = Keyset::of(&preview(31, 1));
        assert_eq!(newer.cmp_desc(&keyset), Ordering::Less);
        assert_eq!(keyset.cmp_desc(&keyset), Ordering::Equal);
    }

    // Test critique: une position de départ inclut la vidéo qu'elle désigne
    #[test]
    fn test_starting_position_is_inclusive() {
        let row = preview(30, 5);
        let start = Keyset::starting_at(row.added_date, row.video_id);
        assert!(start.precedes(&row));
        assert!(start.precedes(&preview(30, 4)));
        assert!(!start.precedes(&preview(30, 6)));

        let token = start.encode().unwrap();
        assert_eq!(Keyset::decode(&token).unwrap(), start);

        // Resume tokens keep their old shape on the wire.
        let resume = Keyset::of(&row).encode().unwrap();
        assert!(!Keyset::decode(&resume).unwrap().inclusive);
    }

    #[test]
    fn test_finish_page_emits_token_only_with_probe_row() {
        let rows: Vec<_> = (0..3).map(|i| preview(50 - i, 1)).collect();

        let exact = finish_page(rows.clone(), 3).unwrap();
        assert_eq!(exact.rows.len(), 3);
        assert!(exact.is_exhausted());

        let probed = finish_page(rows.clone(), 2).unwrap();
        assert_eq!(probed.rows, rows[..2].to_vec());
        let token = probed.next_token.unwrap();
        assert_eq!(Keyset::decode(&token).unwrap(), Keyset::of(&rows[1]));
    }

    #[test]
    fn test_zero_row_fetch_is_a_contract_violation() {
        assert!(matches!(
            probe_limit(0),
            Err(StorageError::ContractViolation(_))
        ));
        assert_eq!(probe_limit(10).unwrap(), 11);
    }
}
