//! Day buckets and the ordered bucket sequence of a feed query.
//!
//! The latest-videos feed is physically partitioned by calendar day. A
//! [`BucketSequence`] lists the buckets one logical query spans, in the
//! order the pagination engine visits them.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Length of a `yyyyMMdd` bucket identifier.
pub const BUCKET_ID_LEN: usize = 8;

// =============================================================================
// Ordering
// =============================================================================

/// Ordering direction for sorted queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderDirection {
    /// Ascending order (oldest bucket first).
    Asc,
    /// Descending order (newest bucket first).
    #[default]
    Desc,
}

// =============================================================================
// BucketId
// =============================================================================

/// Identifier of one day bucket, formatted `yyyyMMdd`.
///
/// Only ASCII digits can appear in a bucket id, and lexical order equals
/// chronological order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BucketId {
    id: String,
    date: NaiveDate,
}

impl BucketId {
    /// Bucket holding every item added on `date`.
    ///
    /// Years outside `0000..=9999` have no 8-character representation.
    pub fn from_date(date: NaiveDate) -> DomainResult<Self> {
        let year = date.year();
        if !(0..=9999).contains(&year) {
            return Err(DomainError::InvalidBucketId(format!(
                "year {} cannot be written as yyyy",
                year
            )));
        }

        Ok(Self {
            id: format!("{:04}{:02}{:02}", year, date.month(), date.day()),
            date,
        })
    }

    /// Parse a `yyyyMMdd` identifier.
    pub fn parse(s: &str) -> DomainResult<Self> {
        if s.len() != BUCKET_ID_LEN || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::InvalidBucketId(format!(
                "{:?} is not 8 digits",
                truncate_for_display(s)
            )));
        }

        // All-digit input of length 8, so the slices are on char boundaries.
        let year: i32 = s[0..4]
            .parse()
            .map_err(|_| DomainError::InvalidBucketId(s.to_string()))?;
        let month: u32 = s[4..6]
            .parse()
            .map_err(|_| DomainError::InvalidBucketId(s.to_string()))?;
        let day: u32 = s[6..8]
            .parse()
            .map_err(|_| DomainError::InvalidBucketId(s.to_string()))?;

        let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
            DomainError::InvalidBucketId(format!("{} is not a calendar date", s))
        })?;

        Ok(Self {
            id: s.to_string(),
            date,
        })
    }

    /// The `yyyyMMdd` string.
    pub fn as_str(&self) -> &str {
        &self.id
    }

    /// The calendar day this bucket covers.
    pub fn date(&self) -> NaiveDate {
        self.date
    }
}

impl fmt::Display for BucketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

impl FromStr for BucketId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for BucketId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<BucketId> for String {
    fn from(bucket: BucketId) -> Self {
        bucket.id
    }
}

impl AsRef<str> for BucketId {
    fn as_ref(&self) -> &str {
        &self.id
    }
}

fn truncate_for_display(s: &str) -> String {
    s.chars().take(32).collect()
}

// =============================================================================
// BucketSequence
// =============================================================================

/// Ordered, immutable list of buckets spanning one query horizon.
///
/// Invariants: never empty, strictly monotonic in [`Self::direction`].
/// Index `0` is the first bucket visited by the pagination engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketSequence {
    buckets: Vec<BucketId>,
    direction: OrderDirection,
}

impl BucketSequence {
    /// Build a sequence from explicit buckets, validating the ordering invariant.
    pub fn new(buckets: Vec<BucketId>, direction: OrderDirection) -> DomainResult<Self> {
        if buckets.is_empty() {
            return Err(DomainError::InvalidBucketSequence(
                "a sequence needs at least one bucket".to_string(),
            ));
        }

        for pair in buckets.windows(2) {
            let ordered = match direction {
                OrderDirection::Desc => pair[0] > pair[1],
                OrderDirection::Asc => pair[0] < pair[1],
            };
            if !ordered {
                return Err(DomainError::InvalidBucketSequence(format!(
                    "{} then {} is not strictly {:?}",
                    pair[0], pair[1], direction
                )));
            }
        }

        Ok(Self { buckets, direction })
    }

    /// Number of buckets.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Bucket at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&BucketId> {
        self.buckets.get(index)
    }

    /// First bucket visited.
    pub fn first(&self) -> &BucketId {
        &self.buckets[0]
    }

    /// Last bucket visited.
    pub fn last(&self) -> &BucketId {
        &self.buckets[self.buckets.len() - 1]
    }

    /// Index of `bucket` in visiting order.
    pub fn position(&self, bucket: &BucketId) -> Option<usize> {
        self.buckets.iter().position(|b| b == bucket)
    }

    pub fn direction(&self) -> OrderDirection {
        self.direction
    }

    pub fn iter(&self) -> impl Iterator<Item = &BucketId> {
        self.buckets.iter()
    }

    pub fn as_slice(&self) -> &[BucketId] {
        &self.buckets
    }
}

/// Latest-first bucket sequence: `anchor`, `anchor - 1 day`, ... for `horizon_days` days.
///
/// Pure function of its inputs.
pub fn build_sequence(horizon_days: u32, anchor: NaiveDate) -> DomainResult<BucketSequence> {
    build_sequence_with_direction(horizon_days, anchor, OrderDirection::Desc)
}

/// Bucket sequence over the `horizon_days` days ending at `anchor`, in `direction`.
pub fn build_sequence_with_direction(
    horizon_days: u32,
    anchor: NaiveDate,
    direction: OrderDirection,
) -> DomainResult<BucketSequence> {
    if horizon_days == 0 {
        return Err(DomainError::InvalidHorizon(
            "horizon must span at least one day".to_string(),
        ));
    }

    // The oldest bucket must still be writable as yyyyMMdd.
    let earliest = NaiveDate::from_ymd_opt(0, 1, 1)
        .ok_or_else(|| DomainError::InvalidHorizon("calendar has no year 0".to_string()))?;
    let days_available = (anchor - earliest).num_days();
    if i64::from(horizon_days - 1) > days_available {
        return Err(DomainError::InvalidHorizon(format!(
            "{} days ending at {} reach before year 0",
            horizon_days, anchor
        )));
    }

    let mut buckets = Vec::with_capacity(horizon_days as usize);
    for offset in 0..horizon_days {
        let day = anchor
            .checked_sub_days(Days::new(u64::from(offset)))
            .ok_or_else(|| {
                DomainError::InvalidHorizon(format!(
                    "{} days before {} is out of the calendar range",
                    offset, anchor
                ))
            })?;
        let bucket = BucketId::from_date(day)
            .map_err(|e| DomainError::InvalidHorizon(e.to_string()))?;
        buckets.push(bucket);
    }

    if direction == OrderDirection::Asc {
        buckets.reverse();
    }

    BucketSequence::new(buckets, direction)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ids(seq: &BucketSequence) -> Vec<&str> {
        seq.iter().map(BucketId::as_str).collect()
    }

    #[test]
    fn bucket_id_from_date_is_zero_padded() {
        let bucket = BucketId::from_date(date(2024, 1, 5)).unwrap();
        assert_eq!(bucket.as_str(), "20240105");
        assert_eq!(bucket.date(), date(2024, 1, 5));
    }

    #[test]
    fn bucket_id_parse_roundtrip() {
        let bucket = BucketId::parse("20240229").unwrap();
        assert_eq!(bucket.to_string(), "20240229");
        assert_eq!(bucket, BucketId::from_date(date(2024, 2, 29)).unwrap());
    }

    // Test critique: rejette tout ce qui n'est pas une date yyyyMMdd
    #[test]
    fn bucket_id_parse_rejects_garbage() {
        for bad in ["", "2024010", "202401011", "2024-1-01", "20241301", "20230229", "2024010a", "２０２４０１０１"] {
            assert!(BucketId::parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn bucket_id_rejects_five_digit_years() {
        assert!(BucketId::from_date(date(10000, 1, 1)).is_err());
    }

    #[test]
    fn bucket_ids_order_chronologically() {
        let a = BucketId::parse("20231231").unwrap();
        let b = BucketId::parse("20240101").unwrap();
        assert!(a < b);
    }

    #[test]
    fn build_sequence_is_newest_first() {
        let seq = build_sequence(3, date(2024, 3, 1)).unwrap();
        assert_eq!(ids(&seq), vec!["20240301", "20240229", "20240228"]);
        assert_eq!(seq.direction(), OrderDirection::Desc);
        assert_eq!(seq.first().as_str(), "20240301");
        assert_eq!(seq.last().as_str(), "20240228");
    }

    #[test]
    fn build_sequence_oldest_first() {
        let seq =
            build_sequence_with_direction(3, date(2024, 1, 1), OrderDirection::Asc).unwrap();
        assert_eq!(ids(&seq), vec!["20231230", "20231231", "20240101"]);
    }

    #[test]
    fn build_sequence_is_deterministic() {
        let anchor = date(2024, 6, 15);
        assert_eq!(build_sequence(7, anchor).unwrap(), build_sequence(7, anchor).unwrap());
    }

    #[test]
    fn build_sequence_rejects_zero_horizon() {
        assert!(matches!(
            build_sequence(0, date(2024, 1, 1)),
            Err(DomainError::InvalidHorizon(_))
        ));
    }

    #[test]
    fn build_sequence_rejects_dates_before_year_zero() {
        assert!(build_sequence(3, date(0, 1, 1)).is_err());
    }

    // Test critique: un horizon démesuré est une erreur, pas un abort d'allocation
    #[test]
    fn build_sequence_rejects_huge_horizon_before_allocating() {
        assert!(matches!(
            build_sequence(u32::MAX, date(2024, 1, 1)),
            Err(DomainError::InvalidHorizon(_))
        ));
        assert!(matches!(
            build_sequence_with_direction(u32::MAX, date(9999, 12, 31), OrderDirection::Asc),
            Err(DomainError::InvalidHorizon(_))
        ));
    }

    #[test]
    fn build_sequence_reaches_exactly_year_zero() {
        let seq = build_sequence(3, date(0, 1, 3)).unwrap();
        assert_eq!(seq.last().as_str(), "00000101");
        assert!(build_sequence(4, date(0, 1, 3)).is_err());
    }

    // Test critique: l'invariant de monotonie est vérifié à la construction
    #[test]
    fn sequence_new_enforces_strict_order() {
        let a = BucketId::parse("20240101").unwrap();
        let b = BucketId::parse("20240102").unwrap();

        assert!(BucketSequence::new(vec![], OrderDirection::Desc).is_err());
        assert!(BucketSequence::new(vec![a.clone(), b.clone()], OrderDirection::Desc).is_err());
        assert!(BucketSequence::new(vec![a.clone(), a.clone()], OrderDirection::Asc).is_err());
        assert!(BucketSequence::new(vec![b.clone(), a.clone()], OrderDirection::Desc).is_ok());

        let seq = BucketSequence::new(vec![a.clone(), b.clone()], OrderDirection::Asc).unwrap();
        assert_eq!(seq.position(&b), Some(1));
        assert_eq!(seq.get(2), None);
    }
}
