//! Error types for the feed domain layer.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`DomainError`] - Invalid domain values (bucket ids, horizons, sequences)
//! - [`StorageError`] - Database/repository errors raised by `BucketStore` adapters
//! - [`CursorError`] - Malformed or tampered paging cursors
//! - [`FeedError`] - Top-level errors returned by the pagination engine
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Domain Errors
// =============================================================================

/// Domain rule violations.
///
/// These errors represent invalid values handed to the domain layer,
/// such as a malformed bucket identifier or an empty horizon.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    /// Bucket identifier is not a `yyyyMMdd` calendar date.
    #[error("Invalid bucket id: {0}")]
    InvalidBucketId(String),

    /// Horizon cannot produce a bucket sequence.
    #[error("Invalid horizon: {0}")]
    InvalidHorizon(String),

    /// Bucket list is empty or not strictly ordered.
    #[error("Invalid bucket sequence: {0}")]
    InvalidBucketSequence(String),

    /// Generic validation error.
    #[error("Validation error: {0}")]
    ValidationError(String),
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Database and repository errors.
///
/// These errors originate from bucket store adapters: queries,
/// connection management and store-native token handling.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Failed to establish database connection.
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    /// Query execution failed.
    #[error("Query execution error: {0}")]
    QueryError(String),

    /// Database migration failed.
    #[error("Migration error: {0}")]
    MigrationError(String),

    /// Data serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A store continuation token could not be interpreted by the store.
    #[error("Invalid store token: {0}")]
    InvalidStoreToken(String),

    /// The store broke the `BucketStore` contract (e.g. returned more rows than asked).
    #[error("Store contract violation: {0}")]
    ContractViolation(String),
}

// =============================================================================
// Cursor Errors
// =============================================================================

/// Paging cursor decoding errors.
///
/// Every string that was not produced by [`crate::ports::PageCursor::encode`]
/// maps to one of these, never to a valid-looking cursor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CursorError {
    /// Cursor string is empty.
    #[error("cursor is empty")]
    Empty,

    /// Cursor string exceeds the accepted length.
    #[error("cursor too long: {len} characters (max {max})")]
    TooLong { len: usize, max: usize },

    /// Cursor is not valid unpadded base64url.
    #[error("cursor is not valid base64url: {0}")]
    InvalidEncoding(String),

    /// Frame version is unknown.
    #[error("unsupported cursor version: {0}")]
    UnsupportedVersion(u8),

    /// Frame ended before a field was complete.
    #[error("cursor truncated while reading {0}")]
    Truncated(&'static str),

    /// Embedded store token length exceeds what a store may emit.
    #[error("cursor store token is {len} bytes (max {max})")]
    TokenTooLong { len: usize, max: usize },

    /// Frame has bytes after the last field.
    #[error("cursor has {0} trailing byte(s)")]
    TrailingBytes(usize),

    /// Store token presence tag is neither 0 nor 1.
    #[error("invalid store token tag: {0}")]
    InvalidTag(u8),

    /// A text field is not UTF-8.
    #[error("cursor field {0} is not valid UTF-8")]
    InvalidUtf8(&'static str),

    /// Embedded bucket id is not a valid bucket id.
    #[error("cursor bucket id is invalid: {0}")]
    InvalidBucketId(String),

    /// Cursor was produced for a different bucket than the one at its index.
    #[error("cursor bucket {cursor} does not match bucket {sequence} at index {index}")]
    BucketMismatch {
        index: u32,
        cursor: String,
        sequence: String,
    },
}

impl CursorError {
    /// Short, stable label used for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            CursorError::Empty => "empty",
            CursorError::TooLong { .. } => "too_long",
            CursorError::InvalidEncoding(_) => "encoding",
            CursorError::UnsupportedVersion(_) => "version",
            CursorError::Truncated(_) => "truncated",
            CursorError::TokenTooLong { .. } => "token_too_long",
            CursorError::TrailingBytes(_) => "trailing",
            CursorError::InvalidTag(_) => "tag",
            CursorError::InvalidUtf8(_) => "utf8",
            CursorError::InvalidBucketId(_) => "bucket_id",
            CursorError::BucketMismatch { .. } => "bucket_mismatch",
        }
    }
}

// =============================================================================
// Feed Errors
// =============================================================================

/// Top-level feed errors.
///
/// This is the error type returned by [`crate::services::PaginationEngine`]
/// and [`crate::services::LatestVideosService`]. Nothing is swallowed: every
/// failure reaches the immediate caller.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Page size is not strictly positive (or exceeds the configured maximum).
    #[error("Invalid page size: {0}")]
    InvalidPageSize(i64),

    /// Cursor is malformed, tampered, or belongs to another bucket.
    #[error("Invalid cursor: {0}")]
    CursorDecode(#[from] CursorError),

    /// Cursor index does not address the current bucket sequence.
    #[error("Cursor out of range: bucket index {index} for a sequence of {len} bucket(s)")]
    CursorOutOfRange { index: u32, len: usize },

    /// Bucket store failure, propagated unchanged.
    #[error("Storage error: {0}")]
    Store(#[from] StorageError),

    /// Domain validation failure.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}

impl FeedError {
    /// Whether the error was caused by the caller's input rather than the store.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, FeedError::Store(_))
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for feed operations.
pub type FeedResult<T> = Result<T, FeedError>;

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
