//! Cursor types for the cross-bucket feed.
//!
//! A [`PageCursor`] is handed to clients as an opaque string and must come
//! back unmodified. The string is a length-prefixed binary frame encoded as
//! unpadded base64url:
//!
//! ```text
//! u8      version            (= 1)
//! u32 BE  bucket index
//! u8      bucket id length   (= 8)
//! [u8]    bucket id          (yyyyMMdd)
//! u8      token tag          (0 = none, 1 = some)
//! u32 BE  token length       (tag = 1 only)
//! [u8]    token              (UTF-8, tag = 1 only)
//! ```
//!
//! No delimiter is involved, so nothing a store puts in its token can
//! change how the frame is split. Decoding consumes the frame exactly.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use crate::error::{CursorError, FeedError, FeedResult, StorageError, StorageResult};
use crate::models::{BUCKET_ID_LEN, BucketId, BucketSequence};

/// Current cursor frame version.
pub const CURSOR_VERSION: u8 = 1;

/// Largest store token (in bytes) a cursor can carry.
pub const MAX_STORE_TOKEN_LEN: usize = 8 * 1024;

/// Largest frame `encode` can produce.
const MAX_FRAME_LEN: usize = 1 + 4 + 1 + BUCKET_ID_LEN + 1 + 4 + MAX_STORE_TOKEN_LEN;

/// Longest cursor string accepted by [`PageCursor::decode`].
pub const MAX_CURSOR_LENGTH: usize = MAX_FRAME_LEN.div_ceil(3) * 4;

const TAG_NONE: u8 = 0;
const TAG_SOME: u8 = 1;

// =============================================================================
// StoreToken
// =============================================================================

/// Store-native continuation marker for resuming a scan inside one bucket.
///
/// Opaque to the engine: it is only stored and handed back.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreToken(String);

impl StoreToken {
    /// Wrap a store token, rejecting tokens too large to fit in a cursor.
    pub fn new(token: impl Into<String>) -> StorageResult<Self> {
        let token = token.into();
        if token.len() > MAX_STORE_TOKEN_LEN {
            return Err(StorageError::InvalidStoreToken(format!(
                "token is {} bytes, maximum is {}",
                token.len(),
                MAX_STORE_TOKEN_LEN
            )));
        }
        Ok(Self(token))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for StoreToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// PageCursor
// =============================================================================

/// Resume position in a bucketed feed.
///
/// Valid only against the [`BucketSequence`] that produced it; see
/// [`PageCursor::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    bucket_index: u32,
    bucket_id: BucketId,
    store_token: Option<StoreToken>,
}

impl PageCursor {
    pub fn new(bucket_index: u32, bucket_id: BucketId, store_token: Option<StoreToken>) -> Self {
        Self {
            bucket_index,
            bucket_id,
            store_token,
        }
    }

    /// Index of the bucket to resume in.
    pub fn bucket_index(&self) -> u32 {
        self.bucket_index
    }

    /// Bucket the index pointed at when the cursor was produced.
    pub fn bucket_id(&self) -> &BucketId {
        &self.bucket_id
    }

    /// Position inside the bucket; `None` means the start of the bucket.
    pub fn store_token(&self) -> Option<&StoreToken> {
        self.store_token.as_ref()
    }

    /// Check this cursor against `sequence` and return the bucket index to resume at.
    ///
    /// A cursor replayed against a different horizon is rejected, never
    /// clamped or reinterpreted.
    pub fn resolve(&self, sequence: &BucketSequence) -> FeedResult<usize> {
        let index = self.bucket_index as usize;
        let bucket = sequence.get(index).ok_or(FeedError::CursorOutOfRange {
            index: self.bucket_index,
            len: sequence.len(),
        })?;

        if *bucket != self.bucket_id {
            return Err(CursorError::BucketMismatch {
                index: self.bucket_index,
                cursor: self.bucket_id.to_string(),
                sequence: bucket.to_string(),
            }
            .into());
        }

        Ok(index)
    }

    /// Serialize to the opaque client-facing string.
    pub fn encode(&self) -> String {
        let token = self.store_token.as_ref().map(|t| t.0.as_bytes());
        let mut frame =
            Vec::with_capacity(1 + 4 + 1 + BUCKET_ID_LEN + 1 + 4 + token.map_or(0, <[u8]>::len));

        frame.push(CURSOR_VERSION);
        frame.extend_from_slice(&self.bucket_index.to_be_bytes());

        let bucket = self.bucket_id.as_str().as_bytes();
        frame.push(bucket.len() as u8);
        frame.extend_from_slice(bucket);

        match token {
            None => frame.push(TAG_NONE),
            Some(bytes) => {
                frame.push(TAG_SOME);
                // StoreToken::new bounds the length well below u32::MAX.
                frame.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
                frame.extend_from_slice(bytes);
            }
        }

        URL_SAFE_NO_PAD.encode(frame)
    }

    /// Parse a string produced by [`PageCursor::encode`].
    pub fn decode(s: &str) -> Result<Self, CursorError> {
        if s.is_empty() {
            return Err(CursorError::Empty);
        }
        if s.len() > MAX_CURSOR_LENGTH {
            return Err(CursorError::TooLong {
                len: s.len(),
                max: MAX_CURSOR_LENGTH,
            });
        }

        let frame = URL_SAFE_NO_PAD
            .decode(s)
            .map_err(|e| CursorError::InvalidEncoding(e.to_string()))?;
        let mut reader = FrameReader::new(&frame);

        let version = reader.u8("version")?;
        if version != CURSOR_VERSION {
            return Err(CursorError::UnsupportedVersion(version));
        }

        let bucket_index = reader.u32("bucket index")?;

        let bucket_len = reader.u8("bucket id length")? as usize;
        if bucket_len != BUCKET_ID_LEN {
            return Err(CursorError::InvalidBucketId(format!(
                "length {} instead of {}",
                bucket_len, BUCKET_ID_LEN
            )));
        }
        let bucket_bytes = reader.take(bucket_len, "bucket id")?;
        let bucket_str =
            std::str::from_utf8(bucket_bytes).map_err(|_| CursorError::InvalidUtf8("bucket id"))?;
        let bucket_id =
            BucketId::parse(bucket_str).map_err(|e| CursorError::InvalidBucketId(e.to_string()))?;

        let store_token = match reader.u8("token tag")? {
            TAG_NONE => None,
            TAG_SOME => {
                let len = reader.u32("token length")? as usize;
                if len > MAX_STORE_TOKEN_LEN {
                    return Err(CursorError::TokenTooLong {
                        len,
                        max: MAX_STORE_TOKEN_LEN,
                    });
                }
                let bytes = reader.take(len, "store token")?;
                let token = std::str::from_utf8(bytes)
                    .map_err(|_| CursorError::InvalidUtf8("store token"))?;
                Some(StoreToken(token.to_string()))
            }
            other => return Err(CursorError::InvalidTag(other)),
        };

        if reader.remaining() > 0 {
            return Err(CursorError::TrailingBytes(reader.remaining()));
        }

        Ok(Self {
            bucket_index,
            bucket_id,
            store_token,
        })
    }
}

/// Sequential reader over a cursor frame.
struct FrameReader<'a> {
    bytes: &'a [u8],
}

impl<'a> FrameReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    fn take(&mut self, n: usize, field: &'static str) -> Result<&'a [u8], CursorError> {
        if self.bytes.len() < n {
            return Err(CursorError::Truncated(field));
        }
        let (head, tail) = self.bytes.split_at(n);
        self.bytes = tail;
        Ok(head)
    }

    fn u8(&mut self, field: &'static str) -> Result<u8, CursorError> {
        Ok(self.take(1, field)?[0])
    }

    fn u32(&mut self, field: &'static str) -> Result<u32, CursorError> {
        let b = self.take(4, field)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn remaining(&self) -> usize {
        self.bytes.len()
    }
}

// =============================================================================
// FeedPage
// =============================================================================

/// One page of the feed.
///
/// `rows.len() <= page_size`; `next_cursor` is present iff more data may follow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedPage<R> {
    pub rows: Vec<R>,
    pub next_cursor: Option<PageCursor>,
}

impl<R> FeedPage<R> {
    /// Whether another page can be requested.
    pub fn has_next_page(&self) -> bool {
        self.next_cursor.is_some()
    }
}
