//! Metrics definitions for the feed.
//!
//! This module defines all metrics used by the pagination engine.
//! Metrics are collected using the `metrics` crate; without an installed
//! recorder every call is a no-op.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Instant;

/// Initialize all metric descriptions.
/// Call this once at startup before any metrics are recorded.
pub fn init_metrics() {
    describe_counter!(
        "feed_pages_served_total",
        "Total number of feed pages assembled"
    );
    describe_counter!(
        "feed_store_fetches_total",
        "Total number of bucket store fetches issued by the pagination engine"
    );
    describe_counter!(
        "feed_bucket_transitions_total",
        "Total number of times a page crossed into the next bucket"
    );
    describe_counter!(
        "feed_cursor_rejections_total",
        "Total number of client cursors rejected, by reason"
    );
    describe_histogram!(
        "feed_page_duration_seconds",
        "Time taken to assemble one feed page in seconds"
    );
}

/// Record a page handed back to a caller.
///
/// # Arguments
/// * `exhausted` - Whether the page ended the feed
pub fn record_page_served(exhausted: bool) {
    counter!("feed_pages_served_total", "exhausted" => exhausted.to_string()).increment(1);
}

/// Record one `BucketStore::fetch` call.
pub fn record_store_fetch() {
    counter!("feed_store_fetches_total").increment(1);
}

/// Record a move to the next bucket.
pub fn record_bucket_transition() {
    counter!("feed_bucket_transitions_total").increment(1);
}

/// Record a rejected cursor.
///
/// # Arguments
/// * `reason` - Short label such as `"truncated"` or `"out_of_range"`
pub fn record_cursor_rejected(reason: &'static str) {
    counter!("feed_cursor_rejections_total", "reason" => reason).increment(1);
}

/// Record page assembly duration.
pub fn record_page_duration(duration_secs: f64) {
    histogram!("feed_page_duration_seconds").record(duration_secs);
}

/// A timer that records page assembly duration when dropped.
pub struct PageTimer {
    start: Instant,
}

impl PageTimer {
    /// Start a new page timer.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for PageTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PageTimer {
    fn drop(&mut self) {
        record_page_duration(self.start.elapsed().as_secs_f64());
    }
}
