//! Core services for the latest-videos feed.

mod catalog;
mod feed;

pub use catalog::*;
pub use feed::*;
