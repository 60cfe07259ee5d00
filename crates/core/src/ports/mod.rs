mod bucket_store;
mod pagination;
mod repository;

pub use bucket_store::*;
pub use pagination::*;
pub use repository::*;
