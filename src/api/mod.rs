//! Remote data source for the posts collection.
//!
//! The remote side is deliberately small: one stateless operation that
//! returns the full current collection or fails. No caching happens here,
//! and no retries either; retry policy belongs to callers.

mod http;
mod types;

pub use http::HttpPostSource;
pub use types::PostDto;

use async_trait::async_trait;

use crate::error::RemoteError;
use crate::posts::Post;

/// A stateless fetcher for the authoritative remote collection.
#[async_trait]
pub trait PostSource: Send + Sync {
  /// Fetch the full remote collection in one round trip.
  async fn fetch_all(&self) -> Result<Vec<Post>, RemoteError>;
}
