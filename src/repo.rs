//! Sync repository: the single authority between the remote source and
//! the local cache.
//!
//! `refresh()` pulls the remote collection into the store; `observe()`
//! exposes the store's live stream as domain posts. UI code reads list
//! content from `observe()` only; `refresh()` reports success or
//! failure, never data. Committed data reaches the screen through exactly
//! one channel, so racing fetches cannot produce duplicate or
//! out-of-order updates.

use std::sync::Arc;

use crate::api::PostSource;
use crate::error::SyncError;
use crate::posts::Post;
use crate::store::{PostRecord, PostStore, StoreWatch};

/// Repository enforcing single-source-of-truth between remote and cache.
#[derive(Clone)]
pub struct PostRepository {
  source: Arc<dyn PostSource>,
  store: PostStore,
}

impl PostRepository {
  pub fn new(source: Arc<dyn PostSource>, store: PostStore) -> Self {
    Self { source, store }
  }

  /// Fetch the remote collection and upsert it into the cache.
  ///
  /// A fetch failure leaves the cache untouched; an upsert failure is
  /// bounded by the store's batch atomicity. The first failure wins.
  pub async fn refresh(&self) -> Result<(), SyncError> {
    let posts = self.source.fetch_all().await?;
    tracing::info!(count = posts.len(), "fetched posts from remote");

    let records: Vec<PostRecord> = posts
      .into_iter()
      .map(|post| PostRecord {
        id: post.id,
        user_id: post.user_id,
        title: post.title,
        body: post.body,
      })
      .collect();

    self.store.upsert_all(&records)?;
    Ok(())
  }

  /// Live stream of the cached collection as domain posts.
  pub fn observe(&self) -> PostsWatch {
    PostsWatch {
      inner: self.store.subscribe(),
    }
  }
}

/// A live view of the cached posts, mapped to the domain type.
pub struct PostsWatch {
  inner: StoreWatch,
}

impl PostsWatch {
  /// Next snapshot of the collection; the first call resolves immediately
  /// with the current contents.
  pub async fn next(&mut self) -> Option<Vec<Post>> {
    let records = self.inner.next().await?;
    Some(records.into_iter().map(PostRecord::into_post).collect())
  }
}
