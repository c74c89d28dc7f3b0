//! Feed state machine for the posts screen.
//!
//! Folds two independent signals, the repository's data stream and the
//! outcome of each refresh, into a single current `FeedState`. The
//! success path always goes through the store: a refresh never flips the
//! state to `Success` by itself; the snapshot emitted by the committed
//! upsert does. The screen therefore only ever shows durably-committed
//! data, never an in-flight network response.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::SyncError;
use crate::posts::Post;
use crate::repo::{PostRepository, PostsWatch};

/// What the posts screen should show right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedState {
  /// No data to show yet; a refresh may be in flight.
  Loading,
  /// Last known-good snapshot, ordered by id.
  Success(Vec<Post>),
  /// The last refresh failed. The cache keeps its prior contents.
  Error(String),
}

impl FeedState {
  pub fn is_loading(&self) -> bool {
    matches!(self, FeedState::Loading)
  }

  pub fn is_success(&self) -> bool {
    matches!(self, FeedState::Success(_))
  }

  pub fn is_error(&self) -> bool {
    matches!(self, FeedState::Error(_))
  }

  #[allow(dead_code)]
  pub fn error(&self) -> Option<&str> {
    match self {
      FeedState::Error(message) => Some(message),
      _ => None,
    }
  }
}

/// Reactive feed over the posts repository.
///
/// The state is a single current value, not a queue; new subscribers see
/// the current state immediately. Dropping the feed ends its observer
/// task, leaving the store and other observers untouched.
pub struct PostsFeed {
  repo: PostRepository,
  state: Arc<watch::Sender<FeedState>>,
  refreshing: AtomicBool,
  observer: JoinHandle<()>,
}

impl PostsFeed {
  /// Create the feed and start observing the repository's data stream.
  pub fn new(repo: PostRepository) -> Self {
    let (state, _) = watch::channel(FeedState::Loading);
    let state = Arc::new(state);
    let observer = tokio::spawn(observe(repo.observe(), Arc::clone(&state)));

    Self {
      repo,
      state,
      refreshing: AtomicBool::new(false),
      observer,
    }
  }

  /// Subscribe to state changes. The receiver replays the current state.
  pub fn subscribe(&self) -> watch::Receiver<FeedState> {
    self.state.subscribe()
  }

  /// Current state snapshot.
  pub fn state(&self) -> FeedState {
    self.state.borrow().clone()
  }

  /// Fetch unless data is already on screen.
  ///
  /// Duplicate triggers (screen re-entry, re-subscription) must not hit
  /// the network once the feed shows data.
  pub async fn load(&self) -> Result<(), SyncError> {
    if self.state.borrow().is_success() {
      return Ok(());
    }
    self.refresh().await
  }

  /// Fetch unconditionally (pull-to-refresh, retry).
  ///
  /// At most one refresh runs at a time; a call that overlaps an
  /// in-flight one returns without fetching again. The returned result is
  /// a success/failure signal only; list content arrives through the
  /// state stream.
  pub async fn refresh(&self) -> Result<(), SyncError> {
    if self.refreshing.swap(true, Ordering::SeqCst) {
      return Ok(());
    }

    let outcome = self.repo.refresh().await;
    self.refreshing.store(false, Ordering::SeqCst);

    match outcome {
      Ok(()) => {
        // No direct transition: the committed upsert re-emits through the
        // store and the observer task produces the Success state.
        Ok(())
      }
      Err(error) => {
        tracing::warn!(%error, "refresh failed");
        self.state.send_replace(FeedState::Error(error.to_string()));
        Err(error)
      }
    }
  }
}

impl Drop for PostsFeed {
  fn drop(&mut self) {
    self.observer.abort();
  }
}

/// Fold store snapshots into feed states.
async fn observe(mut posts: PostsWatch, state: Arc<watch::Sender<FeedState>>) {
  while let Some(snapshot) = posts.next().await {
    if snapshot.is_empty() {
      // An empty cache means "nothing yet", not "recovered": keep a known
      // failure on screen.
      state.send_if_modified(|current| {
        if current.is_error() || current.is_loading() {
          false
        } else {
          *current = FeedState::Loading;
          true
        }
      });
    } else {
      state.send_replace(FeedState::Success(snapshot));
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  use std::sync::Arc;
  use std::time::Duration;

  use crate::api::testing::{post, ScriptedSource};
  use crate::error::RemoteError;
  use crate::store::{PostRecord, PostStore};

  fn seed(store: &PostStore, posts: &[Post]) {
    let records: Vec<PostRecord> = posts
      .iter()
      .cloned()
      .map(|post| PostRecord {
        id: post.id,
        user_id: post.user_id,
        title: post.title,
        body: post.body,
      })
      .collect();
    store.upsert_all(&records).unwrap();
  }

  fn feed_with(
    replies: Vec<Result<Vec<Post>, RemoteError>>,
    store: &PostStore,
  ) -> (PostsFeed, Arc<ScriptedSource>) {
    let source = Arc::new(ScriptedSource::new(replies));
    let repo = PostRepository::new(source.clone(), store.clone());
    (PostsFeed::new(repo), source)
  }

  async fn wait_for(
    rx: &mut watch::Receiver<FeedState>,
    pred: impl Fn(&FeedState) -> bool,
  ) -> FeedState {
    tokio::time::timeout(Duration::from_secs(1), async {
      loop {
        {
          let current = rx.borrow_and_update();
          if pred(&current) {
            return current.clone();
          }
        }
        rx.changed().await.expect("feed state stream ended");
      }
    })
    .await
    .expect("timed out waiting for feed state")
  }

  #[tokio::test]
  async fn starts_loading_with_an_empty_cache() {
    let store = PostStore::open_in_memory().unwrap();
    let (feed, source) = feed_with(vec![], &store);

    assert!(feed.state().is_loading());
    assert_eq!(source.calls(), 0);
  }

  #[tokio::test]
  async fn cached_posts_surface_without_network_access() {
    let store = PostStore::open_in_memory().unwrap();
    seed(&store, &[post(1, "one")]);

    let (feed, source) = feed_with(vec![], &store);
    let mut rx = feed.subscribe();

    let state = wait_for(&mut rx, FeedState::is_success).await;
    assert_eq!(state, FeedState::Success(vec![post(1, "one")]));
    assert_eq!(source.calls(), 0);
  }

  #[tokio::test]
  async fn load_fetches_and_surfaces_committed_data() {
    let store = PostStore::open_in_memory().unwrap();
    let (feed, source) = feed_with(vec![Ok(vec![post(2, "two"), post(1, "one")])], &store);
    let mut rx = feed.subscribe();

    feed.load().await.unwrap();

    let state = wait_for(&mut rx, FeedState::is_success).await;
    assert_eq!(
      state,
      FeedState::Success(vec![post(1, "one"), post(2, "two")])
    );
    assert_eq!(source.calls(), 1);
  }

  #[tokio::test]
  async fn load_is_a_noop_once_successful() {
    let store = PostStore::open_in_memory().unwrap();
    let (feed, source) = feed_with(vec![Ok(vec![post(1, "one")])], &store);
    let mut rx = feed.subscribe();

    feed.load().await.unwrap();
    wait_for(&mut rx, FeedState::is_success).await;

    feed.load().await.unwrap();
    feed.load().await.unwrap();

    assert_eq!(source.calls(), 1);
  }

  #[tokio::test]
  async fn explicit_refresh_always_fetches() {
    let posts = vec![post(1, "one")];
    let store = PostStore::open_in_memory().unwrap();
    let (feed, source) = feed_with(
      vec![Ok(posts.clone()), Ok(posts.clone()), Ok(posts.clone())],
      &store,
    );
    let mut rx = feed.subscribe();

    feed.load().await.unwrap();
    wait_for(&mut rx, FeedState::is_success).await;

    feed.refresh().await.unwrap();
    feed.refresh().await.unwrap();

    assert_eq!(source.calls(), 3);
  }

  #[tokio::test]
  async fn overlapping_refreshes_coalesce() {
    let store = PostStore::open_in_memory().unwrap();
    let source = Arc::new(
      ScriptedSource::new(vec![Ok(vec![post(1, "one")])])
        .with_delay(Duration::from_millis(50)),
    );
    let repo = PostRepository::new(source.clone(), store.clone());
    let feed = PostsFeed::new(repo);

    let (first, second) = tokio::join!(feed.refresh(), feed.refresh());
    first.unwrap();
    second.unwrap();

    assert_eq!(source.calls(), 1);
  }

  #[tokio::test]
  async fn refresh_failure_surfaces_error_and_keeps_the_cache() {
    let store = PostStore::open_in_memory().unwrap();
    seed(&store, &[post(1, "one")]);

    let (feed, _) = feed_with(
      vec![Err(RemoteError::Status(
        reqwest::StatusCode::REQUEST_TIMEOUT,
      ))],
      &store,
    );
    let mut rx = feed.subscribe();
    wait_for(&mut rx, FeedState::is_success).await;

    assert!(feed.refresh().await.is_err());

    let state = wait_for(&mut rx, FeedState::is_error).await;
    assert_eq!(
      state.error(),
      Some("unexpected status 408 Request Timeout")
    );
    // The cache still holds the prior snapshot.
    assert_eq!(store.all().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn error_recovers_directly_to_success() {
    let store = PostStore::open_in_memory().unwrap();
    let (feed, _) = feed_with(
      vec![
        Err(RemoteError::Status(reqwest::StatusCode::BAD_GATEWAY)),
        Ok(vec![post(1, "fresh")]),
      ],
      &store,
    );
    let mut rx = feed.subscribe();

    assert!(feed.load().await.is_err());
    wait_for(&mut rx, FeedState::is_error).await;

    feed.refresh().await.unwrap();

    // Straight to Success with the new data; the empty cache never masks
    // the recovery with a Loading flash.
    let state = wait_for(&mut rx, |s| !s.is_error()).await;
    assert_eq!(state, FeedState::Success(vec![post(1, "fresh")]));
  }

  #[tokio::test]
  async fn empty_emission_does_not_mask_an_error() {
    let store = PostStore::open_in_memory().unwrap();
    let (feed, _) = feed_with(
      vec![Err(RemoteError::Status(
        reqwest::StatusCode::SERVICE_UNAVAILABLE,
      ))],
      &store,
    );
    let mut rx = feed.subscribe();

    assert!(feed.load().await.is_err());
    wait_for(&mut rx, FeedState::is_error).await;

    // clear_all re-emits an empty snapshot; the failure stays visible.
    store.clear_all().unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(feed.state().is_error());
  }

  #[tokio::test]
  async fn clearing_the_cache_returns_to_loading() {
    let store = PostStore::open_in_memory().unwrap();
    seed(&store, &[post(1, "one")]);

    let (feed, _) = feed_with(vec![], &store);
    let mut rx = feed.subscribe();
    wait_for(&mut rx, FeedState::is_success).await;

    store.clear_all().unwrap();

    let state = wait_for(&mut rx, FeedState::is_loading).await;
    assert_eq!(state, FeedState::Loading);
  }
}
