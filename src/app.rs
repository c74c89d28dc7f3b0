//! Command runners wiring the sync core to the terminal.
//!
//! Each command builds the store/repository/feed stack, drives it, and
//! renders the resulting feed state as plain terminal output. List
//! content is only ever read from the feed's state stream; refresh
//! outcomes are treated as success/failure signals.

use color_eyre::{eyre::eyre, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use url::Url;

use crate::api::HttpPostSource;
use crate::config::Config;
use crate::feed::{FeedState, PostsFeed};
use crate::repo::PostRepository;
use crate::store::PostStore;

/// How long to wait for the observer task to fold a committed snapshot
/// into the visible state before rendering whatever is current.
const SETTLE_GRACE: Duration = Duration::from_millis(750);

fn build_feed(config: &Config) -> Result<(PostsFeed, PostStore)> {
  let base_url = config.base_url()?;
  let source =
    HttpPostSource::new(&base_url).map_err(|e| eyre!("Invalid endpoint URL: {}", e))?;

  let store = PostStore::open(&config.cache_path()?)?;
  let repo = PostRepository::new(Arc::new(source), store.clone());

  Ok((PostsFeed::new(repo), store))
}

/// `list`: show posts, fetching them first if nothing is cached.
pub async fn list(config: &Config) -> Result<()> {
  let (feed, store) = build_feed(config)?;
  let mut rx = feed.subscribe();

  if feed.load().await.is_err() {
    // The failure already lives in the state.
    render(&feed.state(), &store)
  } else {
    let state = settled_state(&mut rx).await;
    render(&state, &store)
  }
}

/// `refresh`: force a fetch, then show the outcome.
pub async fn refresh(config: &Config) -> Result<()> {
  let (feed, store) = build_feed(config)?;
  let mut rx = feed.subscribe();
  rx.mark_unchanged();

  match feed.refresh().await {
    Err(_) => render(&feed.state(), &store),
    Ok(()) => {
      // The committed upsert re-emits through the store; give the
      // observer a beat to fold it in.
      let _ = tokio::time::timeout(SETTLE_GRACE, rx.changed()).await;
      let state = settled_state(&mut rx).await;
      render(&state, &store)
    }
  }
}

/// `clear-cache`: maintenance trigger that empties the local table.
pub fn clear_cache(config: &Config) -> Result<()> {
  let store = PostStore::open(&config.cache_path()?)?;
  store.clear_all()?;

  println!("Cache cleared.");
  Ok(())
}

/// `set-url`: validate and persist a new endpoint root.
pub fn set_url(config: &mut Config, raw: &str, explicit_path: Option<&Path>) -> Result<()> {
  let url = Url::parse(raw).map_err(|e| eyre!("Invalid URL {}: {}", raw, e))?;

  config.api.base_url = url.to_string();
  config.save(explicit_path)?;

  println!("Base URL set to {}", url);
  Ok(())
}

/// Wait briefly for a non-Loading state, then return whatever is current.
async fn settled_state(rx: &mut watch::Receiver<FeedState>) -> FeedState {
  let wait = async {
    loop {
      if !rx.borrow_and_update().is_loading() {
        break;
      }
      if rx.changed().await.is_err() {
        break;
      }
    }
  };
  let _ = tokio::time::timeout(SETTLE_GRACE, wait).await;

  rx.borrow().clone()
}

fn render(state: &FeedState, store: &PostStore) -> Result<()> {
  match state {
    FeedState::Loading => {
      println!("No posts available yet. Run `postfeed refresh` to fetch them.");
    }
    FeedState::Success(posts) => {
      for post in posts {
        println!("{:>5}  {}", post.id, post.title);
      }
      println!();
      match store.last_synced_at()? {
        Some(at) => println!(
          "{} posts, last synced {}.",
          posts.len(),
          at.format("%Y-%m-%d %H:%M UTC")
        ),
        None => println!("{} posts.", posts.len()),
      }
    }
    FeedState::Error(message) => {
      eprintln!("Refresh failed: {message}");
      let cached = store.all()?;
      if cached.is_empty() {
        eprintln!("No cached posts to fall back on. Retry with `postfeed refresh`.");
      } else {
        eprintln!(
          "{} posts remain cached; `postfeed list` shows them.",
          cached.len()
        );
      }
    }
  }
  Ok(())
}
