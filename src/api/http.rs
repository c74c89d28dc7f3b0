//! HTTP implementation of the remote source.

use async_trait::async_trait;
use url::Url;

use crate::error::RemoteError;
use crate::posts::Post;

use super::types::PostDto;
use super::PostSource;

/// Remote source backed by a plain GET against the posts endpoint.
#[derive(Clone)]
pub struct HttpPostSource {
  client: reqwest::Client,
  endpoint: Url,
}

impl HttpPostSource {
  /// Build a source for the given endpoint root.
  ///
  /// The root is treated as a directory, so `https://host/api` and
  /// `https://host/api/` both resolve to `https://host/api/posts`.
  pub fn new(base_url: &Url) -> Result<Self, url::ParseError> {
    let mut base = base_url.clone();
    if !base.path().ends_with('/') {
      base.set_path(&format!("{}/", base.path()));
    }
    let endpoint = base.join("posts")?;

    Ok(Self {
      client: reqwest::Client::new(),
      endpoint,
    })
  }
}

#[async_trait]
impl PostSource for HttpPostSource {
  async fn fetch_all(&self) -> Result<Vec<Post>, RemoteError> {
    tracing::debug!(endpoint = %self.endpoint, "fetching posts");

    let response = self.client.get(self.endpoint.clone()).send().await?;

    let status = response.status();
    if !status.is_success() {
      return Err(RemoteError::Status(status));
    }

    // Decode from the raw body so a schema mismatch surfaces as a payload
    // error rather than a transport error.
    let body = response.text().await?;
    let posts: Vec<PostDto> = serde_json::from_str(&body)?;

    tracing::debug!(count = posts.len(), "fetched posts");
    Ok(posts.into_iter().map(PostDto::into_post).collect())
  }
}
