//! Wire types for the posts endpoint.

use serde::Deserialize;

use crate::posts::Post;

/// A post exactly as the endpoint serializes it.
///
/// The payload is a JSON array of objects like:
///
/// ```json
/// { "userId": 1, "id": 1, "title": "...", "body": "..." }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct PostDto {
  #[serde(rename = "userId")]
  pub user_id: i64,
  pub id: i64,
  pub title: String,
  pub body: String,
}

impl PostDto {
  /// Convert into the domain representation.
  pub fn into_post(self) -> Post {
    Post {
      id: self.id,
      user_id: self.user_id,
      title: self.title,
      body: self.body,
    }
  }
}
