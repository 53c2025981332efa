use reqwest::{Client, StatusCode, header};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{info, warn};

use crate::video::Video;

/// Boot-time playlist failures. Both are terminal: the caller shows a status
/// message and does not retry.
#[derive(Debug, Error)]
pub enum PlaylistError {
  #[error("playlist fetch failed: {0}")]
  Fetch(#[from] reqwest::Error),
  #[error("playlist fetch failed: {0}")]
  Status(StatusCode),
  #[error("playlist format error: {0}")]
  Format(String),
}

/// Fetch and validate the manifest at `url`.
pub async fn fetch_playlist(client: &Client, url: &str) -> Result<Vec<Video>, PlaylistError> {
  info!(url = %url, "playlist: fetching manifest");
  let response = client.get(url).header(header::CACHE_CONTROL, "no-cache").send().await?;

  let status = response.status();
  if !status.is_success() {
    return Err(PlaylistError::Status(status));
  }

  let body = response.text().await?;
  let videos = parse_playlist(&body)?;
  info!(count = videos.len(), "playlist: loaded");
  Ok(videos)
}

/// Decode a manifest body. The top level must be a JSON array; each element
/// must be a valid video. Later duplicates of an id are dropped.
pub fn parse_playlist(body: &str) -> Result<Vec<Video>, PlaylistError> {
  let value: serde_json::Value =
    serde_json::from_str(body).map_err(|e| PlaylistError::Format(format!("invalid JSON: {}", e)))?;

  let serde_json::Value::Array(items) = value else {
    return Err(PlaylistError::Format("playlist must be an array".to_string()));
  };

  let mut seen = HashSet::new();
  let mut videos = Vec::with_capacity(items.len());
  for (i, item) in items.into_iter().enumerate() {
    let video: Video =
      serde_json::from_value(item).map_err(|e| PlaylistError::Format(format!("entry {}: {}", i, e)))?;
    if !seen.insert(video.id.clone()) {
      warn!(id = %video.id, index = i, "playlist: duplicate id dropped");
      continue;
    }
    videos.push(video);
  }
  Ok(videos)
}
