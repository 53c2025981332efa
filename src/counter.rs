use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::video::{CounterSnapshot, VoteDirection};

/// Any failure talking to the counter service. Callers only need to know
/// that the remote is unavailable; the reason is kept for logging.
#[derive(Debug, Error)]
#[error("counter service unavailable: {reason}")]
pub struct RemoteUnavailable {
  pub reason: String,
}

impl RemoteUnavailable {
  pub fn new(reason: impl Into<String>) -> Self {
    Self { reason: reason.into() }
  }
}

impl From<reqwest::Error> for RemoteUnavailable {
  fn from(e: reqwest::Error) -> Self {
    Self::new(e.to_string())
  }
}

/// Like/dislike totals returned by a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct VoteTotals {
  pub likes: u64,
  pub dislikes: u64,
}

#[derive(Debug, Deserialize)]
struct ViewResponse {
  views: Option<u64>,
}

/// Global view/like/dislike tallies kept by an external service.
#[async_trait]
pub trait CounterService: Send + Sync {
  async fn get_stats(&self, id: &str) -> Result<CounterSnapshot, RemoteUnavailable>;

  /// Record one view. The service may or may not answer with the new total.
  async fn record_view(&self, id: &str) -> Result<Option<u64>, RemoteUnavailable>;

  async fn vote(&self, id: &str, direction: VoteDirection) -> Result<VoteTotals, RemoteUnavailable>;
}

/// HTTP client for the counter worker:
///
/// - `GET  {base}/video/{id}` → `{views, likes, dislikes}`
/// - `POST {base}/view` `{id}` → optional `{views}`
/// - `POST {base}/vote` `{id, vote}` → `{likes, dislikes}`
pub struct HttpCounterClient {
  client: Client,
  base: Url,
}

impl HttpCounterClient {
  pub fn new(client: Client, base_url: &str) -> anyhow::Result<Self> {
    let base = Url::parse(base_url.trim_end_matches('/'))?;
    if base.cannot_be_a_base() {
      anyhow::bail!("counter url cannot be a base: {}", base_url);
    }
    Ok(Self { client, base })
  }

  fn endpoint(&self, segments: &[&str]) -> Url {
    let mut url = self.base.clone();
    // Checked in `new`; a trailing slash would leave an empty segment before ours.
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().extend(segments);
    }
    url
  }
}

#[async_trait]
impl CounterService for HttpCounterClient {
  async fn get_stats(&self, id: &str) -> Result<CounterSnapshot, RemoteUnavailable> {
    let response = self.client.get(self.endpoint(&["video", id])).send().await?;
    if !response.status().is_success() {
      return Err(RemoteUnavailable::new(format!("stats status {}", response.status())));
    }
    Ok(response.json::<CounterSnapshot>().await?)
  }

  async fn record_view(&self, id: &str) -> Result<Option<u64>, RemoteUnavailable> {
    let response = self.client.post(self.endpoint(&["view"])).json(&json!({ "id": id })).send().await?;
    if !response.status().is_success() {
      return Err(RemoteUnavailable::new(format!("view status {}", response.status())));
    }
    let body = response.text().await?;
    Ok(serde_json::from_str::<ViewResponse>(&body).ok().and_then(|r| r.views))
  }

  async fn vote(&self, id: &str, direction: VoteDirection) -> Result<VoteTotals, RemoteUnavailable> {
    let response =
      self.client.post(self.endpoint(&["vote"])).json(&json!({ "id": id, "vote": direction })).send().await?;
    if !response.status().is_success() {
      return Err(RemoteUnavailable::new(format!("vote status {}", response.status())));
    }
    Ok(response.json::<VoteTotals>().await?)
  }
}
