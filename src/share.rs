use reqwest::Url;

/// Query parameter carrying the active video id.
pub const VIDEO_PARAM: &str = "v";

/// Read the `v` parameter from a share link. Empty values count as absent.
pub fn video_from_link(link: &str) -> Option<String> {
  let url = Url::parse(link).ok()?;
  url.query_pairs().find(|(k, _)| k == VIDEO_PARAM).map(|(_, v)| v.into_owned()).filter(|v| !v.is_empty())
}

/// Rewrite `base` so its `v` parameter is `id`, replacing any existing value
/// and keeping other parameters. `None` or an empty id removes the parameter.
pub fn with_video(base: &str, id: Option<&str>) -> Option<String> {
  let mut url = Url::parse(base).ok()?;
  let kept: Vec<(String, String)> =
    url.query_pairs().filter(|(k, _)| k != VIDEO_PARAM).map(|(k, v)| (k.into_owned(), v.into_owned())).collect();

  url.set_query(None);
  let id = id.filter(|id| !id.is_empty());
  if !kept.is_empty() || id.is_some() {
    let mut pairs = url.query_pairs_mut();
    for (k, v) in &kept {
      pairs.append_pair(k, v);
    }
    if let Some(id) = id {
      pairs.append_pair(VIDEO_PARAM, id);
    }
  }
  Some(url.into())
}
