use serde::{Deserialize, Serialize};

/// A single playlist entry as described by the manifest.
///
/// Only `id` and `src` are required; everything else falls back to empty/`None`
/// so that sparse manifests still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
  pub id: String,
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub tags: Vec<String>,
  #[serde(default)]
  pub year: Option<i32>,
  #[serde(default)]
  pub map: Option<String>,
  #[serde(default)]
  pub category: Option<String>,
  #[serde(default)]
  pub thumbnail: Option<String>,
  pub src: String,
}

impl Video {
  /// Lowercased haystack used by search: title, description, map and joined tags.
  pub fn search_text(&self) -> String {
    format!("{} {} {} {}", self.title, self.description, self.map.as_deref().unwrap_or(""), self.tags.join(" "))
      .to_lowercase()
  }

  /// Secondary line shown under the title in the list: "Year N • category • map".
  pub fn meta_line(&self) -> String {
    let mut parts = Vec::new();
    if let Some(year) = self.year {
      parts.push(format!("Year {}", year));
    }
    if let Some(category) = self.category.as_deref().filter(|c| !c.is_empty()) {
      parts.push(category.to_string());
    }
    if let Some(map) = self.map.as_deref().filter(|m| !m.is_empty()) {
      parts.push(map.to_string());
    }
    parts.join(" • ")
  }
}

/// Global counters for one video, as reported by the counter service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct CounterSnapshot {
  pub views: u64,
  pub likes: u64,
  pub dislikes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
  Up,
  Down,
}

impl VoteDirection {
  pub fn as_str(self) -> &'static str {
    match self {
      VoteDirection::Up => "up",
      VoteDirection::Down => "down",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "up" => Some(VoteDirection::Up),
      "down" => Some(VoteDirection::Down),
      _ => None,
    }
  }
}

#[cfg(test)]
pub(crate) fn sample(id: &str, title: &str) -> Video {
  Video {
    id: id.to_string(),
    title: title.to_string(),
    description: String::new(),
    tags: Vec::new(),
    year: None,
    map: None,
    category: None,
    thumbnail: None,
    src: format!("https://cdn.example.com/{}.mp4", id),
  }
}
