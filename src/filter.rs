use rand::Rng;
use std::sync::Arc;

use crate::video::Video;

/// The full playlist plus the search-derived subset and the active pointer.
///
/// `filtered` holds indices into `all`, so videos are never copied. Whenever
/// `filtered` is non-empty, `active_index` is a valid position in it.
#[derive(Debug, Clone)]
pub struct VideoIndex {
  all: Arc<[Video]>,
  filtered: Vec<usize>,
  active_id: Option<String>,
  active_index: usize,
}

impl VideoIndex {
  pub fn new(all: Arc<[Video]>) -> Self {
    let mut index = Self { all, filtered: Vec::new(), active_id: None, active_index: 0 };
    index.apply_filter("");
    index
  }

  pub fn all(&self) -> &[Video] {
    &self.all
  }

  pub fn get(&self, id: &str) -> Option<&Video> {
    self.all.iter().find(|v| v.id == id)
  }

  pub fn contains(&self, id: &str) -> bool {
    self.get(id).is_some()
  }

  pub fn filtered(&self) -> impl Iterator<Item = &Video> + '_ {
    self.filtered.iter().map(|&i| &self.all[i])
  }

  pub fn filtered_len(&self) -> usize {
    self.filtered.len()
  }

  pub fn filtered_at(&self, pos: usize) -> Option<&Video> {
    self.filtered.get(pos).map(|&i| &self.all[i])
  }

  pub fn active_id(&self) -> Option<&str> {
    self.active_id.as_deref()
  }

  pub fn active_index(&self) -> usize {
    self.active_index
  }

  /// Case-insensitive substring match over title, description, map and tags.
  pub fn matches(video: &Video, needle: &str) -> bool {
    needle.is_empty() || video.search_text().contains(needle)
  }

  /// Recompute `filtered` for `term` and repair the active pointer.
  pub fn apply_filter(&mut self, term: &str) {
    let needle = term.trim().to_lowercase();
    self.filtered =
      self.all.iter().enumerate().filter(|(_, v)| Self::matches(v, &needle)).map(|(i, _)| i).collect();

    let still_visible = self.active_id.as_deref().is_some_and(|id| self.position_in_filtered(id).is_some());
    if !still_visible {
      self.active_id = self.filtered_at(0).or_else(|| self.all.first()).map(|v| v.id.clone());
    }
    self.reindex();
  }

  /// Make `id` active. Returns the video, or `None` (and changes nothing)
  /// when the id is not in the playlist.
  pub fn set_active(&mut self, id: &str) -> Option<&Video> {
    let pos = self.all.iter().position(|v| v.id == id)?;
    self.active_id = Some(self.all[pos].id.clone());
    self.reindex();
    Some(&self.all[pos])
  }

  /// Target of "previous": one step back, clamped at the first item.
  pub fn prev_target(&self) -> Option<&Video> {
    if self.filtered.is_empty() {
      return None;
    }
    self.filtered_at(self.active_index.saturating_sub(1))
  }

  /// Target of "next": one step forward, clamped at the last item.
  pub fn next_target(&self) -> Option<&Video> {
    if self.filtered.is_empty() {
      return None;
    }
    let last = self.filtered.len() - 1;
    self.filtered_at((self.active_index + 1).min(last))
  }

  /// Uniformly random item from `filtered`; the current one may repeat.
  pub fn shuffle_target<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Video> {
    if self.filtered.is_empty() {
      return None;
    }
    self.filtered_at(rng.random_range(0..self.filtered.len()))
  }

  fn position_in_filtered(&self, id: &str) -> Option<usize> {
    self.filtered.iter().position(|&i| self.all[i].id == id)
  }

  fn reindex(&mut self) {
    self.active_index = self.active_id.as_deref().and_then(|id| self.position_in_filtered(id)).unwrap_or(0);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::video::sample;
  use rand::SeedableRng;
  use rand::rngs::SmallRng;

  fn index_of(videos: Vec<Video>) -> VideoIndex {
    VideoIndex::new(videos.into())
  }

  fn playlist() -> VideoIndex {
    let mut a = sample("a", "Desert Map");
    a.tags = vec!["sand".to_string()];
    let b = sample("b", "Snow Level");
    let mut c = sample("c", "Night Run");
    c.map = Some("Snowfield".to_string());
    let mut d = sample("d", "Bridge");
    d.description = "A long desert crossing".to_string();
    index_of(vec![a, b, c, d])
  }

  fn ids(index: &VideoIndex) -> Vec<&str> {
    index.filtered().map(|v| v.id.as_str()).collect()
  }

  #[test]
  fn empty_term_matches_everything() {
    let index = playlist();
    assert_eq!(ids(&index), vec!["a", "b", "c", "d"]);
    assert_eq!(index.active_id(), Some("a"));
    assert_eq!(index.active_index(), 0);
  }

  #[test]
  fn snow_scenario_selects_b() {
    let mut index = index_of(vec![sample("a", "Desert Map"), sample("b", "Snow Level")]);
    index.apply_filter("snow");
    assert_eq!(ids(&index), vec!["b"]);
    assert_eq!(index.active_id(), Some("b"));
    assert_eq!(index.active_index(), 0);
  }

  #[test]
  fn filter_is_case_insensitive_and_covers_all_fields() {
    let mut index = playlist();
    index.apply_filter("  SNOW ");
    assert_eq!(ids(&index), vec!["b", "c"]);
    index.apply_filter("desert");
    assert_eq!(ids(&index), vec!["a", "d"]);
    index.apply_filter("Sand");
    assert_eq!(ids(&index), vec!["a"]);
  }

  #[test]
  fn every_filtered_video_contains_term() {
    let mut index = playlist();
    for term in ["a", "sn", "run", "desert", "zzz", "e"] {
      index.apply_filter(term);
      for v in index.filtered() {
        assert!(v.search_text().contains(term), "{} should contain {}", v.id, term);
      }
    }
  }

  #[test]
  fn active_kept_when_still_visible() {
    let mut index = playlist();
    index.set_active("c").unwrap();
    index.apply_filter("snow");
    assert_eq!(index.active_id(), Some("c"));
    assert_eq!(index.active_index(), 1);
  }

  #[test]
  fn empty_result_falls_back_to_first_of_all() {
    let mut index = playlist();
    index.set_active("c").unwrap();
    index.apply_filter("nothing matches this");
    assert_eq!(index.filtered_len(), 0);
    assert_eq!(index.active_id(), Some("a"));
    assert_eq!(index.active_index(), 0);
  }

  #[test]
  fn empty_playlist_has_no_active() {
    let mut index = index_of(Vec::new());
    index.apply_filter("x");
    assert_eq!(index.active_id(), None);
    assert!(index.next_target().is_none());
    assert!(index.prev_target().is_none());
  }

  #[test]
  fn set_active_unknown_id_is_noop() {
    let mut index = playlist();
    index.set_active("b").unwrap();
    assert!(index.set_active("missing").is_none());
    assert_eq!(index.active_id(), Some("b"));
    assert_eq!(index.active_index(), 1);
  }

  #[test]
  fn set_active_outside_filter_keeps_valid_index() {
    let mut index = playlist();
    index.apply_filter("snow");
    index.set_active("a").unwrap();
    assert_eq!(index.active_id(), Some("a"));
    assert_eq!(index.active_index(), 0);
  }

  #[test]
  fn navigation_clamps_at_edges() {
    let mut index = playlist();
    assert_eq!(index.prev_target().map(|v| v.id.as_str()), Some("a"));
    index.set_active("d").unwrap();
    assert_eq!(index.next_target().map(|v| v.id.as_str()), Some("d"));
    assert_eq!(index.prev_target().map(|v| v.id.as_str()), Some("c"));
  }

  #[test]
  fn shuffle_stays_in_filtered_range() {
    let mut index = playlist();
    index.apply_filter("snow");
    let mut rng = SmallRng::seed_from_u64(7);
    for _ in 0..50 {
      let v = index.shuffle_target(&mut rng).unwrap();
      assert!(v.id == "b" || v.id == "c");
    }
  }

  #[test]
  fn shuffle_can_repeat_single_item() {
    let mut index = playlist();
    index.apply_filter("bridge");
    let mut rng = SmallRng::seed_from_u64(1);
    assert_eq!(index.shuffle_target(&mut rng).map(|v| v.id.as_str()), Some("d"));
  }

  #[test]
  fn active_index_valid_across_random_operations() {
    let mut index = playlist();
    let mut rng = SmallRng::seed_from_u64(42);
    let terms = ["", "snow", "desert", "none", "n", "bridge"];
    for step in 0..500 {
      match rng.random_range(0..5) {
        0 => index.apply_filter(terms[rng.random_range(0..terms.len())]),
        1 => {
          let id = index.prev_target().map(|v| v.id.clone());
          if let Some(id) = id {
            index.set_active(&id);
          }
        }
        2 => {
          let id = index.next_target().map(|v| v.id.clone());
          if let Some(id) = id {
            index.set_active(&id);
          }
        }
        3 => {
          let id = index.shuffle_target(&mut rng).map(|v| v.id.clone());
          if let Some(id) = id {
            index.set_active(&id);
          }
        }
        _ => {
          let id = ["a", "b", "c", "d", "zz"][rng.random_range(0..5)];
          index.set_active(id);
        }
      }
      if index.filtered_len() > 0 {
        assert!(index.active_index() < index.filtered_len(), "step {step}: index out of range");
      }
    }
  }
}
