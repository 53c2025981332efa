//! Application constants loaded from `constants.ron` at compile time.
//!
//! The RON file is embedded via `include_str!` so it's always available,
//! with no runtime file I/O. Parsed once on first access via `LazyLock`.

use serde::Deserialize;
use std::sync::LazyLock;

/// All tuneable application constants.
#[derive(Debug, Deserialize)]
pub struct Constants {
  pub default_playlist_url: String,
  pub default_share_base_url: String,

  // Playback
  pub view_threshold_secs: f64,
  pub position_snapshot_secs: u64,

  // Storage
  pub session_key: String,
  pub vote_key_prefix: String,
  pub views_key_prefix: String,
  pub state_file_name: String,

  // UI text
  pub loading_placeholder: String,
  pub link_copied_message: String,
  pub boot_failed_message: String,
}

static CONSTANTS: LazyLock<Constants> = LazyLock::new(|| {
  // Safety: the RON file is embedded at compile time; if it's malformed this is a build-time error.
  ron::from_str(include_str!("../constants.ron")).expect("constants.ron must be valid RON (embedded at compile time)")
});

/// Returns a reference to the parsed application constants.
pub fn constants() -> &'static Constants {
  &CONSTANTS
}
