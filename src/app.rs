use ratatui::widgets::ListState;
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::clipboard::copy_to_clipboard;
use crate::config::Config;
use crate::constants::constants;
use crate::filter::VideoIndex;
use crate::player::MediaPlayer;
use crate::playlist::{PlaylistError, fetch_playlist};
use crate::share;
use crate::sync::{SyncCore, VoteRejected};
use crate::theme::{self, THEMES};
use crate::video::{Video, VoteDirection};

// --- Types ---

pub type BootResult = Result<Vec<Video>, PlaylistError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
  List,
  Search,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootState {
  Loading,
  Ready,
  /// Terminal: the playlist could not be loaded and nothing else will run.
  Failed(String),
}

/// A playback start queued by a synchronous action and run by the event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayRequest {
  pub id: String,
  pub src: String,
  pub start: Option<u64>,
}

pub struct App {
  pub mode: AppMode,
  pub theme_index: usize,
  pub index: VideoIndex,
  pub core: SyncCore,
  pub player: MediaPlayer,
  /// Cursor in the filtered list (independent of the active video).
  pub list_state: ListState,
  pub search: String,
  pub search_cursor: usize,
  pub search_scroll: usize,
  pub boot: BootState,
  pub last_error: Option<String>,
  pub should_quit: bool,
  config: Config,
  share_base_url: String,
  /// Video id requested via a share link on startup; consumed by `boot`.
  preselect: Option<String>,
  pending_play: Option<PlayRequest>,
  boot_rx: Option<oneshot::Receiver<BootResult>>,
  /// When the last error was set, used for auto-dismiss after 5 seconds.
  error_time: Option<Instant>,
}

impl App {
  pub fn new(core: SyncCore, config: Config, share_base_url: String, preselect: Option<String>) -> Self {
    Self {
      mode: AppMode::List,
      theme_index: theme::index_of(config.theme_name.as_deref()),
      index: VideoIndex::new(Vec::new().into()),
      core,
      player: MediaPlayer::new(),
      list_state: ListState::default(),
      search: String::new(),
      search_cursor: 0,
      search_scroll: 0,
      boot: BootState::Loading,
      last_error: None,
      should_quit: false,
      config,
      share_base_url,
      preselect,
      pending_play: None,
      boot_rx: None,
      error_time: None,
    }
  }

  pub fn theme(&self) -> &'static theme::Theme {
    &THEMES[self.theme_index % THEMES.len()]
  }

  pub fn next_theme(&mut self) {
    self.theme_index = (self.theme_index + 1) % THEMES.len();
    self.config.theme_name = Some(self.theme().name.to_string());
    self.config.save();
  }

  /// Set an error message with auto-dismiss tracking.
  pub fn set_error(&mut self, msg: String) {
    self.last_error = Some(msg);
    self.error_time = Some(Instant::now());
  }

  pub fn clear_error(&mut self) {
    self.last_error = None;
    self.error_time = None;
  }

  /// Clear stale error messages after 5 seconds.
  pub fn expire_error(&mut self) {
    if let Some(t) = self.error_time
      && t.elapsed() >= Duration::from_secs(5)
    {
      self.last_error = None;
      self.error_time = None;
    }
  }

  // --- Boot ---

  pub fn trigger_boot(&mut self, client: Client, playlist_url: String) {
    self.boot = BootState::Loading;
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let _ = tx.send(fetch_playlist(&client, &playlist_url).await);
    });
    self.boot_rx = Some(rx);
  }

  /// Install the playlist and pick the initial video: share link first,
  /// then the stored last id, then the first visible video.
  pub fn boot(&mut self, videos: Vec<Video>) {
    let videos: Arc<[Video]> = videos.into();
    self.index = VideoIndex::new(videos);
    self.index.apply_filter(&self.search);
    self.boot = BootState::Ready;

    let session = self.core.session();
    let from_link = self.preselect.take().filter(|id| self.index.contains(id));
    let from_session = session.last_id.clone().filter(|id| self.index.contains(id));
    let initial = from_link
      .or(from_session)
      .or_else(|| self.index.filtered_at(0).map(|v| v.id.clone()))
      .or_else(|| self.index.all().first().map(|v| v.id.clone()));

    info!(count = self.index.all().len(), initial = ?initial, "app: booted");
    if let Some(id) = initial {
      let resume = if session.last_id.as_deref() == Some(id.as_str()) { session.t } else { None };
      self.activate(&id, resume);
    }
    self.sync_cursor();
  }

  fn boot_failed(&mut self, err: &PlaylistError) {
    error!(err = %err, "app: playlist boot failed");
    self.boot = BootState::Failed(format!("{}: {}", constants().boot_failed_message, err));
  }

  // --- Actions ---

  /// Make `id` active and load it into the core. Unknown ids are ignored.
  fn activate(&mut self, id: &str, start: Option<u64>) {
    let Some(video) = self.index.set_active(id) else {
      warn!(id, "app: pick for unknown id ignored");
      return;
    };
    self.core.load_video(video);
    self.pending_play = Some(PlayRequest { id: video.id.clone(), src: video.src.clone(), start });
  }

  /// List pick (Enter/Space on an item).
  pub fn pick(&mut self, id: &str) {
    self.activate(id, None);
    self.sync_cursor();
  }

  pub fn pick_cursor(&mut self) {
    let Some(selected) = self.list_state.selected() else { return };
    let Some(id) = self.index.filtered_at(selected).map(|v| v.id.clone()) else { return };
    self.pick(&id);
  }

  pub fn prev(&mut self) {
    if let Some(id) = self.index.prev_target().map(|v| v.id.clone()) {
      self.pick(&id);
    }
  }

  pub fn next(&mut self) {
    if let Some(id) = self.index.next_target().map(|v| v.id.clone()) {
      self.pick(&id);
    }
  }

  pub fn shuffle(&mut self) {
    if let Some(id) = self.index.shuffle_target(&mut rand::rng()).map(|v| v.id.clone()) {
      self.pick(&id);
    }
  }

  /// Share link for the active video.
  pub fn share_link(&self) -> Option<String> {
    share::with_video(&self.share_base_url, self.index.active_id())
  }

  pub fn copy_link(&mut self) {
    let Some(link) = self.share_link() else {
      self.set_error(format!("Invalid share URL: {}", self.share_base_url));
      return;
    };
    match copy_to_clipboard(&link) {
      Ok(()) => {
        info!(link = %link, "app: link copied");
        self.core.set_status(constants().link_copied_message.clone());
      }
      Err(e) => self.set_error(format!("Copy failed: {:#}", e)),
    }
  }

  pub fn vote(&mut self, direction: VoteDirection) {
    match self.core.vote(direction) {
      Ok(()) => {}
      Err(VoteRejected::AlreadyVoted) => self.core.set_status("You already voted on this video."),
      Err(VoteRejected::NoCounterService) => self.core.set_status("Voting needs a counter service."),
      Err(VoteRejected::InFlight | VoteRejected::NoVideo) => {}
    }
  }

  /// Re-filter after the search text changed.
  pub fn recompute_filter(&mut self) {
    self.index.apply_filter(&self.search);
    self.sync_cursor();
  }

  /// Move the list cursor onto the active video (or clear it when nothing is visible).
  fn sync_cursor(&mut self) {
    if self.index.filtered_len() == 0 {
      self.list_state.select(None);
    } else {
      self.list_state.select(Some(self.index.active_index()));
    }
  }

  pub fn move_cursor(&mut self, down: bool) {
    let count = self.index.filtered_len();
    if count == 0 {
      return;
    }
    let i = match (self.list_state.selected(), down) {
      (None, _) => 0,
      (Some(i), true) => (i + 1) % count,
      (Some(i), false) => {
        if i == 0 {
          count - 1
        } else {
          i - 1
        }
      }
    };
    self.list_state.select(Some(i));
  }

  pub fn take_play_request(&mut self) -> Option<PlayRequest> {
    self.pending_play.take()
  }

  // --- Event loop hooks ---

  pub async fn check_pending(&mut self) {
    if let Some(mut rx) = self.boot_rx.take() {
      match rx.try_recv() {
        Ok(Ok(videos)) => self.boot(videos),
        Ok(Err(e)) => self.boot_failed(&e),
        Err(oneshot::error::TryRecvError::Empty) => {
          self.boot_rx = Some(rx);
        }
        Err(oneshot::error::TryRecvError::Closed) => {
          self.boot = BootState::Failed(format!("{}: loader task failed", constants().boot_failed_message));
        }
      }
    }

    self.core.poll();

    // Switch mpv before reading positions; stopping the old player drops its queued samples.
    if let Some(req) = self.take_play_request()
      && let Err(e) = self.player.play(&req.id, &req.src, req.start).await
    {
      self.set_error(format!("Playback error: {:#}", e));
      let _ = self.player.stop().await;
    }

    self.apply_positions();
    self.player.reap_exited();
    self.expire_error();
  }

  /// Feed playback positions to the core, but only while mpv is showing the
  /// video the core has loaded.
  fn apply_positions(&mut self) {
    let positions = self.player.drain_positions();
    if positions.is_empty() {
      return;
    }
    if self.player.now_playing.as_deref() != self.core.current_id() {
      debug!(
        playing = ?self.player.now_playing,
        loaded = ?self.core.current_id(),
        count = positions.len(),
        "app: positions for another video dropped"
      );
      return;
    }
    for pos in positions {
      self.core.on_position(pos);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::storage::{KeyValueStore, LocalStore, MemoryStore};
  use crate::sync::{SyncSettings, ViewCount};
  use crate::video::sample;

  fn build_app(medium: MemoryStore, preselect: Option<&str>, local_views: bool) -> App {
    let settings = SyncSettings { local_views, share_base_url: "https://site.example/".to_string() };
    let core = SyncCore::new(LocalStore::new(Box::new(medium)), None, settings);
    App::new(core, Config::default(), "https://site.example/".to_string(), preselect.map(str::to_string))
  }

  fn app_with(medium: MemoryStore, preselect: Option<&str>) -> App {
    build_app(medium, preselect, false)
  }

  fn playlist() -> Vec<Video> {
    vec![sample("a", "Desert Map"), sample("b", "Snow Level"), sample("c", "Night Run")]
  }

  fn stored_last(id: &str, t: Option<u64>) -> MemoryStore {
    let mut medium = MemoryStore::default();
    let session = match t {
      Some(t) => format!(r#"{{"lastId":"{}","t":{}}}"#, id, t),
      None => format!(r#"{{"lastId":"{}"}}"#, id),
    };
    medium.set("rsTube:v1", &session).unwrap();
    medium
  }

  #[test]
  fn link_takes_precedence_over_stored_state() {
    let mut app = app_with(stored_last("a", None), Some("b"));
    app.boot(playlist());
    assert_eq!(app.index.active_id(), Some("b"));
    assert_eq!(app.core.current_id(), Some("b"));
    assert_eq!(app.list_state.selected(), Some(1));
  }

  #[test]
  fn unknown_link_falls_back_to_stored_state() {
    let mut app = app_with(stored_last("c", None), Some("zzz"));
    app.boot(playlist());
    assert_eq!(app.index.active_id(), Some("c"));
  }

  #[test]
  fn stale_stored_id_falls_back_to_first() {
    let mut app = app_with(stored_last("gone", None), None);
    app.boot(playlist());
    assert_eq!(app.index.active_id(), Some("a"));
  }

  #[test]
  fn resumes_position_only_for_stored_video() {
    let mut app = app_with(stored_last("b", Some(35)), None);
    app.boot(playlist());
    let expected = PlayRequest { id: "b".into(), src: playlist()[1].src.clone(), start: Some(35) };
    assert_eq!(app.take_play_request(), Some(expected));

    let mut app = app_with(stored_last("b", Some(35)), Some("c"));
    app.boot(playlist());
    assert_eq!(app.take_play_request().and_then(|r| r.start), None);
  }

  #[test]
  fn empty_playlist_boots_without_video() {
    let mut app = app_with(MemoryStore::default(), None);
    app.boot(Vec::new());
    assert_eq!(app.boot, BootState::Ready);
    assert_eq!(app.core.current_id(), None);
    assert_eq!(app.list_state.selected(), None);
    app.next();
    app.shuffle();
    assert_eq!(app.take_play_request(), None);
  }

  #[test]
  fn prev_next_walk_the_filtered_list() {
    let mut app = app_with(MemoryStore::default(), None);
    app.boot(playlist());
    app.next();
    app.next();
    app.next();
    assert_eq!(app.core.current_id(), Some("c"));
    app.prev();
    assert_eq!(app.core.current_id(), Some("b"));
    assert_eq!(app.core.session().last_id.as_deref(), Some("b"));
  }

  #[test]
  fn positions_of_previous_video_are_not_applied_to_new_one() {
    let mut app = build_app(MemoryStore::default(), None, true);
    app.boot(playlist());
    app.take_play_request();
    let from_a = app.player.attach_positions("a");

    app.next();
    from_a.try_send(30.2).unwrap();
    app.apply_positions();
    assert_eq!(app.core.current_id(), Some("b"));
    assert_eq!(app.core.display().views, ViewCount::Local(0));
    assert_eq!(app.core.session().last_id.as_deref(), Some("b"));
    assert_eq!(app.core.session().t, None);

    let from_b = app.player.attach_positions("b");
    from_b.try_send(10.4).unwrap();
    app.apply_positions();
    assert_eq!(app.core.display().views, ViewCount::Local(1));
    assert_eq!(app.core.session().t, Some(10));
  }

  #[test]
  fn search_moves_active_without_loading() {
    let mut app = app_with(MemoryStore::default(), None);
    app.boot(playlist());
    app.take_play_request();
    app.search = "snow".to_string();
    app.recompute_filter();
    assert_eq!(app.index.active_id(), Some("b"));
    assert_eq!(app.core.current_id(), Some("a"));
    assert_eq!(app.take_play_request(), None);
    assert_eq!(app.list_state.selected(), Some(0));
  }

  #[test]
  fn pick_cursor_loads_selected_item() {
    let mut app = app_with(MemoryStore::default(), None);
    app.boot(playlist());
    app.move_cursor(true);
    app.move_cursor(true);
    app.pick_cursor();
    assert_eq!(app.core.current_id(), Some("c"));
    assert_eq!(app.core.display().share_link.as_deref(), Some("https://site.example/?v=c"));
  }

  #[test]
  fn cursor_wraps_both_ways() {
    let mut app = app_with(MemoryStore::default(), None);
    app.boot(playlist());
    app.move_cursor(false);
    assert_eq!(app.list_state.selected(), Some(2));
    app.move_cursor(true);
    assert_eq!(app.list_state.selected(), Some(0));
  }

  #[test]
  fn share_link_follows_active_id() {
    let mut app = app_with(MemoryStore::default(), None);
    app.boot(playlist());
    app.pick("b");
    assert_eq!(app.share_link().as_deref(), Some("https://site.example/?v=b"));
  }

  #[test]
  fn vote_without_service_sets_status() {
    let mut app = app_with(MemoryStore::default(), None);
    app.boot(playlist());
    app.vote(VoteDirection::Up);
    assert_eq!(app.core.display().status.as_deref(), Some("Voting needs a counter service."));
  }

  #[test]
  fn boot_failure_is_terminal_status() {
    let mut app = app_with(MemoryStore::default(), None);
    app.boot_failed(&PlaylistError::Format("playlist must be an array".to_string()));
    match &app.boot {
      BootState::Failed(msg) => assert!(msg.starts_with("Failed to load playlist")),
      other => panic!("unexpected boot state: {other:?}"),
    }
  }
}
