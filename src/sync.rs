//! Player/sync core.
//!
//! Owns the single "currently loaded video" and reconciles what is shown for
//! it from three sources: the video's static fields, the remote counter
//! service, and the local store (vote locks, fallback view counts).
//!
//! Each `load_video` starts a new load cycle with a fresh generation number.
//! Remote requests run on spawned tasks and report back as [`SyncEvent`]s
//! tagged with the generation they were issued for; [`SyncCore::apply`]
//! discards anything whose generation is no longer current. In-flight
//! requests are never cancelled, only ignored.
//!
//! The core never touches the terminal. It exposes a [`DisplayState`] value
//! that the UI renders.

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::constants::constants;
use crate::counter::{CounterService, RemoteUnavailable, VoteTotals};
use crate::share;
use crate::storage::{LocalStore, SessionState};
use crate::video::{CounterSnapshot, Video, VoteDirection};

pub type Generation = u64;

/// View count as displayed. A number is always tagged with where it came
/// from so remote and local counts are never blended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewCount {
  /// Waiting on the counter service (or it failed with no local fallback).
  #[default]
  Pending,
  Remote(u64),
  Local(u64),
  /// No counter service and no local counting: show no number at all.
  Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPhase {
  #[default]
  Idle,
  StatsPending,
  Synced,
  Degraded,
  /// No counter service configured.
  Offline,
}

/// Everything the UI needs to draw the now-playing panel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayState {
  pub video_id: Option<String>,
  pub title: String,
  pub description: String,
  pub tags: Vec<String>,
  pub year: Option<i32>,
  pub map: Option<String>,
  pub category: Option<String>,
  pub src: Option<String>,
  pub views: ViewCount,
  pub votes: Option<VoteTotals>,
  /// Vote already cast for this video on this device.
  pub voted: Option<VoteDirection>,
  pub votes_enabled: bool,
  /// Share link carrying the loaded id as `?v=`.
  pub share_link: Option<String>,
  pub status: Option<String>,
  pub phase: SyncPhase,
}

impl DisplayState {
  /// "Title | 12 views", "Title | loading…", or just "Title".
  pub fn title_line(&self) -> String {
    match self.views {
      ViewCount::Pending => format!("{} | {}", self.title, constants().loading_placeholder),
      ViewCount::Remote(n) | ViewCount::Local(n) => format!("{} | {} views", self.title, n),
      ViewCount::Unavailable => self.title.clone(),
    }
  }
}

#[derive(Debug)]
pub enum SyncOutcome {
  Stats(Result<CounterSnapshot, RemoteUnavailable>),
  View(Result<Option<u64>, RemoteUnavailable>),
  Vote(VoteDirection, Result<VoteTotals, RemoteUnavailable>),
}

/// Completion of a remote request, tagged with the cycle that issued it.
#[derive(Debug)]
pub struct SyncEvent {
  pub generation: Generation,
  pub video_id: String,
  pub outcome: SyncOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteRejected {
  NoVideo,
  NoCounterService,
  AlreadyVoted,
  InFlight,
}

#[derive(Debug, Clone)]
pub struct SyncSettings {
  /// Keep and display a local per-device view count.
  pub local_views: bool,
  pub share_base_url: String,
}

pub struct SyncCore {
  store: LocalStore,
  remote: Option<Arc<dyn CounterService>>,
  settings: SyncSettings,
  generation: Generation,
  current_id: Option<String>,
  view_counted: bool,
  /// A view or vote response already updated this cycle's counters; later
  /// stats for the same cycle are older and must not overwrite them.
  views_confirmed: bool,
  votes_confirmed: bool,
  /// Ids with a vote request outstanding. Keyed by id, not cycle, so leaving
  /// and coming back cannot send a second vote.
  votes_in_flight: HashSet<String>,
  display: DisplayState,
  events_tx: mpsc::UnboundedSender<SyncEvent>,
  events_rx: mpsc::UnboundedReceiver<SyncEvent>,
}

impl SyncCore {
  pub fn new(store: LocalStore, remote: Option<Arc<dyn CounterService>>, settings: SyncSettings) -> Self {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    Self {
      store,
      remote,
      settings,
      generation: 0,
      current_id: None,
      view_counted: false,
      views_confirmed: false,
      votes_confirmed: false,
      votes_in_flight: HashSet::new(),
      display: DisplayState::default(),
      events_tx,
      events_rx,
    }
  }

  pub fn display(&self) -> &DisplayState {
    &self.display
  }

  pub fn current_id(&self) -> Option<&str> {
    self.current_id.as_deref()
  }

  pub fn has_remote(&self) -> bool {
    self.remote.is_some()
  }

  pub fn session(&self) -> SessionState {
    self.store.load_session()
  }

  pub fn set_status(&mut self, msg: impl Into<String>) {
    self.display.status = Some(msg.into());
  }

  pub fn clear_status(&mut self) {
    self.display.status = None;
  }

  /// Start a new load cycle for `video`. All local updates happen before
  /// the stats request is issued.
  pub fn load_video(&mut self, video: &Video) -> Generation {
    self.generation += 1;
    self.view_counted = false;
    self.views_confirmed = false;
    self.votes_confirmed = false;
    self.current_id = Some(video.id.clone());

    let voted = self.store.vote_lock(&video.id);
    let (views, phase) = match (&self.remote, self.settings.local_views) {
      (Some(_), _) => (ViewCount::Pending, SyncPhase::StatsPending),
      (None, true) => (ViewCount::Local(self.store.fallback_views(&video.id).unwrap_or(0)), SyncPhase::Offline),
      (None, false) => (ViewCount::Unavailable, SyncPhase::Offline),
    };

    self.display = DisplayState {
      video_id: Some(video.id.clone()),
      title: video.title.clone(),
      description: video.description.clone(),
      tags: video.tags.clone(),
      year: video.year,
      map: video.map.clone().filter(|m| !m.is_empty()),
      category: video.category.clone().filter(|c| !c.is_empty()),
      src: Some(video.src.clone()),
      views,
      votes: None,
      voted,
      votes_enabled: self.remote.is_some() && voted.is_none(),
      share_link: share::with_video(&self.settings.share_base_url, Some(&video.id)),
      status: self.display.status.take(),
      phase,
    };
    self.store.remember_last_id(&video.id);
    info!(id = %video.id, generation = self.generation, "sync: video loaded");

    if let Some(remote) = self.remote.clone() {
      let tx = self.events_tx.clone();
      let generation = self.generation;
      let id = video.id.clone();
      tokio::spawn(async move {
        let outcome = SyncOutcome::Stats(remote.get_stats(&id).await);
        let _ = tx.send(SyncEvent { generation, video_id: id, outcome });
      });
    }
    self.generation
  }

  /// Handle a playback-position update (seconds into the current video).
  pub fn on_position(&mut self, secs: f64) {
    if self.current_id.is_none() || !secs.is_finite() || secs < 0.0 {
      return;
    }
    let c = constants();

    if !self.view_counted && secs >= c.view_threshold_secs {
      self.view_counted = true;
      self.count_view();
    }

    let whole = secs.floor() as u64;
    if c.position_snapshot_secs > 0 && whole % c.position_snapshot_secs == 0 {
      self.store.remember_position(whole);
    }
  }

  fn count_view(&mut self) {
    let Some(id) = self.current_id.clone() else { return };
    debug!(id = %id, generation = self.generation, "sync: view threshold reached");

    if self.settings.local_views {
      let n = self.store.increment_fallback_views(&id);
      let degraded_placeholder =
        self.display.phase == SyncPhase::Degraded && self.display.views == ViewCount::Pending;
      if matches!(self.display.views, ViewCount::Local(_)) || degraded_placeholder {
        self.display.views = ViewCount::Local(n);
      }
    }

    if let Some(remote) = self.remote.clone() {
      let tx = self.events_tx.clone();
      let generation = self.generation;
      tokio::spawn(async move {
        let outcome = SyncOutcome::View(remote.record_view(&id).await);
        let _ = tx.send(SyncEvent { generation, video_id: id, outcome });
      });
    }
  }

  /// Cast a vote for the loaded video. At most one vote per video per device
  /// ever succeeds; the lock is written only once the service confirms.
  pub fn vote(&mut self, direction: VoteDirection) -> Result<(), VoteRejected> {
    let id = self.current_id.clone().ok_or(VoteRejected::NoVideo)?;
    let remote = self.remote.clone().ok_or(VoteRejected::NoCounterService)?;
    if let Some(existing) = self.store.vote_lock(&id) {
      self.display.voted = Some(existing);
      self.display.votes_enabled = false;
      return Err(VoteRejected::AlreadyVoted);
    }
    if self.votes_in_flight.contains(&id) {
      return Err(VoteRejected::InFlight);
    }
    self.votes_in_flight.insert(id.clone());
    info!(id = %id, vote = direction.as_str(), "sync: sending vote");

    let tx = self.events_tx.clone();
    let generation = self.generation;
    tokio::spawn(async move {
      let outcome = SyncOutcome::Vote(direction, remote.vote(&id, direction).await);
      let _ = tx.send(SyncEvent { generation, video_id: id, outcome });
    });
    Ok(())
  }

  /// Apply every completed remote request without blocking.
  pub fn poll(&mut self) -> usize {
    let mut applied = 0;
    while let Ok(event) = self.events_rx.try_recv() {
      self.apply(event);
      applied += 1;
    }
    applied
  }

  pub fn apply(&mut self, event: SyncEvent) {
    let current = event.generation == self.generation;
    let SyncEvent { video_id, outcome, .. } = event;

    match outcome {
      SyncOutcome::Vote(direction, Ok(totals)) => {
        self.votes_in_flight.remove(&video_id);
        // Confirmed by the service, so the lock holds even if the user moved on.
        self.store.lock_vote(&video_id, direction);
        if self.current_id.as_deref() == Some(video_id.as_str()) {
          self.display.voted = Some(direction);
          self.display.votes_enabled = false;
        }
        if !current {
          debug!(id = %video_id, "sync: stale vote result, lock written, totals dropped");
          return;
        }
        self.votes_confirmed = true;
        self.display.votes = Some(totals);
      }
      SyncOutcome::Vote(_, Err(e)) => {
        warn!(id = %video_id, err = %e, "sync: vote failed, not locking");
        self.votes_in_flight.remove(&video_id);
      }
      _ if !current => {
        debug!(id = %video_id, current = ?self.current_id, "sync: stale response discarded");
      }
      SyncOutcome::Stats(Ok(stats)) => {
        if self.views_confirmed {
          debug!(id = %video_id, "sync: stats views older than recorded view, kept newer");
        } else {
          self.display.views = ViewCount::Remote(stats.views);
        }
        if !self.votes_confirmed {
          self.display.votes = Some(VoteTotals { likes: stats.likes, dislikes: stats.dislikes });
        }
        self.display.phase = SyncPhase::Synced;
      }
      SyncOutcome::Stats(Err(e)) => {
        warn!(id = %video_id, err = %e, "sync: stats unavailable");
        self.display.phase = SyncPhase::Degraded;
        if self.settings.local_views
          && let Some(n) = self.store.fallback_views(&video_id)
        {
          self.display.views = ViewCount::Local(n);
        }
      }
      SyncOutcome::View(Ok(Some(views))) => {
        self.views_confirmed = true;
        self.display.views = ViewCount::Remote(views);
      }
      SyncOutcome::View(Ok(None)) => {}
      SyncOutcome::View(Err(e)) => {
        warn!(id = %video_id, err = %e, "sync: view not recorded");
      }
    }
  }

  /// Wait for `n` events and apply them in arrival order.
  #[cfg(test)]
  async fn settle(&mut self, n: usize) {
    for _ in 0..n {
      let event = self.events_rx.recv().await.expect("sync channel closed");
      self.apply(event);
    }
  }
}
