mod app;
mod clipboard;
mod config;
mod constants;
mod counter;
mod filter;
mod input;
mod player;
mod playlist;
mod share;
mod storage;
mod sync;
mod theme;
mod ui;
mod video;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use directories::ProjectDirs;
use ratatui::{
  DefaultTerminal,
  crossterm::event::{self, Event, KeyEventKind},
};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use app::App;
use config::Config;
use constants::constants;
use counter::{CounterService, HttpCounterClient};
use storage::{FileStore, LocalStore};
use sync::{SyncCore, SyncSettings};

// --- CLI ---

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Args {
  /// Playlist manifest URL (JSON array of videos)
  #[arg(long)]
  playlist_url: Option<String>,

  /// Counter service base URL for global views and votes
  #[arg(long, conflicts_with = "no_counter")]
  counter_url: Option<String>,

  /// Ignore any configured counter service
  #[arg(long)]
  no_counter: bool,

  /// Count views on this device and show them when global counts are unavailable
  #[arg(long)]
  local_views: bool,

  /// Share link to open; its `v` parameter selects the initial video
  #[arg(long, conflicts_with = "video")]
  open: Option<String>,

  /// Id of the video to select on startup
  #[arg(long)]
  video: Option<String>,

  /// Print shell completions and exit
  #[arg(long, value_name = "SHELL")]
  completions: Option<Shell>,
}

/// Effective settings after merging CLI flags over the config file.
#[derive(Debug, Clone, PartialEq)]
struct Settings {
  playlist_url: String,
  counter_url: Option<String>,
  share_base_url: String,
  local_views: bool,
  preselect: Option<String>,
}

fn resolve_settings(args: &Args, config: &Config) -> Settings {
  let c = constants();
  let counter_url = if args.no_counter {
    None
  } else {
    args.counter_url.clone().or_else(|| config.counter_url.clone()).filter(|u| !u.trim().is_empty())
  };
  let preselect = args.video.clone().or_else(|| args.open.as_deref().and_then(share::video_from_link));
  Settings {
    playlist_url: args
      .playlist_url
      .clone()
      .or_else(|| config.playlist_url.clone())
      .unwrap_or_else(|| c.default_playlist_url.clone()),
    counter_url,
    share_base_url: config.share_base_url.clone().unwrap_or_else(|| c.default_share_base_url.clone()),
    local_views: args.local_views || config.local_views,
    preselect,
  }
}

// --- Logging ---

/// Log to a daily file; the terminal belongs to the UI.
fn init_logging() -> Option<WorkerGuard> {
  let dirs = ProjectDirs::from("", "", "rstube")?;
  let log_dir = dirs.data_dir().join("logs");
  std::fs::create_dir_all(&log_dir).ok()?;
  let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(log_dir, "rstube.log"));
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rstube=info"));
  tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer).with_ansi(false).init();
  Some(guard)
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  if let Some(shell) = args.completions {
    clap_complete::generate(shell, &mut Args::command(), "rstube", &mut std::io::stdout());
    return Ok(());
  }

  let _log_guard = init_logging();
  let config = Config::load();
  let settings = resolve_settings(&args, &config);
  info!(settings = ?settings, "starting");

  let client = Client::builder()
    .user_agent(concat!("rstube/", env!("CARGO_PKG_VERSION")))
    .build()
    .context("Failed to build HTTP client")?;

  // The counter capability is decided once, here.
  let remote: Option<Arc<dyn CounterService>> = match settings.counter_url.as_deref() {
    Some(url) => match HttpCounterClient::new(client.clone(), url) {
      Ok(c) => Some(Arc::new(c)),
      Err(e) => {
        warn!(url, err = %e, "counter: invalid url, running without global counters");
        None
      }
    },
    None => None,
  };

  let store = match FileStore::default_path() {
    Some(path) => LocalStore::new(Box::new(FileStore::open(path))),
    None => {
      warn!("storage: no data directory, state will not persist");
      LocalStore::in_memory()
    }
  };

  let core = SyncCore::new(
    store,
    remote,
    SyncSettings { local_views: settings.local_views, share_base_url: settings.share_base_url.clone() },
  );
  let mut app = App::new(core, config, settings.share_base_url.clone(), settings.preselect.clone());
  app.trigger_boot(client, settings.playlist_url.clone());

  let default_hook = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |info| {
    ratatui::restore();
    default_hook(info);
  }));

  let mut terminal = ratatui::init();
  let result = run(&mut terminal, &mut app).await;
  ratatui::restore();
  let _ = app.player.stop().await;
  result
}

async fn run(terminal: &mut DefaultTerminal, app: &mut App) -> Result<()> {
  loop {
    app.check_pending().await;

    terminal.draw(|frame| ui::ui(frame, app))?;

    if event::poll(Duration::from_millis(100))? {
      match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => {
          input::handle_key_event(app, key).await?;
        }
        _ => {}
      }
    }

    if app.should_quit {
      break;
    }
  }
  Ok(())
}
