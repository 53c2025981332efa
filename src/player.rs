use anyhow::{Context, Result, anyhow};
use std::process::Stdio;
use std::time::Duration;
use tokio::{
  io::BufReader as TokioBufReader,
  io::{AsyncBufReadExt, AsyncWriteExt},
  process::{Child as TokioChild, Command},
  sync::mpsc,
  task::JoinHandle,
};
use tracing::{debug, info, warn};

/// Plays video sources in an external `mpv` window and streams the playback
/// position back over mpv's JSON IPC socket.
pub struct MediaPlayer {
  pub(crate) current_process: Option<TokioChild>,
  monitor_handle: Option<JoinHandle<()>>,
  position_rx: Option<mpsc::Receiver<f64>>,
  ipc_socket_path: Option<String>,
  /// Id of the video handed to mpv, if any.
  pub now_playing: Option<String>,
  /// Last reported position in seconds.
  pub position: Option<f64>,
  pub paused: bool,
}

impl MediaPlayer {
  pub fn new() -> Self {
    Self {
      current_process: None,
      monitor_handle: None,
      position_rx: None,
      ipc_socket_path: None,
      now_playing: None,
      position: None,
      paused: false,
    }
  }

  pub fn is_playing(&self) -> bool {
    self.current_process.is_some()
  }

  /// Start playing `src`, optionally from `start` seconds. Any previous
  /// playback is stopped first.
  pub async fn play(&mut self, id: &str, src: &str, start: Option<u64>) -> Result<()> {
    self.stop().await.context("Failed to stop previous playback")?;

    let socket_path = std::env::temp_dir().join(format!("rstube-mpv-{}.sock", std::process::id()));
    let socket_path_str = socket_path.to_str().context("Temp dir path is not valid UTF-8")?.to_string();
    // Remove stale socket if it exists from a previous crash.
    let _ = std::fs::remove_file(&socket_path);

    let mut cmd = Command::new("mpv");
    cmd.args(["--force-window=immediate", "--really-quiet", &format!("--input-ipc-server={}", socket_path_str)]);
    if let Some(start) = start.filter(|s| *s > 0) {
      cmd.arg(format!("--start={}", start));
    }
    cmd.arg("--").arg(src);
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::null());
    cmd.stderr(Stdio::null());

    let child = cmd.spawn().map_err(|e| {
      if e.kind() == std::io::ErrorKind::NotFound {
        anyhow!("mpv not found. Install it with: brew install mpv (macOS) or apt install mpv (Linux)")
      } else {
        anyhow!(e).context("Failed to spawn mpv process")
      }
    })?;

    let (tx, rx) = mpsc::channel::<f64>(64);
    let monitor_socket = socket_path_str.clone();
    let monitor_handle = tokio::spawn(async move {
      if let Err(e) = observe_position(&monitor_socket, tx).await {
        warn!(err = %e, "player: position monitor stopped");
      }
    });

    info!(id, start = ?start, "player: started mpv");
    self.current_process = Some(child);
    self.monitor_handle = Some(monitor_handle);
    self.position_rx = Some(rx);
    self.ipc_socket_path = Some(socket_path_str);
    self.now_playing = Some(id.to_string());
    self.paused = false;
    Ok(())
  }

  /// Pretend `id` is playing and hand back the sender for its position feed.
  #[cfg(test)]
  pub(crate) fn attach_positions(&mut self, id: &str) -> mpsc::Sender<f64> {
    let (tx, rx) = mpsc::channel(64);
    self.position_rx = Some(rx);
    self.now_playing = Some(id.to_string());
    tx
  }

  /// Take every position update received since the last call.
  pub fn drain_positions(&mut self) -> Vec<f64> {
    let mut out = Vec::new();
    if let Some(rx) = &mut self.position_rx {
      while let Ok(pos) = rx.try_recv() {
        out.push(pos);
      }
    }
    if let Some(&last) = out.last() {
      self.position = Some(last);
    }
    out
  }

  /// Returns `true` once if mpv exited on its own (window closed, end of file).
  pub fn reap_exited(&mut self) -> bool {
    let exited = match self.current_process.as_mut().map(|c| c.try_wait()) {
      Some(Ok(Some(status))) => {
        debug!(status = %status, "player: mpv exited");
        true
      }
      Some(Err(e)) => {
        warn!(err = %e, "player: failed to poll mpv");
        true
      }
      _ => false,
    };
    if exited {
      self.current_process = None;
      if let Some(handle) = self.monitor_handle.take() {
        handle.abort();
      }
      if let Some(path) = self.ipc_socket_path.take() {
        let _ = std::fs::remove_file(&path);
      }
      self.paused = false;
    }
    exited
  }

  pub async fn toggle_pause(&mut self) -> Result<()> {
    let Some(ref socket_path) = self.ipc_socket_path else {
      return Ok(());
    };
    let mut stream =
      tokio::net::UnixStream::connect(socket_path).await.context("Failed to connect to mpv IPC socket")?;
    stream.write_all(b"{\"command\":[\"cycle\",\"pause\"]}\n").await.context("Failed to send pause command to mpv")?;
    self.paused = !self.paused;
    Ok(())
  }

  pub async fn stop(&mut self) -> Result<()> {
    if let Some(handle) = self.monitor_handle.take() {
      handle.abort();
      let _ = handle.await;
    }
    self.position_rx = None;
    self.position = None;

    if let Some(mut child) = self.current_process.take() {
      child.kill().await.context("Failed to kill mpv process")?;
      let _ = child.wait().await;
    }

    self.now_playing = None;
    self.paused = false;

    if let Some(path) = self.ipc_socket_path.take() {
      let _ = std::fs::remove_file(&path);
    }
    Ok(())
  }
}

/// Connect to mpv's IPC socket (retrying while mpv starts up), subscribe to
/// `time-pos`, and forward each change until the socket closes.
async fn observe_position(socket_path: &str, tx: mpsc::Sender<f64>) -> Result<()> {
  let mut stream = None;
  for attempt in 0..20 {
    tokio::time::sleep(Duration::from_millis(if attempt == 0 { 200 } else { 500 })).await;
    match tokio::net::UnixStream::connect(socket_path).await {
      Ok(s) => {
        stream = Some(s);
        break;
      }
      Err(e) => debug!(attempt, err = %e, "player: mpv IPC connect failed, retrying"),
    }
  }
  let mut stream = stream.context("mpv IPC socket never became available")?;

  stream
    .write_all(b"{\"command\":[\"observe_property\",1,\"time-pos\"]}\n")
    .await
    .context("Failed to subscribe to time-pos")?;

  let mut lines = TokioBufReader::new(stream).lines();
  while let Some(line) = lines.next_line().await.context("Failed to read from mpv IPC socket")? {
    if let Some(pos) = parse_time_pos(&line)
      && tx.send(pos).await.is_err()
    {
      break;
    }
  }
  Ok(())
}

/// Extract the position from an mpv `property-change` event for `time-pos`.
/// e.g. `{"event":"property-change","id":1,"name":"time-pos","data":5.04}`
pub fn parse_time_pos(line: &str) -> Option<f64> {
  let val: serde_json::Value = serde_json::from_str(line).ok()?;
  if val.get("event").and_then(|v| v.as_str()) != Some("property-change")
    || val.get("name").and_then(|v| v.as_str()) != Some("time-pos")
  {
    return None;
  }
  val.get("data").and_then(|v| v.as_f64())
}
