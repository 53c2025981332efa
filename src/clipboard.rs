use anyhow::{Context, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use std::io::Write;

/// OSC 52 "set clipboard" sequence for `text`. Most modern terminals (and
/// tmux with `set-clipboard on`) forward this to the system clipboard.
pub fn osc52_sequence(text: &str) -> String {
  format!("\x1B]52;c;{}\x07", BASE64.encode(text.as_bytes()))
}

pub fn copy_to_clipboard(text: &str) -> Result<()> {
  let mut stdout = std::io::stdout();
  stdout.write_all(osc52_sequence(text).as_bytes()).context("Failed to write clipboard escape")?;
  stdout.flush().context("Failed to flush clipboard escape")?;
  Ok(())
}
