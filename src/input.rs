use anyhow::{Context, Result};
use ratatui::crossterm::event::{self, KeyCode, KeyModifiers};

use crate::app::{App, AppMode, BootState};
use crate::video::VoteDirection;

// --- Helpers ---

/// Convert a char index to a byte offset within the string.
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
  s.char_indices().nth(char_idx).map_or(s.len(), |(i, _)| i)
}

// --- Event Handling ---

pub async fn handle_key_event(app: &mut App, key: event::KeyEvent) -> Result<()> {
  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
    app.should_quit = true;
    return Ok(());
  }

  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('t') {
    app.next_theme();
    return Ok(());
  }

  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('s') {
    if app.player.is_playing() {
      app.player.stop().await.context("Failed to stop playback")?;
    }
    return Ok(());
  }

  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('p') {
    if app.player.is_playing()
      && let Err(e) = app.player.toggle_pause().await
    {
      app.set_error(format!("Pause error: {}", e));
    }
    return Ok(());
  }

  // Nothing but quitting once boot has failed or while it is running.
  if app.boot != BootState::Ready {
    if matches!(key.code, KeyCode::Esc | KeyCode::Char('q')) {
      app.should_quit = true;
    }
    return Ok(());
  }

  match app.mode {
    AppMode::List => handle_list_key(app, key),
    AppMode::Search => handle_search_key(app, key),
  }
  Ok(())
}

fn handle_list_key(app: &mut App, key: event::KeyEvent) {
  app.clear_error();
  app.core.clear_status();
  match key.code {
    KeyCode::Enter | KeyCode::Char(' ') => app.pick_cursor(),
    KeyCode::Down | KeyCode::Char('j') => app.move_cursor(true),
    KeyCode::Up | KeyCode::Char('k') => app.move_cursor(false),
    KeyCode::Char('n') | KeyCode::Right => app.next(),
    KeyCode::Char('p') | KeyCode::Left => app.prev(),
    KeyCode::Char('r') => app.shuffle(),
    KeyCode::Char('c') => app.copy_link(),
    KeyCode::Char('+') | KeyCode::Char('u') => app.vote(VoteDirection::Up),
    KeyCode::Char('-') | KeyCode::Char('d') => app.vote(VoteDirection::Down),
    KeyCode::Char('/') => app.mode = AppMode::Search,
    KeyCode::Esc | KeyCode::Char('q') => app.should_quit = true,
    _ => {}
  }
}

fn handle_search_key(app: &mut App, key: event::KeyEvent) {
  match key.code {
    KeyCode::Char(c) => {
      let byte_idx = char_to_byte_index(&app.search, app.search_cursor);
      app.search.insert(byte_idx, c);
      app.search_cursor += 1;
      app.recompute_filter();
    }
    KeyCode::Backspace => {
      if app.search_cursor > 0 {
        app.search_cursor -= 1;
        let byte_idx = char_to_byte_index(&app.search, app.search_cursor);
        app.search.remove(byte_idx);
        app.recompute_filter();
      }
    }
    KeyCode::Delete => {
      if app.search_cursor < app.search.chars().count() {
        let byte_idx = char_to_byte_index(&app.search, app.search_cursor);
        app.search.remove(byte_idx);
        app.recompute_filter();
      }
    }
    KeyCode::Left => {
      app.search_cursor = app.search_cursor.saturating_sub(1);
    }
    KeyCode::Right => {
      if app.search_cursor < app.search.chars().count() {
        app.search_cursor += 1;
      }
    }
    KeyCode::Home => {
      app.search_cursor = 0;
    }
    KeyCode::End => {
      app.search_cursor = app.search.chars().count();
    }
    KeyCode::Down => app.move_cursor(true),
    KeyCode::Up => app.move_cursor(false),
    KeyCode::Enter => {
      // Keep the filter and go back to the list
      app.mode = AppMode::List;
    }
    KeyCode::Esc => {
      app.search.clear();
      app.search_cursor = 0;
      app.search_scroll = 0;
      app.recompute_filter();
      app.mode = AppMode::List;
    }
    _ => {}
  }
}
