use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Layout, Rect},
  style::{Modifier, Style, Stylize},
  text::{Line, Span},
  widgets::{Block, List, ListItem, Padding, Paragraph, Wrap},
};

use crate::app::{App, AppMode, BootState};
use crate::sync::{DisplayState, SyncPhase};
use crate::theme::Theme;

// --- Helpers ---

/// Compute the display width of the first `n` chars (accounting for double-width CJK).
pub fn display_width(s: &str, n: usize) -> usize {
  use unicode_width::UnicodeWidthChar;
  s.chars().take(n).map(|c| c.width().unwrap_or(0)).sum()
}

/// Truncate a string to `max_width` characters, appending "…" if truncated.
fn truncate_str(s: &str, max_width: usize) -> String {
  if s.chars().count() <= max_width {
    s.to_string()
  } else {
    let truncated: String = s.chars().take(max_width.saturating_sub(1)).collect();
    format!("{}…", truncated)
  }
}

/// Where the displayed counters come from, for the now-playing panel.
fn counters_label(phase: SyncPhase) -> Option<&'static str> {
  match phase {
    SyncPhase::Idle => None,
    SyncPhase::StatsPending => Some("syncing…"),
    SyncPhase::Synced => Some("global"),
    SyncPhase::Degraded => Some("service unavailable"),
    SyncPhase::Offline => Some("this device only"),
  }
}

fn block<'a>(title: Line<'a>, theme: &Theme, focused: bool) -> Block<'a> {
  Block::bordered()
    .title(title)
    .border_type(ratatui::widgets::BorderType::Rounded)
    .border_style(Style::default().fg(if focused { theme.accent } else { theme.border }))
}

// --- UI Rendering ---

pub fn ui(frame: &mut Frame, app: &mut App) {
  let theme = app.theme();
  frame.render_widget(Block::default().style(Style::default().bg(theme.bg)), frame.area());

  let [header_area, main_area, status_area, input_area, footer_area] = Layout::vertical([
    Constraint::Length(1),
    Constraint::Min(5),
    Constraint::Length(1),
    Constraint::Length(3),
    Constraint::Length(1),
  ])
  .areas(frame.area());

  render_header(frame, app, header_area);
  if app.boot == BootState::Ready {
    let [list_area, player_area] =
      Layout::horizontal([Constraint::Percentage(45), Constraint::Percentage(55)]).areas(main_area);
    render_list(frame, app, list_area);
    render_now_playing(frame, theme, app.core.display(), player_area);
  } else if let BootState::Failed(msg) = &app.boot {
    render_message(frame, theme, msg, theme.error, main_area);
  } else {
    render_message(frame, theme, "Loading playlist…", theme.muted, main_area);
  }
  render_status(frame, app, status_area);
  render_search(frame, app, input_area);
  render_footer(frame, app, footer_area);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let left = Line::from(Span::styled(" ▶ rstube ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)));
  frame.render_widget(left, area);

  let right_text = match app.core.has_remote() {
    true => format!("global counters · v{} ", env!("CARGO_PKG_VERSION")),
    false => format!("offline · v{} ", env!("CARGO_PKG_VERSION")),
  };
  let width = right_text.chars().count() as u16;
  let right = Line::from(Span::styled(right_text, Style::default().fg(theme.muted)));
  let right_area = Rect { x: area.x + area.width.saturating_sub(width), width: width.min(area.width), ..area };
  frame.render_widget(right, right_area);
}

fn render_message(frame: &mut Frame, theme: &Theme, msg: &str, color: ratatui::style::Color, area: Rect) {
  let text = vec![Line::from(""), Line::from(Span::styled(msg.to_string(), Style::default().fg(color)))];
  let paragraph = Paragraph::new(text)
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .block(block(Line::from(""), theme, false));
  frame.render_widget(paragraph, area);
}

/// The playlist: one two-line item per filtered video, active one marked.
fn render_list(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let active_id = app.index.active_id().map(str::to_string);
  let selected = app.list_state.selected();
  // Inner width: area minus 2 borders minus 2 chars for highlight symbol ("▶ ")
  let inner_w = area.width.saturating_sub(4) as usize;

  let items: Vec<ListItem> = app
    .index
    .filtered()
    .enumerate()
    .map(|(i, video)| {
      let is_active = active_id.as_deref() == Some(video.id.as_str());
      let is_selected = Some(i) == selected;
      let fg = if is_selected { theme.highlight_fg } else { theme.fg };
      let bg = if is_selected {
        theme.highlight_bg
      } else if i % 2 == 1 {
        theme.stripe_bg
      } else {
        theme.bg
      };

      let marker = if is_active { "● " } else { "  " };
      let mut title_style = Style::default().fg(fg);
      if is_active {
        title_style = title_style.add_modifier(Modifier::BOLD);
      }
      let title = Line::from(vec![
        Span::styled(marker, Style::default().fg(if is_selected { fg } else { theme.accent })),
        Span::styled(truncate_str(&video.title, inner_w.saturating_sub(2)), title_style),
      ]);
      let meta = Line::from(Span::styled(
        format!("  {}", truncate_str(&video.meta_line(), inner_w.saturating_sub(2))),
        Style::default().fg(if is_selected { fg } else { theme.muted }),
      ));
      ListItem::new(vec![title, meta]).bg(bg)
    })
    .collect();

  let count = app.index.filtered_len();
  let title = Line::from(vec![
    Span::styled(" Playlist ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)),
    Span::styled(format!("{} videos ", count), Style::default().fg(theme.muted)),
  ]);

  let list = List::new(items)
    .block(block(title, theme, app.mode == AppMode::List))
    .highlight_symbol("▶ ")
    .highlight_style(Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD));

  frame.render_stateful_widget(list, area, &mut app.list_state);
}

/// Applies a `DisplayState` to the now-playing panel.
fn render_now_playing(frame: &mut Frame, theme: &Theme, display: &DisplayState, area: Rect) {
  let info_title =
    Line::from(Span::styled(" Now Playing ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)));
  let info_block = block(info_title, theme, false).padding(Padding::horizontal(1));

  if display.video_id.is_none() {
    frame.render_widget(info_block, area);
    return;
  }
  let inner_w = area.width.saturating_sub(4) as usize;
  let label = |s: &'static str| Span::styled(s, Style::default().fg(theme.muted));

  let mut lines = vec![
    Line::from(""),
    Line::from(Span::styled(
      truncate_str(&display.title_line(), inner_w),
      Style::default().fg(theme.fg).add_modifier(Modifier::BOLD),
    )),
    Line::from(""),
  ];

  let votes = match display.votes {
    Some(v) => format!("👍 {} | 👎 {}", v.likes, v.dislikes),
    None => "–".to_string(),
  };
  let vote_hint = match (display.voted, display.votes_enabled) {
    (Some(dir), _) => format!("  (voted {})", dir.as_str()),
    (None, true) => "  (u/d to vote)".to_string(),
    (None, false) => String::new(),
  };
  lines.push(Line::from(vec![
    label("Votes     "),
    Span::styled(votes, Style::default().fg(theme.fg)),
    Span::styled(vote_hint, Style::default().fg(theme.muted)),
  ]));

  if let Some(source) = counters_label(display.phase) {
    let color = if display.phase == SyncPhase::Degraded { theme.error } else { theme.muted };
    lines.push(Line::from(vec![label("Counters  "), Span::styled(source, Style::default().fg(color))]));
  }
  if let Some(year) = display.year {
    lines.push(Line::from(vec![label("Year      "), Span::styled(year.to_string(), Style::default().fg(theme.fg))]));
  }
  if let Some(map) = &display.map {
    lines.push(Line::from(vec![label("Map       "), Span::styled(map.clone(), Style::default().fg(theme.fg))]));
  }
  if let Some(category) = &display.category {
    lines.push(Line::from(vec![label("Category  "), Span::styled(category.clone(), Style::default().fg(theme.fg))]));
  }
  if !display.tags.is_empty() {
    let mut spans = vec![label("Tags      ")];
    for tag in &display.tags {
      spans.push(Span::styled(format!(" {} ", tag), Style::default().fg(theme.key_fg).bg(theme.key_bg)));
      spans.push(Span::raw(" "));
    }
    lines.push(Line::from(spans));
  }
  if !display.description.is_empty() {
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(display.description.clone(), Style::default().fg(theme.fg))));
  }
  if let Some(link) = &display.share_link {
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
      truncate_str(link, inner_w),
      Style::default().fg(theme.accent).add_modifier(Modifier::UNDERLINED),
    )));
  }

  let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false }).block(info_block);
  frame.render_widget(paragraph, area);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let (text, style) = if let Some(err) = &app.last_error {
    (format!(" ⚠  {}", err), Style::default().fg(theme.error))
  } else if let Some(msg) = &app.core.display().status {
    (format!(" ✓ {}", msg), Style::default().fg(theme.status))
  } else if let Some(pos) = app.player.position {
    let state = if app.player.paused { "paused" } else { "playing" };
    (format!(" ♪ {} · {:.0}s", state, pos), Style::default().fg(theme.status))
  } else {
    (" Ready".to_string(), Style::default().fg(theme.muted))
  };
  frame.render_widget(Paragraph::new(text).style(style), area);
}

fn render_search(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let focused = app.mode == AppMode::Search;
  let border_color = if focused { theme.accent } else { theme.border };
  let input_block = Block::bordered()
    .title(" Search ")
    .title_style(Style::default().fg(border_color))
    .border_type(ratatui::widgets::BorderType::Rounded)
    .border_style(Style::default().fg(border_color))
    .padding(Padding::horizontal(1));

  let inner_w = area.width.saturating_sub(4) as usize;
  let cursor_col = display_width(&app.search, app.search_cursor);

  if cursor_col < app.search_scroll {
    app.search_scroll = cursor_col;
  } else if cursor_col >= app.search_scroll + inner_w {
    app.search_scroll = cursor_col.saturating_sub(inner_w) + 1;
  }

  let visible: String = app
    .search
    .chars()
    .scan(0usize, |col, c| {
      let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
      let start = *col;
      *col += w;
      Some((start, *col, c))
    })
    .skip_while(|(_, end, _)| *end <= app.search_scroll)
    .take_while(|(start, _, _)| *start < app.search_scroll + inner_w)
    .map(|(_, _, c)| c)
    .collect();

  let paragraph = Paragraph::new(visible).style(Style::default().fg(theme.fg)).block(input_block);
  frame.render_widget(paragraph, area);

  if focused {
    let cursor_x = area.x + 2 + (cursor_col - app.search_scroll) as u16;
    frame.set_cursor_position((cursor_x, area.y + 1));
  }
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let is_playing = app.player.is_playing();
  let keys: Vec<(&str, &str)> = match app.mode {
    AppMode::List => {
      let mut k = vec![("Enter", "Play"), ("n/p", "Next/Prev"), ("r", "Shuffle"), ("/", "Search"), ("c", "Copy link")];
      if app.core.display().votes_enabled {
        k.push(("u/d", "Vote"));
      }
      if is_playing {
        let pause_label = if app.player.paused { "Resume" } else { "Pause" };
        k.push(("^p", pause_label));
        k.push(("^s", "Stop"));
      }
      k.push(("q", "Quit"));
      k
    }
    AppMode::Search => vec![("Enter", "Done"), ("Esc", "Clear"), ("↑/↓", "Move")],
  };

  let spans: Vec<Span> = keys
    .iter()
    .enumerate()
    .flat_map(|(i, (key, action))| {
      let mut s = vec![
        Span::styled(format!(" {} ", key), Style::default().fg(theme.key_fg).bg(theme.key_bg)),
        Span::styled(format!(" {} ", action), Style::default().fg(theme.muted)),
      ];
      if i < keys.len() - 1 {
        s.push(Span::raw(" "));
      }
      s
    })
    .collect();

  frame.render_widget(Line::from(spans), area);

  let theme_label = format!("{} ", theme.name);
  let right = Line::from(Span::styled(&theme_label, Style::default().fg(theme.muted)));
  let right_area =
    Rect { x: area.x + area.width.saturating_sub(theme_label.len() as u16), width: theme_label.len() as u16, ..area };
  frame.render_widget(right, right_area);
}
