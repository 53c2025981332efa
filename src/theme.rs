use ratatui::style::Color;

pub struct Theme {
  pub name: &'static str,
  pub bg: Color,
  pub fg: Color,
  pub muted: Color,
  pub accent: Color,
  pub border: Color,
  pub highlight_fg: Color,
  pub highlight_bg: Color,
  pub stripe_bg: Color,
  pub status: Color,
  pub error: Color,
  pub key_fg: Color,
  pub key_bg: Color,
}

pub static THEMES: [Theme; 3] = [
  Theme {
    name: "dusk",
    bg: Color::Rgb(24, 24, 32),
    fg: Color::Rgb(220, 220, 230),
    muted: Color::Rgb(120, 120, 140),
    accent: Color::Rgb(255, 121, 98),
    border: Color::Rgb(70, 70, 90),
    highlight_fg: Color::Rgb(24, 24, 32),
    highlight_bg: Color::Rgb(255, 121, 98),
    stripe_bg: Color::Rgb(30, 30, 40),
    status: Color::Rgb(140, 200, 255),
    error: Color::Rgb(255, 95, 95),
    key_fg: Color::Rgb(24, 24, 32),
    key_bg: Color::Rgb(160, 160, 180),
  },
  Theme {
    name: "paper",
    bg: Color::Rgb(250, 248, 240),
    fg: Color::Rgb(40, 40, 40),
    muted: Color::Rgb(130, 125, 115),
    accent: Color::Rgb(30, 110, 180),
    border: Color::Rgb(200, 195, 185),
    highlight_fg: Color::Rgb(250, 248, 240),
    highlight_bg: Color::Rgb(30, 110, 180),
    stripe_bg: Color::Rgb(242, 239, 230),
    status: Color::Rgb(30, 110, 180),
    error: Color::Rgb(190, 40, 40),
    key_fg: Color::Rgb(250, 248, 240),
    key_bg: Color::Rgb(100, 95, 90),
  },
  Theme {
    name: "terminal",
    bg: Color::Reset,
    fg: Color::Reset,
    muted: Color::DarkGray,
    accent: Color::Green,
    border: Color::DarkGray,
    highlight_fg: Color::Black,
    highlight_bg: Color::Green,
    stripe_bg: Color::Reset,
    status: Color::Cyan,
    error: Color::Red,
    key_fg: Color::Black,
    key_bg: Color::Gray,
  },
];

/// Index of the theme called `name`, or the first theme.
pub fn index_of(name: Option<&str>) -> usize {
  name.and_then(|n| THEMES.iter().position(|t| t.name == n)).unwrap_or(0)
}
