use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// User preferences read from `config.toml` in the platform config directory.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
pub struct Config {
  pub playlist_url: Option<String>,
  /// Base URL of the counter service. Absent means no remote counters.
  pub counter_url: Option<String>,
  /// Page that share links point at.
  pub share_base_url: Option<String>,
  /// Keep a per-device view count and show it when remote counts are unavailable.
  #[serde(default)]
  pub local_views: bool,
  pub theme_name: Option<String>,
}

impl Config {
  pub fn load() -> Self {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "rstube") {
      let config_file = proj_dirs.config_dir().join("config.toml");
      if let Ok(content) = std::fs::read_to_string(config_file)
        && let Ok(config) = Self::parse(&content)
      {
        return config;
      }
    }
    Self::default()
  }

  pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
    toml::from_str(content)
  }

  pub fn save(&self) {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "rstube") {
      let config_dir = proj_dirs.config_dir();
      if std::fs::create_dir_all(config_dir).is_ok() {
        let config_file = config_dir.join("config.toml");
        if let Ok(content) = toml::to_string(self) {
          let _ = std::fs::write(config_file, content);
        }
      }
    }
  }
}
