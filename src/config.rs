use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::ui::value::Value;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_log_buffer_size")]
    pub log_buffer_size: usize,
    /// Overrides the watch-history location under the data directory.
    #[serde(default)]
    pub history_file: Option<PathBuf>,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_search_url")]
    pub search_url: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default = "default_episode_page_size")]
    pub episode_page_size: u32,
    #[serde(default = "default_resume_rewind_secs")]
    pub resume_rewind_secs: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    #[serde(default = "default_player_program")]
    pub program: String,
    #[serde(default = "default_quality")]
    pub quality: String,
    #[serde(default = "default_player")]
    pub player: String,
    /// Extra arguments handed to the player after the resume and status flags.
    #[serde(default = "default_player_args")]
    pub player_args: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default = "default_anime_pane_width")]
    pub anime_pane_width: Value,
    #[serde(default = "default_browser_pane_height")]
    pub browser_pane_height: Value,
}

fn default_theme() -> String {
    "catppuccin-mocha".to_string()
}
fn default_log_buffer_size() -> usize {
    50
}
fn default_api_base_url() -> String {
    "https://api.crunchyroll.com".to_string()
}
fn default_search_url() -> String {
    "https://www.crunchyroll.com/ajax/?req=RpcApiSearch_GetSearchCandidates".to_string()
}
fn default_locale() -> String {
    "enUS".to_string()
}
fn default_episode_page_size() -> u32 {
    1000
}
fn default_resume_rewind_secs() -> f64 {
    5.0
}
fn default_player_program() -> String {
    "streamlink".to_string()
}
fn default_quality() -> String {
    "best".to_string()
}
fn default_player() -> String {
    "mpv".to_string()
}
fn default_player_args() -> String {
    "--cache=yes --cache-secs=300 --force-seekable=yes --hr-seek=yes --hr-seek-framedrop=yes"
        .to_string()
}
fn default_anime_pane_width() -> Value {
    Value::relative(0.3)
}
fn default_browser_pane_height() -> Value {
    Value::relative(0.8)
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            program: default_player_program(),
            quality: default_quality(),
            player: default_player(),
            player_args: default_player_args(),
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            anime_pane_width: default_anime_pane_width(),
            browser_pane_height: default_browser_pane_height(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            log_buffer_size: default_log_buffer_size(),
            history_file: None,
            api_base_url: default_api_base_url(),
            search_url: default_search_url(),
            session_id: None,
            locale: default_locale(),
            player: PlayerConfig::default(),
            layout: LayoutConfig::default(),
            episode_page_size: default_episode_page_size(),
            resume_rewind_secs: default_resume_rewind_secs(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("parsing {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("crunsuck")
            .join("config.toml")
    }
}
