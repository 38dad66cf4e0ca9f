use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::platform;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub metadata: MetadataConfig,
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    #[serde(default)]
    pub player: PlayerConfig,
}

/// Polling and fetch tuning for the now-playing sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataConfig {
    /// Seconds between fetch cycles while a station is selected.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Upper bound on connecting to a stream and reading its first metadata block.
    #[serde(default = "default_stream_read_timeout_ms")]
    pub stream_read_timeout_ms: u64,
    /// Timeout for JSON requests (directory, song history, playlists).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Maximum number of tracks kept in the in-memory history.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    #[serde(default = "default_channels_url")]
    pub channels_url: String,
    /// Base for `<base>/<station_id>.json`.
    #[serde(default = "default_songs_base_url")]
    pub songs_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    #[serde(default = "default_volume")]
    pub default_volume: f32,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            stream_read_timeout_ms: default_stream_read_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            user_agent: default_user_agent(),
            history_limit: default_history_limit(),
        }
    }
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            channels_url: default_channels_url(),
            songs_base_url: default_songs_base_url(),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            default_volume: default_volume(),
        }
    }
}

impl MetadataConfig {
    pub fn poll_interval(&self) -> Duration {
        // A zero period would make tokio's interval panic.
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn stream_read_timeout(&self) -> Duration {
        Duration::from_millis(self.stream_read_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn default_poll_interval_secs() -> u64 {
    3
}

fn default_stream_read_timeout_ms() -> u64 {
    10_000
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_user_agent() -> String {
    "SomaFM-Player/1.0".to_string()
}

fn default_history_limit() -> usize {
    50
}

fn default_channels_url() -> String {
    "https://somafm.com/channels.json".to_string()
}

fn default_songs_base_url() -> String {
    "https://somafm.com/songs".to_string()
}

fn default_volume() -> f32 {
    0.7
}

impl Config {
    /// Load `config.toml` from the platform config dir, writing defaults on first run.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save_to(&config_path)?;
            return Ok(config);
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}
