//! Station directory (`channels.json`) and stream variant selection.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info};

use crate::config::Config;

pub const LOSSLESS_STATION_ID: &str = "groovesalad";
pub const LOSSLESS_HLS_URL: &str = "https://hls.somafm.com/hls/groovesalad/FLAC/program.m3u8";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamFormat {
    Mp3,
    Aac,
    Aacp,
    Flac,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamQuality {
    Highest,
    High,
    Low,
    Lossless,
    #[serde(other)]
    Other,
}

impl StreamQuality {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Highest => "highest",
            Self::High => "high",
            Self::Low => "low",
            Self::Lossless => "lossless",
            Self::Other => "unknown",
        }
    }
}

/// One listed stream variant.  `url` may be a direct stream or a `.pls` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub url: String,
    pub format: StreamFormat,
    pub quality: StreamQuality,
}

impl Playlist {
    /// Short label for the variant picker.
    pub fn label(&self) -> String {
        match self.format {
            StreamFormat::Flac => "FLAC HLS".to_string(),
            StreamFormat::Mp3 if self.url.contains("320") => "320k MP3".to_string(),
            StreamFormat::Mp3 => "256k MP3".to_string(),
            StreamFormat::Aac => "128k AAC".to_string(),
            _ => self.quality.name().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub dj: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub largeimage: String,
    #[serde(default)]
    pub xlimage: String,
    #[serde(default)]
    pub updated: String,
    #[serde(default, deserialize_with = "lenient_count")]
    pub listeners: u64,
    #[serde(default, rename = "lastPlaying")]
    pub last_playing: String,
    #[serde(default)]
    pub playlists: Vec<Playlist>,
}

impl Channel {
    /// The variant played when the user just clicks the station.
    pub fn preferred_playlist(&self) -> Option<&Playlist> {
        if self.id == LOSSLESS_STATION_ID {
            if let Some(first) = self.playlists.first().filter(|p| p.format == StreamFormat::Flac) {
                return Some(first);
            }
        }
        self.playlists
            .iter()
            .find(|p| p.quality == StreamQuality::Highest)
            .or_else(|| self.playlists.first())
    }
}

#[derive(Debug, Deserialize)]
struct ChannelsResponse {
    channels: Vec<Channel>,
}

/// The API sends listener counts as strings; accept numbers as well.
fn lenient_count<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(u64),
        Text(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Int(n) => n,
        Raw::Text(s) => s.trim().parse().unwrap_or(0),
    })
}

/// Prepend the FLAC HLS variant to the lossless-capable channel.
pub fn add_lossless_variant(channels: &mut [Channel]) {
    for channel in channels.iter_mut().filter(|c| c.id == LOSSLESS_STATION_ID) {
        if channel.playlists.iter().any(|p| p.url == LOSSLESS_HLS_URL) {
            continue;
        }
        channel.playlists.insert(
            0,
            Playlist {
                url: LOSSLESS_HLS_URL.to_string(),
                format: StreamFormat::Flac,
                quality: StreamQuality::Lossless,
            },
        );
    }
}

pub fn parse_channels(body: &[u8]) -> Result<Vec<Channel>> {
    let resp: ChannelsResponse =
        serde_json::from_slice(body).context("Failed to parse channels.json")?;
    Ok(resp.channels)
}

pub struct DirectoryClient {
    client: Client,
    channels_url: String,
}

impl DirectoryClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.metadata.user_agent.clone())
            .timeout(config.metadata.request_timeout())
            .build()
            .context("Failed to build directory client")?;
        Ok(Self::with_client(client, &config.endpoints.channels_url))
    }

    pub fn with_client(client: Client, channels_url: &str) -> Self {
        Self {
            client,
            channels_url: channels_url.to_string(),
        }
    }

    /// Fetch the channel list, with the lossless variant added.
    pub async fn fetch_channels(&self) -> Result<Vec<Channel>> {
        debug!("[directory] GET {}", self.channels_url);
        let response = self
            .client
            .get(&self.channels_url)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to fetch channels")?;

        if !response.status().is_success() {
            anyhow::bail!("channels.json returned status: {}", response.status());
        }

        let body = response
            .bytes()
            .await
            .context("Failed to read channels response")?;
        let mut channels = parse_channels(&body)?;
        add_lossless_variant(&mut channels);
        info!("[directory] loaded {} channels", channels.len());
        Ok(channels)
    }
}
