//! Song-history API client (`<base>/songs/<station_id>.json`).
//!
//! SomaFM publishes the last few tracks of every channel as JSON, newest
//! first.  It is cheaper and more reliable than tapping the audio stream, so
//! the orchestrator asks here first.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::MetadataError;
use crate::orchestrator::TrackSource;
use crate::types::{TrackHistoryEntry, TrackMetadata, UNKNOWN_ARTIST, UNKNOWN_TITLE};

// ── Response schema ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SongsResponse {
    pub songs: Vec<SongRecord>,
}

#[derive(Debug, Deserialize)]
pub struct SongRecord {
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub album: Option<String>,
    /// Unix seconds.  The API sends a string, but numbers are accepted too.
    /// Missing or unreadable dates become 0 so one bad row cannot sink the list.
    #[serde(default, deserialize_with = "unix_seconds")]
    pub date: i64,
}

fn unix_seconds<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Float(f64),
        Text(String),
        Other(serde::de::IgnoredAny),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Int(n) => n,
        Raw::Float(f) => f as i64,
        Raw::Text(s) => s.trim().parse::<i64>().unwrap_or_else(|_| {
            debug!("[songs] unreadable date {:?}", s);
            0
        }),
        Raw::Other(_) => 0,
    })
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

impl SongRecord {
    pub fn to_track(&self) -> TrackMetadata {
        TrackMetadata {
            title: non_empty(self.title.as_deref()).unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            artist: non_empty(self.artist.as_deref()).unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
            album: non_empty(self.album.as_deref()),
        }
    }

    pub fn to_history_entry(&self) -> TrackHistoryEntry {
        TrackHistoryEntry::new(self.to_track(), self.date.saturating_mul(1000))
    }
}

// ── Client ────────────────────────────────────────────────────────────────────

pub struct SongHistoryClient {
    client: Client,
    base_url: String,
}

impl SongHistoryClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(config.metadata.user_agent.clone())
            .timeout(config.metadata.request_timeout())
            .build()
            .context("Failed to build song history client")?;
        Ok(Self::with_client(client, &config.endpoints.songs_base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn songs_url(&self, station_id: &str) -> String {
        format!("{}/{}.json", self.base_url, station_id)
    }

    pub async fn fetch_songs(&self, station_id: &str) -> Result<SongsResponse, MetadataError> {
        let url = self.songs_url(station_id);
        let resp = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(MetadataError::Status(status));
        }

        let body = resp.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| MetadataError::Decode(e.to_string()))
    }

    /// Most recent track for `station_id`, or `None` if the list is empty or
    /// the request fails.
    pub async fn get_latest_track(&self, station_id: &str) -> Option<TrackMetadata> {
        match self.fetch_songs(station_id).await {
            Ok(resp) => {
                let latest = resp.songs.first().map(SongRecord::to_track);
                if latest.is_none() {
                    debug!("[songs] empty history for {}", station_id);
                }
                latest
            }
            Err(e) => {
                warn!("[songs] latest track for {} failed: {}", station_id, e);
                None
            }
        }
    }

    /// Full recent history in server order (newest first); empty on failure.
    pub async fn get_track_history(&self, station_id: &str) -> Vec<TrackHistoryEntry> {
        match self.fetch_songs(station_id).await {
            Ok(resp) => resp.songs.iter().map(SongRecord::to_history_entry).collect(),
            Err(e) => {
                warn!("[songs] history for {} failed: {}", station_id, e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl TrackSource for SongHistoryClient {
    async fn latest_track(&self, station_id: &str) -> Option<TrackMetadata> {
        self.get_latest_track(station_id).await
    }
}
