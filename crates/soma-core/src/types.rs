use serde::{Deserialize, Serialize};

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// A track as reported by one of the metadata sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
}

impl TrackMetadata {
    pub fn new(artist: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            album: None,
        }
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    /// Two tracks are the same song when title and artist match; album is ignored.
    pub fn same_track(&self, other: &TrackMetadata) -> bool {
        self.title == other.title && self.artist == other.artist
    }

    /// "Artist - Title", the way the player bar shows it.
    pub fn display(&self) -> String {
        format!("{} - {}", self.artist, self.title)
    }
}

/// One row of the in-memory tracklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackHistoryEntry {
    #[serde(flatten)]
    pub track: TrackMetadata,
    /// Unix timestamp in milliseconds.
    pub played_at: i64,
}

impl TrackHistoryEntry {
    pub fn new(track: TrackMetadata, played_at: i64) -> Self {
        Self { track, played_at }
    }
}

/// The station the orchestrator is polling, plus the stream variant in use.
///
/// Replaced wholesale on every selection; never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationStreamHandle {
    pub station_id: String,
    pub stream_url: String,
}

impl StationStreamHandle {
    pub fn new(station_id: impl Into<String>, stream_url: impl Into<String>) -> Self {
        Self {
            station_id: station_id.into(),
            stream_url: stream_url.into(),
        }
    }
}

/// Which source produced a now-playing result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetadataSource {
    HistoryApi,
    IcyStream,
}

impl MetadataSource {
    pub fn label(&self) -> &'static str {
        match self {
            Self::HistoryApi => "songs-api",
            Self::IcyStream => "icy",
        }
    }
}
