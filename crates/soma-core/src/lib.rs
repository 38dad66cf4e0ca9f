//! Now-playing metadata core for a SomaFM-style internet radio client.
//!
//! The UI shell owns rendering and the platform audio output; this crate owns
//! everything that talks to the network: the station directory, playlist
//! resolution, ICY stream metadata, the song-history API, and the orchestrator
//! that polls them while a station is selected.

pub mod config;
pub mod directory;
pub mod error;
pub mod history;
pub mod icy;
pub mod logging;
pub mod orchestrator;
pub mod platform;
pub mod player;
pub mod playlist;
pub mod reader;
pub mod songs;
pub mod types;

pub use error::{MetadataError, OrchestratorError};
pub use orchestrator::{MetadataOrchestrator, NowPlaying};
pub use types::{MetadataSource, StationStreamHandle, TrackHistoryEntry, TrackMetadata};
