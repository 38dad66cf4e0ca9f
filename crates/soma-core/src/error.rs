use thiserror::Error;

/// Everything that can go wrong while fetching now-playing metadata.
///
/// None of these ever reach the UI: the public metadata operations log them and
/// return "no metadata" instead.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server returned {0}")]
    Status(reqwest::StatusCode),

    #[error("stream does not advertise icy-metaint")]
    NoIcySupport,

    #[error("decode error: {0}")]
    Decode(String),

    #[error("stream ended before the metadata block")]
    StreamEnded,

    #[error("timed out waiting for metadata")]
    Timeout,

    #[error("cancelled")]
    Cancelled,

    #[error("playlist has no playable entry")]
    EmptyPlaylist,

    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl MetadataError {
    /// Cancellation is an expected outcome (superseded or aborted fetch), not a failure.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Returned by orchestrator commands once its event loop has shut down.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("metadata orchestrator is closed")]
    Closed,
}
