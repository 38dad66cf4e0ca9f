//! Stream Metadata Reader: pulls one ICY metadata block off a live stream.
//!
//! Each call opens its own connection, reads just far enough to reach the first
//! metadata block, and drops the connection.  Calls are single-flight per
//! reader: starting a new fetch cancels the previous one.
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::MetadataConfig;
use crate::error::MetadataError;
use crate::icy::{self, IcyBlock, MAX_METAINT};
use crate::orchestrator::StreamSource;
use crate::types::TrackMetadata;

pub struct StreamMetadataReader {
    client: Client,
    read_timeout: Duration,
    /// Token of the fetch currently in flight, if any.
    inflight: Mutex<Option<CancellationToken>>,
}

impl StreamMetadataReader {
    pub fn new(config: &MetadataConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            // Icecast mounts often redirect to a relay
            .redirect(reqwest::redirect::Policy::limited(10))
            .connect_timeout(config.request_timeout())
            .build()
            .context("Failed to build stream metadata client")?;
        Ok(Self::with_client(client, config.stream_read_timeout()))
    }

    pub fn with_client(client: Client, read_timeout: Duration) -> Self {
        Self {
            client,
            read_timeout,
            inflight: Mutex::new(None),
        }
    }

    /// Fetch the current track from `stream_url`, or `None` on any failure.
    pub async fn get_metadata(&self, stream_url: &str) -> Option<TrackMetadata> {
        match self.fetch(stream_url).await {
            Ok(meta) => meta,
            Err(e) if e.is_cancellation() => {
                debug!("[icy] fetch cancelled: {}", stream_url);
                None
            }
            Err(MetadataError::NoIcySupport) => {
                info!("[icy] no ICY metadata available for {}", stream_url);
                None
            }
            Err(e) => {
                warn!("[icy] metadata fetch failed for {}: {}", stream_url, e);
                None
            }
        }
    }

    /// Like [`get_metadata`](Self::get_metadata) but keeps the failure reason.
    ///
    /// Dropping the returned future releases the in-flight slot.
    pub async fn fetch(&self, stream_url: &str) -> Result<Option<TrackMetadata>, MetadataError> {
        let inflight = Inflight {
            reader: self,
            token: self.begin(),
        };

        let result = tokio::select! {
            biased;
            _ = inflight.token.cancelled() => Err(MetadataError::Cancelled),
            read = tokio::time::timeout(self.read_timeout, self.read_first_block(stream_url)) => {
                read.unwrap_or(Err(MetadataError::Timeout))
            }
        };
        drop(inflight);
        result
    }

    /// Cancel the in-flight fetch, if any.  No-op when idle.
    pub fn abort(&self) {
        if let Some(token) = self.slot().take() {
            debug!("[icy] aborting in-flight fetch");
            token.cancel();
        }
    }

    pub fn is_busy(&self) -> bool {
        self.slot().is_some()
    }

    fn slot(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.inflight.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn begin(&self) -> CancellationToken {
        let token = CancellationToken::new();
        if let Some(previous) = self.slot().replace(token.clone()) {
            debug!("[icy] superseding in-flight fetch");
            previous.cancel();
        }
        token
    }

    fn finish(&self, token: &CancellationToken) {
        let mut slot = self.slot();
        // A cancelled token has already been replaced or taken under this lock.
        if !token.is_cancelled() {
            *slot = None;
        }
    }

    async fn read_first_block(&self, stream_url: &str) -> Result<Option<TrackMetadata>, MetadataError> {
        let mut resp = self
            .client
            .get(stream_url)
            .header("Icy-MetaData", HeaderValue::from_static("1"))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(MetadataError::Status(status));
        }

        let metaint = icy_metaint(resp.headers()).ok_or(MetadataError::NoIcySupport)?;
        debug!("[icy] icy-metaint={} for {}", metaint, stream_url);

        let mut buf: Vec<u8> = Vec::with_capacity((metaint + 1024).min(128 * 1024));
        loop {
            match icy::locate_block(&buf, metaint) {
                IcyBlock::Empty => {
                    debug!("[icy] empty metadata block");
                    return Ok(None);
                }
                IcyBlock::Block(block) => {
                    let meta = icy::parse_metadata(block);
                    if meta.is_none() {
                        debug!("[icy] block without StreamTitle: {:?}", String::from_utf8_lossy(block));
                    }
                    return Ok(meta);
                }
                IcyBlock::NeedMore => {}
            }

            match resp.chunk().await? {
                Some(chunk) => buf.extend_from_slice(&chunk),
                None => return Err(MetadataError::StreamEnded),
            }
        }
    }
}

/// Clears the reader's slot when a fetch completes or its future is dropped.
struct Inflight<'a> {
    reader: &'a StreamMetadataReader,
    token: CancellationToken,
}

impl Drop for Inflight<'_> {
    fn drop(&mut self) {
        self.reader.finish(&self.token);
    }
}

/// Parse `icy-metaint`, rejecting zero and absurd values.
pub fn icy_metaint(headers: &HeaderMap) -> Option<usize> {
    headers
        .get("icy-metaint")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<usize>().ok())
        .filter(|n| (1..=MAX_METAINT).contains(n))
}

#[async_trait]
impl StreamSource for StreamMetadataReader {
    async fn stream_metadata(&self, stream_url: &str) -> Option<TrackMetadata> {
        self.get_metadata(stream_url).await
    }

    fn abort(&self) {
        StreamMetadataReader::abort(self);
    }
}
