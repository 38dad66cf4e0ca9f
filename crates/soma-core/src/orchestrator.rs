//! Metadata Orchestrator: single-owner polling loop for now-playing state.
//!
//! One tokio task owns the current selection, the poll ticker, the handle of
//! the in-flight fetch cycle and the track history.  Callers drive it with
//! `select` / `stop` commands over an mpsc channel and watch the resulting
//! [`NowPlaying`] snapshot through a `watch` channel.
//!
//! Each fetch cycle asks the song-history API first and falls back to the ICY
//! stream.  Cycles never overlap: a tick that fires while one is still running
//! is skipped.  Every cycle carries the generation it was started under;
//! `select` and `stop` bump the generation, abort the running cycle and abort
//! the stream reader before doing anything else, and any result that still
//! arrives with an old generation is dropped.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::{Config, MetadataConfig};
use crate::error::OrchestratorError;
use crate::history::TrackHistory;
use crate::reader::StreamMetadataReader;
use crate::songs::SongHistoryClient;
use crate::types::{MetadataSource, StationStreamHandle, TrackHistoryEntry, TrackMetadata};

// ── Sources ───────────────────────────────────────────────────────────────────

/// A per-station "what is playing" lookup (the song-history API).
#[async_trait]
pub trait TrackSource: Send + Sync {
    async fn latest_track(&self, station_id: &str) -> Option<TrackMetadata>;
}

/// In-band metadata read from the audio stream itself.
#[async_trait]
pub trait StreamSource: Send + Sync {
    async fn stream_metadata(&self, stream_url: &str) -> Option<TrackMetadata>;

    /// Cancel whatever fetch is in flight.  Must be idempotent.
    fn abort(&self);
}

// ── Public state ──────────────────────────────────────────────────────────────

/// What the UI renders: the selection, the current track and the tracklist.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NowPlaying {
    pub selection: Option<StationStreamHandle>,
    pub current: Option<TrackMetadata>,
    pub source: Option<MetadataSource>,
    /// Newest first.
    pub history: Vec<TrackHistoryEntry>,
}

impl NowPlaying {
    pub fn is_polling(&self) -> bool {
        self.selection.is_some()
    }
}

/// Floor for the poll period; tokio intervals reject a zero period.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// Clamped to [`MIN_POLL_INTERVAL`].
    pub poll_interval: Duration,
    pub history_limit: usize,
}

impl From<&MetadataConfig> for OrchestratorOptions {
    fn from(config: &MetadataConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            history_limit: config.history_limit,
        }
    }
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self::from(&MetadataConfig::default())
    }
}

// ── Handle ────────────────────────────────────────────────────────────────────

#[derive(Debug)]
enum Command {
    Select(StationStreamHandle),
    Stop,
    Shutdown,
}

/// Owning handle for the polling loop.  Dropping it aborts the loop; prefer
/// [`dispose`](Self::dispose) for an orderly shutdown.
pub struct MetadataOrchestrator {
    cmd_tx: mpsc::Sender<Command>,
    snapshot_rx: watch::Receiver<NowPlaying>,
    task: Option<JoinHandle<()>>,
}

impl MetadataOrchestrator {
    /// Spawn the loop on the current tokio runtime.
    pub fn create(
        tracks: Arc<dyn TrackSource>,
        stream: Arc<dyn StreamSource>,
        options: OrchestratorOptions,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (core, done_rx, snapshot_rx) = Core::new(tracks, stream, options);
        let task = tokio::spawn(core.run(cmd_rx, done_rx));
        Self {
            cmd_tx,
            snapshot_rx,
            task: Some(task),
        }
    }

    /// Build the real HTTP sources from `config` and spawn the loop.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let tracks = Arc::new(SongHistoryClient::new(config)?);
        let stream = Arc::new(StreamMetadataReader::new(&config.metadata)?);
        Ok(Self::create(
            tracks,
            stream,
            OrchestratorOptions::from(&config.metadata),
        ))
    }

    /// Start polling `station_id`, replacing any previous selection.
    pub async fn select(
        &self,
        station_id: impl Into<String>,
        stream_url: impl Into<String>,
    ) -> Result<(), OrchestratorError> {
        let handle = StationStreamHandle::new(station_id, stream_url);
        self.send(Command::Select(handle)).await
    }

    /// Stop polling and clear the current track.  History is kept.
    pub async fn stop(&self) -> Result<(), OrchestratorError> {
        self.send(Command::Stop).await
    }

    pub fn subscribe(&self) -> watch::Receiver<NowPlaying> {
        self.snapshot_rx.clone()
    }

    pub fn now_playing(&self) -> NowPlaying {
        self.snapshot_rx.borrow().clone()
    }

    /// Stop polling, shut the loop down and wait for it to exit.
    pub async fn dispose(mut self) {
        let _ = self.cmd_tx.send(Command::Shutdown).await;
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!("[orchestrator] loop ended abnormally: {}", e);
                }
            }
        }
    }

    async fn send(&self, cmd: Command) -> Result<(), OrchestratorError> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| OrchestratorError::Closed)
    }
}

impl Drop for MetadataOrchestrator {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ── Loop ──────────────────────────────────────────────────────────────────────

type CycleOutcome = Option<(TrackMetadata, MetadataSource)>;

#[derive(Debug)]
struct CycleDone {
    generation: u64,
    station_id: String,
    outcome: CycleOutcome,
}

struct Core {
    tracks: Arc<dyn TrackSource>,
    stream: Arc<dyn StreamSource>,
    poll_interval: Duration,
    selection: Option<StationStreamHandle>,
    /// Station of the most recent selection, kept across `stop`.
    last_station_id: Option<String>,
    current: CycleOutcome,
    history: TrackHistory,
    /// Bumped on every select/stop; cycles stamped with an older value are stale.
    generation: u64,
    /// Mirror of `generation` that running cycles can read.
    live_generation: Arc<AtomicU64>,
    ticker: Option<Interval>,
    cycle: Option<AbortHandle>,
    done_tx: mpsc::Sender<CycleDone>,
    snapshot_tx: watch::Sender<NowPlaying>,
}

impl Core {
    fn new(
        tracks: Arc<dyn TrackSource>,
        stream: Arc<dyn StreamSource>,
        options: OrchestratorOptions,
    ) -> (Self, mpsc::Receiver<CycleDone>, watch::Receiver<NowPlaying>) {
        let (done_tx, done_rx) = mpsc::channel(8);
        let (snapshot_tx, snapshot_rx) = watch::channel(NowPlaying::default());
        let core = Self {
            tracks,
            stream,
            poll_interval: options.poll_interval.max(MIN_POLL_INTERVAL),
            selection: None,
            last_station_id: None,
            current: None,
            history: TrackHistory::with_limit(options.history_limit),
            generation: 0,
            live_generation: Arc::new(AtomicU64::new(0)),
            ticker: None,
            cycle: None,
            done_tx,
            snapshot_tx,
        };
        (core, done_rx, snapshot_rx)
    }

    async fn run(mut self, mut cmd_rx: mpsc::Receiver<Command>, mut done_rx: mpsc::Receiver<CycleDone>) {
        debug!("[orchestrator] starting event loop");
        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => match cmd {
                    Some(Command::Select(handle)) => self.select(handle),
                    Some(Command::Stop) => self.stop(),
                    Some(Command::Shutdown) | None => break,
                },
                Some(done) = done_rx.recv() => self.apply(done),
                _ = next_tick(&mut self.ticker) => self.start_cycle(),
            }
        }
        self.cancel_inflight();
        debug!("[orchestrator] event loop stopped");
    }

    fn select(&mut self, handle: StationStreamHandle) {
        self.cancel_inflight();

        if self.last_station_id.as_deref() != Some(handle.station_id.as_str()) {
            if !self.history.is_empty() {
                debug!("[orchestrator] station switch, clearing history");
            }
            self.history.clear();
            self.current = None;
        }
        info!(
            "[orchestrator] polling {} via {}",
            handle.station_id, handle.stream_url
        );
        self.last_station_id = Some(handle.station_id.clone());
        self.selection = Some(handle);

        let start = tokio::time::Instant::now() + self.poll_interval;
        let mut ticker = tokio::time::interval_at(start, self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.ticker = Some(ticker);

        self.start_cycle();
        self.publish();
    }

    fn stop(&mut self) {
        self.cancel_inflight();
        if let Some(selection) = self.selection.take() {
            info!("[orchestrator] stopped polling {}", selection.station_id);
        }
        self.current = None;
        self.publish();
    }

    /// Drop the ticker and the running cycle, and invalidate anything in flight.
    fn cancel_inflight(&mut self) {
        self.generation += 1;
        self.live_generation.store(self.generation, Ordering::SeqCst);
        self.ticker = None;
        if let Some(cycle) = self.cycle.take() {
            cycle.abort();
        }
        self.stream.abort();
    }

    fn start_cycle(&mut self) {
        let Some(selection) = self.selection.clone() else {
            return;
        };
        if self.cycle.as_ref().is_some_and(|c| !c.is_finished()) {
            debug!("[orchestrator] previous cycle still running, skipping tick");
            return;
        }

        let generation = self.generation;
        let tracks = Arc::clone(&self.tracks);
        let stream = Arc::clone(&self.stream);
        let done_tx = self.done_tx.clone();
        let live = Arc::clone(&self.live_generation);
        let task = tokio::spawn(async move {
            let still_current = || live.load(Ordering::SeqCst) == generation;
            let outcome =
                fetch_cycle(tracks.as_ref(), stream.as_ref(), &selection, still_current).await;
            let done = CycleDone {
                generation,
                station_id: selection.station_id,
                outcome,
            };
            let _ = done_tx.send(done).await;
        });
        self.cycle = Some(task.abort_handle());
    }

    fn apply(&mut self, done: CycleDone) {
        let current_station = self.selection.as_ref().map(|s| s.station_id.as_str());
        if done.generation != self.generation || current_station != Some(done.station_id.as_str()) {
            debug!(
                "[orchestrator] discarding stale result for {} (gen {} != {})",
                done.station_id, done.generation, self.generation
            );
            return;
        }
        self.cycle = None;

        let Some((track, source)) = done.outcome else {
            debug!("[orchestrator] no metadata for {} this cycle", done.station_id);
            return;
        };

        let played_at = chrono::Utc::now().timestamp_millis();
        if self.history.record(track.clone(), played_at) {
            info!("[orchestrator] now playing: {} ({})", track.display(), source.label());
        }
        self.current = Some((track, source));
        self.publish();
    }

    fn snapshot(&self) -> NowPlaying {
        NowPlaying {
            selection: self.selection.clone(),
            current: self.current.as_ref().map(|(t, _)| t.clone()),
            source: self.current.as_ref().map(|(_, s)| *s),
            history: self.history.to_vec(),
        }
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }
}

impl Drop for Core {
    fn drop(&mut self) {
        // The loop may be aborted mid-await; make sure the cycle dies with it.
        if let Some(cycle) = self.cycle.take() {
            cycle.abort();
        }
        self.stream.abort();
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(t) => {
            t.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

async fn fetch_cycle(
    tracks: &dyn TrackSource,
    stream: &dyn StreamSource,
    selection: &StationStreamHandle,
    still_current: impl Fn() -> bool,
) -> CycleOutcome {
    if let Some(track) = tracks.latest_track(&selection.station_id).await {
        return Some((track, MetadataSource::HistoryApi));
    }
    // An aborted cycle only stops at its next await. Starting a stream read
    // here would supersede the read of the selection that replaced us.
    if !still_current() {
        debug!("[orchestrator] cycle for {} superseded before stream read", selection.station_id);
        return None;
    }
    stream
        .stream_metadata(&selection.stream_url)
        .await
        .map(|track| (track, MetadataSource::IcyStream))
}
