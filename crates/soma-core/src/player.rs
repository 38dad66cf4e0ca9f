//! Player session: ties the platform audio output to the metadata orchestrator.
//!
//! The audio primitive itself (decoding, buffering, output device) belongs to
//! the platform; we only tell it what to play and at which volume.
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::Config;
use crate::orchestrator::{MetadataOrchestrator, NowPlaying};

/// Platform-provided audio playback.
pub trait AudioOutput: Send {
    fn play(&mut self, url: &str) -> anyhow::Result<()>;
    fn pause(&mut self);
    fn resume(&mut self) -> anyhow::Result<()>;
    fn stop(&mut self);
    /// 0.0 ..= 1.0
    fn set_volume(&mut self, volume: f32);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

pub struct PlayerSession<A: AudioOutput> {
    output: A,
    orchestrator: MetadataOrchestrator,
    state: PlaybackState,
    volume: f32,
}

impl<A: AudioOutput> PlayerSession<A> {
    pub fn new(mut output: A, orchestrator: MetadataOrchestrator, volume: f32) -> Self {
        let volume = clamp_volume(volume).unwrap_or(0.0);
        output.set_volume(volume);
        Self {
            output,
            orchestrator,
            state: PlaybackState::Stopped,
            volume,
        }
    }

    /// Real HTTP metadata sources, default volume from `[player]`.
    pub fn from_config(output: A, config: &Config) -> anyhow::Result<Self> {
        let orchestrator = MetadataOrchestrator::from_config(config)?;
        Ok(Self::new(output, orchestrator, config.player.default_volume))
    }

    /// Switch to `stream_url` and start polling now-playing for `station_id`.
    pub async fn play(&mut self, station_id: &str, stream_url: &str) -> anyhow::Result<()> {
        self.output.stop();
        if let Err(e) = self.output.play(stream_url) {
            warn!("[player] failed to start {}: {}", stream_url, e);
            self.state = PlaybackState::Stopped;
            self.orchestrator.stop().await?;
            return Err(e);
        }
        self.state = PlaybackState::Playing;
        info!("[player] playing {} ({})", station_id, stream_url);
        self.orchestrator.select(station_id, stream_url).await?;
        Ok(())
    }

    /// Pause audio only; now-playing polling and history carry on.
    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.output.pause();
            self.state = PlaybackState::Paused;
        }
    }

    pub fn resume(&mut self) -> anyhow::Result<()> {
        if self.state == PlaybackState::Paused {
            self.output.resume()?;
            self.state = PlaybackState::Playing;
        }
        Ok(())
    }

    pub async fn stop(&mut self) -> anyhow::Result<()> {
        self.output.stop();
        self.state = PlaybackState::Stopped;
        self.orchestrator.stop().await?;
        Ok(())
    }

    /// Clamped to 0.0..=1.0; non-finite values are ignored.
    pub fn set_volume(&mut self, volume: f32) {
        let Some(volume) = clamp_volume(volume) else {
            warn!("[player] ignoring volume {}", volume);
            return;
        };
        self.volume = volume;
        self.output.set_volume(volume);
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn now_playing(&self) -> NowPlaying {
        self.orchestrator.now_playing()
    }

    pub fn subscribe(&self) -> watch::Receiver<NowPlaying> {
        self.orchestrator.subscribe()
    }

    pub fn output(&self) -> &A {
        &self.output
    }

    /// Stop audio and dispose of the orchestrator.
    pub async fn shutdown(self) -> A {
        let Self {
            mut output,
            orchestrator,
            ..
        } = self;
        output.stop();
        orchestrator.dispose().await;
        output
    }
}

fn clamp_volume(volume: f32) -> Option<f32> {
    volume.is_finite().then(|| volume.clamp(0.0, 1.0))
}
