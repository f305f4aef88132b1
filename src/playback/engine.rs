use std::path::PathBuf;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::{
    common::{errors::PlaybackError, types::TrackId},
    protocol::PlayMode,
};

/// What to play, resolved from the selected song.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackArtifact {
    pub name: String,
    pub path: PathBuf,
}

/// Per-peer options passed to the engine when a scheduled play fires.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayOptions {
    pub mode: PlayMode,
    /// Own slot, 0 when none was assigned.
    pub slot: u32,
    pub total_players: u32,
    pub track_id: Option<TrackId>,
}

/// The component that actually renders the artifact.
///
/// Positions are in seconds.
#[async_trait]
pub trait PlaybackEngine: Send + Sync {
    async fn seek_to(&self, position: f64) -> Result<(), PlaybackError>;
    async fn start_playback(
        &self,
        artifact: &PlaybackArtifact,
        options: &PlayOptions,
    ) -> Result<(), PlaybackError>;
    async fn pause_or_resume(&self) -> Result<(), PlaybackError>;
    async fn stop(&self) -> Result<(), PlaybackError>;
    fn current_position(&self) -> f64;
    fn is_paused(&self) -> bool;
}

/// Engine that only keeps the timeline: where playback is, whether it is
/// paused, and what was started with which options. Nothing is rendered.
#[derive(Default)]
pub struct TimelineEngine {
    state: Mutex<Timeline>,
}

#[derive(Default)]
struct Timeline {
    loaded: Option<(PlaybackArtifact, PlayOptions)>,
    playing: bool,
    paused: bool,
    /// Position the running clock counts from.
    offset: f64,
    started: Option<Instant>,
}

impl Timeline {
    fn position(&self) -> f64 {
        match self.started {
            Some(started) if self.playing && !self.paused => {
                self.offset + started.elapsed().as_secs_f64()
            }
            _ => self.offset,
        }
    }
}

impl TimelineEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_playing(&self) -> bool {
        self.state.lock().playing
    }

    /// The artifact and options of the last `start_playback`.
    pub fn loaded(&self) -> Option<(PlaybackArtifact, PlayOptions)> {
        self.state.lock().loaded.clone()
    }
}

#[async_trait]
impl PlaybackEngine for TimelineEngine {
    async fn seek_to(&self, position: f64) -> Result<(), PlaybackError> {
        let mut state = self.state.lock();
        state.offset = position.max(0.0);
        if state.playing && !state.paused {
            state.started = Some(Instant::now());
        }
        Ok(())
    }

    async fn start_playback(
        &self,
        artifact: &PlaybackArtifact,
        options: &PlayOptions,
    ) -> Result<(), PlaybackError> {
        let mut state = self.state.lock();
        state.loaded = Some((artifact.clone(), options.clone()));
        state.playing = true;
        state.paused = false;
        state.started = Some(Instant::now());
        Ok(())
    }

    async fn pause_or_resume(&self) -> Result<(), PlaybackError> {
        let mut state = self.state.lock();
        if !state.playing {
            return Err(PlaybackError::NothingLoaded);
        }
        if state.paused {
            state.paused = false;
            state.started = Some(Instant::now());
        } else {
            state.offset = state.position();
            state.paused = true;
            state.started = None;
        }
        Ok(())
    }

    async fn stop(&self) -> Result<(), PlaybackError> {
        let mut state = self.state.lock();
        state.playing = false;
        state.paused = false;
        state.offset = 0.0;
        state.started = None;
        Ok(())
    }

    fn current_position(&self) -> f64 {
        self.state.lock().position()
    }

    fn is_paused(&self) -> bool {
        self.state.lock().paused
    }
}
