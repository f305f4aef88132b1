use tracing::{debug, info, warn};

use super::{
    BandSession, SelectedSong,
    constants::{MAX_HOST_DELAY_MS, SYNC_PULSE_INTERVAL_MS},
    timers::{self, TimerEvent},
};
use crate::{
    common::errors::PlaybackError,
    playback::{LocalAction, PlayOptions, delay_until, play_buffer_ms, seek_buffer_ms},
    protocol::{PlayCommand, SeekCommand, SyncPulse, WireMessage},
};

impl BandSession {
    /// Host side: start everyone at `position` once the slowest member has
    /// had time to hear about it. Returns the broadcast command.
    pub async fn play(&mut self, position: f64) -> Option<PlayCommand> {
        if !self.is_host() {
            return None;
        }

        let buffer = play_buffer_ms(self.directory.max_latency());
        let command = PlayCommand {
            start_at: self.now_ms() + buffer,
            position,
            mode: self.info.play_mode,
            total_players: self.directory.len() as u32,
        };
        info!(
            "Play at {} from {:.2}s ({}ms buffer, {} players)",
            command.start_at, position, buffer, command.total_players
        );

        self.broadcast(&WireMessage::Play(command.clone()), None);
        self.on_play(command.clone()).await;
        if !self.coordinator.sync_pulse_running() {
            self.start_sync_pulse();
        }
        Some(command)
    }

    /// Host side: pause everyone.
    pub async fn pause(&mut self) {
        if !self.is_host() {
            return;
        }
        self.broadcast(
            &WireMessage::Pause {
                timestamp: self.now_ms(),
            },
            None,
        );
        self.on_pause().await;
    }

    /// Host side: stop everyone and reopen the ready gate.
    pub async fn stop(&mut self) {
        if !self.is_host() {
            return;
        }
        self.broadcast(&WireMessage::Stop, None);
        self.on_stop().await;
        self.reset_ready_gate();
        self.stop_sync_pulse();
    }

    /// Host side: move everyone to `position`. Returns the broadcast command.
    pub async fn seek(&mut self, position: f64) -> Option<SeekCommand> {
        if !self.is_host() {
            return None;
        }

        let command = SeekCommand {
            seek_at: self.now_ms() + seek_buffer_ms(self.directory.max_latency()),
            position,
        };
        self.broadcast(&WireMessage::Seek(command.clone()), None);
        self.on_seek(command.clone()).await;
        Some(command)
    }

    /// Sets the extra delay the host applies to its own scheduled commands.
    /// Returns the value actually stored.
    pub fn set_host_delay(&mut self, delay_ms: u64) -> u64 {
        self.host_delay_ms = delay_ms.min(MAX_HOST_DELAY_MS);
        self.host_delay_ms
    }

    /// Host side: broadcast the playback position every
    /// [`SYNC_PULSE_INTERVAL_MS`]. Restarts the period if already running.
    pub fn start_sync_pulse(&mut self) -> bool {
        if !self.is_host() {
            return false;
        }
        let Some(link) = self.link.as_ref() else {
            return false;
        };
        let token = link.cancel.child_token();
        timers::spawn_interval(
            link.timer_tx.clone(),
            SYNC_PULSE_INTERVAL_MS,
            token.clone(),
            || TimerEvent::SyncPulse,
        );
        self.coordinator.set_sync_pulse(token);
        debug!("Sync pulse started");
        true
    }

    pub fn stop_sync_pulse(&mut self) -> bool {
        self.coordinator.cancel_sync_pulse()
    }

    pub(super) async fn on_play(&mut self, command: PlayCommand) {
        let host_offset = if self.is_host() { self.host_delay_ms } else { 0 };
        let delay = delay_until(command.start_at, self.now_ms(), host_offset);

        let Some(artifact) = self.song.as_ref().and_then(SelectedSong::artifact) else {
            warn!("Play requested with no song available locally");
            return;
        };
        let options = PlayOptions {
            mode: command.mode,
            slot: self.my_slot.unwrap_or(0),
            total_players: command.total_players,
            track_id: self.my_track_id,
        };
        debug!(
            "Play in {}ms (host offset {}ms), slot {}/{}",
            delay, host_offset, options.slot, options.total_players
        );

        self.schedule(
            LocalAction::Start {
                position: command.position,
                artifact,
                options,
            },
            delay,
        )
        .await;
    }

    pub(super) async fn on_seek(&mut self, command: SeekCommand) {
        let delay = delay_until(command.seek_at, self.now_ms(), 0);
        self.schedule(
            LocalAction::Seek {
                position: command.position,
            },
            delay,
        )
        .await;
    }

    pub(super) async fn on_pause(&mut self) {
        if self.engine.is_paused() {
            return;
        }
        match self.engine.pause_or_resume().await {
            Ok(()) => {}
            Err(PlaybackError::NothingLoaded) => debug!("Pause with nothing playing"),
            Err(e) => warn!("Failed to pause: {}", e),
        }
    }

    pub(super) async fn on_stop(&mut self) {
        if let Err(e) = self.engine.stop().await {
            warn!("Failed to stop playback: {}", e);
        }
        self.coordinator.stopped();
        self.my_ready = false;
    }

    /// Member side: remember the pulse and let the corrector decide whether
    /// local playback has drifted too far.
    pub(super) async fn on_sync(&mut self, pulse: SyncPulse) {
        if self.is_host() {
            return;
        }
        let target = self.coordinator.receive_pulse(
            pulse,
            self.engine.current_position(),
            self.engine.is_paused(),
            self.now_ms(),
        );
        if let Some(position) = target {
            debug!("Correcting drift, seeking to {:.3}s", position);
            if let Err(e) = self.engine.seek_to(position).await {
                warn!("Drift correction failed: {}", e);
            }
        }
    }

    pub(super) fn on_sync_tick(&self) {
        if !self.coordinator.sync_pulse_running() {
            return;
        }
        self.broadcast(
            &WireMessage::Sync(SyncPulse {
                position: self.engine.current_position(),
                timestamp: self.now_ms(),
            }),
            None,
        );
    }

    /// Runs `action` after `delay_ms`, or right away once the deadline has
    /// already passed here.
    async fn schedule(&mut self, action: LocalAction, delay_ms: i64) {
        if delay_ms <= 0 {
            self.execute(action).await;
            return;
        }
        let Some(link) = self.link.as_ref() else {
            return;
        };

        let token = link.cancel.child_token();
        match action {
            LocalAction::Start { .. } => self.coordinator.schedule_start(token.clone()),
            LocalAction::Seek { .. } => self.coordinator.schedule_seek(token.clone()),
        }
        timers::spawn_delay(
            link.timer_tx.clone(),
            delay_ms as u64,
            token.clone(),
            TimerEvent::Execute { action, token },
        );
    }

    pub(super) async fn execute(&mut self, action: LocalAction) {
        match action {
            LocalAction::Start {
                position,
                artifact,
                options,
            } => {
                if let Err(e) = self.engine.seek_to(position).await {
                    warn!("Failed to seek before start: {}", e);
                }
                match self.engine.start_playback(&artifact, &options).await {
                    Ok(()) => {
                        info!("Playing {} from {:.2}s", artifact.name, position);
                        self.coordinator.started();
                    }
                    Err(e) => warn!("Failed to start {}: {}", artifact.name, e),
                }
            }
            LocalAction::Seek { position } => {
                if let Err(e) = self.engine.seek_to(position).await {
                    warn!("Failed to seek to {:.2}s: {}", position, e);
                }
                self.coordinator.seeked();
            }
        }
    }
}
