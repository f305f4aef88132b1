use tokio_util::sync::CancellationToken;

use super::{
    drift::DriftCorrector,
    engine::{PlayOptions, PlaybackArtifact},
};
use crate::{
    protocol::SyncPulse,
    session::constants::{
        PLAY_BUFFER_FLOOR_MS, PLAY_BUFFER_PAD_MS, SEEK_BUFFER_FLOOR_MS, SEEK_BUFFER_PAD_MS,
    },
};

/// Lead time for a broadcast `play`: twice the worst latency plus padding.
pub fn play_buffer_ms(max_latency_ms: u64) -> u64 {
    (max_latency_ms * 2 + PLAY_BUFFER_PAD_MS).max(PLAY_BUFFER_FLOOR_MS)
}

/// Lead time for a broadcast `seek`.
pub fn seek_buffer_ms(max_latency_ms: u64) -> u64 {
    (max_latency_ms * 2 + SEEK_BUFFER_PAD_MS).max(SEEK_BUFFER_FLOOR_MS)
}

/// How long to wait before executing a command due at `at`. Zero or less
/// means the deadline has passed locally and the command runs right away.
pub fn delay_until(at: u64, now: u64, host_offset_ms: u64) -> i64 {
    at as i64 - now as i64 + host_offset_ms as i64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackPhase {
    #[default]
    Idle,
    /// A play command is waiting for its start time.
    Scheduled,
    Playing,
}

/// Work the engine does once a scheduled deadline arrives.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalAction {
    Start {
        position: f64,
        artifact: PlaybackArtifact,
        options: PlayOptions,
    },
    Seek {
        position: f64,
    },
}

/// Per-peer playback state: phase, pending deadlines, the host's pulse
/// timer and the last pulse a member received.
pub struct PlaybackCoordinator {
    phase: PlaybackPhase,
    pending_start: Option<CancellationToken>,
    pending_seek: Option<CancellationToken>,
    sync_pulse: Option<CancellationToken>,
    last_pulse: Option<SyncPulse>,
    corrector: Box<dyn DriftCorrector>,
}

impl PlaybackCoordinator {
    pub fn new(corrector: Box<dyn DriftCorrector>) -> Self {
        Self {
            phase: PlaybackPhase::Idle,
            pending_start: None,
            pending_seek: None,
            sync_pulse: None,
            last_pulse: None,
            corrector,
        }
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    pub fn last_pulse(&self) -> Option<&SyncPulse> {
        self.last_pulse.as_ref()
    }

    pub fn set_corrector(&mut self, corrector: Box<dyn DriftCorrector>) {
        self.corrector = corrector;
    }

    /// Registers a delayed start, replacing any start still pending.
    pub fn schedule_start(&mut self, token: CancellationToken) {
        if let Some(previous) = self.pending_start.replace(token) {
            previous.cancel();
        }
        self.phase = PlaybackPhase::Scheduled;
    }

    pub fn schedule_seek(&mut self, token: CancellationToken) {
        if let Some(previous) = self.pending_seek.replace(token) {
            previous.cancel();
        }
    }

    /// A start ran. A delayed start still waiting is older and must not
    /// fire after it.
    pub fn started(&mut self) {
        if let Some(pending) = self.pending_start.take() {
            pending.cancel();
        }
        self.phase = PlaybackPhase::Playing;
    }

    pub fn seeked(&mut self) {
        if let Some(pending) = self.pending_seek.take() {
            pending.cancel();
        }
    }

    /// Back to idle, dropping any deadline that has not fired yet.
    pub fn stopped(&mut self) {
        for token in [self.pending_start.take(), self.pending_seek.take()]
            .into_iter()
            .flatten()
        {
            token.cancel();
        }
        self.phase = PlaybackPhase::Idle;
    }

    pub fn sync_pulse_running(&self) -> bool {
        self.sync_pulse.is_some()
    }

    pub fn set_sync_pulse(&mut self, token: CancellationToken) {
        if let Some(previous) = self.sync_pulse.replace(token) {
            previous.cancel();
        }
    }

    pub fn cancel_sync_pulse(&mut self) -> bool {
        match self.sync_pulse.take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Stores the pulse and asks the corrector for a target position.
    /// Corrections only apply while actually playing.
    pub fn receive_pulse(
        &mut self,
        pulse: SyncPulse,
        local_position: f64,
        paused: bool,
        now_ms: u64,
    ) -> Option<f64> {
        let target = if self.phase == PlaybackPhase::Playing && !paused {
            self.corrector.correct(&pulse, local_position, now_ms)
        } else {
            None
        };
        self.last_pulse = Some(pulse);
        target
    }

    /// Cancels every timer and forgets all state.
    pub fn reset(&mut self) {
        self.stopped();
        self.cancel_sync_pulse();
        self.last_pulse = None;
    }
}
