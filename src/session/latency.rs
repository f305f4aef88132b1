use tracing::trace;

use super::{
    BandSession,
    constants::PING_INTERVAL_MS,
    timers::{self, TimerEvent},
};
use crate::{common::types::PeerId, protocol::WireMessage};

impl BandSession {
    /// Pings `peer` now and every [`PING_INTERVAL_MS`] after that.
    pub(super) fn start_probe(&mut self, peer: PeerId) {
        self.send_ping(&peer);

        let Some(link) = self.link.as_mut() else {
            return;
        };
        let token = link.cancel.child_token();
        let target = peer.clone();
        timers::spawn_interval(
            link.timer_tx.clone(),
            PING_INTERVAL_MS,
            token.clone(),
            move || TimerEvent::Ping(target.clone()),
        );
        if let Some(previous) = link.probes.insert(peer, token) {
            previous.cancel();
        }
    }

    pub(super) fn stop_probe(&mut self, peer: &PeerId) {
        if let Some(token) = self.link.as_mut().and_then(|link| link.probes.remove(peer)) {
            token.cancel();
        }
    }

    pub(super) fn on_ping_tick(&self, peer: &PeerId) {
        let probing = self
            .link
            .as_ref()
            .is_some_and(|link| link.probes.contains_key(peer));
        if probing {
            self.send_ping(peer);
        }
    }

    fn send_ping(&self, peer: &PeerId) {
        let open = self
            .link
            .as_ref()
            .and_then(|link| link.channel(peer))
            .is_some_and(|channel| channel.is_open());
        if open {
            self.send_to(
                peer,
                &WireMessage::Ping {
                    timestamp: self.now_ms(),
                },
            );
        }
    }

    pub(super) fn on_ping(&self, from: &PeerId, timestamp: u64) {
        self.send_to(from, &WireMessage::Pong { timestamp });
    }

    /// Half the round trip, assuming both directions take as long.
    pub(super) fn on_pong(&mut self, from: &PeerId, timestamp: u64) {
        let round_trip = self.now_ms().saturating_sub(timestamp);
        let latency = (round_trip as f64 / 2.0).round() as u64;
        trace!("Latency to {}: {}ms", from, latency);
        self.directory.set_latency(from, latency);
    }
}
