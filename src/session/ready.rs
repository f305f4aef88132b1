use tracing::debug;

use super::BandSession;
use crate::{common::types::PeerId, protocol::WireMessage};

impl BandSession {
    /// Flips our ready flag and tells the host. The host is always ready, so
    /// this does nothing there. Returns the flag after the call.
    pub fn toggle_ready(&mut self) -> bool {
        if self.is_host() || !self.in_room() {
            return self.my_ready;
        }

        self.my_ready = !self.my_ready;
        if let Some(local) = self.local_id().cloned() {
            self.directory.set_ready(&local, self.my_ready);
        }
        self.send_to(
            &PeerId::host(),
            &WireMessage::Ready {
                ready: self.my_ready,
            },
        );
        self.my_ready
    }

    /// True when every member, not counting the host, is ready.
    pub fn all_members_ready(&self) -> bool {
        self.directory.all_members_ready()
    }

    /// Host side: record the sender's flag and relay it to everyone else.
    pub(super) fn on_ready(&mut self, from: &PeerId, ready: bool) {
        if !self.directory.set_ready(from, ready) {
            debug!("Ready from unknown peer {}", from);
            return;
        }
        self.broadcast(
            &WireMessage::ReadyUpdate {
                peer_id: from.clone(),
                ready,
            },
            Some(from),
        );
    }

    pub(super) fn on_ready_update(&mut self, peer: &PeerId, ready: bool) {
        self.directory.set_ready(peer, ready);
        if self.is_self(peer) {
            self.my_ready = ready;
        }
    }

    pub(super) fn on_ready_reset(&mut self) {
        self.my_ready = false;
        self.directory.reset_ready();
    }

    /// Host side: clear every member's flag here and on every peer.
    pub(super) fn reset_ready_gate(&mut self) {
        self.broadcast(&WireMessage::ReadyReset, None);
        self.on_ready_reset();
    }
}
