use tracing::{debug, trace, warn};

use super::{BandSession, Role};
use crate::{common::types::PeerId, protocol::WireMessage};

/// What the router did with one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    Applied,
    /// Dropped without touching any state.
    Ignored(&'static str),
}

impl BandSession {
    /// Decodes and routes one payload received from `from`.
    pub(crate) async fn route(&mut self, from: &PeerId, payload: &str) -> RouteOutcome {
        match WireMessage::decode(payload) {
            Ok(message) => self.route_message(from, message).await,
            Err(e) => {
                warn!("Dropping malformed message from {}: {}", from, e);
                RouteOutcome::Ignored("malformed")
            }
        }
    }

    pub(crate) async fn route_message(
        &mut self,
        from: &PeerId,
        message: WireMessage,
    ) -> RouteOutcome {
        let host = self.info.role == Role::Host;
        if message.host_only() && !host {
            debug!("Ignoring {} from {}: not the host", message.tag(), from);
            return RouteOutcome::Ignored("host only");
        }
        if message.member_only() && host {
            debug!("Ignoring {} from {}: host", message.tag(), from);
            return RouteOutcome::Ignored("member only");
        }
        trace!("Routing {} from {}", message.tag(), from);

        match message {
            WireMessage::Join { name } => self.on_join(from, name),
            WireMessage::RoomState {
                peers,
                tracks,
                mode,
                song,
            } => self.on_room_state(peers, tracks, mode, song).await,
            WireMessage::PeerJoined { peer } => self.on_peer_joined(peer),
            WireMessage::PeerLeft { peer_id } => self.on_peer_left(&peer_id),
            WireMessage::Ping { timestamp } => self.on_ping(from, timestamp),
            WireMessage::Pong { timestamp } => self.on_pong(from, timestamp),
            WireMessage::TrackAssign { peer_id, track_id } => {
                self.on_track_assign(&peer_id, track_id)
            }
            WireMessage::SlotAssign { peer_id, slot } => self.on_slot_assign(&peer_id, slot),
            WireMessage::TracksUpdate { tracks } => self.tracks = tracks,
            WireMessage::ModeChange { mode } => self.info.play_mode = mode,
            WireMessage::Play(command) => self.on_play(command).await,
            WireMessage::Pause { .. } => self.on_pause().await,
            WireMessage::Stop => self.on_stop().await,
            WireMessage::Seek(command) => self.on_seek(command).await,
            WireMessage::Sync(pulse) => self.on_sync(pulse).await,
            WireMessage::RoomClosed => self.on_room_closed().await,
            WireMessage::Ready { ready } => self.on_ready(from, ready),
            WireMessage::ReadyUpdate { peer_id, ready } => self.on_ready_update(&peer_id, ready),
            WireMessage::SongSelect { name, filename } => {
                self.on_song_select(name, filename).await
            }
            WireMessage::SongData {
                filename,
                file_data,
            } => self.on_song_data(filename, file_data).await,
            WireMessage::ReadyReset => self.on_ready_reset(),
            WireMessage::Unknown => {
                trace!("Ignoring unknown message type from {}", from);
                return RouteOutcome::Ignored("unknown type");
            }
        }

        RouteOutcome::Applied
    }
}
