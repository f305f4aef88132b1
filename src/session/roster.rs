use std::path::Path;

use tracing::{info, warn};

use super::BandSession;
use crate::{
    common::types::{PeerId, TrackId},
    protocol::{PeerRecord, PlayMode, SongRef, Track, WireMessage},
};

impl BandSession {
    /// Host side: admit the sender, hand it the whole room, and announce it.
    pub(super) fn on_join(&mut self, from: &PeerId, name: String) {
        let record = PeerRecord::member(from.clone(), name);
        info!("{} joined as {}", from, record.name);
        self.directory.upsert(record.clone());

        self.send_to(
            from,
            &WireMessage::RoomState {
                peers: self.directory.peers().to_vec(),
                tracks: self.tracks.clone(),
                mode: Some(self.info.play_mode),
                song: self.song.as_ref().map(|song| song.song_ref()),
            },
        );
        if let Some(song) = &self.song {
            if let Some(payload) = &song.payload {
                self.send_to(
                    from,
                    &WireMessage::SongData {
                        filename: song.filename.clone(),
                        file_data: payload.clone(),
                    },
                );
            }
        }

        self.broadcast(&WireMessage::PeerJoined { peer: record }, Some(from));
    }

    pub(super) async fn on_room_state(
        &mut self,
        peers: Vec<PeerRecord>,
        tracks: Vec<Track>,
        mode: Option<PlayMode>,
        song: Option<SongRef>,
    ) {
        self.directory.replace(peers);
        self.tracks = tracks;
        if let Some(mode) = mode {
            self.info.play_mode = mode;
        }
        if let Some(song) = song {
            self.on_song_select(song.name, song.filename).await;
        }
    }

    pub(super) fn on_peer_joined(&mut self, peer: PeerRecord) {
        self.directory.upsert(peer);
    }

    pub(super) fn on_peer_left(&mut self, peer: &PeerId) {
        self.directory.remove(peer);
    }

    pub(super) fn on_track_assign(&mut self, peer: &PeerId, track_id: Option<TrackId>) {
        self.directory.set_track(peer, track_id);
        if self.is_self(peer) {
            self.my_track_id = track_id;
        }
    }

    pub(super) fn on_slot_assign(&mut self, peer: &PeerId, slot: Option<u32>) {
        self.directory.set_slot(peer, slot);
        if self.is_self(peer) {
            self.my_slot = slot;
        }
    }

    pub fn assign_track(&mut self, peer: &PeerId, track_id: Option<TrackId>) {
        if !self.is_host() {
            return;
        }
        self.on_track_assign(peer, track_id);
        self.broadcast(
            &WireMessage::TrackAssign {
                peer_id: peer.clone(),
                track_id,
            },
            None,
        );
    }

    pub fn assign_slot(&mut self, peer: &PeerId, slot: Option<u32>) {
        if !self.is_host() {
            return;
        }
        self.on_slot_assign(peer, slot);
        self.broadcast(
            &WireMessage::SlotAssign {
                peer_id: peer.clone(),
                slot,
            },
            None,
        );
    }

    /// Gives every peer, host included, its position in the directory as
    /// its slot.
    pub fn auto_assign_slots(&mut self) {
        if !self.is_host() {
            return;
        }
        let ids: Vec<PeerId> = self.directory.peers().iter().map(|p| p.id.clone()).collect();
        for (slot, id) in ids.iter().enumerate() {
            self.assign_slot(id, Some(slot as u32));
        }
    }

    /// Switching to split mode reassigns every slot.
    pub fn set_play_mode(&mut self, mode: PlayMode) {
        if !self.is_host() {
            return;
        }
        self.info.play_mode = mode;
        self.broadcast(&WireMessage::ModeChange { mode }, None);
        if mode == PlayMode::Split {
            self.auto_assign_slots();
        }
    }

    /// Replaces the track inventory; the host also pushes it to members.
    pub fn set_available_tracks(&mut self, tracks: Vec<Track>) {
        self.tracks = tracks;
        if self.is_host() {
            self.broadcast(
                &WireMessage::TracksUpdate {
                    tracks: self.tracks.clone(),
                },
                None,
            );
        }
    }

    /// Host side: read the tracks of `path` and publish them. On failure the
    /// current inventory stays and an empty list is returned.
    pub async fn load_tracks_from_file(&mut self, path: &Path) -> Vec<Track> {
        if !self.is_host() {
            return Vec::new();
        }
        match self.inspector.extract_tracks(path).await {
            Ok(tracks) => {
                self.set_available_tracks(tracks.clone());
                tracks
            }
            Err(e) => {
                warn!("{}", e);
                Vec::new()
            }
        }
    }
}
