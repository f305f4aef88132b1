use serde::{Deserialize, Serialize};

use super::models::{MediaPayload, PeerRecord, PlayMode, SongRef, Track};
use crate::common::types::{PeerId, TrackId};

/// Start playback at `position` once the shared clock reaches `start_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayCommand {
    /// Absolute wall-clock timestamp in milliseconds.
    pub start_at: u64,
    /// Position in seconds.
    pub position: f64,
    #[serde(default)]
    pub mode: PlayMode,
    #[serde(default = "default_total_players")]
    pub total_players: u32,
}

/// Jump to `position` once the shared clock reaches `seek_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeekCommand {
    pub seek_at: u64,
    pub position: f64,
}

/// Periodic report of the host's playback position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncPulse {
    pub position: f64,
    pub timestamp: u64,
}

fn default_total_players() -> u32 {
    1
}

/// Every message exchanged over a peer channel.
///
/// Tags that this build does not know decode to [`WireMessage::Unknown`]
/// and are dropped by the router, so newer peers can add message types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireMessage {
    Join {
        name: String,
    },
    RoomState {
        peers: Vec<PeerRecord>,
        #[serde(default)]
        tracks: Vec<Track>,
        #[serde(default)]
        mode: Option<PlayMode>,
        #[serde(default)]
        song: Option<SongRef>,
    },
    PeerJoined {
        peer: PeerRecord,
    },
    #[serde(rename_all = "camelCase")]
    PeerLeft {
        peer_id: PeerId,
    },
    Ping {
        timestamp: u64,
    },
    Pong {
        timestamp: u64,
    },
    #[serde(rename_all = "camelCase")]
    TrackAssign {
        peer_id: PeerId,
        track_id: Option<TrackId>,
    },
    #[serde(rename_all = "camelCase")]
    SlotAssign {
        peer_id: PeerId,
        slot: Option<u32>,
    },
    TracksUpdate {
        tracks: Vec<Track>,
    },
    ModeChange {
        mode: PlayMode,
    },
    Play(PlayCommand),
    Pause {
        timestamp: u64,
    },
    Stop,
    Seek(SeekCommand),
    Sync(SyncPulse),
    RoomClosed,
    Ready {
        ready: bool,
    },
    #[serde(rename_all = "camelCase")]
    ReadyUpdate {
        peer_id: PeerId,
        ready: bool,
    },
    SongSelect {
        name: String,
        filename: String,
    },
    #[serde(rename_all = "camelCase")]
    SongData {
        filename: String,
        file_data: MediaPayload,
    },
    ReadyReset,
    #[serde(other)]
    Unknown,
}

impl WireMessage {
    /// The wire tag, for logging.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::RoomState { .. } => "room_state",
            Self::PeerJoined { .. } => "peer_joined",
            Self::PeerLeft { .. } => "peer_left",
            Self::Ping { .. } => "ping",
            Self::Pong { .. } => "pong",
            Self::TrackAssign { .. } => "track_assign",
            Self::SlotAssign { .. } => "slot_assign",
            Self::TracksUpdate { .. } => "tracks_update",
            Self::ModeChange { .. } => "mode_change",
            Self::Play(_) => "play",
            Self::Pause { .. } => "pause",
            Self::Stop => "stop",
            Self::Seek(_) => "seek",
            Self::Sync(_) => "sync",
            Self::RoomClosed => "room_closed",
            Self::Ready { .. } => "ready",
            Self::ReadyUpdate { .. } => "ready_update",
            Self::SongSelect { .. } => "song_select",
            Self::SongData { .. } => "song_data",
            Self::ReadyReset => "ready_reset",
            Self::Unknown => "unknown",
        }
    }

    /// Messages only the host acts on.
    pub fn host_only(&self) -> bool {
        matches!(self, Self::Join { .. } | Self::Ready { .. })
    }

    /// Messages only members act on.
    pub fn member_only(&self) -> bool {
        matches!(
            self,
            Self::RoomState { .. }
                | Self::SongSelect { .. }
                | Self::SongData { .. }
                | Self::RoomClosed
        )
    }

    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn decode(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_play_uses_camel_case_fields() {
        let msg = WireMessage::Play(PlayCommand {
            start_at: 1_700_000_000_500,
            position: 12.5,
            mode: PlayMode::Split,
            total_players: 3,
        });
        let value: serde_json::Value = serde_json::from_str(&msg.encode().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "play",
                "startAt": 1_700_000_000_500u64,
                "position": 12.5,
                "mode": "split",
                "totalPlayers": 3
            })
        );
    }

    #[test]
    fn test_decode_peer_record_from_wire() {
        let text = r#"{"type":"peer_joined","peer":{"id":"p-1","name":"Bea","latency":0,"trackId":null,"isHost":false,"ready":false}}"#;
        let msg = WireMessage::decode(text).unwrap();
        let WireMessage::PeerJoined { peer } = msg else {
            panic!("expected peer_joined, got {:?}", msg);
        };
        assert_eq!(peer.id, PeerId::from("p-1"));
        assert_eq!(peer.slot, None);
        assert!(!peer.is_host);
    }

    #[test]
    fn test_unknown_tag_decodes_to_unknown() {
        let msg = WireMessage::decode(r#"{"type":"emoji_reaction","emoji":"🎺"}"#).unwrap();
        assert_eq!(msg, WireMessage::Unknown);
    }

    #[test]
    fn test_play_defaults_mode_and_players() {
        let msg = WireMessage::decode(r#"{"type":"play","startAt":10,"position":0}"#).unwrap();
        let WireMessage::Play(cmd) = msg else {
            panic!("expected play");
        };
        assert_eq!(cmd.mode, PlayMode::Split);
        assert_eq!(cmd.total_players, 1);
    }

    #[test]
    fn test_unit_variants_carry_only_the_tag() {
        assert_eq!(WireMessage::ReadyReset.encode().unwrap(), r#"{"type":"ready_reset"}"#);
        assert_eq!(
            WireMessage::decode(r#"{"type":"room_closed"}"#).unwrap(),
            WireMessage::RoomClosed
        );
    }

    #[test]
    fn test_song_data_field_names() {
        let msg = WireMessage::SongData {
            filename: "waltz.mid".into(),
            file_data: MediaPayload("TVRoZA==".into()),
        };
        let value: serde_json::Value = serde_json::from_str(&msg.encode().unwrap()).unwrap();
        assert_eq!(value["fileData"], "TVRoZA==");
        assert_eq!(value["filename"], "waltz.mid");
    }
}
