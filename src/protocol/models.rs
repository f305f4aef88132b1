use serde::{Deserialize, Serialize};

use crate::common::types::{PeerId, TrackId};

/// One participant as seen by the membership directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerRecord {
    pub id: PeerId,
    pub name: String,
    /// Estimated one-way latency in milliseconds.
    #[serde(rename = "latency", default)]
    pub latency_ms: u64,
    #[serde(default)]
    pub track_id: Option<TrackId>,
    #[serde(default)]
    pub slot: Option<u32>,
    #[serde(default)]
    pub is_host: bool,
    #[serde(default)]
    pub ready: bool,
}

impl PeerRecord {
    /// The host's own record. The host is always ready.
    pub fn host(name: impl Into<String>) -> Self {
        Self {
            id: PeerId::host(),
            name: name.into(),
            latency_ms: 0,
            track_id: None,
            slot: None,
            is_host: true,
            ready: true,
        }
    }

    pub fn member(id: PeerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            latency_ms: 0,
            track_id: None,
            slot: None,
            is_host: false,
            ready: false,
        }
    }
}

/// A selectable musical part of the shared artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: TrackId,
    pub name: String,
    #[serde(default)]
    pub note_count: u32,
}

/// How material is distributed between players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayMode {
    /// Notes are auto-distributed by slot index.
    #[default]
    Split,
    /// Each player plays the track assigned to them.
    Track,
}

impl std::fmt::Display for PlayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Split => write!(f, "split"),
            Self::Track => write!(f, "track"),
        }
    }
}

/// Name and filename of the selected song, as announced to members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongRef {
    pub name: String,
    pub filename: String,
}

/// Base64 text of a media artifact, as carried by `song_data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaPayload(pub String);

impl MediaPayload {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
