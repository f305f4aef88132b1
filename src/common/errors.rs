use thiserror::Error;

/// Failures surfaced by the room lifecycle (`create_room` / `join_room`).
///
/// Everything that goes wrong once a room is established is logged and
/// absorbed instead; only these reach the caller.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The join timeout elapsed, or the transport reported the rendezvous
    /// address as unreachable.
    #[error("room not found")]
    RoomNotFound,
    #[error("connection error: {0}")]
    Connection(#[from] TransportError),
    #[error("already in a room")]
    AlreadyInRoom,
}

/// Errors reported by a [`crate::transport::Transport`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("peer unavailable: {0}")]
    PeerUnavailable(String),
    #[error("address already in use: {0}")]
    AddressInUse(String),
    #[error("channel closed")]
    ChannelClosed,
    #[error("endpoint failure: {0}")]
    Endpoint(String),
}

/// Errors from the media collaborators. Never fatal to a session.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("failed to read media {path}: {reason}")]
    Read { path: String, reason: String },
    #[error("failed to persist media {filename}: {reason}")]
    Persist { filename: String, reason: String },
    #[error("failed to inspect tracks of {path}: {reason}")]
    Inspect { path: String, reason: String },
}

/// Errors from the playback engine. Logged by the coordinator.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("no artifact loaded")]
    NothingLoaded,
    #[error("engine failure: {0}")]
    Engine(String),
}
