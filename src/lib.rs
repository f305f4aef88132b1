//! Peer-to-peer band sessions: one host and a handful of members share a
//! playback timeline over direct channels, with start and seek times
//! compensated for the slowest member's latency.

pub mod common;
pub mod configs;
pub mod media;
pub mod playback;
pub mod protocol;
pub mod session;
pub mod transport;

#[cfg(test)]
mod testing;

pub use common::errors::{MediaError, PlaybackError, SessionError, TransportError};
pub use configs::Config;
pub use session::{BandSession, RoomCode, SessionInfo, SessionStatus};
