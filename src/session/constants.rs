/// Room code alphabet. `0`, `O`, `1` and `I` are left out because they are
/// easy to confuse when a code is read aloud or copied by hand.
pub const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub const ROOM_CODE_LEN: usize = 6;

/// Default prefix joined with the room code to form the host's address.
pub const RENDEZVOUS_PREFIX: &str = "wwm-";

/// How long a member waits for the host channel to open.
pub const JOIN_TIMEOUT_MS: u64 = 10_000;

/// Period of the per-channel latency ping.
pub const PING_INTERVAL_MS: u64 = 2_000;

/// Period of the host's drift-correction pulse.
pub const SYNC_PULSE_INTERVAL_MS: u64 = 5_000;

pub const PLAY_BUFFER_PAD_MS: u64 = 100;
pub const PLAY_BUFFER_FLOOR_MS: u64 = 300;
pub const SEEK_BUFFER_PAD_MS: u64 = 50;
pub const SEEK_BUFFER_FLOOR_MS: u64 = 150;

pub const DEFAULT_HOST_DELAY_MS: u64 = 300;
pub const MAX_HOST_DELAY_MS: u64 = 500;
