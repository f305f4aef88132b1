/// Source of wall-clock time shared by every peer in a room.
///
/// Scheduled commands carry absolute timestamps from this clock; peers are
/// assumed to agree on it closely enough that no offset correction is done.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// The local system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        super::types::now_ms()
    }
}
