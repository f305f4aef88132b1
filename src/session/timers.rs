use tokio::{
    sync::mpsc::UnboundedSender,
    task::JoinHandle,
    time::{Duration, Instant, interval_at, sleep},
};
use tokio_util::sync::CancellationToken;

use crate::{common::types::PeerId, playback::LocalAction};

/// Timer firings delivered back into the session's event pump.
#[derive(Debug)]
pub enum TimerEvent {
    /// The latency probe of this peer is due.
    Ping(PeerId),
    /// The host's drift pulse is due.
    SyncPulse,
    /// A scheduled play or seek reached its deadline. `token` is the one the
    /// coordinator holds for it; a cancelled token means the action is stale.
    Execute {
        action: LocalAction,
        token: CancellationToken,
    },
}

pub type TimerSink = UnboundedSender<TimerEvent>;

/// Sends `make()` every `period_ms`, starting one period from now, until
/// `cancel` fires or the session stops listening.
pub fn spawn_interval<F>(
    tx: TimerSink,
    period_ms: u64,
    cancel: CancellationToken,
    make: F,
) -> JoinHandle<()>
where
    F: Fn() -> TimerEvent + Send + 'static,
{
    tokio::spawn(async move {
        let period = Duration::from_millis(period_ms);
        let mut interval = interval_at(Instant::now() + period, period);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    if tx.send(make()).is_err() {
                        break;
                    }
                }
            }
        }
    })
}

/// Sends `event` once after `delay_ms` unless `cancel` fires first.
pub fn spawn_delay(
    tx: TimerSink,
    delay_ms: u64,
    cancel: CancellationToken,
    event: TimerEvent,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = sleep(Duration::from_millis(delay_ms)) => {
                let _ = tx.send(event);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn test_interval_skips_the_immediate_tick() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let started = Instant::now();
        spawn_interval(tx, 2_000, cancel.clone(), || TimerEvent::SyncPulse);

        assert!(matches!(rx.recv().await, Some(TimerEvent::SyncPulse)));
        assert_eq!(started.elapsed(), Duration::from_millis(2_000));

        cancel.cancel();
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_delay_never_fires() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        spawn_delay(tx, 500, cancel.clone(), TimerEvent::Ping(PeerId::host()));

        cancel.cancel();
        assert!(rx.recv().await.is_none());
    }
}
