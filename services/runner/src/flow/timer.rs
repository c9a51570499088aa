//! services/runner/src/flow/timer.rs
//!
//! The session countdown clock. Ticks once per second for the quiz's time
//! limit, publishes the remaining seconds, and fires a one-shot expiry
//! signal when the countdown reaches zero. The timer is cancelled the
//! moment submission begins so a completed submission can never be
//! overwritten by a late timeout signal.

use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Handle to a running countdown. Dropping the handle does not stop the
/// clock; call [`SessionTimer::stop`] when submission begins.
pub struct SessionTimer {
    cancel: CancellationToken,
    remaining: watch::Receiver<u64>,
}

impl SessionTimer {
    /// Starts the countdown and returns the expiry signal alongside the
    /// handle. The signal resolves at most once; if the timer is stopped
    /// first, the sender is dropped and the receiver resolves to an error
    /// instead.
    pub fn start(limit: Duration) -> (Self, oneshot::Receiver<()>) {
        let total = limit.as_secs();
        let (remaining_tx, remaining_rx) = watch::channel(total);
        let (expiry_tx, expiry_rx) = oneshot::channel();
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        tokio::spawn(async move {
            let mut remaining = total;
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            // The first tick of a tokio interval completes immediately.
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!("Session timer stopped with {remaining}s remaining.");
                        return;
                    }
                    _ = interval.tick() => {
                        remaining = remaining.saturating_sub(1);
                        let _ = remaining_tx.send(remaining);
                        if remaining == 0 {
                            debug!("Session time limit reached.");
                            let _ = expiry_tx.send(());
                            return;
                        }
                    }
                }
            }
        });

        (
            Self {
                cancel,
                remaining: remaining_rx,
            },
            expiry_rx,
        )
    }

    /// Seconds left on the clock.
    pub fn remaining_seconds(&self) -> u64 {
        *self.remaining.borrow()
    }

    /// A receiver that observes every per-second update.
    pub fn subscribe_remaining(&self) -> watch::Receiver<u64> {
        self.remaining.clone()
    }

    /// Stops the countdown immediately. Idempotent.
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

/// Renders seconds as `m:ss` for the countdown and elapsed-time displays.
pub fn format_clock(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn expiry_fires_exactly_once_at_zero() {
        let (timer, expiry) = SessionTimer::start(Duration::from_secs(3));
        // The oneshot can resolve at most once by construction; receiving
        // it proves the countdown ran to zero.
        expiry.await.expect("timer should signal expiry");
        assert_eq!(timer.remaining_seconds(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn remaining_decrements_once_per_second() {
        let (timer, _expiry) = SessionTimer::start(Duration::from_secs(5));
        let mut remaining = timer.subscribe_remaining();

        remaining.changed().await.unwrap();
        assert_eq!(*remaining.borrow(), 4);
        remaining.changed().await.unwrap();
        assert_eq!(*remaining.borrow(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_prevents_the_expiry_signal() {
        let (timer, expiry) = SessionTimer::start(Duration::from_secs(2));
        let mut remaining = timer.subscribe_remaining();
        remaining.changed().await.unwrap();

        timer.stop();
        // The sender is dropped without signaling.
        assert!(expiry.await.is_err());
    }

    #[test]
    fn clock_formats_with_padded_seconds() {
        assert_eq!(format_clock(0), "0:00");
        assert_eq!(format_clock(65), "1:05");
        assert_eq!(format_clock(600), "10:00");
    }
}
