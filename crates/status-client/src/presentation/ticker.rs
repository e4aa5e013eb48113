// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Local uptime clock.
//!
//! The server reports its uptime once; between fetches the dashboard keeps
//! the value moving by adding one second per tick period.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use tokio::sync::Notify;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Wall-clock time represented by one tick.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Owned handle to a repeating uptime tick task.
///
/// The task stops when the handle is stopped or dropped. Once stopped, the
/// reported value is frozen at the moment of the stop. The count saturates
/// at `u64::MAX`.
pub struct UptimeTicker {
    seconds: Arc<AtomicU64>,
    reseeded: Arc<Notify>,
    frozen: Option<u64>,
    cancel_token: CancellationToken,
}

impl std::fmt::Debug for UptimeTicker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UptimeTicker")
            .field("seconds", &self.seconds())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

impl UptimeTicker {
    /// Start ticking from `seed` seconds with the default one second period.
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn start(seed: u64) -> Self {
        Self::with_period(seed, TICK_PERIOD)
    }

    #[must_use]
    pub fn with_period(seed: u64, period: Duration) -> Self {
        let seconds = Arc::new(AtomicU64::new(seed));
        let reseeded = Arc::new(Notify::new());
        let cancel_token = CancellationToken::new();

        let task_seconds = Arc::clone(&seconds);
        let task_reseeded = Arc::clone(&reseeded);
        let task_cancel = cancel_token.clone();

        tokio::spawn(async move {
            // First tick one full period after the seed
            let mut interval = interval_at(Instant::now() + period, period);
            // Catch up after a stalled runtime so the count tracks wall time
            interval.set_missed_tick_behavior(MissedTickBehavior::Burst);

            debug!("Uptime ticker started at {}s", seed);

            loop {
                tokio::select! {
                    biased;

                    () = task_cancel.cancelled() => {
                        debug!("Uptime ticker stopped");
                        return;
                    }
                    () = task_reseeded.notified() => {
                        // Next tick one full period after the new seed
                        interval.reset();
                    }
                    _ = interval.tick() => {
                        // Err only when already saturated
                        let _ = task_seconds.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |s| {
                            s.checked_add(1)
                        });
                    }
                }
            }
        });

        Self {
            seconds,
            reseeded,
            frozen: None,
            cancel_token,
        }
    }

    /// Current uptime in seconds.
    #[must_use]
    pub fn seconds(&self) -> u64 {
        self.frozen
            .unwrap_or_else(|| self.seconds.load(Ordering::Relaxed))
    }

    /// Restart the count from a fresh server value, with the next tick one
    /// full period later. Ignored once stopped.
    pub fn reseed(&self, seed: u64) {
        if !self.is_stopped() {
            self.seconds.store(seed, Ordering::Relaxed);
            self.reseeded.notify_one();
        }
    }

    /// Cancel the tick task and freeze the current value.
    pub fn stop(&mut self) {
        if self.frozen.is_none() {
            self.cancel_token.cancel();
            self.frozen = Some(self.seconds.load(Ordering::Relaxed));
        }
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.frozen.is_some()
    }
}

impl Drop for UptimeTicker {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test(start_paused = true)]
    async fn test_seed_is_reported_before_first_tick() {
        let ticker = UptimeTicker::start(42);
        sleep(Duration::from_millis(500)).await;
        assert_eq!(ticker.seconds(), 42);
    }

    #[tokio::test(start_paused = true)]
    async fn test_counts_one_per_second() {
        let ticker = UptimeTicker::start(100);

        sleep(Duration::from_millis(3_500)).await;
        assert_eq!(ticker.seconds(), 103);

        sleep(Duration::from_secs(2)).await;
        assert_eq!(ticker.seconds(), 105);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_decreases() {
        let ticker = UptimeTicker::start(0);
        let mut last = ticker.seconds();

        for _ in 0..10 {
            sleep(Duration::from_millis(650)).await;
            let now = ticker.seconds();
            assert!(now >= last);
            last = now;
        }
        assert_eq!(last, 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_freezes_value() {
        let mut ticker = UptimeTicker::start(10);
        sleep(Duration::from_millis(2_500)).await;

        ticker.stop();
        let frozen = ticker.seconds();
        assert_eq!(frozen, 12);

        sleep(Duration::from_secs(10)).await;
        assert_eq!(ticker.seconds(), frozen);
        assert_eq!(ticker.seconds.load(Ordering::Relaxed), frozen);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reseed() {
        let mut ticker = UptimeTicker::start(10);
        sleep(Duration::from_millis(1_500)).await;

        ticker.reseed(500);
        assert_eq!(ticker.seconds(), 500);

        // The tick due at 2s was rescheduled to 2.5s
        sleep(Duration::from_millis(700)).await;
        assert_eq!(ticker.seconds(), 500);

        sleep(Duration::from_millis(500)).await;
        assert_eq!(ticker.seconds(), 501);

        ticker.stop();
        ticker.reseed(0);
        assert_eq!(ticker.seconds(), 501);
    }

    #[tokio::test(start_paused = true)]
    async fn test_saturates_at_max() {
        let ticker = UptimeTicker::start(u64::MAX - 1);

        sleep(Duration::from_millis(3_500)).await;
        assert_eq!(ticker.seconds(), u64::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn test_independent_tickers() {
        let fast = UptimeTicker::with_period(0, Duration::from_millis(100));
        let mut slow = UptimeTicker::start(0);

        sleep(Duration::from_millis(1_050)).await;
        slow.stop();
        assert_eq!(fast.seconds(), 10);
        assert_eq!(slow.seconds(), 1);

        sleep(Duration::from_millis(1_000)).await;
        assert_eq!(fast.seconds(), 20);
        assert_eq!(slow.seconds(), 1);
    }
}
