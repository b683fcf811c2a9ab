//! Fixed-interval poll scheduler for Podium.
//!
//! Fires once immediately, then every `interval`, with overrun handling and
//! pause/resume support. The leaderboard sync uses it to drive its fetch
//! loop; nothing here knows what is being polled.
//!
//! # Disabled mode
//!
//! When `interval` is zero the scheduler is disabled and
//! [`PollScheduler::wait_for_tick`] pends forever. The caller still gets
//! push updates and on-demand refreshes, just no periodic fetch.
//!
//! # Integration
//!
//! The scheduler is designed to sit inside a task's `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         _ = cancel.cancelled() => break,
//!         tick = scheduler.wait_for_tick() => {
//!             tokio::spawn(fetch(tick.seq));
//!         }
//!     }
//! }
//! ```

use std::time::Duration;

use rand::Rng;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What to do when a tick is observed late (the task was starved, or the
/// process was suspended).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverrunPolicy {
    /// Forget the missed ticks and schedule the next one a full interval
    /// from now. Never bursts.
    #[default]
    Skip,
    /// Keep the original cadence: the next tick stays at
    /// `previous deadline + interval`, even if that is already due.
    FixedCadence,
}

/// Full configuration for the poll scheduler.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Time between polls. Zero disables periodic polling.
    pub interval: Duration,
    pub policy: OverrunPolicy,
    /// Fire the first tick immediately instead of one interval in.
    pub immediate_first: bool,
    /// Random delay (0..max) added before the first tick so many clients
    /// started together don't poll in lockstep. Zero disables it.
    pub initial_jitter: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Self::DEFAULT_INTERVAL,
            policy: OverrunPolicy::default(),
            immediate_first: true,
            initial_jitter: Duration::ZERO,
        }
    }
}

impl PollConfig {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(2_000);
    /// Smallest accepted non-zero interval.
    pub const MIN_INTERVAL: Duration = Duration::from_millis(100);

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    /// Fix out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`PollScheduler::new`]. A non-zero interval
    /// below [`Self::MIN_INTERVAL`] is raised to it.
    pub fn validated(mut self) -> Self {
        if !self.interval.is_zero() && self.interval < Self::MIN_INTERVAL {
            warn!(
                interval_ms = self.interval.as_millis() as u64,
                min_ms = Self::MIN_INTERVAL.as_millis() as u64,
                "poll interval below minimum, clamping"
            );
            self.interval = Self::MIN_INTERVAL;
        }
        self
    }

    pub fn is_disabled(&self) -> bool {
        self.interval.is_zero()
    }
}

// ---------------------------------------------------------------------------
// Tick info
// ---------------------------------------------------------------------------

/// Returned by [`PollScheduler::wait_for_tick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollTick {
    /// Monotonically increasing tick number, starting at 1.
    pub seq: u64,
    /// How far past its deadline the tick fired.
    pub late_by: Duration,
    /// Whole intervals that were skipped because of the delay.
    pub missed: u64,
}

impl PollTick {
    pub fn is_late(&self) -> bool {
        self.missed > 0
    }
}

/// Counters kept across the scheduler's life.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollMetrics {
    pub total_ticks: u64,
    /// Ticks that fired at least one full interval late.
    pub total_late: u64,
    pub total_missed: u64,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Fixed-interval poll scheduler. One per polling task.
pub struct PollScheduler {
    config: PollConfig,
    next_tick: Option<Instant>,
    tick_count: u64,
    paused: bool,
    metrics: PollMetrics,
}

impl PollScheduler {
    pub fn new(config: PollConfig) -> Self {
        let config = config.validated();

        let next_tick = if config.is_disabled() {
            debug!("poll scheduler created disabled (interval 0)");
            None
        } else {
            let first = if config.immediate_first {
                Duration::ZERO
            } else {
                config.interval
            };
            debug!(
                interval_ms = config.interval.as_millis() as u64,
                policy = ?config.policy,
                "poll scheduler created"
            );
            Some(Instant::now() + first + jitter(config.initial_jitter))
        };

        Self {
            config,
            next_tick,
            tick_count: 0,
            paused: false,
            metrics: PollMetrics::default(),
        }
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self::new(PollConfig::with_interval(interval))
    }

    /// Waits until the next poll is due.
    ///
    /// Pends forever while paused or disabled; `tokio::select!` keeps
    /// serving its other branches meanwhile.
    pub async fn wait_for_tick(&mut self) -> PollTick {
        let next = match self.next_tick {
            Some(next) if !self.paused => next,
            _ => std::future::pending().await,
        };
        let interval = self.config.interval;

        time::sleep_until(next).await;

        let now = Instant::now();
        let late_by = now.saturating_duration_since(next);
        let missed = (late_by.as_nanos() / interval.as_nanos()) as u64;
        self.tick_count += 1;

        self.next_tick = Some(match self.config.policy {
            OverrunPolicy::Skip => {
                if missed > 0 {
                    warn!(
                        tick = self.tick_count,
                        missed,
                        late_ms = late_by.as_millis() as u64,
                        "poll fell behind, skipping ahead"
                    );
                }
                now + interval
            }
            OverrunPolicy::FixedCadence => next + interval,
        });

        self.metrics.total_ticks += 1;
        if missed > 0 {
            self.metrics.total_late += 1;
            self.metrics.total_missed += missed;
        }
        trace!(tick = self.tick_count, missed, "poll tick");

        PollTick {
            seq: self.tick_count,
            late_by,
            missed,
        }
    }

    /// Stops ticking until [`resume`](Self::resume). Idempotent.
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            debug!(tick = self.tick_count, "poll scheduler paused");
        }
    }

    /// Resumes with one immediate tick, then the usual cadence.
    ///
    /// Time spent paused never turns into a burst of catch-up ticks.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            if !self.config.is_disabled() {
                self.next_tick = Some(Instant::now());
            }
            debug!(tick = self.tick_count, "poll scheduler resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_disabled(&self) -> bool {
        self.config.is_disabled()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn metrics(&self) -> &PollMetrics {
        &self.metrics
    }

    pub fn interval(&self) -> Duration {
        self.config.interval
    }
}

fn jitter(max: Duration) -> Duration {
    if max.is_zero() {
        return Duration::ZERO;
    }
    let us = rand::rng().random_range(0..max.as_micros().max(1) as u64);
    Duration::from_micros(us)
}
