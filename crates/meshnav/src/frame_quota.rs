//! Per-frame time quota shared by time-sliced searches
//!
//! Each search step is bracketed by [`FrameQuota::start_step`] and
//! [`FrameQuota::end_step`]. The time measured in between is charged to the
//! current frame; once the charge reaches the quota no further step is granted
//! until [`FrameQuota::new_frame`] is called.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use web_time::Instant;

/// Source of monotonic time
pub trait Clock {
    /// Time elapsed since an arbitrary fixed origin
    fn now(&self) -> Duration;
}

/// Wall clock
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that only moves when told to.
///
/// Clones share the same time, so a test can keep one handle and advance the
/// clock while a [`FrameQuota`] owns the other.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves time forward
    pub fn advance(&self, by: Duration) {
        let nanos = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.nanos.fetch_add(nanos, Ordering::Relaxed);
    }

    /// Jumps to an absolute time
    pub fn set(&self, to: Duration) {
        let nanos = u64::try_from(to.as_nanos()).unwrap_or(u64::MAX);
        self.nanos.store(nanos, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::Relaxed))
    }
}

/// Aggregate cost of completed searches
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SearchStatistics {
    pub completed_searches: u64,
    pub total_steps: u64,
    pub peak_steps: u64,
    pub total_time: Duration,
    pub peak_time: Duration,
}

impl SearchStatistics {
    /// Records one completed search
    pub fn record(&mut self, steps: u64, time: Duration) {
        self.completed_searches += 1;
        self.total_steps += steps;
        self.peak_steps = self.peak_steps.max(steps);
        self.total_time += time;
        self.peak_time = self.peak_time.max(time);
    }

    pub fn average_steps(&self) -> f64 {
        if self.completed_searches == 0 {
            return 0.0;
        }
        self.total_steps as f64 / self.completed_searches as f64
    }

    pub fn average_time(&self) -> Duration {
        if self.completed_searches == 0 {
            return Duration::ZERO;
        }
        self.total_time / u32::try_from(self.completed_searches).unwrap_or(u32::MAX)
    }
}

/// Time budget for one frame of search work
#[derive(Debug, Clone)]
pub struct FrameQuota<C: Clock = SystemClock> {
    clock: C,
    /// Zero means unbounded
    quota: Duration,
    consumed: Duration,
    step_started: Option<Duration>,
    stats: SearchStatistics,
}

impl Default for FrameQuota<SystemClock> {
    fn default() -> Self {
        Self::new(SystemClock::default(), Duration::ZERO)
    }
}

impl<C: Clock> FrameQuota<C> {
    /// Creates a quota measured with `clock`; `Duration::ZERO` disables the limit
    pub fn new(clock: C, quota: Duration) -> Self {
        Self {
            clock,
            quota,
            consumed: Duration::ZERO,
            step_started: None,
            stats: SearchStatistics::default(),
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn quota(&self) -> Duration {
        self.quota
    }

    pub fn set_quota(&mut self, quota: Duration) {
        self.quota = quota;
    }

    /// Time charged to the current frame
    pub fn consumed(&self) -> Duration {
        self.consumed
    }

    /// Checks if the current frame still has time left
    pub fn has_budget(&self) -> bool {
        self.quota.is_zero() || self.consumed < self.quota
    }

    /// Opens a step bracket
    pub fn start_step(&mut self) {
        self.step_started = Some(self.clock.now());
    }

    /// Closes the step bracket and charges its duration to the frame
    pub fn end_step(&mut self) -> Duration {
        let Some(started) = self.step_started.take() else {
            return Duration::ZERO;
        };
        let elapsed = self.clock.now().saturating_sub(started);
        self.consumed += elapsed;
        elapsed
    }

    /// Resets the time charged to the frame
    pub fn new_frame(&mut self) {
        self.consumed = Duration::ZERO;
    }

    pub fn stats(&self) -> &SearchStatistics {
        &self.stats
    }

    /// Records a completed search in the aggregate statistics
    pub fn record_search(&mut self, steps: u64, time: Duration) {
        self.stats.record(steps, time);
    }

    pub fn reset_stats(&mut self) {
        self.stats = SearchStatistics::default();
    }
}
