use std::time::Duration;

use tokio::time::Instant;

use crate::backend::PlaybackBackend;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(500);
pub const MIN_TICK_INTERVAL: Duration = Duration::from_millis(250);
pub const MAX_TICK_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineSample {
    pub position_ms: u64,
    pub duration_ms: u64,
}

/// Periodic position sampler.
///
/// The broadcaster does not own a timer task. It only keeps the deadline of
/// its next tick; the runtime sleeps until that deadline on the same task that
/// handles commands, and calls [`TimelineBroadcaster::reschedule`] after each
/// tick. Stopping drops the deadline, so a stopped broadcaster costs nothing.
#[derive(Debug)]
pub struct TimelineBroadcaster {
    interval: Duration,
    next_due: Option<Instant>,
}

impl TimelineBroadcaster {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.clamp(MIN_TICK_INTERVAL, MAX_TICK_INTERVAL),
            next_due: None,
        }
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.next_due
    }

    /// Arm the first tick. A running broadcaster keeps its current deadline.
    pub fn start(&mut self) {
        if self.next_due.is_none() {
            self.next_due = Some(Instant::now() + self.interval);
        }
    }

    pub fn stop(&mut self) {
        self.next_due = None;
    }

    /// Schedule the tick after the one that just fired.
    pub fn reschedule(&mut self) {
        if self.next_due.is_some() {
            self.next_due = Some(Instant::now() + self.interval);
        }
    }

    /// Read position and duration. Unknown or zero durations yield no sample
    /// so the UI never draws a bogus progress bar.
    pub fn sample(backend: &dyn PlaybackBackend) -> Option<TimelineSample> {
        let duration_ms = backend.duration_ms().filter(|d| *d > 0)?;
        Some(TimelineSample {
            position_ms: backend.position_ms(),
            duration_ms,
        })
    }
}

impl Default for TimelineBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_INTERVAL)
    }
}
