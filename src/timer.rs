//! The timer track: a background thread that sleeps for the computed
//! per-move budget, then signals the searcher's [`StopFlag`].
//!
//! This is the only concurrency the engine needs: the searcher and the
//! timer never touch shared mutable state beyond the flag itself.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::sync::StopFlag;

#[inline]
fn duration_until(deadline: Instant) -> Option<Duration> {
    let now = Instant::now();
    (deadline > now).then(|| deadline - now)
}

/// A timer that signals a [`StopFlag`] once `duration` has elapsed.
pub struct DeadlineTimer {
    handle: Option<JoinHandle<()>>,
}

impl DeadlineTimer {
    /// Starts a timer for `duration`, or returns `None` (no timer needed)
    /// if `duration` is zero.
    #[must_use]
    pub fn start(duration: Duration, stop_flag: StopFlag) -> Option<Self> {
        if duration.is_zero() {
            return None;
        }
        let handle = thread::spawn(move || {
            thread::sleep(duration);
            stop_flag.stop();
        });
        Some(DeadlineTimer {
            handle: Some(handle),
        })
    }

    /// Starts a timer for an absolute `deadline`. If the deadline has
    /// already passed, stops `stop_flag` immediately and returns `None`.
    #[must_use]
    pub fn start_at(deadline: Instant, stop_flag: StopFlag) -> Option<Self> {
        match duration_until(deadline) {
            Some(d) => Self::start(d, stop_flag),
            None => {
                stop_flag.stop();
                None
            }
        }
    }

    /// Blocks until the timer thread has finished (fired or not). Only
    /// used by tests; production code uses [`DeadlineTimer::cancel`] so a
    /// search that finished early isn't held up by a timer still asleep
    /// for the rest of its original budget.
    pub fn wait(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    /// Drops the timer without waiting for its thread to finish. The
    /// thread keeps sleeping and then exits quietly; it holds its own
    /// clone of the stop flag, so letting it run to completion after the
    /// search is done is harmless.
    pub fn cancel(mut self) {
        self.handle.take();
    }
}

impl Drop for DeadlineTimer {
    fn drop(&mut self) {
        // Don't join here either: dropping a `DeadlineTimer` must never
        // block on the sleeping thread.
    }
}
