//! Spacing between consecutive calls to the hosting platform.
//!
//! The reconciler calls [`Throttle::wait`] before every remote call. The
//! production gate sleeps until a minimum interval has passed since the
//! previous call; tests inject [`Unthrottled`].

use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

pub trait Throttle {
    /// Block until the next remote call may proceed.
    fn wait(&mut self);
}

/// Minimum-interval gate backed by the system clock.
#[derive(Debug)]
pub struct IntervalGate {
    min_interval: Duration,
    last: Option<Instant>,
}

impl IntervalGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: None,
        }
    }

    /// Time still to wait at `now`, zero for the first call.
    fn remaining(&self, now: Instant) -> Duration {
        match self.last {
            Some(last) => self
                .min_interval
                .saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }
}

impl Throttle for IntervalGate {
    fn wait(&mut self) {
        let pause = self.remaining(Instant::now());
        if !pause.is_zero() {
            debug!(pause_ms = pause.as_millis() as u64, "throttling remote call");
            thread::sleep(pause);
        }
        self.last = Some(Instant::now());
    }
}

/// No spacing at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unthrottled;

impl Throttle for Unthrottled {
    fn wait(&mut self) {}
}

impl<T: Throttle + ?Sized> Throttle for &mut T {
    fn wait(&mut self) {
        (**self).wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_call_does_not_wait() {
        let gate = IntervalGate::new(Duration::from_millis(500));
        assert_eq!(gate.remaining(Instant::now()), Duration::ZERO);
    }

    #[test]
    fn remaining_shrinks_with_elapsed_time() {
        let start = Instant::now();
        let gate = IntervalGate {
            min_interval: Duration::from_millis(500),
            last: Some(start),
        };
        assert_eq!(gate.remaining(start), Duration::from_millis(500));
        assert_eq!(
            gate.remaining(start + Duration::from_millis(200)),
            Duration::from_millis(300)
        );
        assert_eq!(
            gate.remaining(start + Duration::from_secs(2)),
            Duration::ZERO
        );
    }

    #[test]
    fn consecutive_waits_are_spaced() {
        let mut gate = IntervalGate::new(Duration::from_millis(20));
        let start = Instant::now();
        gate.wait();
        gate.wait();
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
