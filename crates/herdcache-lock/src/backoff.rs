//! Jittered exponential backoff for lock contention.

use std::time::Duration;

use rand::Rng;

/// Produces the delays between acquisition attempts.
///
/// Each delay is drawn uniformly from `[base / 2, base]` so that contenders
/// that started together drift apart instead of retrying in lockstep.
#[derive(Debug, Clone)]
pub(crate) struct Backoff {
    current: Duration,
    max: Duration,
    multiplier: f64,
}

impl Backoff {
    pub(crate) fn new(initial: Duration, max: Duration, multiplier: f64) -> Self {
        Self {
            current: initial.min(max),
            max,
            multiplier,
        }
    }

    /// Returns the next delay and grows the base for the following one.
    pub(crate) fn next_delay(&mut self) -> Duration {
        let base = self.current;
        self.current = Duration::try_from_secs_f64(base.as_secs_f64() * self.multiplier)
            .map_or(self.max, |next| next.min(self.max));
        jitter(base)
    }
}

fn jitter(base: Duration) -> Duration {
    let half = base / 2;
    let spread = (base - half).as_micros() as u64;
    half + Duration::from_micros(rand::rng().random_range(0..=spread))
}
