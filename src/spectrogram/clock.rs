use std::time::Duration;

/// Fixed-cadence slice scheduler fed with variable frame deltas.
///
/// Elapsed time accumulates; each [`SliceClock::next_slice`] that returns
/// `true` consumes one interval, so a long frame drains several captures.
#[derive(Debug, Clone)]
pub struct SliceClock {
    interval: f64,
    accumulator: f64,
}

impl SliceClock {
    pub fn new(slices_per_second: u32) -> Self {
        Self {
            interval: 1.0 / slices_per_second.max(1) as f64,
            accumulator: 0.0,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(self.interval)
    }

    pub fn advance(&mut self, elapsed: Duration) {
        self.accumulator += elapsed.as_secs_f64();
    }

    pub fn next_slice(&mut self) -> bool {
        if self.accumulator >= self.interval {
            self.accumulator -= self.interval;
            true
        } else {
            false
        }
    }
}
