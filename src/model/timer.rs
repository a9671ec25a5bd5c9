//! Time budget of a solve.

use std::time::Instant;

use log::debug;

/// Tracks elapsed time against a limit.
///
/// The timer never stops anything by itself: strategies poll
/// [`Timer::time_remaining`] and wind down once it is `<= 0`.
#[derive(Debug, Clone, Default)]
pub struct Timer {
    limit: f64,
    start: Option<Instant>,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts counting against `limit` seconds.
    ///
    /// # Panics
    /// Panics unless `limit > 0`.
    pub fn start(&mut self, limit: f64) {
        assert!(limit > 0.0, "time limit {limit} is invalid");
        self.limit = limit;
        self.start = Some(Instant::now());
        debug!("timer started with a limit of {limit}s");
    }

    pub fn limit(&self) -> f64 {
        self.limit
    }

    /// Seconds elapsed since [`Timer::start`], 0 if never started.
    ///
    /// This is wall-clock time measured with [`Instant`], not processor
    /// time: time spent blocked or sleeping counts against the budget.
    pub fn cpu_time(&self) -> f64 {
        self.start
            .map(|start| start.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Seconds left in the budget. Negative once the limit is exceeded.
    pub fn time_remaining(&self) -> f64 {
        self.limit - self.cpu_time()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_remaining_right_after_start() {
        let mut timer = Timer::new();
        timer.start(10.0);
        let remaining = timer.time_remaining();
        assert!(remaining > 9.9 && remaining <= 10.0, "got {remaining}");
    }

    #[test]
    fn test_remaining_goes_negative() {
        let mut timer = Timer::new();
        timer.start(0.01);
        thread::sleep(Duration::from_millis(30));
        assert!(timer.time_remaining() <= 0.0);
        assert!(timer.cpu_time() >= 0.01);
    }

    #[test]
    fn test_elapsed_counts_sleep() {
        let mut timer = Timer::new();
        timer.start(10.0);
        thread::sleep(Duration::from_millis(50));
        assert!(timer.cpu_time() >= 0.05, "got {}", timer.cpu_time());
    }

    #[test]
    fn test_unstarted_timer() {
        let timer = Timer::new();
        assert_eq!(timer.cpu_time(), 0.0);
        assert!(timer.time_remaining() <= 0.0);
    }

    #[test]
    #[should_panic(expected = "time limit 0 is invalid")]
    fn test_zero_limit_panics() {
        Timer::new().start(0.0);
    }

    #[test]
    #[should_panic(expected = "is invalid")]
    fn test_nan_limit_panics() {
        Timer::new().start(f64::NAN);
    }
}
