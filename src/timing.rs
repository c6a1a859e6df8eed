// ============================================
// STEP TIMING
// ============================================
// Usage:
//   let timer = Timer::start("fetch"); ... let elapsed = timer.stop();
//   let out = Timer::measure("build_table", || build(...));
// ============================================

use std::time::{Duration, Instant};
use tracing::info;

/// Measures one pipeline step and logs it through `tracing`.
pub struct Timer {
    name: String,
    start: Instant,
    stopped: bool,
}

impl Timer {
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: Instant::now(),
            stopped: false,
        }
    }

    /// Stop the timer and log the result
    pub fn stop(mut self) -> Duration {
        let duration = self.start.elapsed();
        self.log_duration(duration);
        self.stopped = true;
        duration
    }

    fn log_duration(&self, duration: Duration) {
        let ms = duration.as_millis();
        info!(
            step = %self.name,
            elapsed_ms = ms as u64,
            speed = Self::speed_label(ms),
            "Step finished"
        );
    }

    fn speed_label(ms: u128) -> &'static str {
        match ms {
            0..=100 => "fast",
            101..=1000 => "ok",
            1001..=5000 => "slow",
            _ => "very slow",
        }
    }

    /// Time a synchronous closure
    pub fn measure<F, R>(name: impl Into<String>, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let timer = Self::start(name);
        let result = f();
        timer.stop();
        result
    }
}

// Steps that exit early through `?` still get logged
impl Drop for Timer {
    fn drop(&mut self) {
        if !self.stopped {
            let duration = self.start.elapsed();
            self.log_duration(duration);
        }
    }
}
