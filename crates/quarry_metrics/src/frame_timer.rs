//! Frame timing with an optional per-frame budget

use super::ring_buffer::RingBuffer;
use std::time::{Duration, Instant};

/// Rolling frame-time statistics for a fixed-step loop.
pub struct FrameTimer {
    started: Option<Instant>,
    samples: RingBuffer<Duration>,
    budget: Option<Duration>,
    frames: u64,
    over_budget: u64,
}

impl FrameTimer {
    /// Average over the last `window` frames.
    pub fn new(window: usize) -> Self {
        Self {
            started: None,
            samples: RingBuffer::new(window),
            budget: None,
            frames: 0,
            over_budget: 0,
        }
    }

    /// Like [`FrameTimer::new`], also counting frames slower than `budget`.
    pub fn with_budget(window: usize, budget: Duration) -> Self {
        Self {
            budget: Some(budget),
            ..Self::new(window)
        }
    }

    pub fn begin(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Close the frame opened by [`FrameTimer::begin`] and return its length.
    /// Without a matching `begin` nothing is recorded.
    pub fn end(&mut self) -> Duration {
        let Some(started) = self.started.take() else {
            return Duration::ZERO;
        };
        let elapsed = started.elapsed();
        self.samples.push(elapsed);
        self.frames += 1;
        if self.budget.is_some_and(|budget| elapsed > budget) {
            self.over_budget += 1;
        }
        elapsed
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Frames that took longer than the budget.
    pub fn over_budget(&self) -> u64 {
        self.over_budget
    }

    pub fn fps(&self) -> f64 {
        let average = self.samples.average().as_secs_f64();
        if average > 0.0 {
            average.recip()
        } else {
            0.0
        }
    }

    pub fn frame_time_ms(&self) -> f64 {
        self.samples.average().as_secs_f64() * 1000.0
    }

    /// Fastest and slowest frame in the window, in milliseconds.
    pub fn frame_time_range_ms(&self) -> (f64, f64) {
        let (min, max) = self.samples.min_max();
        (min.as_secs_f64() * 1000.0, max.as_secs_f64() * 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_without_begin_records_nothing() {
        let mut timer = FrameTimer::new(8);
        assert_eq!(timer.end(), Duration::ZERO);
        assert_eq!(timer.frames(), 0);
        assert_eq!(timer.fps(), 0.0);
    }

    #[test]
    fn test_budget_overruns_are_counted() {
        let mut timer = FrameTimer::with_budget(8, Duration::ZERO);
        timer.begin();
        std::thread::sleep(Duration::from_millis(1));
        let elapsed = timer.end();

        assert!(elapsed >= Duration::from_millis(1));
        assert_eq!(timer.frames(), 1);
        assert_eq!(timer.over_budget(), 1);
        let (min, max) = timer.frame_time_range_ms();
        assert!(min >= 1.0 && min <= max);
    }
}
