//! System profiler for timing named update units

use super::ring_buffer::RingBuffer;
use std::collections::HashMap;
use std::time::{Duration, Instant};

const DEFAULT_WINDOW: usize = 60;

/// Timing history for one system.
pub struct SystemTiming {
    last: Duration,
    calls: u64,
    window: RingBuffer<Duration>,
}

impl SystemTiming {
    fn new(window: usize) -> Self {
        Self {
            last: Duration::ZERO,
            calls: 0,
            window: RingBuffer::new(window),
        }
    }

    /// Duration of the most recent run.
    pub fn last(&self) -> Duration {
        self.last
    }

    /// Rolling average over the profiler window.
    pub fn average(&self) -> Duration {
        self.window.average()
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }
}

pub struct SystemProfiler {
    timings: HashMap<String, SystemTiming>,
    window: usize,
}

impl SystemProfiler {
    pub fn new() -> Self {
        Self::with_window(DEFAULT_WINDOW)
    }

    /// Keep a rolling average over the last `window` runs of each system.
    pub fn with_window(window: usize) -> Self {
        Self {
            timings: HashMap::new(),
            window,
        }
    }

    pub fn time_system<F, R>(&mut self, name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        let window = self.window;
        let timing = self
            .timings
            .entry(name.to_string())
            .or_insert_with(|| SystemTiming::new(window));
        timing.last = elapsed;
        timing.calls += 1;
        timing.window.push(elapsed);
        result
    }

    pub fn timing(&self, name: &str) -> Option<&SystemTiming> {
        self.timings.get(name)
    }

    pub fn last(&self, name: &str) -> Duration {
        self.timing(name).map(SystemTiming::last).unwrap_or(Duration::ZERO)
    }

    pub fn average(&self, name: &str) -> Duration {
        self.timing(name).map(SystemTiming::average).unwrap_or(Duration::ZERO)
    }

    pub fn calls(&self, name: &str) -> u64 {
        self.timing(name).map(SystemTiming::calls).unwrap_or(0)
    }

    pub fn reset(&mut self) {
        self.timings.clear();
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.timings.keys().map(String::as_str)
    }
}

impl Default for SystemProfiler {
    fn default() -> Self {
        Self::new()
    }
}
