//! Named per-frame tallies

use std::collections::BTreeMap;

/// Running sum, sample count and peak of one named quantity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub total: u64,
    pub samples: u64,
    pub peak: u64,
}

impl Tally {
    pub fn mean(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.total as f64 / self.samples as f64
        }
    }
}

/// Records one sample per name and frame, e.g. live entities or entities
/// remeshed.
#[derive(Default)]
pub struct Counter {
    tallies: BTreeMap<&'static str, Tally>,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, name: &'static str, value: u64) {
        let tally = self.tallies.entry(name).or_default();
        tally.total += value;
        tally.samples += 1;
        tally.peak = tally.peak.max(value);
    }

    pub fn tally(&self, name: &str) -> Tally {
        self.tallies.get(name).copied().unwrap_or_default()
    }

    pub fn reset_all(&mut self) {
        self.tallies.clear();
    }

    /// Tallies in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Tally)> + '_ {
        self.tallies.iter().map(|(name, tally)| (*name, *tally))
    }
}
