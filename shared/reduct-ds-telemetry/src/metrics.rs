//! Metrics primitives

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Monotonic counter
#[derive(Clone, Debug, Default)]
pub struct Counter {
    value: Arc<AtomicU64>,
    name: String,
}

impl Counter {
    pub fn new(name: &str) -> Self {
        Self {
            value: Arc::new(AtomicU64::new(0)),
            name: name.to_string(),
        }
    }

    pub fn inc(&self) {
        self.add(1);
    }

    pub fn add(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Up/down gauge, never below zero
#[derive(Clone, Debug, Default)]
pub struct Gauge {
    value: Arc<AtomicU64>,
    name: String,
}

impl Gauge {
    pub fn new(name: &str) -> Self {
        Self {
            value: Arc::new(AtomicU64::new(0)),
            name: name.to_string(),
        }
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        let _ = self
            .value
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| Some(v.saturating_sub(1)));
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Summary of the retained histogram window
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct HistogramSummary {
    pub count: usize,
    pub mean: f64,
    pub p50: f64,
    pub p99: f64,
}

/// Histogram over the most recent samples
#[derive(Clone, Debug)]
pub struct Histogram {
    samples: Arc<Mutex<VecDeque<f64>>>,
    name: String,
    window: usize,
}

impl Histogram {
    pub const DEFAULT_WINDOW: usize = 4096;

    pub fn new(name: &str) -> Self {
        Self::with_window(name, Self::DEFAULT_WINDOW)
    }

    pub fn with_window(name: &str, window: usize) -> Self {
        Self {
            samples: Arc::new(Mutex::new(VecDeque::with_capacity(window.min(1024)))),
            name: name.to_string(),
            window: window.max(1),
        }
    }

    pub fn record(&self, value: f64) {
        let mut samples = self.samples.lock();
        if samples.len() == self.window {
            samples.pop_front();
        }
        samples.push_back(value);
    }

    pub fn count(&self) -> usize {
        self.samples.lock().len()
    }

    /// Nearest-rank percentile, `p` in 0..=100
    pub fn percentile(&self, p: f64) -> f64 {
        let mut sorted: Vec<f64> = self.samples.lock().iter().copied().collect();
        percentile_of(&mut sorted, p)
    }

    pub fn mean(&self) -> f64 {
        let samples = self.samples.lock();
        if samples.is_empty() {
            return 0.0;
        }
        samples.iter().sum::<f64>() / samples.len() as f64
    }

    pub fn summary(&self) -> HistogramSummary {
        let mut sorted: Vec<f64> = self.samples.lock().iter().copied().collect();
        if sorted.is_empty() {
            return HistogramSummary::default();
        }
        let mean = sorted.iter().sum::<f64>() / sorted.len() as f64;
        HistogramSummary {
            count: sorted.len(),
            mean,
            p50: percentile_of(&mut sorted, 50.0),
            p99: percentile_of(&mut sorted, 99.0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

fn percentile_of(samples: &mut [f64], p: f64) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.sort_by(f64::total_cmp);
    let idx = ((samples.len() as f64) * p.clamp(0.0, 100.0) / 100.0) as usize;
    samples[idx.min(samples.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter() {
        let counter = Counter::new("queries_total");
        counter.inc();
        counter.add(4);
        assert_eq!(counter.get(), 5);
        assert_eq!(counter.name(), "queries_total");
    }

    #[test]
    fn test_gauge_saturates_at_zero() {
        let gauge = Gauge::new("queries_in_flight");
        gauge.inc();
        gauge.dec();
        gauge.dec();
        assert_eq!(gauge.get(), 0);
    }

    #[test]
    fn test_histogram_window_and_summary() {
        let hist = Histogram::with_window("latency_ms", 3);
        for v in [100.0, 1.0, 2.0, 3.0] {
            hist.record(v);
        }

        assert_eq!(hist.count(), 3);
        assert_eq!(hist.mean(), 2.0);
        assert_eq!(hist.percentile(0.0), 1.0);
        assert_eq!(hist.percentile(100.0), 3.0);

        let summary = hist.summary();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.p50, 2.0);
    }

    #[test]
    fn test_empty_histogram() {
        let hist = Histogram::new("empty");
        assert_eq!(hist.percentile(50.0), 0.0);
        assert_eq!(hist.summary(), HistogramSummary::default());
    }
}
