//! Query metrics of the data source

use reduct_ds_telemetry::{Counter, Gauge, Histogram, HistogramSummary};
use reduct_frames::AccumulatorStats;
use serde::Serialize;
use std::time::Duration;

/// Metrics shared by all handlers of one data source
#[derive(Clone, Debug)]
pub struct DatasourceMetrics {
    pub queries: Counter,
    pub query_errors: Counter,
    pub points_appended: Counter,
    pub points_coerced: Counter,
    pub points_dropped: Counter,
    pub queries_in_flight: Gauge,
    pub query_latency_ms: Histogram,
}

impl Default for DatasourceMetrics {
    fn default() -> Self {
        Self {
            queries: Counter::new("reduct_ds_queries_total"),
            query_errors: Counter::new("reduct_ds_query_errors_total"),
            points_appended: Counter::new("reduct_ds_points_appended_total"),
            points_coerced: Counter::new("reduct_ds_points_coerced_total"),
            points_dropped: Counter::new("reduct_ds_points_dropped_total"),
            queries_in_flight: Gauge::new("reduct_ds_queries_in_flight"),
            query_latency_ms: Histogram::new("reduct_ds_query_latency_ms"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub queries: u64,
    pub query_errors: u64,
    pub points_appended: u64,
    pub points_coerced: u64,
    pub points_dropped: u64,
    pub queries_in_flight: u64,
    pub query_latency_ms: HistogramSummary,
}

impl DatasourceMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_points(&self, stats: AccumulatorStats) {
        self.points_appended.add(stats.appended);
        self.points_coerced.add(stats.coerced);
        self.points_dropped.add(stats.dropped);
    }

    pub fn record_query(&self, elapsed: Duration, failed: bool) {
        self.queries.inc();
        if failed {
            self.query_errors.inc();
        }
        self.query_latency_ms.record(elapsed.as_secs_f64() * 1000.0);
    }

    /// Count a query as in flight until the guard is dropped
    pub fn track_in_flight(&self) -> InFlightGuard<'_> {
        self.queries_in_flight.inc();
        InFlightGuard {
            gauge: &self.queries_in_flight,
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queries: self.queries.get(),
            query_errors: self.query_errors.get(),
            points_appended: self.points_appended.get(),
            points_coerced: self.points_coerced.get(),
            points_dropped: self.points_dropped.get(),
            queries_in_flight: self.queries_in_flight.get(),
            query_latency_ms: self.query_latency_ms.summary(),
        }
    }
}

/// Decrements the in-flight gauge on drop, including when the query is cancelled
pub struct InFlightGuard<'a> {
    gauge: &'a Gauge,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.gauge.dec();
    }
}
