//! Prometheus metrics for analytics cycles
//!
//! Metrics recorded by [`CycleMetrics`]:
//!
//! * `gex_cycles_total` - Completed cycles, labelled by outcome
//! * `gex_records_dropped_total` - Incomplete contract records skipped
//! * `gex_walls_selected` - Walls in the latest cycle
//! * `gex_signals_total` - Flow signals, labelled by classification
//! * `gex_cycle_duration_seconds` - Cycle duration histogram

use metrics::{counter, gauge, histogram, Counter, Gauge, Histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Start the Prometheus exporter; metrics are served at `/metrics`
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    tracing::info!(%addr, "Metrics server listening");
    Ok(())
}

/// How a cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed,
    /// No expiration or spot could be resolved
    Unresolved,
    Rejected,
}

impl CycleOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Unresolved => "unresolved",
            Self::Rejected => "rejected",
        }
    }
}

/// Metric handles for one engine, labelled by `engine`
#[derive(Clone)]
pub struct CycleMetrics {
    engine: String,
    records_dropped: Counter,
    walls_selected: Gauge,
    cycle_duration: Histogram,
}

impl CycleMetrics {
    pub fn new(engine: &str) -> Self {
        let name = engine.to_string();

        Self {
            records_dropped: counter!("gex_records_dropped_total", "engine" => name.clone()),
            walls_selected: gauge!("gex_walls_selected", "engine" => name.clone()),
            cycle_duration: histogram!("gex_cycle_duration_seconds", "engine" => name.clone()),
            engine: name,
        }
    }

    pub fn record_cycle(&self, outcome: CycleOutcome, duration: Duration) {
        counter!(
            "gex_cycles_total",
            "engine" => self.engine.clone(),
            "outcome" => outcome.as_str()
        )
        .increment(1);
        self.cycle_duration.record(duration.as_secs_f64());
    }

    pub fn record_dropped(&self, dropped: usize) {
        if dropped > 0 {
            self.records_dropped.increment(dropped as u64);
        }
    }

    pub fn set_walls(&self, walls: usize) {
        self.walls_selected.set(walls as f64);
    }

    /// `classification` is the lowercase signal name, e.g. `bullish`
    pub fn record_signal(&self, classification: &str) {
        counter!(
            "gex_signals_total",
            "engine" => self.engine.clone(),
            "classification" => classification.to_string()
        )
        .increment(1);
    }

    pub fn engine(&self) -> &str {
        &self.engine
    }
}

/// Times one cycle and records it on drop.
///
/// Defaults to [`CycleOutcome::Rejected`] so an early `?` return is counted.
pub struct CycleTimer<'a> {
    metrics: &'a CycleMetrics,
    start: Instant,
    outcome: CycleOutcome,
}

impl<'a> CycleTimer<'a> {
    pub fn new(metrics: &'a CycleMetrics) -> Self {
        Self {
            metrics,
            start: Instant::now(),
            outcome: CycleOutcome::Rejected,
        }
    }

    pub fn set_outcome(&mut self, outcome: CycleOutcome) {
        self.outcome = outcome;
    }
}

impl Drop for CycleTimer<'_> {
    fn drop(&mut self) {
        self.metrics.record_cycle(self.outcome, self.start.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_metrics_without_recorder() {
        // No recorder installed: handles are no-ops
        let metrics = CycleMetrics::new("test");
        metrics.record_dropped(3);
        metrics.set_walls(5);
        metrics.record_signal("bullish");
        assert_eq!(metrics.engine(), "test");
    }

    #[test]
    fn test_timer_records_on_drop() {
        let metrics = CycleMetrics::new("test");
        {
            let mut timer = CycleTimer::new(&metrics);
            timer.set_outcome(CycleOutcome::Completed);
        }
        assert_eq!(CycleOutcome::Unresolved.as_str(), "unresolved");
    }
}
