//! Prometheus metrics for the VFM engine
//!
//! All metrics use the `vfm_` prefix. Nothing is served; callers render the
//! registry as text and ship it wherever they need.

use prometheus::{
    CounterVec, Gauge, Histogram, HistogramOpts, IntCounter, Opts, Registry, TextEncoder,
    core::{AtomicF64, GenericGauge},
};
use std::sync::Arc;

/// Engine-level counters and gauges
#[derive(Clone)]
pub struct EngineMetrics {
    registry: Arc<Registry>,
    /// Batches passed through `calculate_vfm`
    pub batches_total: IntCounter,
    /// Rows by component and prediction source
    pub rows_total: CounterVec,
    /// Wall time of a full batch in seconds
    pub batch_duration_seconds: Histogram,
    /// 0=uninitialized, 1=loading, 2=ready, 3=degraded, 4=failed
    pub engine_state: GenericGauge<AtomicF64>,
    /// Mean VFM index of the last batch
    pub last_batch_mean_vfm: GenericGauge<AtomicF64>,
}

impl EngineMetrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let batches_total = IntCounter::with_opts(Opts::new(
            "vfm_batches_total",
            "Total batches processed",
        ))?;
        registry.register(Box::new(batches_total.clone()))?;

        let rows_total = CounterVec::new(
            Opts::new(
                "vfm_rows_total",
                "Rows processed by component and prediction source",
            ),
            &["component", "source"],
        )?;
        registry.register(Box::new(rows_total.clone()))?;

        let batch_duration_seconds = Histogram::with_opts(
            HistogramOpts::new("vfm_batch_duration_seconds", "Batch wall time in seconds")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]),
        )?;
        registry.register(Box::new(batch_duration_seconds.clone()))?;

        let engine_state = Gauge::with_opts(Opts::new(
            "vfm_engine_state",
            "Engine state (0=uninitialized, 1=loading, 2=ready, 3=degraded, 4=failed)",
        ))?;
        registry.register(Box::new(engine_state.clone()))?;

        let last_batch_mean_vfm = Gauge::with_opts(Opts::new(
            "vfm_last_batch_mean_vfm",
            "Mean VFM index of the last batch",
        ))?;
        registry.register(Box::new(last_batch_mean_vfm.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            batches_total,
            rows_total,
            batch_duration_seconds,
            engine_state,
            last_batch_mean_vfm,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    pub fn inc_rows(&self, component: &str, source: &str, rows: usize) {
        if rows > 0 {
            self.rows_total
                .with_label_values(&[component, source])
                .inc_by(rows as f64);
        }
    }

    pub fn set_state_code(&self, code: u8) {
        self.engine_state.set(f64::from(code));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = EngineMetrics::new().expect("Failed to create metrics");
        assert!(metrics.render().contains("vfm_"));
    }

    #[test]
    fn test_row_counter_labels() {
        let metrics = EngineMetrics::new().expect("Failed to create metrics");
        metrics.inc_rows("forecaster", "model", 3);
        metrics.inc_rows("forecaster", "fallback", 1);
        metrics.inc_rows("scorer", "skipped", 0);

        let output = metrics.render();
        assert!(output.contains("vfm_rows_total"));
        assert!(output.contains("fallback"));
        assert!(!output.contains("skipped"));
    }

    #[test]
    fn test_state_gauge() {
        let metrics = EngineMetrics::new().expect("Failed to create metrics");
        metrics.set_state_code(3);
        assert!(metrics.render().contains("vfm_engine_state 3"));
    }
}
