// src/metrics/collector.rs
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;
use anyhow::Result;

pub struct MetricsRegistry {
    registry: Registry,
    collector: Arc<MetricsCollector>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let collector = Arc::new(MetricsCollector::new(&registry)?);

        Ok(Self {
            registry,
            collector,
        })
    }

    pub fn collector(&self) -> Arc<MetricsCollector> {
        self.collector.clone()
    }

    /// Renders every registered metric in the text exposition format.
    pub fn gather(&self) -> Result<Vec<u8>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(buffer)
    }
}

pub struct MetricsCollector {
    pub refreshes_total: IntCounterVec,
    pub refresh_duration_seconds: HistogramVec,
    pub endpoint_set_changes_total: IntCounterVec,
    pub endpoints: IntGaugeVec,
}

impl MetricsCollector {
    pub fn new(registry: &Registry) -> Result<Self> {
        let refreshes_total = IntCounterVec::new(
            Opts::new(
                "dns_balancer_refreshes_total",
                "Refresh cycles by outcome",
            ),
            &["target", "outcome"],
        )?;
        registry.register(Box::new(refreshes_total.clone()))?;

        let refresh_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "dns_balancer_refresh_duration_seconds",
                "Time spent resolving during a refresh cycle",
            ),
            &["target"],
        )?;
        registry.register(Box::new(refresh_duration_seconds.clone()))?;

        let endpoint_set_changes_total = IntCounterVec::new(
            Opts::new(
                "dns_balancer_endpoint_set_changes_total",
                "Number of times a new endpoint set was published",
            ),
            &["target"],
        )?;
        registry.register(Box::new(endpoint_set_changes_total.clone()))?;

        let endpoints = IntGaugeVec::new(
            Opts::new("dns_balancer_endpoints", "Endpoints in the published set"),
            &["target"],
        )?;
        registry.register(Box::new(endpoints.clone()))?;

        Ok(Self {
            refreshes_total,
            refresh_duration_seconds,
            endpoint_set_changes_total,
            endpoints,
        })
    }

    pub fn record_refresh(&self, target: &str, outcome: &str, duration: Duration) {
        self.refreshes_total
            .with_label_values(&[target, outcome])
            .inc();

        self.refresh_duration_seconds
            .with_label_values(&[target])
            .observe(duration.as_secs_f64());
    }

    pub fn record_publish(&self, target: &str, count: usize) {
        self.endpoint_set_changes_total
            .with_label_values(&[target])
            .inc();
        self.update_endpoint_count(target, count);
    }

    pub fn update_endpoint_count(&self, target: &str, count: usize) {
        self.endpoints
            .with_label_values(&[target])
            .set(count as i64);
    }

    pub fn publish_count(&self, target: &str) -> u64 {
        self.endpoint_set_changes_total
            .with_label_values(&[target])
            .get()
    }

    pub fn refresh_count(&self, target: &str, outcome: &str) -> u64 {
        self.refreshes_total
            .with_label_values(&[target, outcome])
            .get()
    }
}
