use prometheus::{
    Gauge, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the process-wide `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE
        .get_or_init(|| async {
            info!("Initializing Metrics ...");
            Arc::new(Metrics::new().expect("static metric definitions are valid"))
        })
        .await
}

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Exchanger metrics
    pub exchange_requests: IntCounter,
    pub exchange_failures: IntCounterVec,
    pub exchange_duration: Histogram,

    // Parser metrics
    pub parse_failures: IntCounter,

    // Cache metrics
    pub cache_hits: IntCounter,
    pub cache_misses: IntCounter,
    pub refresh_waiters: IntCounter,
    pub token_refreshes: IntCounterVec,
    pub token_expiry_unix: IntGauge,

    // Gate metrics
    pub bearer_requests: IntCounterVec,

    // Config/runtime
    pub config_validation_errors: IntCounter,
    pub up: IntGauge,

    // === Service resource metrics ===
    pub process_cpu_usage: Gauge,
    pub process_memory_usage: IntGauge,
    pub process_open_fds: IntGauge,
    pub process_start_time: IntGauge,
    pub process_uptime: IntGauge,
}

impl Metrics {
    fn new() -> prometheus::Result<Self> {
        let registry = Registry::new_custom(Some("mstokenagent".into()), None)?;

        let metrics = Self {
            // Exchanger
            exchange_requests: IntCounter::new("exchange_requests_total", "Token endpoint round trips started")?,
            exchange_failures: IntCounterVec::new(Opts::new("exchange_failures_total", "Token exchange failures by reason"), &["reason"])?,
            exchange_duration: Histogram::with_opts(HistogramOpts::new("exchange_duration_seconds", "Token exchange duration seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]))?,

            parse_failures: IntCounter::new("parse_failures_total", "Token responses that did not parse")?,

            // Cache
            cache_hits: IntCounter::new("cache_hits_total", "Requests served from the cached token")?,
            cache_misses: IntCounter::new("cache_misses_total", "Requests that found the cache empty or stale")?,
            refresh_waiters: IntCounter::new("refresh_waiters_total", "Requests that joined an in-flight refresh")?,
            token_refreshes: IntCounterVec::new(Opts::new("token_refreshes_total", "Completed refresh attempts by outcome"), &["outcome"])?,
            token_expiry_unix: IntGauge::new("token_expiry_unix_seconds", "Expiry timestamp of the cached token")?,

            // Gate
            bearer_requests: IntCounterVec::new(Opts::new("bearer_requests_total", "Bearer token requests by outcome"), &["outcome"])?,

            // Config/runtime
            config_validation_errors: IntCounter::new("config_validation_errors_total", "Validation errors during startup")?,
            up: IntGauge::new("up", "1 if service is healthy")?,
            process_cpu_usage: Gauge::new("process_cpu_usage_percent", "CPU usage % of this process")?,
            process_memory_usage: IntGauge::new("process_memory_usage_bytes", "Resident memory used by this process")?,
            process_open_fds: IntGauge::new("process_open_fds", "Number of open file descriptors")?,
            process_start_time: IntGauge::new("process_start_time_seconds", "Process start time (UNIX seconds)")?,
            process_uptime: IntGauge::new("process_uptime_seconds", "Process uptime seconds")?,

            registry,
        };

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.exchange_requests.clone()))?;
        reg.register(Box::new(metrics.exchange_failures.clone()))?;
        reg.register(Box::new(metrics.exchange_duration.clone()))?;
        reg.register(Box::new(metrics.parse_failures.clone()))?;
        reg.register(Box::new(metrics.cache_hits.clone()))?;
        reg.register(Box::new(metrics.cache_misses.clone()))?;
        reg.register(Box::new(metrics.refresh_waiters.clone()))?;
        reg.register(Box::new(metrics.token_refreshes.clone()))?;
        reg.register(Box::new(metrics.token_expiry_unix.clone()))?;
        reg.register(Box::new(metrics.bearer_requests.clone()))?;
        reg.register(Box::new(metrics.config_validation_errors.clone()))?;
        reg.register(Box::new(metrics.up.clone()))?;

        reg.register(Box::new(metrics.process_cpu_usage.clone()))?;
        reg.register(Box::new(metrics.process_memory_usage.clone()))?;
        reg.register(Box::new(metrics.process_open_fds.clone()))?;
        reg.register(Box::new(metrics.process_start_time.clone()))?;
        reg.register(Box::new(metrics.process_uptime.clone()))?;

        Ok(metrics)
    }
}
