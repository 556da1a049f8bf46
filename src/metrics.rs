//! Prometheus metrics for the dispatch layer.
//!
//! Registered into an owned [`Registry`] rather than the process-global
//! default so tests can construct isolated instances. The worker process
//! exposes these at `GET /metrics` for scraping.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Handler latency buckets: LLM calls routinely take whole seconds.
const DURATION_BUCKETS: &[f64] = &[0.1, 0.25, 0.5, 1.0, 2.0, 3.0, 5.0, 10.0, 30.0];

/// Metric handles for the queue/worker/gateway paths.
pub struct Metrics {
    registry: Registry,

    /// Jobs a worker finished, by job type and terminal status.
    pub jobs_processed: IntCounterVec,

    /// Handler execution duration, by job type.
    pub handler_duration: HistogramVec,

    /// Gateway-side result waits that timed out.
    pub wait_timeouts: IntCounter,

    /// Store operations that failed with a connectivity error.
    pub store_errors: IntCounter,
}

impl Metrics {
    /// Creates and registers all metric families.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let jobs_processed = IntCounterVec::new(
            Opts::new(
                "guildest_jobs_processed_total",
                "Jobs finished by a worker, by job type and terminal status",
            ),
            &["job_type", "status"],
        )?;
        let handler_duration = HistogramVec::new(
            HistogramOpts::new(
                "guildest_handler_duration_seconds",
                "Handler execution duration in seconds",
            )
            .buckets(DURATION_BUCKETS.to_vec()),
            &["job_type"],
        )?;
        let wait_timeouts = IntCounter::new(
            "guildest_result_wait_timeouts_total",
            "Result waits that expired before a result arrived",
        )?;
        let store_errors = IntCounter::new(
            "guildest_store_errors_total",
            "Queue store operations that failed with a connectivity error",
        )?;

        registry.register(Box::new(jobs_processed.clone()))?;
        registry.register(Box::new(handler_duration.clone()))?;
        registry.register(Box::new(wait_timeouts.clone()))?;
        registry.register(Box::new(store_errors.clone()))?;

        Ok(Metrics {
            registry,
            jobs_processed,
            handler_duration,
            wait_timeouts,
            store_errors,
        })
    }

    /// Renders all registered families in Prometheus text format.
    pub fn encode(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        // Encoding into a Vec cannot fail short of OOM.
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .expect("encode metrics");
        String::from_utf8(buffer).expect("prometheus text format is utf-8")
    }
}
