//! The worker dispatch loop.
//!
//! Pops jobs from the shared queue, routes them through the handler table,
//! and publishes results. One job's failure never terminates the loop; the
//! only exits are cancellation and (at startup, before the loop) an
//! unreachable store.
//!
//! The loop imposes no timeout on handler execution: a hung handler stalls
//! this worker until it returns, and the enqueuing side's result-wait
//! timeout bounds end-to-end latency.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::metrics::Metrics;
use crate::queue::{QueueError, TaskQueue};
use crate::types::Job;

use super::dispatch::HandlerRegistry;

/// Default blocking-pop timeout.
///
/// Short enough that cancellation is noticed promptly, long enough that an
/// idle worker isn't spinning on the store. Lengthening it trades shutdown
/// responsiveness for fewer wakeups.
const DEFAULT_POP_TIMEOUT_SECS: u64 = 5;

/// Default sleep after an empty pop.
const DEFAULT_IDLE_SLEEP_MS: u64 = 100;

/// Default backoff after a store error while popping.
const DEFAULT_ERROR_BACKOFF_SECS: u64 = 1;

/// Tunables for the dispatch loop.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// How long each blocking pop waits before returning empty.
    pub pop_timeout: Duration,

    /// Pause between an empty pop and the next attempt.
    pub idle_sleep: Duration,

    /// Pause after a store error before retrying the pop.
    pub error_backoff: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        WorkerConfig {
            pop_timeout: Duration::from_secs(DEFAULT_POP_TIMEOUT_SECS),
            idle_sleep: Duration::from_millis(DEFAULT_IDLE_SLEEP_MS),
            error_backoff: Duration::from_secs(DEFAULT_ERROR_BACKOFF_SECS),
        }
    }
}

/// A worker process's dispatch loop.
pub struct Worker {
    queue: TaskQueue,
    registry: HandlerRegistry,
    config: WorkerConfig,
    metrics: Arc<Metrics>,
}

impl Worker {
    pub fn new(
        queue: TaskQueue,
        registry: HandlerRegistry,
        config: WorkerConfig,
        metrics: Arc<Metrics>,
    ) -> Self {
        Worker {
            queue,
            registry,
            config,
            metrics,
        }
    }

    /// Verifies the store is reachable.
    ///
    /// Run this before [`Worker::run`]: a worker that cannot reach the store
    /// can process nothing, so an unreachable store at startup is fatal to
    /// the process rather than silently retried forever.
    pub async fn check_store(&self) -> Result<(), QueueError> {
        self.queue.ping().await
    }

    /// Drains the queue until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            job_types = ?self.registry.job_types(),
            "worker started, listening for jobs"
        );

        loop {
            let popped = tokio::select! {
                _ = cancel.cancelled() => break,
                popped = self.queue.pop(self.config.pop_timeout) => popped,
            };

            match popped {
                Ok(Some(job)) => self.process(job).await,
                Ok(None) => {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.config.idle_sleep) => {}
                    }
                }
                Err(err) => {
                    self.metrics.store_errors.inc();
                    warn!(error = %err, "failed to pop from queue, backing off");
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.config.error_backoff) => {}
                    }
                }
            }
        }

        info!("worker stopped");
    }

    /// Executes one job and publishes its result.
    #[instrument(skip(self, job), fields(job_id = %job.job_id, job_type = %job.job_type))]
    async fn process(&self, job: Job) {
        debug!("processing job");
        let started = Instant::now();

        let result = self.registry.dispatch(&job).await;

        self.metrics
            .handler_duration
            .with_label_values(&[&job.job_type])
            .observe(started.elapsed().as_secs_f64());
        self.metrics
            .jobs_processed
            .with_label_values(&[&job.job_type, &result.status.to_string()])
            .inc();

        let ttl = Duration::from_secs(job.result_ttl);
        if let Err(err) = self.queue.publish_result(&job.job_id, &result, ttl).await {
            // The job's outcome is lost; the waiter will observe a timeout.
            self.metrics.store_errors.inc();
            error!(error = %err, "failed to publish result");
        } else {
            debug!(status = %result.status, "published result");
        }
    }
}
