//! Job routing: the handler seam and the type → handler table.
//!
//! A worker owns one [`HandlerRegistry`], populated at startup and immutable
//! once the loop runs. Dispatch maps every possible outcome (unknown type,
//! handler error, handler panic) to a structured [`JobResult`], so nothing
//! a job does can escape into the loop.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::llm::LlmError;
use crate::types::{Job, JobPayload, JobResult};

/// Errors a job handler can fail with.
///
/// These terminate at the job boundary: dispatch stringifies them into an
/// error result and the loop moves on.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The job payload is missing or has a malformed field.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// The completion API call failed.
    #[error(transparent)]
    Llm(#[from] LlmError),
}

/// An executor for one job type.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// The job type this handler is registered under.
    fn job_type(&self) -> &str;

    /// Executes the job, returning handler-defined result fields.
    async fn run(&self, job: &Job) -> Result<JobPayload, HandlerError>;
}

/// Immutable `job_type → handler` table.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        HandlerRegistry::default()
    }

    /// Registers a handler under its own job type.
    ///
    /// Re-registering a type replaces the previous handler.
    pub fn register<H: JobHandler + 'static>(mut self, handler: H) -> Self {
        self.handlers
            .insert(handler.job_type().to_owned(), Arc::new(handler));
        self
    }

    /// Returns the registered job types, for startup logging.
    pub fn job_types(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }

    /// Executes a job against the table, mapping every outcome to a result.
    ///
    /// - unknown type: fast synchronous error result, no handler invoked
    /// - handler error: logged, stringified into an error result
    /// - handler panic: contained by running the handler on its own task and
    ///   inspecting the join error
    pub async fn dispatch(&self, job: &Job) -> JobResult {
        let Some(handler) = self.handlers.get(&job.job_type) else {
            return JobResult::error(format!("unknown job_type '{}'", job.job_type));
        };

        let handler = Arc::clone(handler);
        let owned_job = job.clone();
        let outcome = tokio::spawn(async move { handler.run(&owned_job).await }).await;

        match outcome {
            Ok(Ok(fields)) => JobResult::ok(fields),
            Ok(Err(err)) => {
                warn!(job_id = %job.job_id, job_type = %job.job_type, error = %err, "handler failed");
                JobResult::error(err.to_string())
            }
            Err(join_err) => {
                warn!(job_id = %job.job_id, job_type = %job.job_type, "handler panicked");
                JobResult::error(format!("handler panicked: {join_err}"))
            }
        }
    }
}
