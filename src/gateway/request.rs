//! The gateway request path: enqueue a job, await its result off the hot
//! path, perform the side effect.
//!
//! The chat event loop must never block on a worker, so each request spawns
//! a supervised waiter task: enqueue returns immediately, the waiter blocks
//! on the correlated result with a timeout, and on success performs the side
//! effect through the [`ReplySink`]. On timeout or connectivity failure the
//! waiter logs and gives up: no retry, no user-visible error. Availability
//! of the event loop is favored over delivery of any individual job.
//!
//! Waiters are tracked, not fire-and-forget: every spawned task logs its own
//! terminal outcome exactly once, and [`RequestPath::shutdown`] drains
//! whatever is still in flight.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use crate::handlers::job_types;
use crate::metrics::Metrics;
use crate::queue::{QueueError, TaskQueue};
use crate::types::{Job, JobPayload};

use super::event::{MessageEvent, ReplySink};

/// Result TTL for safety-scan jobs.
const SCAN_RESULT_TTL_SECS: u64 = 90;

/// How long the gateway waits for a safety verdict.
const SCAN_WAIT_SECS: u64 = 30;

/// Result TTL for LLM-reply jobs.
const REPLY_RESULT_TTL_SECS: u64 = 180;

/// How long the gateway waits for a generated reply.
///
/// Generation latency is dominated by the completion API; this needs to
/// comfortably exceed it, while the result TTL covers waiters that gave up.
const REPLY_WAIT_SECS: u64 = 75;

/// Timeouts and TTLs for the request paths.
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub scan_result_ttl: Duration,
    pub scan_wait: Duration,
    pub reply_result_ttl: Duration,
    pub reply_wait: Duration,
}

impl Default for RequestConfig {
    fn default() -> Self {
        RequestConfig {
            scan_result_ttl: Duration::from_secs(SCAN_RESULT_TTL_SECS),
            scan_wait: Duration::from_secs(SCAN_WAIT_SECS),
            reply_result_ttl: Duration::from_secs(REPLY_RESULT_TTL_SECS),
            reply_wait: Duration::from_secs(REPLY_WAIT_SECS),
        }
    }
}

/// Originates jobs from chat events and bridges results back to the
/// platform.
#[derive(Clone)]
pub struct RequestPath {
    queue: TaskQueue,
    sink: Arc<dyn ReplySink>,
    metrics: Arc<Metrics>,
    config: RequestConfig,
    waiters: TaskTracker,
}

impl RequestPath {
    pub fn new(
        queue: TaskQueue,
        sink: Arc<dyn ReplySink>,
        metrics: Arc<Metrics>,
        config: RequestConfig,
    ) -> Self {
        RequestPath {
            queue,
            sink,
            metrics,
            config,
            waiters: TaskTracker::new(),
        }
    }

    /// Queues a safety scan for a message and, off the hot path, reports it
    /// to moderators if the verdict comes back non-safe.
    pub async fn scan_message(&self, event: &MessageEvent) {
        if event.content.is_empty() {
            return;
        }

        let mut payload = JobPayload::new();
        payload.insert("content".into(), json!(event.content));
        payload.insert("guild_id".into(), json!(event.guild_id));
        payload.insert("channel_id".into(), json!(event.channel_id));
        payload.insert("author_id".into(), json!(event.author_id));

        let job = Job::new(job_types::SAFETY_SCAN, payload)
            .with_requested_by(event.author_id)
            .with_result_ttl(self.config.scan_result_ttl.as_secs());

        let job = match self.queue.enqueue(job).await {
            Ok(job) => job,
            Err(err) => {
                self.metrics.store_errors.inc();
                warn!(error = %err, "failed to enqueue safety scan");
                return;
            }
        };

        let path = self.clone();
        let event = event.clone();
        let wait = self.config.scan_wait;
        self.waiters.spawn(async move {
            match path.queue.wait_for_result(&job.job_id, wait).await {
                Ok(result) => {
                    let Some(verdict) = result.field("verdict").filter(|v| !v.is_null()) else {
                        debug!(job_id = %job.job_id, "safety scan produced no verdict");
                        return;
                    };
                    if is_safe(verdict) {
                        debug!(job_id = %job.job_id, "message verdict: safe");
                        return;
                    }
                    if let Err(err) = path.sink.report_flagged(&event, verdict).await {
                        warn!(job_id = %job.job_id, error = %err, "failed to report flagged message");
                    }
                }
                Err(err) => path.log_wait_failure("safety scan", &job, err),
            }
        });
    }

    /// Queues an LLM reply for a message and, off the hot path, sends the
    /// generated text back to the channel.
    ///
    /// `channel_context` is forwarded verbatim into the job payload as
    /// `[username, user_id, content]` triples, chronological order.
    pub async fn request_reply(
        &self,
        event: &MessageEvent,
        prompt: &str,
        channel_context: Option<Value>,
        reply_to_message: bool,
    ) {
        if prompt.is_empty() {
            return;
        }

        let mut payload = JobPayload::new();
        payload.insert("prompt".into(), json!(prompt));
        payload.insert("username".into(), json!(event.author_name));
        payload.insert("guild_name".into(), json!(event.guild_name));
        payload.insert("guild_id".into(), json!(event.guild_id));
        payload.insert("user_id".into(), json!(event.author_id));
        payload.insert("channel_id".into(), json!(event.channel_id));
        if let Some(context) = channel_context {
            payload.insert("channel_context".into(), context);
        }

        let job = Job::new(job_types::LLM_REPLY, payload)
            .with_requested_by(event.author_id)
            .with_result_ttl(self.config.reply_result_ttl.as_secs());

        let job = match self.queue.enqueue(job).await {
            Ok(job) => job,
            Err(err) => {
                self.metrics.store_errors.inc();
                warn!(error = %err, "failed to enqueue llm reply");
                return;
            }
        };

        let path = self.clone();
        let event = event.clone();
        let wait = self.config.reply_wait;
        self.waiters.spawn(async move {
            match path.queue.wait_for_result(&job.job_id, wait).await {
                Ok(result) => {
                    let Some(reply) = result.str_field("reply").filter(|r| !r.is_empty()) else {
                        debug!(job_id = %job.job_id, "llm reply result carried no text");
                        return;
                    };
                    let sent = if reply_to_message {
                        path.sink
                            .reply_to(event.channel_id, event.message_id, reply)
                            .await
                    } else {
                        path.sink.send_message(event.channel_id, reply).await
                    };
                    if let Err(err) = sent {
                        warn!(job_id = %job.job_id, error = %err, "failed to deliver llm reply");
                    }
                }
                Err(err) => path.log_wait_failure("llm reply", &job, err),
            }
        });
    }

    fn log_wait_failure(&self, what: &str, job: &Job, err: QueueError) {
        if err.is_timeout() {
            // A late result may still arrive and harmlessly expire unread.
            self.metrics.wait_timeouts.inc();
            warn!(job_id = %job.job_id, "{what} timed out");
        } else {
            self.metrics.store_errors.inc();
            warn!(job_id = %job.job_id, error = %err, "{what} failed");
        }
    }

    /// Closes the waiter pool and waits for in-flight waiters to finish.
    pub async fn shutdown(&self) {
        self.waiters.close();
        self.waiters.wait().await;
    }
}

/// A verdict counts as safe only when its `verdict` field says so;
/// a malformed verdict object is treated as safe rather than paging
/// moderators on classifier noise.
fn is_safe(verdict: &Value) -> bool {
    verdict
        .get("verdict")
        .and_then(Value::as_str)
        .map(|v| v.eq_ignore_ascii_case("safe"))
        .unwrap_or(true)
}
