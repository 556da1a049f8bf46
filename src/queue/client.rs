//! The task queue client: enqueue, dequeue, result publish, result wait.
//!
//! Both the gateway and the workers talk to the store exclusively through
//! this client. It owns job-id generation (done in [`Job::new`]) and the key
//! naming scheme; it deliberately owns **no** retry policy. A failed
//! operation surfaces to the caller, who decides (the gateway logs and
//! abandons, the worker treats startup failures as fatal).

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::types::{Job, JobId, JobResult};

use super::error::{QueueError, Result};
use super::keys::KeyScheme;
use super::store::QueueStore;

/// Typed queue protocol over a [`QueueStore`].
///
/// Cheap to clone; clones share the underlying store connection.
#[derive(Clone)]
pub struct TaskQueue {
    store: Arc<dyn QueueStore>,
    keys: KeyScheme,
}

impl TaskQueue {
    /// Creates a client over the given store, keyed under `namespace`.
    pub fn new(store: Arc<dyn QueueStore>, namespace: impl Into<String>) -> Self {
        TaskQueue {
            store,
            keys: KeyScheme::new(namespace),
        }
    }

    /// Returns the key scheme in use.
    pub fn keys(&self) -> &KeyScheme {
        &self.keys
    }

    /// Verifies the backing store is reachable.
    pub async fn ping(&self) -> Result<()> {
        self.store.ping().await.map_err(QueueError::Store)
    }

    /// Appends a job to the tail of the shared queue.
    ///
    /// The job's type is not validated against any known set; routing an
    /// unknown type is a worker-side concern that comes back as an error
    /// result. Returns the job so the caller keeps its id for the wait.
    pub async fn enqueue(&self, job: Job) -> Result<Job> {
        let record = serde_json::to_string(&job).map_err(QueueError::Serialize)?;
        self.store.push_back(&self.keys.queue_key(), record).await?;
        Ok(job)
    }

    /// Pops the oldest pending job, blocking up to `timeout`.
    ///
    /// Returns `Ok(None)` on timeout (not an error) so worker loops can
    /// interleave shutdown checks between waits. A record that fails to
    /// deserialize is logged and dropped rather than wedging the queue head;
    /// the call then reports `None` and the caller's next pop proceeds past
    /// it.
    pub async fn pop(&self, timeout: Duration) -> Result<Option<Job>> {
        let Some(raw) = self.store.pop_front(&self.keys.queue_key(), timeout).await? else {
            return Ok(None);
        };

        match serde_json::from_str::<Job>(&raw) {
            Ok(job) => Ok(Some(job)),
            Err(err) => {
                warn!(error = %err, "dropping malformed queue record");
                Ok(None)
            }
        }
    }

    /// Publishes the result for a job and starts its expiry clock.
    ///
    /// Results are single-shot: publishing twice for the same id replaces
    /// the unconsumed record, so a retried execution can never strand an
    /// orphaned second entry. The result expires `ttl` after the last
    /// publish whether or not anyone consumed it, bounding store growth from
    /// abandoned jobs.
    pub async fn publish_result(
        &self,
        job_id: &JobId,
        result: &JobResult,
        ttl: Duration,
    ) -> Result<()> {
        let record = serde_json::to_string(result).map_err(QueueError::Serialize)?;
        self.store
            .put_single(&self.keys.result_key(job_id), record, ttl)
            .await?;
        Ok(())
    }

    /// Waits for the result correlated with `job_id`, up to `timeout`.
    ///
    /// Fails with [`QueueError::ResultTimeout`] if nothing arrives, unlike
    /// [`TaskQueue::pop`], because a caller awaiting one specific result has
    /// no fallback branch to take on an empty return.
    pub async fn wait_for_result(&self, job_id: &JobId, timeout: Duration) -> Result<JobResult> {
        let raw = self
            .store
            .pop_front(&self.keys.result_key(job_id), timeout)
            .await?
            .ok_or(QueueError::ResultTimeout { job_id: *job_id })?;

        serde_json::from_str(&raw).map_err(QueueError::Deserialize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::store::MemoryStore;
    use crate::types::{JobPayload, UserId};
    use serde_json::json;

    fn test_queue() -> TaskQueue {
        TaskQueue::new(Arc::new(MemoryStore::new()), "test")
    }

    fn payload_of(value: serde_json::Value) -> JobPayload {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    const POP: Duration = Duration::from_millis(100);

    // ─── Round trip ───

    #[tokio::test]
    async fn enqueue_then_pop_preserves_type_and_payload() {
        let queue = test_queue();
        let payload = payload_of(json!({
            "content": "hello",
            "tags": ["a", "b"],
            "nested": {"depth": 2},
        }));

        let job = queue
            .enqueue(
                Job::new("safety_scan", payload.clone())
                    .with_requested_by(7u64)
                    .with_result_ttl(90),
            )
            .await
            .unwrap();

        let popped = queue.pop(POP).await.unwrap().expect("job should be queued");
        assert_eq!(popped.job_id, job.job_id);
        assert_eq!(popped.job_type, "safety_scan");
        assert_eq!(popped.payload, payload);
        assert_eq!(popped.requested_by, Some(UserId(7)));
        assert_eq!(popped.result_ttl, 90);
    }

    #[tokio::test]
    async fn jobs_pop_in_enqueue_order() {
        let queue = test_queue();
        let first = queue.enqueue(Job::new("a", JobPayload::new())).await.unwrap();
        let second = queue.enqueue(Job::new("b", JobPayload::new())).await.unwrap();

        assert_eq!(queue.pop(POP).await.unwrap().unwrap().job_id, first.job_id);
        assert_eq!(queue.pop(POP).await.unwrap().unwrap().job_id, second.job_id);
    }

    #[tokio::test(start_paused = true)]
    async fn pop_returns_none_on_timeout() {
        let queue = test_queue();
        assert!(queue.pop(Duration::from_secs(5)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn malformed_record_is_dropped_not_fatal() {
        let store = Arc::new(MemoryStore::new());
        let queue = TaskQueue::new(store.clone(), "test");

        store
            .push_back(&queue.keys().queue_key(), "{not json".into())
            .await
            .unwrap();
        let good = queue.enqueue(Job::new("ok", JobPayload::new())).await.unwrap();

        // The malformed head is consumed and reported as an empty pop.
        assert!(queue.pop(POP).await.unwrap().is_none());
        // The queue is not wedged: the next pop yields the good job.
        assert_eq!(queue.pop(POP).await.unwrap().unwrap().job_id, good.job_id);
    }

    // ─── Correlation ───

    #[tokio::test]
    async fn result_resolves_the_matching_waiter() {
        let queue = test_queue();
        let id = JobId::generate();
        let result = JobResult::ok(payload_of(json!({"reply": "hi"})));

        queue
            .publish_result(&id, &result, Duration::from_secs(60))
            .await
            .unwrap();

        let received = queue.wait_for_result(&id, POP).await.unwrap();
        assert_eq!(received, result);
    }

    #[tokio::test(start_paused = true)]
    async fn result_never_resolves_a_different_job_id() {
        let queue = test_queue();
        let published = JobId::generate();
        let other = JobId::generate();

        queue
            .publish_result(&published, &JobResult::ok(JobPayload::new()), Duration::from_secs(60))
            .await
            .unwrap();

        let err = queue
            .wait_for_result(&other, Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(err.is_timeout());

        // The published result is still there for its own waiter.
        assert!(queue.wait_for_result(&published, POP).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn wait_times_out_no_earlier_than_requested() {
        let queue = test_queue();
        let id = JobId::generate();
        let timeout = Duration::from_secs(3);

        let started = tokio::time::Instant::now();
        let err = queue.wait_for_result(&id, timeout).await.unwrap_err();
        let elapsed = started.elapsed();

        assert!(err.is_timeout());
        assert!(elapsed >= timeout, "fired early: {elapsed:?}");
        assert!(elapsed < timeout + Duration::from_millis(100), "fired late: {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn waiter_resolves_when_result_arrives_mid_wait() {
        let queue = test_queue();
        let job = queue.enqueue(Job::new("slow", JobPayload::new())).await.unwrap();

        let waiter = {
            let queue = queue.clone();
            let id = job.job_id;
            tokio::spawn(async move { queue.wait_for_result(&id, Duration::from_secs(30)).await })
        };

        tokio::time::sleep(Duration::from_secs(2)).await;
        queue
            .publish_result(
                &job.job_id,
                &JobResult::ok(payload_of(json!({"reply": "done"}))),
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        let received = waiter.await.unwrap().unwrap();
        assert_eq!(received.str_field("reply"), Some("done"));
    }

    // ─── Expiry and single-shot publish ───

    #[tokio::test(start_paused = true)]
    async fn result_expires_after_its_ttl() {
        let queue = test_queue();
        let id = JobId::generate();

        queue
            .publish_result(&id, &JobResult::ok(JobPayload::new()), Duration::from_secs(1))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(1500)).await;
        let err = queue.wait_for_result(&id, POP).await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn second_publish_overwrites_the_first() {
        let queue = test_queue();
        let id = JobId::generate();

        queue
            .publish_result(&id, &JobResult::error("first attempt"), Duration::from_secs(60))
            .await
            .unwrap();
        queue
            .publish_result(
                &id,
                &JobResult::ok(payload_of(json!({"reply": "second attempt"}))),
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        let received = queue.wait_for_result(&id, POP).await.unwrap();
        assert_eq!(received.str_field("reply"), Some("second attempt"));

        // Single-shot: nothing queued behind the consumed record.
        assert!(queue.wait_for_result(&id, POP).await.unwrap_err().is_timeout());
    }

    // ─── At-most-one-consumer ───

    #[tokio::test(start_paused = true)]
    async fn one_job_reaches_exactly_one_of_many_poppers() {
        let queue = test_queue();
        queue.enqueue(Job::new("contested", JobPayload::new())).await.unwrap();

        let mut poppers = Vec::new();
        for _ in 0..6 {
            let queue = queue.clone();
            poppers.push(tokio::spawn(async move {
                queue.pop(Duration::from_millis(200)).await.unwrap()
            }));
        }

        let mut winners = 0;
        for popper in poppers {
            if popper.await.unwrap().is_some() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
