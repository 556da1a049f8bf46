//! The job record: the unit of asynchronous work carried on the queue.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ids::{JobId, UserId};

/// Handler-defined key/value data carried by a job or returned by a handler.
pub type JobPayload = Map<String, Value>;

/// Default result TTL in seconds when the enqueuing side does not specify one.
pub const DEFAULT_RESULT_TTL_SECS: u64 = 120;

fn default_result_ttl() -> u64 {
    DEFAULT_RESULT_TTL_SECS
}

/// A unit of asynchronous work.
///
/// Serialized as a flat JSON record and pushed onto the shared queue list.
/// The `job_id` is generated at construction time, before the record ever
/// reaches the store, so the enqueuing side can begin waiting on the
/// correlated result immediately.
///
/// Older gateway builds omitted `requested_by` and `result_ttl`; both
/// deserialize with defaults so mixed-version deployments keep draining.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique id used to correlate the result back to this job.
    pub job_id: JobId,

    /// Routing tag looked up in the worker's handler table.
    ///
    /// Not validated at enqueue time: an unknown type is a worker-side
    /// concern and comes back as a normal error result.
    pub job_type: String,

    /// Handler-defined input data.
    #[serde(default)]
    pub payload: JobPayload,

    /// The user on whose behalf the job was enqueued, if any.
    #[serde(default)]
    pub requested_by: Option<UserId>,

    /// Seconds the published result stays retrievable before expiring.
    #[serde(default = "default_result_ttl")]
    pub result_ttl: u64,
}

impl Job {
    /// Creates a job with a fresh id and default result TTL.
    pub fn new(job_type: impl Into<String>, payload: JobPayload) -> Self {
        Job {
            job_id: JobId::generate(),
            job_type: job_type.into(),
            payload,
            requested_by: None,
            result_ttl: DEFAULT_RESULT_TTL_SECS,
        }
    }

    /// Sets the requesting user.
    pub fn with_requested_by(mut self, user: impl Into<UserId>) -> Self {
        self.requested_by = Some(user.into());
        self
    }

    /// Sets the result TTL in seconds.
    pub fn with_result_ttl(mut self, secs: u64) -> Self {
        self.result_ttl = secs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload_of(value: Value) -> JobPayload {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn new_job_fills_defaults() {
        let job = Job::new("safety_scan", JobPayload::new());
        assert!(job.requested_by.is_none());
        assert_eq!(job.result_ttl, DEFAULT_RESULT_TTL_SECS);
    }

    #[test]
    fn builders_set_fields() {
        let job = Job::new("llm_reply", JobPayload::new())
            .with_requested_by(99u64)
            .with_result_ttl(180);
        assert_eq!(job.requested_by, Some(UserId(99)));
        assert_eq!(job.result_ttl, 180);
    }

    #[test]
    fn wire_round_trip_preserves_payload() {
        let job = Job::new(
            "safety_scan",
            payload_of(json!({
                "content": "hello",
                "guild_id": 1234,
                "nested": {"tags": ["a", "b"], "depth": 2},
            })),
        )
        .with_requested_by(42u64)
        .with_result_ttl(90);

        let raw = serde_json::to_string(&job).unwrap();
        let parsed: Job = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, job);
    }

    #[test]
    fn missing_optional_fields_deserialize_with_defaults() {
        let raw = json!({
            "job_id": "550e8400-e29b-41d4-a716-446655440000",
            "job_type": "safety_scan",
            "payload": {"content": "hi"},
        })
        .to_string();

        let parsed: Job = serde_json::from_str(&raw).unwrap();
        assert!(parsed.requested_by.is_none());
        assert_eq!(parsed.result_ttl, DEFAULT_RESULT_TTL_SECS);
    }

    #[test]
    fn requested_by_accepts_string_snowflake() {
        let raw = json!({
            "job_id": "550e8400-e29b-41d4-a716-446655440000",
            "job_type": "llm_reply",
            "payload": {},
            "requested_by": "123456789",
            "result_ttl": 60,
        })
        .to_string();

        let parsed: Job = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.requested_by, Some(UserId(123_456_789)));
    }
}
