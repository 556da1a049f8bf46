//! The result record published by workers and consumed by waiters.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use super::job::JobPayload;

/// Terminal outcome of a job execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Ok,
    Error,
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResultStatus::Ok => "ok",
            ResultStatus::Error => "error",
        })
    }
}

/// The outcome of executing a job, keyed in the store by the job's id.
///
/// On the wire this is a flat object: `{"status": "ok"|"error",
/// "error"?: "...", ...handler-defined fields}`. Handler fields are flattened
/// alongside `status` rather than nested, so an LLM-reply result reads
/// `{"status": "ok", "reply": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub status: ResultStatus,

    /// Human-readable cause, present on error results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Handler-defined output fields, flattened into the record.
    #[serde(flatten)]
    pub fields: JobPayload,
}

impl JobResult {
    /// Creates a success result carrying the handler's output fields.
    pub fn ok(fields: JobPayload) -> Self {
        JobResult {
            status: ResultStatus::Ok,
            error: None,
            fields,
        }
    }

    /// Creates an error result with the given cause.
    pub fn error(message: impl Into<String>) -> Self {
        JobResult {
            status: ResultStatus::Error,
            error: Some(message.into()),
            fields: JobPayload::new(),
        }
    }

    /// Returns true if the job succeeded.
    pub fn is_ok(&self) -> bool {
        self.status == ResultStatus::Ok
    }

    /// Looks up a handler-defined output field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Looks up a handler-defined string field, ignoring non-string values.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}
