//! Key naming scheme for the queue store namespace.
//!
//! One list key holds pending jobs; one short-lived list key per job id
//! holds its result. Everything is prefixed with a deployment namespace so
//! several bot instances can share a store.

use crate::types::JobId;

/// Default namespace prefix for queue keys.
pub const DEFAULT_NAMESPACE: &str = "guildest";

/// Derives the store keys used by the queue protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyScheme {
    namespace: String,
}

impl KeyScheme {
    /// Creates a key scheme under the given namespace.
    pub fn new(namespace: impl Into<String>) -> Self {
        KeyScheme {
            namespace: namespace.into(),
        }
    }

    /// Returns the namespace prefix.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The shared list key holding pending jobs, oldest at the head.
    pub fn queue_key(&self) -> String {
        format!("{}:tasks", self.namespace)
    }

    /// The per-job key its result is published under.
    pub fn result_key(&self, job_id: &JobId) -> String {
        format!("{}:results:{}", self.namespace, job_id)
    }
}

impl Default for KeyScheme {
    fn default() -> Self {
        KeyScheme::new(DEFAULT_NAMESPACE)
    }
}
