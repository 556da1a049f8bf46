//! Process configuration, environment-driven to support container
//! overrides.

use crate::queue::DEFAULT_NAMESPACE;

/// Default store URL for local runs.
pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379/0";

/// Default port for the health/metrics server.
pub const DEFAULT_METRICS_PORT: u16 = 8000;

/// Configuration shared by the gateway and worker processes.
///
/// Beyond store connection settings nothing here is required: the dispatch
/// layer takes no runtime flags.
#[derive(Debug, Clone)]
pub struct Config {
    /// Queue store URL (`REDIS_URL`).
    pub redis_url: String,

    /// Key namespace prefix (`TASK_NAMESPACE`).
    pub namespace: String,

    /// Completion API key (`GROQ_API`). When unset, the worker runs without
    /// the LLM-backed handlers and logs that they are disabled.
    pub completion_api_key: Option<String>,

    /// Port the health/metrics server listens on (`METRICS_PORT`).
    pub metrics_port: u16,
}

impl Config {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through an arbitrary lookup, for tests.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Config {
            redis_url: lookup("REDIS_URL").unwrap_or_else(|| DEFAULT_REDIS_URL.into()),
            namespace: lookup("TASK_NAMESPACE").unwrap_or_else(|| DEFAULT_NAMESPACE.into()),
            completion_api_key: lookup("GROQ_API").filter(|key| !key.is_empty()),
            metrics_port: lookup("METRICS_PORT")
                .and_then(|port| port.parse().ok())
                .unwrap_or(DEFAULT_METRICS_PORT),
        }
    }
}
