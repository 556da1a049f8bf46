//! Bundled job handlers.
//!
//! Both handlers wrap the completion API and are registered by the worker
//! binary when an API key is configured. Job type constants live here so
//! the gateway and the worker agree on routing tags.

pub mod llm_reply;
pub mod safety_scan;

pub use llm_reply::LlmReplyHandler;
pub use safety_scan::SafetyScanHandler;

// Re-exported so handler implementations outside this crate use one path.
pub use crate::worker::dispatch::{HandlerError, JobHandler};

/// Routing tags shared by the gateway and the worker.
pub mod job_types {
    pub const LLM_REPLY: &str = "llm_reply";
    pub const SAFETY_SCAN: &str = "safety_scan";
}
