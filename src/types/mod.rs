//! Core domain types for the task dispatch layer.
//!
//! This module contains the fundamental records exchanged between the
//! gateway, the queue store, and the workers, designed to encode invariants
//! via the type system.

pub mod ids;
pub mod job;
pub mod result;

// Re-export commonly used types at the module level
pub use ids::{JobId, UserId};
pub use job::{DEFAULT_RESULT_TTL_SECS, Job, JobPayload};
pub use result::{JobResult, ResultStatus};
