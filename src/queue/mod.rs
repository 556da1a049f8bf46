//! The job queue and request/response correlation protocol.
//!
//! A gateway process enqueues long-running work onto a shared queue; worker
//! processes pop jobs, execute them, and publish results keyed by job id;
//! the gateway awaits the correlated result with a timeout. Correlation
//! always goes through the job id, never through completion order: two jobs
//! enqueued back-to-back may finish in either order.
//!
//! # Module Structure
//!
//! - [`store`]: the [`QueueStore`] primitives and their Redis / in-memory
//!   backings
//! - [`keys`]: the key namespace scheme
//! - [`client`]: the [`TaskQueue`] protocol client
//! - [`error`]: the queue error taxonomy

pub mod client;
pub mod error;
pub mod keys;
pub mod store;

pub use client::TaskQueue;
pub use error::{QueueError, StoreError};
pub use keys::{DEFAULT_NAMESPACE, KeyScheme};
pub use store::{MemoryStore, QueueStore, RedisStore};
