//! Worker-side dispatch: the handler table and the drain loop.
//!
//! A worker process builds a [`HandlerRegistry`] at startup, health-checks
//! the store, then runs [`Worker::run`] until cancelled. True parallelism
//! comes from running multiple worker processes against the shared queue,
//! not from threads within one; the store's atomic pop is what keeps them
//! from double-claiming a job.
//!
//! # Module Structure
//!
//! - [`dispatch`]: the [`JobHandler`] seam and `job_type → handler` routing
//! - [`runner`]: the pop/execute/publish loop

pub mod dispatch;
pub mod runner;

pub use dispatch::{HandlerError, HandlerRegistry, JobHandler};
pub use runner::{Worker, WorkerConfig};
