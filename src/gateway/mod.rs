//! Gateway-side request origination.
//!
//! The chat process embeds this module: its event handlers hand
//! [`MessageEvent`]s to a [`RequestPath`], which enqueues jobs and bridges
//! the asynchronous results back into side effects on the platform. The
//! chat SDK itself stays outside the crate, behind [`ReplySink`].
//!
//! # Module Structure
//!
//! - [`event`]: event data and the [`ReplySink`] seam
//! - [`request`]: enqueue-and-await orchestration with supervised waiters

pub mod event;
pub mod request;

pub use event::{MessageEvent, ReplySink, SinkError};
pub use request::{RequestConfig, RequestPath};
