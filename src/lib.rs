//! Guildest task dispatch layer.
//!
//! The queue-backed protocol that lets the chat gateway hand long-running
//! work (LLM completions, safety classification) to worker processes and
//! correlate the results back by job id.

pub mod config;
pub mod gateway;
pub mod handlers;
pub mod llm;
pub mod metrics;
pub mod queue;
pub mod server;
pub mod types;
pub mod worker;
