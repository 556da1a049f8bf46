//! LLM error types.

use thiserror::Error;

/// Errors that can occur when calling the completion API.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP request failed
    #[error("http request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// API returned an error response
    #[error("api error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// API returned a well-formed response with no usable completion
    #[error("api returned an empty completion")]
    EmptyCompletion,
}
