//! Health check endpoint for liveness probes.
//!
//! Returns 200 OK if the process is running. This is intended for use
//! with orchestration systems (e.g., Kubernetes liveness probes).

use axum::http::StatusCode;

/// Health check handler.
///
/// Returns 200 OK with the text "OK". This simple endpoint is used
/// to verify that the process is up and accepting connections; it says
/// nothing about queue store reachability, which the worker checks itself
/// at startup.
pub async fn health_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn health_returns_200_ok() {
        let (status, body) = health_handler().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");
    }
}
