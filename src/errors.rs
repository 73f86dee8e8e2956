//! Error types for the transit optimization client.
//!
//! The taxonomy distinguishes failures that are terminal for a job attempt
//! (a rejected or unreachable start) from transient polling failures that
//! must not abandon a job still running server-side.

use thiserror::Error;

/// Result type alias using [`ClientError`].
pub type Result<T> = std::result::Result<T, ClientError>;

/// HTTP response error details.
#[derive(Debug, Clone)]
pub struct HttpDetail {
    /// HTTP status code (e.g. 404, 500)
    pub status: u16,
    /// Request URL
    pub url: String,
    /// Leading portion of the response body, for debugging. Display shows
    /// at most 200 chars of it.
    pub body_snippet: Option<String>,
}

impl std::fmt::Display for HttpDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HTTP {} for {}", self.status, self.url)?;
        if let Some(ref snippet) = self.body_snippet {
            let truncated: String = snippet.chars().take(200).collect();
            write!(f, " | body[0:200]={}", truncated)?;
        }
        Ok(())
    }
}

/// Details of a job the server reports as failed.
#[derive(Debug, Clone)]
pub struct JobFailure {
    /// Job kind label (e.g. "pipeline")
    pub kind: String,
    /// Server-supplied error message, or a synthesized fallback
    pub message: String,
}

impl std::fmt::Display for JobFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} job failed: {}", self.kind, self.message)
    }
}

/// Unified error enum for the transit client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network-layer failure: the request never completed.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// HTTP response error (non-2xx).
    #[error("{0}")]
    Http(HttpDetail),

    /// Response body could not be parsed as the expected JSON shape.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP success but the payload indicates the server did not accept
    /// the operation (acceptance field absent or not "started").
    #[error("server rejected {operation}: {reason}")]
    ServerRejected { operation: String, reason: String },

    /// The job ran but the server reports it failed.
    #[error("{0}")]
    RemoteJobFailed(JobFailure),

    /// Polling found the job no longer running with no result to explain why.
    #[error("job vanished: {0}")]
    JobVanished(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Authentication failed.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Invalid input or state for the requested operation.
    #[error("validation error: {0}")]
    Validation(String),
}

impl ClientError {
    /// Create an HTTP response error.
    pub fn http(status: u16, url: &str, body: Option<&str>) -> Self {
        ClientError::Http(HttpDetail {
            status,
            url: url.to_string(),
            body_snippet: body.map(|s| s.chars().take(4096).collect()),
        })
    }

    /// Create a server-rejection error for a named operation.
    pub fn rejected(operation: &str, reason: impl Into<String>) -> Self {
        ClientError::ServerRejected {
            operation: operation.to_string(),
            reason: reason.into(),
        }
    }

    /// Get the HTTP status code if this is an HTTP error.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            ClientError::Http(detail) => Some(detail.status),
            ClientError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_display() {
        let err = ClientError::http(500, "http://localhost:5000/api/run-pipeline", Some("boom"));
        let msg = format!("{}", err);
        assert!(msg.contains("500"));
        assert!(msg.contains("/api/run-pipeline"));
        assert!(msg.contains("boom"));
    }

    #[test]
    fn test_http_status() {
        let err = ClientError::http(404, "http://localhost:5000/api/ga-status", None);
        assert_eq!(err.http_status(), Some(404));
        assert_eq!(ClientError::Auth("nope".into()).http_status(), None);
    }

    #[test]
    fn test_job_failure_display() {
        let err = ClientError::RemoteJobFailed(JobFailure {
            kind: "pipeline".to_string(),
            message: "step 3 crashed".to_string(),
        });
        let msg = format!("{}", err);
        assert!(msg.contains("pipeline"));
        assert!(msg.contains("step 3 crashed"));
    }
}
