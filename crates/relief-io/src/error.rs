//! Errors from vectorization backends.

use relief_pipeline::PipelineError;

/// A vectorization request failed.
///
/// Failures are reported as-is; nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum VectorizeError {
    /// Decoding, configuration, tracing or importing failed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// The tracing engine could not be initialized.
    #[error("tracer initialization failed: {0}")]
    TracerInit(String),

    /// The remote backend reported a failure.
    #[error("backend error{}: {message}", status_suffix(.status))]
    Backend {
        /// HTTP status, when the failure came with a non-success status.
        status: Option<u16>,
        /// Message from the backend's `error` field or a description of
        /// the malformed response.
        message: String,
    },

    /// The HTTP round trip failed.
    #[error("request failed: {0}")]
    Http(#[from] ureq::Error),

    /// A blocking task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[allow(clippy::ref_option)]
fn status_suffix(status: &Option<u16>) -> String {
    status.map_or_else(String::new, |s| format!(" (HTTP {s})"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_message_includes_status() {
        let err = VectorizeError::Backend {
            status: Some(500),
            message: "potrace crashed".to_string(),
        };
        assert_eq!(err.to_string(), "backend error (HTTP 500): potrace crashed");

        let err = VectorizeError::Backend {
            status: None,
            message: "no svg".to_string(),
        };
        assert_eq!(err.to_string(), "backend error: no svg");
    }

    #[test]
    fn pipeline_errors_pass_through() {
        let err = VectorizeError::from(PipelineError::EmptyInput);
        assert_eq!(err.to_string(), "input image data is empty");
    }
}
