//! Assistant error types.

use thiserror::Error;

/// Errors that can occur in the assistant flows.
#[derive(Debug, Error)]
pub enum AssistantError {
    /// Transport-level failure talking to the model service.
    #[error("LLM request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The model service answered with a non-success status.
    #[error("LLM service returned status {status}: {detail}")]
    Upstream {
        /// HTTP status code.
        status: u16,
        /// Response body, as far as it could be read.
        detail: String,
    },

    /// The model service answered 200 but the payload was unusable.
    #[error("LLM reply was malformed: {0}")]
    MalformedReply(String),

    /// A store operation failed.
    #[error(transparent)]
    Store(#[from] parley_store::StoreError),

    /// No database connection could be checked out.
    #[error("database pool unavailable: {0}")]
    Pool(#[from] r2d2::Error),

    /// A blocking database task panicked or was cancelled.
    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
