//! Errors produced by the reputation client.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use thiserror::Error;

/// Failure modes of a classification request.
///
/// An analysis that does not finish within the poll budget is not an error;
/// it comes back as a `Queued` verdict.
#[derive(Debug, Error)]
pub enum ReputationError {
    /// Required credential or setting missing when the client is built.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Content is larger than the remote service accepts. No request was sent.
    #[error("file too large for upload: {size} bytes (limit {limit} bytes)")]
    SizeLimitExceeded { size: usize, limit: usize },

    /// The remote service answered with an unexpected status.
    #[error("reputation service error {status}: {body}")]
    RemoteService { status: u16, body: String },

    /// Connection, timeout or body read failure.
    #[error("reputation service unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    /// The remote service answered 200 with a body we could not understand.
    #[error("malformed response from reputation service: {0}")]
    MalformedResponse(String),
}

impl ResponseError for ReputationError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::SizeLimitExceeded { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::RemoteService { .. } | Self::Transport(_) | Self::MalformedResponse(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .json(serde_json::json!({ "error": self.to_string() }))
    }
}
