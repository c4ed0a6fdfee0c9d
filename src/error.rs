// Error taxonomy for repository content operations.

use std::path::PathBuf;

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{path} not found")]
    NotFound { path: String },

    #[error("{path} is not a file")]
    NotAFile { path: String },

    #[error("{path} is not a directory")]
    NotADirectory { path: String },

    #[error("{path} is not valid UTF-8 text")]
    NotText { path: String },

    /// The version token sent with a mutation was stale, or missing where the
    /// store requires one. The caller has to re-resolve and resubmit.
    #[error("version conflict on {path} ({status}): {message}")]
    Conflict {
        path: String,
        status: StatusCode,
        message: String,
    },

    #[error("request for {path} failed with status {status}: {message}")]
    Api {
        path: String,
        status: StatusCode,
        message: String,
    },

    #[error("network error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected response for {path}: {reason}")]
    UnexpectedResponse { path: String, reason: String },

    /// The destination was written but the source could not be removed.
    /// Both paths now exist in the repository.
    #[error("{to} was created but {from} could not be deleted, remove it manually: {source}")]
    PartialMove {
        from: String,
        to: String,
        version: String,
        #[source]
        source: Box<Error>,
    },

    #[error("local file '{}': {source}", .path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid repository path '{0}'")]
    InvalidPath(String),

    #[error("access token contains characters that cannot be sent in a header")]
    InvalidToken,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Classify a non-success response from the contents endpoint.
    pub fn from_response(path: &str, status: StatusCode, body: &Value) -> Self {
        let message = remote_message(status, body);
        let path = path.to_string();

        if status == StatusCode::NOT_FOUND {
            return Error::NotFound { path };
        }

        let stale_token = status == StatusCode::CONFLICT
            || (status == StatusCode::UNPROCESSABLE_ENTITY && message.contains("sha"));
        if stale_token {
            Error::Conflict {
                path,
                status,
                message,
            }
        } else {
            Error::Api {
                path,
                status,
                message,
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict { .. })
    }

    /// Status code reported by the remote store, when there is one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::NotFound { .. } => Some(StatusCode::NOT_FOUND),
            Error::Conflict { status, .. } | Error::Api { status, .. } => Some(*status),
            Error::Request(e) => e.status(),
            Error::PartialMove { source, .. } => source.status(),
            _ => None,
        }
    }
}

/// The store puts a human-readable explanation in `message`; fall back to
/// the canonical reason phrase when the body has none.
fn remote_message(status: StatusCode, body: &Value) -> String {
    body.get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown Error").to_string())
}
