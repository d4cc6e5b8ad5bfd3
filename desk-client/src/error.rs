use desk_blob::BlobError;
use serde_json::Value;
use thiserror::Error;

/// Client-side view of a failed operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("No file provided")]
    EmptyPayload,

    #[error("Upload could not be stored: {0}")]
    StoreWrite(String),

    #[error("Unable to scan uploads directory: {0}")]
    StoreRead(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("File too large: {0}")]
    TooLarge(String),

    #[error("Invalid login")]
    InvalidCredentials,

    #[error("Not authenticated: {0}")]
    Unauthorized(String),

    #[error("Request failed with status {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound(_))
    }

    /// Map an error response. The server tags storage failures with
    /// `data.reason`; the status code decides when the tag is missing.
    pub fn from_response(status: u16, body: &Value) -> Self {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let reason = body
            .get("data")
            .and_then(|d| d.get("reason"))
            .and_then(Value::as_str);

        match (reason, status) {
            (Some("EmptyPayload"), _) => ClientError::EmptyPayload,
            (Some("StoreWrite"), _) => ClientError::StoreWrite(message),
            (Some("StoreRead"), _) => ClientError::StoreRead(message),
            (Some("NotFound"), _) | (None, 404) => ClientError::NotFound(message),
            (Some("TooLarge"), _) | (None, 413) => ClientError::TooLarge(message),
            (_, 401) => ClientError::Unauthorized(message),
            _ => ClientError::Server { status, message },
        }
    }
}

impl From<BlobError> for ClientError {
    fn from(err: BlobError) -> Self {
        match err {
            BlobError::EmptyPayload => ClientError::EmptyPayload,
            BlobError::NotFound { name } => ClientError::NotFound(name),
            BlobError::StoreRead { source } => ClientError::StoreRead(source.to_string()),
            e @ BlobError::StoreWrite { .. } => ClientError::StoreWrite(e.to_string()),
            e @ BlobError::TooLarge { .. } => ClientError::TooLarge(e.to_string()),
            e @ BlobError::Metadata { .. } => ClientError::StoreWrite(e.to_string()),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}
