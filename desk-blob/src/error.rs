use thiserror::Error;

/// Result type for blob operations
pub type BlobResult<T> = Result<T, BlobError>;

/// Errors that can occur during blob operations
#[derive(Error, Debug)]
pub enum BlobError {
    /// Upload carried no content (missing file or zero bytes).
    #[error("No file provided")]
    EmptyPayload,

    #[error("Unable to write {name}: {source}")]
    StoreWrite {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to scan uploads directory: {source}")]
    StoreRead {
        #[source]
        source: std::io::Error,
    },

    #[error("File not found: {name}")]
    NotFound { name: String },

    #[error("File of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },

    #[error("Metadata store error: {message}")]
    Metadata { message: String },
}

impl BlobError {
    pub fn store_write<S: Into<String>>(name: S, source: std::io::Error) -> Self {
        Self::StoreWrite {
            name: name.into(),
            source,
        }
    }

    pub fn store_read(source: std::io::Error) -> Self {
        Self::StoreRead { source }
    }

    pub fn not_found<S: Into<String>>(name: S) -> Self {
        Self::NotFound { name: name.into() }
    }

    pub fn metadata<S: Into<String>>(message: S) -> Self {
        Self::Metadata {
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<serde_json::Error> for BlobError {
    fn from(err: serde_json::Error) -> Self {
        Self::metadata(err.to_string())
    }
}
