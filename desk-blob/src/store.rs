use async_trait::async_trait;

use crate::{BlobResult, ByteStream};

/// Core blob storage operations - must be implemented by all storage backends.
///
/// Keys are flat stored names; a backend never creates nested paths.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store a blob from a stream. Fails instead of overwriting an existing key.
    async fn put(
        &self,
        key: &str,
        content_type: Option<&str>,
        stream: ByteStream,
    ) -> BlobResult<PutResult>;

    /// Get a blob as a stream
    async fn get(&self, key: &str) -> BlobResult<GetResult>;

    /// Get blob metadata without content
    async fn head(&self, key: &str) -> BlobResult<ObjectHead>;

    /// Enumerate every blob. Order is unspecified.
    async fn list(&self) -> BlobResult<Vec<ObjectEntry>>;

    /// Delete a blob. Not idempotent: a missing key is `NotFound`.
    async fn delete(&self, key: &str) -> BlobResult<()>;
}

/// Result of a successful put operation
#[derive(Debug, Clone)]
pub struct PutResult {
    pub size_bytes: u64,
}

/// Result of a get operation
pub struct GetResult {
    pub stream: ByteStream,
    pub size_bytes: u64,
    pub content_type: Option<String>,
}

/// Metadata about a blob
#[derive(Debug, Clone)]
pub struct ObjectHead {
    pub size_bytes: u64,
    pub content_type: Option<String>,
    /// Epoch millis
    pub last_modified: Option<i64>,
}

/// One entry of a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    pub key: String,
    pub size_bytes: u64,
}
