use std::path::PathBuf;

/// Configuration for the media library
#[derive(Debug, Clone)]
pub struct BlobConfig {
    /// Directory holding the blobs
    pub uploads_dir: PathBuf,

    /// Prefix of every `accessUrl` (no trailing slash)
    pub public_base_url: String,

    /// Absolute max size allowed for a single blob
    pub max_blob_bytes: u64,

    /// JSON document backing the metadata side-store
    pub metadata_path: Option<PathBuf>,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            uploads_dir: PathBuf::from("uploads"),
            public_base_url: "/uploads".to_string(),
            max_blob_bytes: 200 * 1024 * 1024, // 200MB
            metadata_path: None,
        }
    }
}

impl BlobConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_uploads_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.uploads_dir = dir.into();
        self
    }

    pub fn with_public_base_url<S: Into<String>>(mut self, url: S) -> Self {
        self.public_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_blob_bytes(mut self, bytes: u64) -> Self {
        self.max_blob_bytes = bytes;
        self
    }

    pub fn with_metadata_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.metadata_path = Some(path.into());
        self
    }
}
