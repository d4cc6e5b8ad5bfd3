//! The file operations the console needs, independent of transport.

use async_trait::async_trait;
use bytes::Bytes;
use desk_blob::{stream_from_bytes, Blob, MediaLibrary, MetadataPatch};

use crate::ClientError;

/// A file waiting in the upload queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub content: Bytes,
    pub content_type: Option<String>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

#[async_trait]
pub trait FileApi: Send + Sync {
    async fn upload(&self, file: UploadFile) -> Result<Blob, ClientError>;

    async fn list(&self) -> Result<Vec<Blob>, ClientError>;

    async fn delete(&self, stored_name: &str) -> Result<(), ClientError>;

    async fn edit(&self, stored_name: &str, patch: &MetadataPatch) -> Result<Blob, ClientError>;
}

/// In-process API straight over a [`MediaLibrary`].
#[derive(Clone)]
pub struct LocalFileApi {
    library: MediaLibrary,
}

impl LocalFileApi {
    pub fn new(library: MediaLibrary) -> Self {
        Self { library }
    }

    pub fn library(&self) -> &MediaLibrary {
        &self.library
    }
}

#[async_trait]
impl FileApi for LocalFileApi {
    async fn upload(&self, file: UploadFile) -> Result<Blob, ClientError> {
        if file.content.is_empty() {
            return Err(ClientError::EmptyPayload);
        }
        Ok(self
            .library
            .put(
                &file.name,
                file.content_type.as_deref(),
                stream_from_bytes(file.content),
            )
            .await?)
    }

    async fn list(&self) -> Result<Vec<Blob>, ClientError> {
        Ok(self.library.list().await?)
    }

    async fn delete(&self, stored_name: &str) -> Result<(), ClientError> {
        Ok(self.library.delete(stored_name).await?)
    }

    async fn edit(&self, stored_name: &str, patch: &MetadataPatch) -> Result<Blob, ClientError> {
        Ok(self.library.edit(stored_name, patch).await?)
    }
}
