//! Local filesystem blob store backend.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;

use crate::listing::content_type_for;
use crate::naming::is_safe_stored_name;
use crate::store::{GetResult, ObjectEntry, ObjectHead, PutResult};
use crate::types::stream_from_file;
use crate::{BlobError, BlobResult, BlobStore, ByteStream};

/// A flat directory of files, one per blob.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Create the directory if needed.
    pub async fn ensure_root(&self) -> BlobResult<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| BlobError::store_write(self.root.display().to_string(), e))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> BlobResult<PathBuf> {
        if !is_safe_stored_name(key) {
            return Err(BlobError::not_found(key));
        }
        Ok(self.root.join(key))
    }
}

fn map_missing(key: &str, err: std::io::Error) -> BlobError {
    if err.kind() == ErrorKind::NotFound {
        BlobError::not_found(key)
    } else {
        BlobError::store_write(key, err)
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(
        &self,
        key: &str,
        _content_type: Option<&str>,
        mut stream: ByteStream,
    ) -> BlobResult<PutResult> {
        if !is_safe_stored_name(key) {
            return Err(BlobError::store_write(
                key,
                std::io::Error::new(ErrorKind::InvalidInput, "unsafe blob name"),
            ));
        }

        // Nothing touches the disk until the first non-empty chunk arrives.
        let first = loop {
            match stream.next().await {
                Some(Ok(chunk)) if chunk.is_empty() => continue,
                Some(Ok(chunk)) => break chunk,
                Some(Err(e)) => return Err(BlobError::store_write(key, e)),
                None => return Err(BlobError::EmptyPayload),
            }
        };

        self.ensure_root().await?;
        let path = self.root.join(key);

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| BlobError::store_write(key, e))?;

        let written = async {
            let mut size = first.len() as u64;
            file.write_all(&first).await?;
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                size += chunk.len() as u64;
                file.write_all(&chunk).await?;
            }
            file.flush().await?;
            Ok::<u64, std::io::Error>(size)
        }
        .await;

        match written {
            Ok(size_bytes) => {
                tracing::debug!(stored_name = key, size_bytes, "blob written");
                Ok(PutResult { size_bytes })
            }
            Err(e) => {
                drop(file);
                if let Err(cleanup) = tokio::fs::remove_file(&path).await {
                    tracing::warn!(stored_name = key, error = %cleanup, "failed to remove partial blob");
                }
                Err(BlobError::store_write(key, e))
            }
        }
    }

    async fn get(&self, key: &str) -> BlobResult<GetResult> {
        let path = self.path_for(key)?;
        let file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| map_missing(key, e))?;
        let meta = file.metadata().await.map_err(|e| map_missing(key, e))?;
        if !meta.is_file() {
            return Err(BlobError::not_found(key));
        }

        Ok(GetResult {
            stream: stream_from_file(file),
            size_bytes: meta.len(),
            content_type: Some(content_type_for(key).to_string()),
        })
    }

    async fn head(&self, key: &str) -> BlobResult<ObjectHead> {
        let path = self.path_for(key)?;
        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|e| map_missing(key, e))?;
        if !meta.is_file() {
            return Err(BlobError::not_found(key));
        }

        let last_modified = meta
            .modified()
            .ok()
            .map(|t| chrono::DateTime::<chrono::Utc>::from(t).timestamp_millis());

        Ok(ObjectHead {
            size_bytes: meta.len(),
            content_type: Some(content_type_for(key).to_string()),
            last_modified,
        })
    }

    async fn list(&self) -> BlobResult<Vec<ObjectEntry>> {
        let mut dir = tokio::fs::read_dir(&self.root)
            .await
            .map_err(BlobError::store_read)?;

        let mut entries = Vec::new();
        while let Some(entry) = dir.next_entry().await.map_err(BlobError::store_read)? {
            let Ok(name) = entry.file_name().into_string() else {
                tracing::warn!(path = %entry.path().display(), "skipping non UTF-8 file name");
                continue;
            };

            // Entries may vanish between read_dir and metadata.
            let meta = match entry.metadata().await {
                Ok(meta) => meta,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(BlobError::store_read(e)),
            };
            if !meta.is_file() {
                continue;
            }

            entries.push(ObjectEntry {
                key: name,
                size_bytes: meta.len(),
            });
        }
        Ok(entries)
    }

    async fn delete(&self, key: &str) -> BlobResult<()> {
        let path = self.path_for(key)?;
        let meta = tokio::fs::symlink_metadata(&path)
            .await
            .map_err(|e| map_missing(key, e))?;
        if !meta.is_file() {
            return Err(BlobError::not_found(key));
        }
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| map_missing(key, e))
    }
}
