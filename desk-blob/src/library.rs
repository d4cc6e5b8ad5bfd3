use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::StreamExt;

use crate::listing::{content_type_for, ListingQuery, MediaCategory};
use crate::metadata::{JsonFileMetadataStore, MemoryMetadataStore, MetadataRecord, MetadataStore};
use crate::naming::{parse_stored_name, sanitize_original_name, StoredName};
use crate::stats::LibraryStats;
use crate::store::GetResult;
use crate::{Blob, BlobConfig, BlobError, BlobResult, BlobStore, ByteStream, FsBlobStore, MetadataPatch};

/// Name used when the client sent nothing usable.
const FALLBACK_NAME: &str = "upload";

/// The media library: what services embed.
///
/// Owns the blob store and the metadata side-store and keeps them in step.
#[derive(Clone)]
pub struct MediaLibrary {
    store: Arc<dyn BlobStore>,
    metadata: Arc<dyn MetadataStore>,
    config: BlobConfig,
}

impl MediaLibrary {
    pub fn new<S, M>(store: S, metadata: M, config: BlobConfig) -> Self
    where
        S: BlobStore + 'static,
        M: MetadataStore + 'static,
    {
        Self {
            store: Arc::new(store),
            metadata: Arc::new(metadata),
            config,
        }
    }

    /// Filesystem store under `config.uploads_dir`; JSON metadata when a
    /// path is configured, in-memory otherwise.
    pub fn from_config(config: BlobConfig) -> Self {
        let store = FsBlobStore::new(config.uploads_dir.clone());
        let metadata: Arc<dyn MetadataStore> = match &config.metadata_path {
            Some(path) => Arc::new(JsonFileMetadataStore::new(path.clone())),
            None => Arc::new(MemoryMetadataStore::new()),
        };
        Self {
            store: Arc::new(store),
            metadata,
            config,
        }
    }

    pub fn config(&self) -> &BlobConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    /// `{public_base_url}/{storedName}`, path-encoded.
    pub fn access_url(&self, stored_name: &str) -> String {
        format!(
            "{}/{}",
            self.config.public_base_url.trim_end_matches('/'),
            urlencoding::encode(stored_name)
        )
    }

    fn to_blob(&self, stored_name: &str, size_bytes: u64, record: Option<&MetadataRecord>) -> Blob {
        let (parsed_at, parsed_original) = parse_stored_name(stored_name);
        Blob {
            stored_name: stored_name.to_string(),
            original_name: record
                .map(|r| r.original_name.clone())
                .unwrap_or_else(|| parsed_original.to_string()),
            created_at: record.and_then(|r| r.created_at).or(parsed_at),
            size_bytes,
            access_url: self.access_url(stored_name),
            category: MediaCategory::classify(stored_name),
            display_name: record.and_then(|r| r.display_name.clone()),
            description: record.and_then(|r| r.description.clone()),
        }
    }

    /// Persist a new blob under a freshly generated stored name.
    pub async fn put(
        &self,
        original_name: &str,
        content_type: Option<&str>,
        body: ByteStream,
    ) -> BlobResult<Blob> {
        let original = sanitize_original_name(original_name)
            .unwrap_or_else(|| FALLBACK_NAME.to_string());
        let stored = StoredName::now(&original);
        let content_type = content_type
            .map(str::to_string)
            .unwrap_or_else(|| content_type_for(&original).to_string());

        let limit = self.config.max_blob_bytes;
        let seen = Arc::new(AtomicU64::new(0));
        let exceeded = Arc::new(AtomicBool::new(false));
        let limited = {
            let seen = seen.clone();
            let exceeded = exceeded.clone();
            body.map(move |chunk| {
                let chunk = chunk?;
                let total = seen.fetch_add(chunk.len() as u64, Ordering::Relaxed) + chunk.len() as u64;
                if total > limit {
                    exceeded.store(true, Ordering::Relaxed);
                    return Err(std::io::Error::other("blob size limit exceeded"));
                }
                Ok(chunk)
            })
        };

        let put = match self
            .store
            .put(stored.as_str(), Some(&content_type), Box::pin(limited))
            .await
        {
            Ok(put) => put,
            Err(_) if exceeded.load(Ordering::Relaxed) => {
                return Err(BlobError::TooLarge {
                    size: seen.load(Ordering::Relaxed),
                    limit,
                })
            }
            Err(e) => return Err(e),
        };

        let record = MetadataRecord::new(stored.as_str(), &original, stored.timestamp_ms());
        if let Err(e) = self.metadata.put(record.clone()).await {
            tracing::error!(stored_name = %stored, error = %e, "metadata write failed, rolling back blob");
            if let Err(del) = self.store.delete(stored.as_str()).await {
                tracing::warn!(stored_name = %stored, error = %del, "rollback delete failed");
            }
            return Err(e);
        }

        tracing::info!(stored_name = %stored, size_bytes = put.size_bytes, "blob stored");
        Ok(self.to_blob(stored.as_str(), put.size_bytes, Some(&record)))
    }

    /// Every blob currently in the store. Order is unspecified.
    pub async fn list(&self) -> BlobResult<Vec<Blob>> {
        let entries = self.store.list().await?;
        let records = self.metadata_or_empty().await;

        Ok(entries
            .iter()
            .map(|e| self.to_blob(&e.key, e.size_bytes, records.get(&e.key)))
            .collect())
    }

    /// Listing with a filter/sort query applied.
    pub async fn query(&self, query: &ListingQuery) -> BlobResult<Vec<Blob>> {
        Ok(query.apply(&self.list().await?))
    }

    pub async fn get(&self, stored_name: &str) -> BlobResult<Blob> {
        let head = self.store.head(stored_name).await?;
        let record = self.metadata.get(stored_name).await.unwrap_or_else(|e| {
            tracing::warn!(stored_name, error = %e, "metadata lookup failed");
            None
        });
        Ok(self.to_blob(stored_name, head.size_bytes, record.as_ref()))
    }

    /// Content stream for a blob.
    pub async fn open(&self, stored_name: &str) -> BlobResult<GetResult> {
        self.store.get(stored_name).await
    }

    /// Remove a blob and its metadata. A missing blob is `NotFound`.
    pub async fn delete(&self, stored_name: &str) -> BlobResult<()> {
        self.store.delete(stored_name).await?;
        if let Err(e) = self.metadata.remove(stored_name).await {
            tracing::warn!(stored_name, error = %e, "blob deleted but metadata removal failed");
        }
        tracing::info!(stored_name, "blob deleted");
        Ok(())
    }

    /// Change display name and/or description of an existing blob.
    pub async fn edit(&self, stored_name: &str, patch: &MetadataPatch) -> BlobResult<Blob> {
        let head = self.store.head(stored_name).await?;

        let mut record = match self.metadata.get(stored_name).await? {
            Some(r) => r,
            None => {
                let (created_at, original) = parse_stored_name(stored_name);
                MetadataRecord::new(stored_name, original, created_at)
            }
        };
        record.apply(patch);
        self.metadata.put(record.clone()).await?;

        tracing::info!(stored_name, "metadata updated");
        Ok(self.to_blob(stored_name, head.size_bytes, Some(&record)))
    }

    pub async fn stats(&self, query: &ListingQuery) -> BlobResult<LibraryStats> {
        Ok(LibraryStats::compute(&self.query(query).await?))
    }

    async fn metadata_or_empty(&self) -> BTreeMap<String, MetadataRecord> {
        match self.metadata.all().await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(error = %e, "metadata unavailable, listing from names only");
                BTreeMap::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{collect_stream, stream_from_bytes};
    use tempfile::TempDir;

    fn library(dir: &TempDir) -> MediaLibrary {
        std::fs::create_dir_all(dir.path().join("uploads")).unwrap();
        MediaLibrary::from_config(
            BlobConfig::new()
                .with_uploads_dir(dir.path().join("uploads"))
                .with_metadata_path(dir.path().join("metadata.json"))
                .with_public_base_url("http://localhost:5000/uploads/")
                .with_max_blob_bytes(16),
        )
    }

    #[tokio::test]
    async fn upload_then_list_then_delete() {
        let dir = TempDir::new().unwrap();
        let lib = library(&dir);

        let blob = lib
            .put("my photo.png", None, stream_from_bytes(&b"hello"[..]))
            .await
            .unwrap();
        assert!(blob.stored_name.ends_with("-my photo.png"));
        assert_eq!(blob.original_name, "my photo.png");
        assert_eq!(blob.size_bytes, 5);
        assert_eq!(blob.category, MediaCategory::Image);
        assert!(blob.created_at.is_some());
        assert_eq!(
            blob.access_url,
            format!("http://localhost:5000/uploads/{}", urlencoding::encode(&blob.stored_name))
        );

        let listed = lib.list().await.unwrap();
        assert_eq!(listed, vec![blob.clone()]);

        let content = lib.open(&blob.stored_name).await.unwrap();
        assert_eq!(&collect_stream(content.stream).await.unwrap()[..], b"hello");

        lib.delete(&blob.stored_name).await.unwrap();
        assert!(lib.list().await.unwrap().is_empty());
        assert!(lib.delete(&blob.stored_name).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn rejects_empty_and_oversized() {
        let dir = TempDir::new().unwrap();
        let lib = library(&dir);

        let err = lib
            .put("a.txt", None, stream_from_bytes(bytes::Bytes::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, BlobError::EmptyPayload));

        let err = lib
            .put("big.bin", None, stream_from_bytes(vec![0u8; 32]))
            .await
            .unwrap_err();
        assert!(matches!(err, BlobError::TooLarge { limit: 16, .. }));
        assert!(lib.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn edit_requires_existing_blob() {
        let dir = TempDir::new().unwrap();
        let lib = library(&dir);
        let patch = MetadataPatch {
            display_name: Some("Launch video".into()),
            description: Some("final cut".into()),
        };

        assert!(lib.edit("1-ghost.mp4", &patch).await.unwrap_err().is_not_found());

        let blob = lib
            .put("launch.mp4", None, stream_from_bytes(&b"v"[..]))
            .await
            .unwrap();
        let edited = lib.edit(&blob.stored_name, &patch).await.unwrap();
        assert_eq!(edited.title(), "Launch video");

        let again = lib.get(&blob.stored_name).await.unwrap();
        assert_eq!(again.description.as_deref(), Some("final cut"));
    }

    #[tokio::test]
    async fn strips_client_paths_from_names() {
        let dir = TempDir::new().unwrap();
        let lib = library(&dir);

        let blob = lib
            .put("../../secret.txt", None, stream_from_bytes(&b"x"[..]))
            .await
            .unwrap();
        assert!(blob.stored_name.ends_with("-secret.txt"));
        assert!(dir.path().join("uploads").join(&blob.stored_name).exists());
    }
}
