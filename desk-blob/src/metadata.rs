//! Display metadata kept next to the blobs, keyed by stored name.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use crate::{BlobError, BlobResult, MetadataPatch};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRecord {
    pub stored_name: String,
    pub original_name: String,
    pub created_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl MetadataRecord {
    pub fn new(stored_name: &str, original_name: &str, created_at: Option<i64>) -> Self {
        Self {
            stored_name: stored_name.to_string(),
            original_name: original_name.to_string(),
            created_at,
            display_name: None,
            description: None,
        }
    }

    pub fn apply(&mut self, patch: &MetadataPatch) {
        if let Some(name) = &patch.display_name {
            self.display_name = Some(name.clone());
        }
        if let Some(desc) = &patch.description {
            self.description = Some(desc.clone());
        }
    }
}

#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn get(&self, stored_name: &str) -> BlobResult<Option<MetadataRecord>>;

    async fn all(&self) -> BlobResult<BTreeMap<String, MetadataRecord>>;

    /// Insert or replace.
    async fn put(&self, record: MetadataRecord) -> BlobResult<()>;

    /// Returns whether a record existed.
    async fn remove(&self, stored_name: &str) -> BlobResult<bool>;
}

/// In-memory metadata store (default for tests and ephemeral setups)
#[derive(Debug, Default, Clone)]
pub struct MemoryMetadataStore {
    records: Arc<RwLock<BTreeMap<String, MetadataRecord>>>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn get(&self, stored_name: &str) -> BlobResult<Option<MetadataRecord>> {
        Ok(self.records.read().await.get(stored_name).cloned())
    }

    async fn all(&self) -> BlobResult<BTreeMap<String, MetadataRecord>> {
        Ok(self.records.read().await.clone())
    }

    async fn put(&self, record: MetadataRecord) -> BlobResult<()> {
        self.records
            .write()
            .await
            .insert(record.stored_name.clone(), record);
        Ok(())
    }

    async fn remove(&self, stored_name: &str) -> BlobResult<bool> {
        Ok(self.records.write().await.remove(stored_name).is_some())
    }
}

/// A single JSON document on disk.
///
/// Every write rewrites the document through a temp file and a rename, so
/// readers never observe a half-written file.
#[derive(Debug)]
pub struct JsonFileMetadataStore {
    path: PathBuf,
    records: Mutex<Option<BTreeMap<String, MetadataRecord>>>,
}

impl JsonFileMetadataStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            records: Mutex::new(None),
        }
    }

    async fn load(&self) -> BlobResult<BTreeMap<String, MetadataRecord>> {
        match tokio::fs::read(&self.path).await {
            Ok(raw) if raw.iter().all(u8::is_ascii_whitespace) => Ok(BTreeMap::new()),
            Ok(raw) => Ok(serde_json::from_slice(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(BlobError::metadata(format!(
                "cannot read {}: {e}",
                self.path.display()
            ))),
        }
    }

    async fn persist(&self, records: &BTreeMap<String, MetadataRecord>) -> BlobResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BlobError::metadata(e.to_string()))?;
        }

        let body = serde_json::to_vec_pretty(records)?;
        let tmp = self
            .path
            .with_extension(format!("tmp-{}", uuid::Uuid::new_v4().simple()));

        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| BlobError::metadata(e.to_string()))?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(BlobError::metadata(e.to_string()));
        }
        Ok(())
    }

    async fn with_records<T>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, MetadataRecord>) -> (T, bool),
    ) -> BlobResult<T> {
        let mut guard = self.records.lock().await;
        if guard.is_none() {
            *guard = Some(self.load().await?);
        }
        let records = guard.get_or_insert_with(BTreeMap::new);

        let mut next = records.clone();
        let (out, dirty) = f(&mut next);
        if dirty {
            self.persist(&next).await?;
            *records = next;
        }
        Ok(out)
    }
}

#[async_trait]
impl MetadataStore for JsonFileMetadataStore {
    async fn get(&self, stored_name: &str) -> BlobResult<Option<MetadataRecord>> {
        self.with_records(|r| (r.get(stored_name).cloned(), false))
            .await
    }

    async fn all(&self) -> BlobResult<BTreeMap<String, MetadataRecord>> {
        self.with_records(|r| (r.clone(), false)).await
    }

    async fn put(&self, record: MetadataRecord) -> BlobResult<()> {
        self.with_records(|r| {
            r.insert(record.stored_name.clone(), record);
            ((), true)
        })
        .await
    }

    async fn remove(&self, stored_name: &str) -> BlobResult<bool> {
        self.with_records(|r| {
            let existed = r.remove(stored_name).is_some();
            (existed, existed)
        })
        .await
    }
}
