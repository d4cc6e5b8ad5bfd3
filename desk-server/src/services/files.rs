//! The `files` service: upload, list, get, edit and delete media.

use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use desk_blob::{
    stream_from_file, Blob, BlobError, DateRange, ListingQuery, MediaLibrary, MetadataPatch,
    SortOrder, TypeFilter,
};
use desk_axum::middlewares::{SPOOLED_FILES_HEADER, TEMP_FILE_PREFIX};
use desk_core::{DeskError, DeskService, ServiceCapabilities, ServiceMethodKind};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::blob_error;
use crate::services::DeskParams;

/// A file field as rewritten by the multipart layer.
#[derive(Debug, Deserialize)]
struct SpooledFile {
    temp_path: String,
    filename: Option<String>,
    content_type: Option<String>,
    #[serde(default)]
    size: u64,
}

pub struct FilesService {
    library: MediaLibrary,
    capabilities: ServiceCapabilities,
    spool_dir: PathBuf,
}

impl FilesService {
    pub fn new(library: MediaLibrary) -> Self {
        Self {
            library,
            capabilities: ServiceCapabilities::standard_crud(),
            spool_dir: std::env::temp_dir(),
        }
    }

    /// Same service restricted to `create`, for the upload endpoint.
    pub fn upload_only(library: MediaLibrary) -> Self {
        Self {
            capabilities: ServiceCapabilities::from_methods(vec![ServiceMethodKind::Create]),
            ..Self::new(library)
        }
    }

    /// Must match the multipart layer's temp dir.
    pub fn with_spool_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.spool_dir = dir.into();
        self
    }

    /// Accepts `temp_path` only if the multipart layer spooled it for this
    /// very request: listed in the layer's header, named with its prefix and
    /// sitting directly in the spool dir.
    async fn spooled_path(&self, file: &SpooledFile, params: &DeskParams) -> Result<PathBuf> {
        let reject = || {
            tracing::warn!(temp_path = %file.temp_path, "refused upload from an unspooled path");
            DeskError::bad_request("Uploads must be sent as multipart/form-data").into_anyhow()
        };

        let path = Path::new(&file.temp_path);
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return Err(reject());
        };
        let listed = params
            .headers
            .get(SPOOLED_FILES_HEADER)
            .is_some_and(|v| v.split(',').any(|n| n == name));
        if !listed || !name.starts_with(TEMP_FILE_PREFIX) {
            return Err(reject());
        }

        let parent = match path.parent() {
            Some(p) => tokio::fs::canonicalize(p).await.ok(),
            None => None,
        };
        let spool = tokio::fs::canonicalize(&self.spool_dir).await.ok();
        match (parent, spool) {
            (Some(parent), Some(spool)) if parent == spool => Ok(spool.join(name)),
            _ => Err(reject()),
        }
    }

    async fn store_spooled(&self, file: &SpooledFile, path: &Path) -> Result<Blob, BlobError> {
        if file.size == 0 {
            return Err(BlobError::EmptyPayload);
        }
        let handle = tokio::fs::File::open(path)
            .await
            .map_err(|e| BlobError::store_write(file.temp_path.clone(), e))?;
        let name = file.filename.as_deref().unwrap_or_default();
        self.library
            .put(name, file.content_type.as_deref(), stream_from_file(handle))
            .await
    }
}

/// Blob JSON plus the `filename` / `url` / `path` aliases the console uses.
pub fn file_json(blob: &Blob) -> Value {
    let mut v = json!(blob);
    if let Some(obj) = v.as_object_mut() {
        obj.insert("filename".into(), json!(blob.stored_name));
        obj.insert("url".into(), json!(blob.access_url));
        obj.insert("path".into(), json!(format!("/uploads/{}", blob.stored_name)));
    }
    v
}

/// `type`, `search`, `order`, `start`, `end` query parameters.
pub fn listing_query(params: &DeskParams) -> Result<ListingQuery> {
    let rest = &params.inner;
    let bad = |e: desk_blob::listing::ParseQueryError| DeskError::bad_request(e.to_string()).into_anyhow();

    let mut query = ListingQuery::new();
    if let Some(t) = rest.query_value("type") {
        query = query.with_type(t.parse::<TypeFilter>().map_err(bad)?);
    }
    if let Some(term) = rest.query_value("search") {
        query = query.with_search(term);
    }
    if let Some(order) = rest.query_value("order") {
        query = query.with_order(order.parse::<SortOrder>().map_err(bad)?);
    }
    let range = DateRange::parse(rest.query_value("start"), rest.query_value("end")).map_err(bad)?;
    Ok(query.with_date_range(range))
}

#[async_trait]
impl DeskService<Value, DeskParams> for FilesService {
    fn capabilities(&self) -> ServiceCapabilities {
        self.capabilities.clone()
    }

    async fn find(&self, params: DeskParams) -> Result<Vec<Value>> {
        let query = listing_query(&params)?;
        let blobs = self.library.query(&query).await.map_err(blob_error)?;
        Ok(blobs.iter().map(file_json).collect())
    }

    async fn get(&self, id: &str, _params: DeskParams) -> Result<Value> {
        let blob = self.library.get(id).await.map_err(blob_error)?;
        Ok(file_json(&blob))
    }

    async fn create(&self, data: Value, params: DeskParams) -> Result<Value> {
        let Some(field) = data.get("file").cloned() else {
            return Err(blob_error(BlobError::EmptyPayload));
        };
        let file: SpooledFile = serde_json::from_value(field)
            .map_err(|_| blob_error(BlobError::EmptyPayload))?;
        let path = self.spooled_path(&file, &params).await?;

        let stored = self.store_spooled(&file, &path).await;
        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::debug!(path = %path.display(), error = %e, "temp file already gone");
        }
        let blob = stored.map_err(blob_error)?;

        Ok(json!({
            "message": "File uploaded successfully",
            "file": file_json(&blob),
        }))
    }

    async fn patch(&self, id: Option<&str>, data: Value, _params: DeskParams) -> Result<Value> {
        let id = id.ok_or_else(|| DeskError::bad_request("A stored name is required").into_anyhow())?;
        let patch: MetadataPatch = serde_json::from_value(data).map_err(|e| {
            DeskError::bad_request("Invalid metadata")
                .with_errors(json!({ "_schema": [e.to_string()] }))
                .into_anyhow()
        })?;
        if patch.is_empty() {
            return Err(DeskError::bad_request("Nothing to update: send displayName and/or description").into_anyhow());
        }

        let blob = self.library.edit(id, &patch).await.map_err(blob_error)?;
        Ok(file_json(&blob))
    }

    async fn remove(&self, id: Option<&str>, _params: DeskParams) -> Result<Value> {
        let id = id.ok_or_else(|| DeskError::bad_request("A stored name is required").into_anyhow())?;
        self.library.delete(id).await.map_err(blob_error)?;
        Ok(json!({
            "message": "File deleted successfully",
            "storedName": id,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use desk_blob::BlobConfig;
    use desk_core::ErrorKind;
    use std::collections::HashMap;

    fn params(query: &[(&str, &str)]) -> DeskParams {
        let mut p = DeskParams::internal(Default::default());
        p.inner.query = query
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();
        p
    }

    fn service(dir: &tempfile::TempDir) -> FilesService {
        let uploads = dir.path().join("uploads");
        let spool = dir.path().join("spool");
        std::fs::create_dir_all(&uploads).unwrap();
        std::fs::create_dir_all(&spool).unwrap();
        FilesService::new(MediaLibrary::from_config(
            BlobConfig::new()
                .with_uploads_dir(uploads)
                .with_public_base_url("http://localhost:5000/uploads"),
        ))
        .with_spool_dir(spool)
    }

    fn upload_body(path: &std::path::Path, name: &str, size: usize) -> Value {
        json!({
            "file": {
                "temp_path": path.to_string_lossy(),
                "filename": name,
                "content_type": null,
                "size": size,
            }
        })
    }

    /// What the multipart layer hands over: a spooled file and the header naming it.
    async fn spool(dir: &tempfile::TempDir, name: &str, content: &[u8]) -> (Value, DeskParams) {
        let temp_name = format!("{TEMP_FILE_PREFIX}{name}");
        let path = dir.path().join("spool").join(&temp_name);
        tokio::fs::write(&path, content).await.unwrap();

        let mut p = params(&[]);
        p.headers.insert(SPOOLED_FILES_HEADER.to_string(), temp_name);
        (upload_body(&path, name, content.len()), p)
    }

    #[tokio::test]
    async fn create_stores_and_removes_the_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir);
        let (data, p) = spool(&dir, "cat.png", b"png").await;
        let temp = data["file"]["temp_path"].as_str().unwrap().to_string();

        let out = svc.create(data, p).await.unwrap();
        assert_eq!(out["message"], "File uploaded successfully");
        let stored = out["file"]["storedName"].as_str().unwrap();
        assert!(stored.ends_with("-cat.png"));
        assert_eq!(out["file"]["filename"], stored);
        assert_eq!(out["file"]["path"], format!("/uploads/{stored}"));
        assert!(!std::path::Path::new(&temp).exists());
    }

    #[tokio::test]
    async fn create_without_file_is_empty_payload() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir);

        let err = svc.create(json!({}), params(&[])).await.unwrap_err();
        assert_eq!(DeskError::normalize(err).kind, ErrorKind::BadRequest);

        let (data, p) = spool(&dir, "empty.png", b"").await;
        let err = svc.create(data, p).await.unwrap_err();
        let desk = DeskError::normalize(err);
        assert_eq!(desk.message, "No file provided");
    }

    #[tokio::test]
    async fn find_applies_query_parameters() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir);
        for name in ["b.png", "a.png", "clip.mp4", "notes.txt"] {
            let (data, p) = spool(&dir, name, b"x").await;
            svc.create(data, p).await.unwrap();
        }

        let all = svc.find(params(&[])).await.unwrap();
        assert_eq!(all.len(), 4);

        let images = svc
            .find(params(&[("type", "image"), ("order", "asc")]))
            .await
            .unwrap();
        let names: Vec<&str> = images.iter().map(|v| v["originalName"].as_str().unwrap()).collect();
        assert_eq!(names, ["a.png", "b.png"]);

        let search = svc.find(params(&[("search", "CLIP")])).await.unwrap();
        assert_eq!(search.len(), 1);

        let err = svc.find(params(&[("order", "sideways")])).await.unwrap_err();
        assert_eq!(DeskError::normalize(err).kind, ErrorKind::BadRequest);
    }

    #[tokio::test]
    async fn patch_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir);
        let (data, p) = spool(&dir, "a.png", b"x").await;
        let out = svc.create(data, p).await.unwrap();
        let stored = out["file"]["storedName"].as_str().unwrap().to_string();

        let edited = svc
            .patch(Some(&stored), json!({"displayName": "Cover"}), params(&[]))
            .await
            .unwrap();
        assert_eq!(edited["displayName"], "Cover");

        let err = svc.patch(Some(&stored), json!({}), params(&[])).await.unwrap_err();
        assert_eq!(DeskError::normalize(err).kind, ErrorKind::BadRequest);

        let removed = svc.remove(Some(&stored), params(&[])).await.unwrap();
        assert_eq!(removed["message"], "File deleted successfully");

        let err = svc.remove(Some(&stored), params(&[])).await.unwrap_err();
        assert_eq!(DeskError::normalize(err).kind, ErrorKind::NotFound);

        let err = svc
            .patch(Some(&stored), json!({"description": "x"}), params(&[]))
            .await
            .unwrap_err();
        assert_eq!(DeskError::normalize(err).kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn create_refuses_paths_the_multipart_layer_did_not_spool() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir);

        let secret = dir.path().join("secret.conf");
        tokio::fs::write(&secret, b"db_password=hunter2").await.unwrap();

        // arbitrary path, no header
        let err = svc
            .create(upload_body(&secret, "loot.txt", 19), params(&[]))
            .await
            .unwrap_err();
        assert_eq!(DeskError::normalize(err).kind, ErrorKind::BadRequest);

        // header naming the file does not help outside the spool dir
        let mut p = params(&[]);
        p.headers.insert(SPOOLED_FILES_HEADER.to_string(), "secret.conf".into());
        let err = svc
            .create(upload_body(&secret, "loot.txt", 19), p)
            .await
            .unwrap_err();
        assert_eq!(DeskError::normalize(err).kind, ErrorKind::BadRequest);

        // a spooled file of another request is not listed for this one
        let (data, _) = spool(&dir, "other.png", b"x").await;
        let mut p = params(&[]);
        p.headers.insert(SPOOLED_FILES_HEADER.to_string(), format!("{TEMP_FILE_PREFIX}mine.png"));
        let other = data["file"]["temp_path"].as_str().unwrap().to_string();
        let err = svc.create(data, p).await.unwrap_err();
        assert_eq!(DeskError::normalize(err).kind, ErrorKind::BadRequest);

        // traversal out of the spool dir
        let sneaky = dir
            .path()
            .join("spool")
            .join("..")
            .join(format!("{TEMP_FILE_PREFIX}x"));
        tokio::fs::write(&sneaky, b"x").await.unwrap();
        let mut p = params(&[]);
        p.headers.insert(SPOOLED_FILES_HEADER.to_string(), format!("{TEMP_FILE_PREFIX}x"));
        let err = svc.create(upload_body(&sneaky, "x.png", 1), p).await.unwrap_err();
        assert_eq!(DeskError::normalize(err).kind, ErrorKind::BadRequest);

        assert!(secret.exists());
        assert!(std::path::Path::new(&other).exists());
        assert!(sneaky.exists());
        assert!(svc.find(params(&[])).await.unwrap().is_empty());
    }
}
