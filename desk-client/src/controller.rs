//! Upload/delete orchestration for the file manager screen.

use std::collections::BTreeSet;
use std::sync::Arc;

use desk_blob::{Blob, MetadataPatch};
use futures::future::join_all;

use crate::api::{FileApi, UploadFile};
use crate::ClientError;

/// What the last mutation did, for the status line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Status {
    #[default]
    Idle,
    Uploading,
    Uploaded,
    UploadFailed,
    Deleted,
    DeleteFailed,
}

/// Explicit user answer to "delete this file?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Cancelled,
}

/// Per-item results of a batch upload or delete.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, ClientError)>,
}

impl BatchOutcome {
    /// True only when every item went through.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Client state of the file manager: upload queue, selection and the
/// last listing fetched from the store.
pub struct FileManager {
    api: Arc<dyn FileApi>,
    queue: Vec<UploadFile>,
    selection: BTreeSet<String>,
    files: Vec<Blob>,
    status: Status,
}

impl FileManager {
    pub fn new(api: Arc<dyn FileApi>) -> Self {
        Self {
            api,
            queue: Vec::new(),
            selection: BTreeSet::new(),
            files: Vec::new(),
            status: Status::Idle,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn files(&self) -> &[Blob] {
        &self.files
    }

    pub fn queue(&self) -> &[UploadFile] {
        &self.queue
    }

    pub fn selection(&self) -> &BTreeSet<String> {
        &self.selection
    }

    pub fn enqueue(&mut self, file: UploadFile) {
        self.queue.push(file);
    }

    pub fn clear_queue(&mut self) {
        self.queue.clear();
    }

    /// Adds or removes `stored_name`; returns whether it is now selected.
    pub fn toggle_selection(&mut self, stored_name: &str) -> bool {
        if self.selection.remove(stored_name) {
            false
        } else {
            self.selection.insert(stored_name.to_string());
            true
        }
    }

    /// Re-reads the listing from the store.
    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        self.files = self.api.list().await?;
        Ok(())
    }

    async fn refresh_quietly(&mut self) {
        if let Err(e) = self.refresh().await {
            tracing::warn!(error = %e, "re-list after mutation failed");
        }
    }

    /// Uploads every queued file concurrently. The queue is emptied and the
    /// listing refreshed whatever the individual outcomes.
    pub async fn upload_all(&mut self) -> BatchOutcome {
        let queued = std::mem::take(&mut self.queue);
        if queued.is_empty() {
            return BatchOutcome::default();
        }

        self.status = Status::Uploading;
        let names: Vec<String> = queued.iter().map(|f| f.name.clone()).collect();
        let api = &self.api;
        let results = join_all(queued.into_iter().map(|file| api.upload(file))).await;

        let mut outcome = BatchOutcome::default();
        for (name, result) in names.into_iter().zip(results) {
            match result {
                Ok(blob) => outcome.succeeded.push(blob.stored_name),
                Err(e) => {
                    tracing::warn!(file = %name, error = %e, "upload failed");
                    outcome.failed.push((name, e));
                }
            }
        }

        self.status = if outcome.is_success() {
            Status::Uploaded
        } else {
            Status::UploadFailed
        };
        self.refresh_quietly().await;
        outcome
    }

    /// Deletes one file once the user has confirmed. A cancelled
    /// confirmation never reaches the store and returns `Ok(false)`.
    pub async fn delete_one(
        &mut self,
        stored_name: &str,
        confirmation: Confirmation,
    ) -> Result<bool, ClientError> {
        if confirmation == Confirmation::Cancelled {
            return Ok(false);
        }

        match self.api.delete(stored_name).await {
            Ok(()) => {
                self.selection.remove(stored_name);
                self.status = Status::Deleted;
                self.refresh_quietly().await;
                Ok(true)
            }
            Err(e) => {
                tracing::warn!(stored_name, error = %e, "delete failed");
                self.status = Status::DeleteFailed;
                Err(e)
            }
        }
    }

    /// Deletes the selection one file at a time. Every selected name is
    /// attempted exactly once; the selection is cleared afterwards.
    pub async fn delete_selected(&mut self) -> BatchOutcome {
        let selected = std::mem::take(&mut self.selection);
        let mut outcome = BatchOutcome::default();

        for name in selected {
            match self.api.delete(&name).await {
                Ok(()) => outcome.succeeded.push(name),
                Err(e) => {
                    tracing::warn!(stored_name = %name, error = %e, "batch delete item failed");
                    outcome.failed.push((name, e));
                }
            }
        }

        if outcome.attempted() > 0 {
            self.status = if outcome.is_success() {
                Status::Deleted
            } else {
                Status::DeleteFailed
            };
        }
        self.refresh_quietly().await;
        outcome
    }

    /// Changes display name / description, then re-lists.
    pub async fn edit(
        &mut self,
        stored_name: &str,
        patch: &MetadataPatch,
    ) -> Result<Blob, ClientError> {
        let blob = self.api.edit(stored_name, patch).await?;
        self.refresh_quietly().await;
        Ok(blob)
    }
}
