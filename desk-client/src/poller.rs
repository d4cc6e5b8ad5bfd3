//! Periodic re-listing, the console's change notification.

use std::sync::Arc;
use std::time::Duration;

use desk_blob::Blob;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::api::FileApi;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Lists the store on a fixed interval and publishes each successful
/// listing. Stops on [`stop`](Self::stop) or when dropped.
pub struct ListingPoller {
    rx: watch::Receiver<Vec<Blob>>,
    task: JoinHandle<()>,
}

impl ListingPoller {
    /// Starts polling; the first listing is fetched right away.
    pub fn spawn(api: Arc<dyn FileApi>, interval: Duration) -> Self {
        let (tx, rx) = watch::channel(Vec::new());

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                match api.list().await {
                    Ok(files) => {
                        if tx.send(files).is_err() {
                            // every receiver is gone
                            break;
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "poll failed, keeping last listing"),
                }
            }
        });

        Self { rx, task }
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Blob>> {
        self.rx.clone()
    }

    pub fn latest(&self) -> Vec<Blob> {
        self.rx.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for ListingPoller {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Dashboard auto-refresh switch: owns a poller while enabled.
pub struct AutoRefresh {
    api: Arc<dyn FileApi>,
    interval: Duration,
    poller: Option<ListingPoller>,
}

impl AutoRefresh {
    pub fn new(api: Arc<dyn FileApi>) -> Self {
        Self::with_interval(api, DEFAULT_POLL_INTERVAL)
    }

    pub fn with_interval(api: Arc<dyn FileApi>, interval: Duration) -> Self {
        Self {
            api,
            interval,
            poller: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.poller.is_some()
    }

    /// Turning it on starts a fresh poller; turning it off drops it.
    pub fn set_enabled(&mut self, enabled: bool) {
        match (enabled, self.poller.is_some()) {
            (true, false) => {
                self.poller = Some(ListingPoller::spawn(Arc::clone(&self.api), self.interval))
            }
            (false, true) => self.poller = None,
            _ => {}
        }
    }

    pub fn poller(&self) -> Option<&ListingPoller> {
        self.poller.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{LocalFileApi, UploadFile};
    use desk_blob::{BlobConfig, MediaLibrary};

    fn api(dir: &tempfile::TempDir) -> Arc<LocalFileApi> {
        let uploads = dir.path().join("uploads");
        std::fs::create_dir_all(&uploads).unwrap();
        Arc::new(LocalFileApi::new(MediaLibrary::from_config(
            BlobConfig::new().with_uploads_dir(uploads),
        )))
    }

    #[tokio::test]
    async fn publishes_new_listings() {
        let dir = tempfile::tempdir().unwrap();
        let api = api(&dir);
        let poller = ListingPoller::spawn(api.clone(), Duration::from_millis(20));
        let mut rx = poller.subscribe();

        api.upload(UploadFile::new("a.png", &b"x"[..])).await.unwrap();

        let seen = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                rx.changed().await.unwrap();
                if rx.borrow().len() == 1 {
                    break;
                }
            }
        })
        .await;
        assert!(seen.is_ok());
        assert_eq!(poller.latest().len(), 1);
    }

    #[tokio::test]
    async fn stop_ends_the_task() {
        let dir = tempfile::tempdir().unwrap();
        let poller = ListingPoller::spawn(api(&dir), Duration::from_millis(10));
        assert!(poller.is_running());
        poller.stop();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!poller.is_running());
    }

    #[tokio::test]
    async fn auto_refresh_toggle() {
        let dir = tempfile::tempdir().unwrap();
        let mut auto = AutoRefresh::with_interval(api(&dir), Duration::from_millis(10));
        assert!(!auto.is_enabled());
        auto.set_enabled(true);
        assert!(auto.poller().is_some_and(|p| p.is_running()));
        auto.set_enabled(false);
        assert!(auto.poller().is_none());
    }
}
