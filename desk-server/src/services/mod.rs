use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use desk_auth::{AuthenticateHook, AuthenticationService};
use desk_blob::MediaLibrary;
use desk_core::{DeskApp, DeskService};
use serde_json::Value;

pub mod files;
pub mod stats;
pub mod types;

pub use types::DeskParams;

pub struct DeskServices {
    pub files: Arc<dyn DeskService<Value, DeskParams>>,
    pub upload: Arc<dyn DeskService<Value, DeskParams>>,
    pub authentication: Arc<AuthenticationService>,
}

pub fn configure(
    app: &DeskApp<Value, DeskParams>,
    library: MediaLibrary,
    spool_dir: &Path,
) -> Result<DeskServices> {
    let authentication = AuthenticationService::from_config(&app.config_snapshot())?;

    let files: Arc<dyn DeskService<Value, DeskParams>> =
        Arc::new(files::FilesService::new(library.clone()).with_spool_dir(spool_dir));
    let upload: Arc<dyn DeskService<Value, DeskParams>> =
        Arc::new(files::FilesService::upload_only(library.clone()).with_spool_dir(spool_dir));
    let stats: Arc<dyn DeskService<Value, DeskParams>> =
        Arc::new(stats::StatsService::new(library));

    // mounted by hand in `stats::router`, so registered here
    app.register_service("stats", stats);

    Ok(DeskServices {
        files,
        upload,
        authentication,
    })
}

/// Everything except the login endpoints needs a bearer token.
pub fn register_hooks(
    app: &DeskApp<Value, DeskParams>,
    authentication: Arc<AuthenticationService>,
) -> Result<()> {
    let authenticate = Arc::new(AuthenticateHook::new(authentication));

    for name in ["files", "upload", "stats"] {
        let hook = Arc::clone(&authenticate);
        app.service(name)?.hooks(|h| {
            h.before_all(hook);
        });
    }
    Ok(())
}
