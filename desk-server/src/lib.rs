//! mediadesk backend.
//!
//! | route | service |
//! |---|---|
//! | `POST /authentication`, `POST /api/login` | admin login, returns a JWT |
//! | `/api/files`, `/api/files/{storedName}` | list, upload, get, edit, delete |
//! | `POST /api/upload` | upload only |
//! | `GET /api/stats` | counts per category and day |
//! | `GET /api/stats/export` | `Filename,URL` CSV of the filtered listing |
//! | `GET /uploads/{storedName}` | raw blob content |
//! | `GET /health` | liveness |

pub mod config;
pub mod errors;
pub mod hooks;
pub mod services;

use anyhow::{Context, Result};
use desk_axum::middlewares::{MultipartConfig, MultipartToJson};
use desk_axum::{axum, AxumApp};
use desk_blob::MediaLibrary;
use desk_core::DeskApp;
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

pub use config::Settings;
pub use services::DeskParams;

/// Builds the app from the process environment.
pub async fn build() -> Result<AxumApp<Value, DeskParams>> {
    build_with(DeskApp::new()).await
}

/// Builds the app on top of `app`; keys already set on it win over the environment.
pub async fn build_with(app: DeskApp<Value, DeskParams>) -> Result<AxumApp<Value, DeskParams>> {
    config::configure(&app)?;
    let settings = Settings::from_snapshot(&app.config_snapshot())?;

    for dir in [&settings.uploads_dir, &settings.spool_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;
    }
    let library = MediaLibrary::from_config(settings.blob_config());

    hooks::global_hooks(&app);
    let svcs = services::configure(&app, library, &settings.spool_dir)?;

    let multipart = MultipartToJson::with_config(
        MultipartConfig::new()
            .max_file_size(settings.max_file_size_bytes)
            .file_field("file")
            .temp_dir(settings.spool_dir.clone()),
    );

    let mut ax = axum(app)
        .use_service_with("/api/files", svcs.files, multipart.clone())
        .use_service_with("/api/upload", svcs.upload, multipart)
        .use_service("/authentication", svcs.authentication.clone())
        .use_service("/api/login", svcs.authentication.clone())
        .service("/health", || async { "ok" });

    let stats = services::stats::router(ax.app.clone());
    ax = ax.use_router("/api/stats", stats);

    services::register_hooks(&ax.app, svcs.authentication)?;

    ax.router = ax
        .router
        .nest_service("/uploads", ServeDir::new(&settings.uploads_dir))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    tracing::info!(
        uploads_dir = %settings.uploads_dir.display(),
        public_base_url = %settings.public_base_url,
        max_file_size_bytes = settings.max_file_size_bytes,
        "mediadesk configured"
    );
    Ok(ax)
}
