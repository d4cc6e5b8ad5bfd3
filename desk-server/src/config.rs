use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use desk_blob::BlobConfig;
use desk_core::{DeskApp, DeskConfigSnapshot};
use serde_json::Value;

use crate::services::DeskParams;

pub const ENV_PREFIX: &str = "MEDIADESK__";

/// Fill app settings from the environment, keeping anything already set.
/// `MEDIADESK__A__B` overrides win over both.
pub fn configure(app: &DeskApp<Value, DeskParams>) -> Result<()> {
    configure_http(app);
    configure_uploads(app);
    configure_auth(app);

    app.load_env(ENV_PREFIX);
    Ok(())
}

fn set_default(app: &DeskApp<Value, DeskParams>, key: &str, value: String) {
    if app.get(key).is_none() {
        app.set(key, value);
    }
}

fn env_or(keys: &[&str], default: &str) -> String {
    keys.iter()
        .find_map(|k| env::var(k).ok().filter(|v| !v.trim().is_empty()))
        .unwrap_or_else(|| default.to_string())
}

fn configure_http(app: &DeskApp<Value, DeskParams>) {
    set_default(app, "http.host", env_or(&["HTTP_HOST"], "127.0.0.1"));
    set_default(app, "http.port", env_or(&["HTTP_PORT", "PORT"], "5000"));
}

fn configure_uploads(app: &DeskApp<Value, DeskParams>) {
    set_default(app, "uploads.dir", env_or(&["UPLOADS_DIR"], "uploads"));

    let host = app.get("http.host").unwrap_or_default();
    let port = app.get("http.port").unwrap_or_default();
    set_default(
        app,
        "uploads.publicBaseUrl",
        env_or(&["PUBLIC_BASE_URL"], &format!("http://{host}:{port}/uploads")),
    );
    set_default(app, "uploads.maxFileSizeMb", env_or(&["MAX_FILE_SIZE_MB"], "200"));
    set_default(app, "metadata.path", env_or(&["METADATA_PATH"], "data/metadata.json"));
    if let Ok(dir) = env::var("SPOOL_DIR") {
        set_default(app, "uploads.spoolDir", dir);
    }
}

fn configure_auth(app: &DeskApp<Value, DeskParams>) {
    set_default(app, "auth.jwt.secret", env_or(&["AUTH_JWT_SECRET"], "dev-secret"));
    set_default(app, "auth.jwt.expiresIn", env_or(&["AUTH_JWT_EXPIRES_IN"], "1h"));
    set_default(app, "auth.admin.username", env_or(&["ADMIN_USERNAME"], "admin"));

    if let Ok(hash) = env::var("ADMIN_PASSWORD_HASH") {
        set_default(app, "auth.admin.passwordHash", hash);
    }
    if app.get("auth.admin.passwordHash").is_none() {
        set_default(app, "auth.admin.password", env_or(&["ADMIN_PASSWORD"], "admin"));
    }
}

/// Typed view of the settings the server itself needs.
#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub uploads_dir: PathBuf,
    pub public_base_url: String,
    pub max_file_size_bytes: u64,
    pub metadata_path: PathBuf,
    /// Where the multipart layer spools uploads before they are stored.
    pub spool_dir: PathBuf,
}

impl Settings {
    pub fn from_snapshot(cfg: &DeskConfigSnapshot) -> Result<Self> {
        let port = cfg
            .get("http.port")
            .unwrap_or("5000")
            .parse::<u16>()
            .context("http.port must be a port number")?;
        let max_mb = cfg.get_u64("uploads.maxFileSizeMb").unwrap_or(200);

        Ok(Self {
            host: cfg.get_string("http.host").unwrap_or_else(|| "127.0.0.1".into()),
            port,
            uploads_dir: cfg.get_string("uploads.dir").unwrap_or_else(|| "uploads".into()).into(),
            public_base_url: cfg.get_string("uploads.publicBaseUrl").unwrap_or_default(),
            max_file_size_bytes: max_mb * 1024 * 1024,
            metadata_path: cfg
                .get_string("metadata.path")
                .unwrap_or_else(|| "data/metadata.json".into())
                .into(),
            spool_dir: cfg
                .get_string("uploads.spoolDir")
                .map(PathBuf::from)
                .unwrap_or_else(env::temp_dir),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn blob_config(&self) -> BlobConfig {
        BlobConfig::new()
            .with_uploads_dir(self.uploads_dir.clone())
            .with_public_base_url(self.public_base_url.clone())
            .with_max_blob_bytes(self.max_file_size_bytes)
            .with_metadata_path(self.metadata_path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_values_survive_defaults() {
        let app: DeskApp<Value, DeskParams> = DeskApp::new();
        app.set("uploads.dir", "/srv/media");
        app.set("http.port", "8080");
        app.set("auth.admin.passwordHash", "$2b$04$hash");
        configure(&app).unwrap();

        let s = Settings::from_snapshot(&app.config_snapshot()).unwrap();
        assert_eq!(s.uploads_dir, PathBuf::from("/srv/media"));
        assert_eq!(s.port, 8080);
        assert!(app.get("auth.admin.password").is_none());
        assert!(app.get("auth.jwt.secret").is_some());
    }

    #[test]
    fn bad_port_is_an_error() {
        let app: DeskApp<Value, DeskParams> = DeskApp::new();
        app.set("http.port", "not-a-port");
        assert!(Settings::from_snapshot(&app.config_snapshot()).is_err());
    }
}
