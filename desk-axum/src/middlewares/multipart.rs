use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use desk_core::DeskError;
use serde_json::{json, Map, Value};
use tokio::io::AsyncWriteExt;
use tower::{Layer, Service};

/// Request header listing the temp file names spooled for this request,
/// comma separated. Set only by [`MultipartToJson`]; any copy sent by the
/// client is stripped.
pub const SPOOLED_FILES_HEADER: &str = "x-desk-spooled-files";

/// File name prefix of every spooled temp file.
pub const TEMP_FILE_PREFIX: &str = "desk-upload-";

/// Configuration for multipart to JSON conversion
#[derive(Clone, Debug)]
pub struct MultipartConfig {
    /// Maximum size of a single file field in bytes (None = unlimited)
    pub max_file_size: Option<u64>,
    /// Maximum size of the whole request body in bytes (None = unlimited)
    pub max_total_size: Option<u64>,
    /// Field names to treat as files (empty = any field with a filename)
    pub file_fields: HashSet<String>,
    /// Where file fields are spooled while the request is handled
    pub temp_dir: PathBuf,
}

impl Default for MultipartConfig {
    fn default() -> Self {
        Self {
            max_file_size: Some(200 * 1024 * 1024),
            max_total_size: None,
            file_fields: HashSet::new(),
            temp_dir: std::env::temp_dir(),
        }
    }
}

impl MultipartConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = Some(size);
        self
    }

    pub fn max_total_size(mut self, size: u64) -> Self {
        self.max_total_size = Some(size);
        self
    }

    pub fn file_field(mut self, field_name: &str) -> Self {
        self.file_fields.insert(field_name.to_string());
        self
    }

    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    fn is_file_field(&self, name: &str, has_filename: bool) -> bool {
        if self.file_fields.is_empty() {
            has_filename
        } else {
            self.file_fields.contains(name)
        }
    }
}

/// Middleware that converts multipart/form-data requests to JSON.
///
/// File fields are streamed to temp files and replaced by
/// `{temp_path, filename, content_type, size}`; text fields become strings.
/// Temp files are removed once the inner service has answered.
#[derive(Clone, Default)]
pub struct MultipartToJson {
    config: Arc<MultipartConfig>,
}

impl MultipartToJson {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: MultipartConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

impl<S> Layer<S> for MultipartToJson {
    type Service = MultipartToJsonService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MultipartToJsonService {
            inner,
            config: Arc::clone(&self.config),
        }
    }
}

#[derive(Clone)]
pub struct MultipartToJsonService<S> {
    inner: S,
    config: Arc<MultipartConfig>,
}

impl<S> Service<Request<Body>> for MultipartToJsonService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let mut inner = self.inner.clone();
        let config = Arc::clone(&self.config);

        Box::pin(async move {
            req.headers_mut().remove(SPOOLED_FILES_HEADER);

            let is_multipart = req
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|ct| ct.starts_with("multipart/form-data"));

            if !is_multipart {
                return inner.call(req).await;
            }

            match convert_multipart_to_json(req, &config).await {
                Ok((json_req, temp_files)) => {
                    let res = inner.call(json_req).await;
                    remove_temp_files(&temp_files).await;
                    res
                }
                Err(failure) => {
                    tracing::warn!(error = %failure.message(), "rejected multipart request");
                    Ok(failure.into_response())
                }
            }
        })
    }
}

#[derive(Debug)]
enum MultipartFailure {
    TooLarge(String),
    Invalid(String),
    Io(String),
}

impl MultipartFailure {
    fn message(&self) -> &str {
        match self {
            Self::TooLarge(m) | Self::Invalid(m) | Self::Io(m) => m,
        }
    }

    fn io(what: &str, e: std::io::Error) -> Self {
        Self::Io(format!("{what}: {e}"))
    }
}

impl From<multer::Error> for MultipartFailure {
    fn from(e: multer::Error) -> Self {
        match e {
            multer::Error::StreamSizeExceeded { .. } | multer::Error::FieldSizeExceeded { .. } => {
                Self::TooLarge(e.to_string())
            }
            other => Self::Invalid(format!("Failed to parse multipart data: {other}")),
        }
    }
}

impl IntoResponse for MultipartFailure {
    fn into_response(self) -> Response {
        let err = match self {
            Self::TooLarge(m) => DeskError::payload_too_large(m),
            Self::Invalid(m) => DeskError::bad_request(m),
            Self::Io(m) => DeskError::general_error(m),
        };
        let status = StatusCode::from_u16(err.code()).unwrap_or(StatusCode::BAD_REQUEST);
        (status, Json(err.to_json())).into_response()
    }
}

async fn convert_multipart_to_json(
    req: Request<Body>,
    config: &MultipartConfig,
) -> Result<(Request<Body>, Vec<PathBuf>), MultipartFailure> {
    let (mut parts, body) = req.into_parts();

    let content_type = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let boundary = multer::parse_boundary(content_type)
        .map_err(|_| MultipartFailure::Invalid("Missing boundary in multipart content-type".into()))?;

    let mut constraints = multer::Constraints::new();
    if let Some(total) = config.max_total_size {
        constraints = constraints.size_limit(multer::SizeLimit::new().whole_stream(total));
    }
    let mut multipart =
        multer::Multipart::with_constraints(body.into_data_stream(), boundary, constraints);

    let mut temp_files = Vec::new();
    let fields = match read_fields(&mut multipart, config, &mut temp_files).await {
        Ok(fields) => fields,
        Err(e) => {
            remove_temp_files(&temp_files).await;
            return Err(e);
        }
    };

    let json_bytes = match serde_json::to_vec(&Value::Object(fields)) {
        Ok(bytes) => bytes,
        Err(e) => {
            remove_temp_files(&temp_files).await;
            return Err(MultipartFailure::Invalid(e.to_string()));
        }
    };

    parts.headers.remove(header::TRANSFER_ENCODING);
    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    parts
        .headers
        .insert(header::CONTENT_LENGTH, HeaderValue::from(json_bytes.len()));

    let names: Vec<String> = temp_files
        .iter()
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();
    if let Ok(value) = HeaderValue::from_str(&names.join(",")) {
        parts.headers.insert(SPOOLED_FILES_HEADER, value);
    }

    Ok((Request::from_parts(parts, Body::from(json_bytes)), temp_files))
}

async fn read_fields(
    multipart: &mut multer::Multipart<'static>,
    config: &MultipartConfig,
    temp_files: &mut Vec<PathBuf>,
) -> Result<Map<String, Value>, MultipartFailure> {
    let mut out = Map::new();

    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("unknown").to_string();
        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(|m| m.to_string());

        if !config.is_file_field(&name, filename.is_some()) {
            let value = field.text().await?;
            out.insert(name, Value::String(value));
            continue;
        }

        if out.contains_key(&name) {
            return Err(MultipartFailure::Invalid(format!(
                "Only one file is accepted per field: '{name}'"
            )));
        }

        let temp_path = config
            .temp_dir
            .join(format!("{TEMP_FILE_PREFIX}{}", uuid::Uuid::new_v4()));
        let mut file = tokio::fs::File::create(&temp_path)
            .await
            .map_err(|e| MultipartFailure::io("Failed to create temp file", e))?;
        temp_files.push(temp_path.clone());

        let mut size = 0u64;
        while let Some(chunk) = field.chunk().await? {
            size += chunk.len() as u64;
            if let Some(max) = config.max_file_size {
                if size > max {
                    return Err(MultipartFailure::TooLarge(format!(
                        "File '{name}' exceeds maximum size of {max} bytes"
                    )));
                }
            }
            file.write_all(&chunk)
                .await
                .map_err(|e| MultipartFailure::io("Failed to write chunk", e))?;
        }
        file.flush()
            .await
            .map_err(|e| MultipartFailure::io("Failed to flush temp file", e))?;

        tracing::debug!(field = %name, size_bytes = size, "spooled multipart file field");

        out.insert(
            name,
            json!({
                "temp_path": temp_path.to_string_lossy(),
                "filename": filename,
                "content_type": content_type,
                "size": size,
            }),
        );
    }

    Ok(out)
}

async fn remove_temp_files(paths: &[PathBuf]) {
    for path in paths {
        remove_quietly(path).await;
    }
}

async fn remove_quietly(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove temp file"),
    }
}
