//! Dashboard metrics and the CSV export over the (optionally date-filtered) library.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    extract::{OriginalUri, Query, State},
    http::{header, HeaderMap, HeaderValue, Method},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use desk_axum::params::{FromRestParams, RestParams};
use desk_axum::DeskAxumError;
use desk_blob::{export_csv, LibraryStats, MediaLibrary, EXPORT_FILE_NAME};
use desk_core::{DeskApp, DeskError, DeskService, ServiceCapabilities, ServiceMethodKind};
use serde_json::{json, Value};

use crate::errors::blob_error;
use crate::services::files::listing_query;
use crate::services::DeskParams;

pub const SUMMARY_ID: &str = "summary";
pub const EXPORT_ID: &str = "export";

pub struct StatsService {
    library: MediaLibrary,
}

impl StatsService {
    pub fn new(library: MediaLibrary) -> Self {
        Self { library }
    }

    pub async fn compute(&self, params: &DeskParams) -> Result<LibraryStats> {
        let query = listing_query(params)?;
        self.library.stats(&query).await.map_err(blob_error)
    }

    /// `Filename,URL` rows for the same filtered listing the dashboard shows.
    pub async fn export(&self, params: &DeskParams) -> Result<String> {
        let query = listing_query(params)?;
        let blobs = self.library.query(&query).await.map_err(blob_error)?;
        export_csv(&blobs).map_err(|e| DeskError::general_error(format!("CSV export failed: {e}")).into_anyhow())
    }
}

#[async_trait]
impl DeskService<Value, DeskParams> for StatsService {
    fn capabilities(&self) -> ServiceCapabilities {
        ServiceCapabilities::from_methods(vec![ServiceMethodKind::Get])
    }

    async fn get(&self, id: &str, params: DeskParams) -> Result<Value> {
        match id {
            SUMMARY_ID => Ok(json!(self.compute(&params).await?)),
            EXPORT_ID => Ok(Value::String(self.export(&params).await?)),
            other => Err(DeskError::not_found(format!("No stats resource '{other}'")).into_anyhow()),
        }
    }
}

/// `GET /` answering with the single summary object and `GET /export` with
/// the CSV download, both through the hook pipeline.
pub fn router(app: DeskApp<Value, DeskParams>) -> Router<()> {
    Router::new()
        .route("/", get(summary))
        .route("/export", get(export))
        .with_state(app)
}

fn params_from(method: &Method, headers: &HeaderMap, query: HashMap<String, String>, uri: &axum::http::Uri) -> DeskParams {
    DeskParams::from_rest_params(RestParams::from_parts("rest", headers, query, method.as_str(), uri))
}

async fn summary(
    State(app): State<DeskApp<Value, DeskParams>>,
    method: Method,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<Value>, DeskAxumError> {
    let params = params_from(&method, &headers, query, &uri);
    let res = app.service("stats")?.get(SUMMARY_ID, params).await?;
    Ok(Json(res))
}

async fn export(
    State(app): State<DeskApp<Value, DeskParams>>,
    method: Method,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    OriginalUri(uri): OriginalUri,
) -> Result<Response, DeskAxumError> {
    let params = params_from(&method, &headers, query, &uri);
    let body = match app.service("stats")?.get(EXPORT_ID, params).await? {
        Value::String(csv) => csv,
        other => other.to_string(),
    };
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{EXPORT_FILE_NAME}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("text/csv; charset=utf-8")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}
