use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::rejection::JsonRejection,
    extract::{OriginalUri, Path, Query, State},
    http::{HeaderMap, Method},
    routing::MethodRouter,
    Json, Router,
};
use desk_core::{DeskApp, DeskError, ServiceCapabilities, ServiceMethodKind};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

use crate::{
    params::{FromRestParams, RestParams},
    DeskAxumError, DeskAxumState,
};

type Q = Query<HashMap<String, String>>;

fn map_json_rejection(rejection: JsonRejection) -> DeskAxumError {
    DeskError::bad_request("Failed to parse the request body as JSON")
        .with_errors(json!({"_schema": [rejection.to_string()]}))
        .into()
}

fn params<P: FromRestParams>(
    headers: &HeaderMap,
    query: HashMap<String, String>,
    method: &Method,
    uri: &axum::http::Uri,
) -> P {
    P::from_rest_params(RestParams::from_parts(
        "rest",
        headers,
        query,
        method.as_str(),
        uri,
    ))
}

async fn find<R, P>(
    State(state): State<DeskAxumState<R, P>>,
    method: Method,
    headers: HeaderMap,
    Query(query): Q,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<Vec<R>>, DeskAxumError>
where
    R: Serialize + DeserializeOwned + Send + Sync + 'static,
    P: FromRestParams + Send + Sync + Clone + 'static,
{
    let svc = state.app.service(&state.service)?;
    let res = svc.find(params(&headers, query, &method, &uri)).await?;
    Ok(Json(res))
}

async fn create<R, P>(
    State(state): State<DeskAxumState<R, P>>,
    method: Method,
    headers: HeaderMap,
    Query(query): Q,
    OriginalUri(uri): OriginalUri,
    data: Result<Json<R>, JsonRejection>,
) -> Result<Json<R>, DeskAxumError>
where
    R: Serialize + DeserializeOwned + Send + Sync + 'static,
    P: FromRestParams + Send + Sync + Clone + 'static,
{
    let Json(data) = data.map_err(map_json_rejection)?;
    let svc = state.app.service(&state.service)?;
    let res = svc
        .create(data, params(&headers, query, &method, &uri))
        .await?;
    Ok(Json(res))
}

async fn get<R, P>(
    State(state): State<DeskAxumState<R, P>>,
    method: Method,
    headers: HeaderMap,
    Query(query): Q,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
) -> Result<Json<R>, DeskAxumError>
where
    R: Serialize + DeserializeOwned + Send + Sync + 'static,
    P: FromRestParams + Send + Sync + Clone + 'static,
{
    let svc = state.app.service(&state.service)?;
    let res = svc.get(&id, params(&headers, query, &method, &uri)).await?;
    Ok(Json(res))
}

async fn patch<R, P>(
    State(state): State<DeskAxumState<R, P>>,
    method: Method,
    headers: HeaderMap,
    Query(query): Q,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
    data: Result<Json<R>, JsonRejection>,
) -> Result<Json<R>, DeskAxumError>
where
    R: Serialize + DeserializeOwned + Send + Sync + 'static,
    P: FromRestParams + Send + Sync + Clone + 'static,
{
    let Json(data) = data.map_err(map_json_rejection)?;
    let svc = state.app.service(&state.service)?;
    let res = svc
        .patch(Some(&id), data, params(&headers, query, &method, &uri))
        .await?;
    Ok(Json(res))
}

async fn remove<R, P>(
    State(state): State<DeskAxumState<R, P>>,
    method: Method,
    headers: HeaderMap,
    Query(query): Q,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
) -> Result<Json<R>, DeskAxumError>
where
    R: Serialize + DeserializeOwned + Send + Sync + 'static,
    P: FromRestParams + Send + Sync + Clone + 'static,
{
    let svc = state.app.service(&state.service)?;
    let res = svc
        .remove(Some(&id), params(&headers, query, &method, &uri))
        .await?;
    Ok(Json(res))
}

/// REST routes for a registered service. Only the methods the service
/// advertises in its capabilities are mounted; the rest answer 405.
pub(crate) fn router_for<R, P>(
    service_name: &str,
    app: DeskApp<R, P>,
    caps: &ServiceCapabilities,
) -> Router<()>
where
    R: Serialize + DeserializeOwned + Send + Sync + 'static,
    P: FromRestParams + Send + Sync + Clone + 'static,
{
    let state = DeskAxumState::new(app, Arc::<str>::from(service_name));

    let mut collection: MethodRouter<DeskAxumState<R, P>> = MethodRouter::new();
    if caps.allows(&ServiceMethodKind::Find) {
        collection = collection.get(find::<R, P>);
    }
    if caps.allows(&ServiceMethodKind::Create) {
        collection = collection.post(create::<R, P>);
    }

    let mut item: MethodRouter<DeskAxumState<R, P>> = MethodRouter::new();
    if caps.allows(&ServiceMethodKind::Get) {
        item = item.get(get::<R, P>);
    }
    if caps.allows(&ServiceMethodKind::Patch) {
        item = item.patch(patch::<R, P>);
    }
    if caps.allows(&ServiceMethodKind::Remove) {
        item = item.delete(remove::<R, P>);
    }

    Router::new()
        .route("/", collection)
        .route("/{id}", item)
        .with_state(state)
}
