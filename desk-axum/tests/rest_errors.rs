use std::sync::Arc;

use axum::body::Body;
use axum::http::HeaderValue;
use axum::http::Request;
use desk_axum::axum;
use desk_core::{DeskApp, DeskError, DeskService, ServiceCapabilities, ServiceMethodKind};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

struct UnprocessableOnCreate;

#[async_trait::async_trait]
impl DeskService<Value, ()> for UnprocessableOnCreate {
    fn capabilities(&self) -> ServiceCapabilities {
        ServiceCapabilities::from_methods(vec![ServiceMethodKind::Create])
    }

    async fn create(&self, _data: Value, _params: ()) -> anyhow::Result<Value> {
        Err(DeskError::unprocessable("Invalid")
            .with_errors(json!({"displayName": ["required"]}))
            .into_anyhow())
    }
}

struct BoomOnCreate;

#[async_trait::async_trait]
impl DeskService<Value, ()> for BoomOnCreate {
    fn capabilities(&self) -> ServiceCapabilities {
        ServiceCapabilities::from_methods(vec![ServiceMethodKind::Create])
    }

    async fn create(&self, _data: Value, _params: ()) -> anyhow::Result<Value> {
        Err(anyhow::anyhow!("boom"))
    }
}

struct MissingOnGet;

#[async_trait::async_trait]
impl DeskService<Value, ()> for MissingOnGet {
    fn capabilities(&self) -> ServiceCapabilities {
        ServiceCapabilities::from_methods(vec![ServiceMethodKind::Get])
    }

    async fn get(&self, id: &str, _params: ()) -> anyhow::Result<Value> {
        Err(DeskError::not_found(format!("File not found: {id}")).into_anyhow())
    }
}

async fn json_body(res: axum::response::Response) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: &'static str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn malformed_json_returns_bad_request() {
    let app: DeskApp<Value, ()> = DeskApp::new();
    let router = axum(app)
        .use_service("/files", Arc::new(BoomOnCreate))
        .into_router();

    let res = router
        .oneshot(post_json("/files", "{\"title\":\"x\""))
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 400);
    assert!(res.headers().get("x-request-id").is_some());
    let body = json_body(res).await;
    assert_eq!(body["name"], "BadRequest");
    assert_eq!(body["code"], 400);
    assert_eq!(body["className"], "bad-request");
    assert!(body.get("errors").is_some());
}

#[tokio::test]
async fn request_id_is_preserved_when_provided() {
    let app: DeskApp<Value, ()> = DeskApp::new();
    let router = axum(app)
        .use_service("/files", Arc::new(BoomOnCreate))
        .into_router();

    let provided = HeaderValue::from_static("req-test-123");
    let mut req = post_json("/files", "{\"title\":\"ok\"}");
    req.headers_mut().insert("x-request-id", provided.clone());
    let res = router.oneshot(req).await.unwrap();

    assert_eq!(res.headers().get("x-request-id").unwrap(), &provided);
}

#[tokio::test]
async fn unprocessable_preserves_422_and_shape() {
    let app: DeskApp<Value, ()> = DeskApp::new();
    let router = axum(app)
        .use_service("/files", Arc::new(UnprocessableOnCreate))
        .into_router();

    let res = router
        .oneshot(post_json("/files", "{\"title\":\"ok\"}"))
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 422);
    let body = json_body(res).await;
    assert_eq!(body["name"], "Unprocessable");
    assert_eq!(body["code"], 422);
    assert_eq!(body["className"], "unprocessable");
    assert_eq!(body["errors"], json!({"displayName": ["required"]}));
}

#[tokio::test]
async fn plain_errors_map_to_general_error_shape() {
    let app: DeskApp<Value, ()> = DeskApp::new();
    let router = axum(app)
        .use_service("/files", Arc::new(BoomOnCreate))
        .into_router();

    let res = router
        .oneshot(post_json("/files", "{\"title\":\"ok\"}"))
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 500);
    let body = json_body(res).await;
    assert_eq!(body["name"], "GeneralError");
    assert_eq!(body["code"], 500);
    assert_eq!(body["className"], "general-error");
    assert!(body["message"].as_str().unwrap().contains("boom"));
}

#[tokio::test]
async fn not_found_maps_to_404() {
    let app: DeskApp<Value, ()> = DeskApp::new();
    let router = axum(app)
        .use_service("/files", Arc::new(MissingOnGet))
        .into_router();

    let res = router
        .oneshot(
            Request::builder()
                .uri("/files/1700000000000-a.png")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 404);
    let body = json_body(res).await;
    assert_eq!(body["name"], "NotFound");
    assert_eq!(body["message"], "File not found: 1700000000000-a.png");
}

#[tokio::test]
async fn methods_outside_capabilities_are_not_mounted() {
    let app: DeskApp<Value, ()> = DeskApp::new();
    let router = axum(app)
        .use_service("/files", Arc::new(MissingOnGet))
        .into_router();

    let res = router
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/files/x.png")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 405);
}
