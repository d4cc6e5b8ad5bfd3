//! The HTTP client against a live server on an ephemeral port.

use std::sync::Arc;

use desk_blob::MetadataPatch;
use desk_client::{ClientError, Confirmation, FileManager, FileView, Session, Status, UploadFile};
use desk_core::DeskApp;
use desk_server::DeskParams;
use serde_json::Value;
use tokio::net::TcpListener;

async fn serve(dir: &tempfile::TempDir) -> String {
    let app: DeskApp<Value, DeskParams> = DeskApp::new();
    app.set("uploads.dir", dir.path().join("uploads").to_string_lossy().to_string());
    app.set("metadata.path", dir.path().join("metadata.json").to_string_lossy().to_string());
    app.set("uploads.spoolDir", dir.path().join("spool").to_string_lossy().to_string());
    app.set("auth.jwt.secret", "test-secret");
    app.set("auth.admin.password", "hunter2");
    app.set("auth.admin.hashCost", "4");

    let router = desk_server::build_with(app).await.unwrap().into_router();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn wrong_password_is_invalid_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let base = serve(&dir).await;

    let err = Session::login(&base, "admin", "nope").await.unwrap_err();
    assert_eq!(err, ClientError::InvalidCredentials);
}

#[tokio::test]
async fn file_manager_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let base = serve(&dir).await;

    let session = Session::login(&base, "admin", "hunter2").await.unwrap();
    assert_eq!(session.username(), "admin");
    let api = Arc::new(session.file_api().unwrap());
    let mut fm = FileManager::new(api.clone());

    for i in 0..12 {
        fm.enqueue(UploadFile::new(format!("shot-{i:02}.png"), format!("img{i}").into_bytes()));
    }
    fm.enqueue(UploadFile::new("empty.mp4", Vec::<u8>::new()));

    let outcome = fm.upload_all().await;
    assert_eq!(outcome.succeeded.len(), 12);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].1, ClientError::EmptyPayload);
    assert_eq!(fm.status(), Status::UploadFailed);
    assert_eq!(fm.files().len(), 12);

    let mut view = FileView::new();
    let page = view.visible(fm.files());
    assert_eq!(page.items.len(), 10);
    assert!(view.has_more(fm.files()));
    view.load_more();
    let page = view.visible(fm.files());
    assert_eq!(page.items.len(), 12);
    assert_eq!(page.visible_count, 12);

    let target = fm.files()[0].stored_name.clone();
    let patch = MetadataPatch {
        display_name: Some("Cover".into()),
        description: None,
    };
    let blob = fm.edit(&target, &patch).await.unwrap();
    assert_eq!(blob.title(), "Cover");

    let names: Vec<String> = fm.files().iter().take(3).map(|b| b.stored_name.clone()).collect();
    for n in &names {
        fm.toggle_selection(n);
    }
    let outcome = fm.delete_selected().await;
    assert!(outcome.is_success());
    assert_eq!(fm.files().len(), 9);

    let err = fm.delete_one(&names[0], Confirmation::Confirmed).await.unwrap_err();
    assert!(err.is_not_found());

    let stats = api.stats(None, None).await.unwrap();
    assert_eq!(stats.total, 9);
    assert_eq!(stats.images, 9);

    let csv = api.export_csv(None, None).await.unwrap();
    let rows: Vec<&str> = csv.lines().collect();
    assert_eq!(rows[0], "Filename,URL");
    assert_eq!(rows.len(), 10);
    assert!(rows.iter().skip(1).all(|r| !r.contains(&names[0])));
}
