use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use pretty_assertions::assert_eq;
use tower::ServiceExt;

mod common;
use common::TextDecoder;

const BOUNDARY: &str = "converter-test-boundary";

fn upload(field: &str, file_name: &str, content: &str) -> Request<Body> {
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n{content}\r\n--{b}--\r\n",
        b = BOUNDARY,
    );

    Request::builder()
        .method("POST")
        .uri("/convert")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn converts_upload() {
    let work = tempfile::tempdir().unwrap();
    let app = converter::api::router(Arc::new(TextDecoder), work.path(), Default::default());

    let response = app
        .oneshot(upload("demo", "final.dem", "kill\nkill\n"))
        .await
        .unwrap();

    assert_eq!(StatusCode::OK, response.status());
    assert_eq!(
        "text/csv",
        response.headers()[header::CONTENT_TYPE].to_str().unwrap()
    );
    assert_eq!(
        "attachment; filename=\"final.csv\"",
        response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
    );

    let csv = body_text(response).await;
    assert!(csv.starts_with(&extraction::row::header()));
    assert_eq!(2, csv.lines().filter(|l| l.starts_with("Kill,")).count());

    // Scratch folders are removed after each request
    assert_eq!(0, std::fs::read_dir(work.path()).unwrap().count());
}

#[tokio::test]
async fn corrupted_upload_is_rejected() {
    let work = tempfile::tempdir().unwrap();
    let app = converter::api::router(Arc::new(TextDecoder), work.path(), Default::default());

    let response = app
        .oneshot(upload("demo", "broken.dem", "corrupt"))
        .await
        .unwrap();

    assert_eq!(StatusCode::UNPROCESSABLE_ENTITY, response.status());
    assert!(body_text(response).await.contains("corrupt test input"));
    assert_eq!(0, std::fs::read_dir(work.path()).unwrap().count());
}

#[tokio::test]
async fn missing_field() {
    let work = tempfile::tempdir().unwrap();
    let app = converter::api::router(Arc::new(TextDecoder), work.path(), Default::default());

    let response = app
        .oneshot(upload("other", "final.dem", "kill\n"))
        .await
        .unwrap();

    assert_eq!(StatusCode::BAD_REQUEST, response.status());
}
