//! HTTP API tests driven through the router without binding a socket.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;
use uuid::Uuid;

use common::*;
use lexrag::adapters::http::{ErrorModel, JOB_ID_HEADER};
use lexrag::JobStatus;

const BOUNDARY: &str = "lexrag-test-boundary";

fn multipart_request(field: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/v1")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    (status, headers, body)
}

fn error_body(body: &[u8]) -> ErrorModel {
    serde_json::from_slice(body).expect("error body should be an ErrorModel")
}

#[tokio::test]
async fn test_health() {
    let dir = temp_dir();
    let app = start_app(test_config(dir.path())).await;

    let (status, _, body) = send(&app.router(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");

    app.shutdown().await;
}

#[tokio::test]
async fn test_upload_then_query() {
    let dir = temp_dir();
    let app = start_app(test_config(dir.path())).await;
    let router = app.router();

    let request = multipart_request(
        "file",
        "lease.pdf",
        "application/pdf",
        &pdf_bytes(&["The tenant pays rent on the first day of each month."]),
    );
    let (status, headers, body) = send(&router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        String::from_utf8(body).unwrap(),
        "Document lease.pdf uploaded successfully"
    );

    let job_id: Uuid = headers[JOB_ID_HEADER].to_str().unwrap().parse().unwrap();
    let record = wait_for_job(&app.state().queue, job_id).await;
    assert_eq!(record.status(), JobStatus::Succeeded);

    let (status, _, body) = send(&router, get("/api/v1/query?query=when%20is%20rent%20paid")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body).unwrap().contains("first day of each month"));

    let (status, _, body) = send(&router, get("/api/v1/search?query=rent&top_k=1")).await;
    assert_eq!(status, StatusCode::OK);
    let hits: Vec<serde_json::Value> = serde_json::from_slice(&body).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["metadata"]["file_name"], "lease.pdf");

    let (status, headers, body) = send(
        &router,
        multipart_request("file", "lease.pdf", "application/pdf", &pdf_bytes(&["other"])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(body).unwrap(), "Document lease.pdf already exists");
    assert!(headers.get(JOB_ID_HEADER).is_none());

    app.shutdown().await;
}

#[tokio::test]
async fn test_upload_validation_errors() {
    let dir = temp_dir();
    let app = start_app(test_config(dir.path())).await;
    let router = app.router();

    let (status, _, body) = send(
        &router,
        multipart_request("file", "photo.png", "image/png", b"\x89PNG"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error = error_body(&body);
    assert_eq!(error.code, "400");
    assert_eq!(error.message, "Invalid file format. Only PDF files are supported");

    let (status, _, body) = send(
        &router,
        multipart_request("file", "report", "application/pdf", &pdf_bytes(&["x"])),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_body(&body).message, "Invalid file");

    let (status, _, body) = send(
        &router,
        multipart_request("attachment", "report.pdf", "application/pdf", &pdf_bytes(&["x"])),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_body(&body).message, "Invalid file");

    assert!(app.state().queue.list().await.is_empty());
    app.shutdown().await;
}

#[tokio::test]
async fn test_query_requires_text() {
    let dir = temp_dir();
    let app = start_app(test_config(dir.path())).await;
    let router = app.router();

    for uri in ["/api/v1/query", "/api/v1/query?query=", "/api/v1/query?query=%20%20"] {
        let (status, _, body) = send(&router, get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(error_body(&body).message, "query is null or empty");
    }

    let (status, _, _) = send(&router, get("/api/v1/search?query=rent&top_k=0")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.shutdown().await;
}

#[tokio::test]
async fn test_query_on_empty_index_answers_without_context() {
    let dir = temp_dir();
    let app = start_app(test_config(dir.path())).await;

    let (status, _, body) = send(&app.router(), get("/api/v1/query?query=anything")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body).unwrap().contains("cannot answer"));

    app.shutdown().await;
}

#[tokio::test]
async fn test_job_endpoints() {
    let dir = temp_dir();
    let app = start_app_with(test_config(dir.path()), StubPdfExtractor::failing(1)).await;
    let router = app.router();

    let (status, _, _) = send(&router, get(&format!("/api/v1/jobs/{}", Uuid::new_v4()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, body) = send(&router, get("/api/v1/jobs/not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_body(&body).code, "400");

    let (_, headers, _) = send(
        &router,
        multipart_request("file", "deed.pdf", "application/pdf", &pdf_bytes(&["Deed of sale."])),
    )
    .await;
    let job_id: Uuid = headers[JOB_ID_HEADER].to_str().unwrap().parse().unwrap();
    assert_eq!(wait_for_job(&app.state().queue, job_id).await.status(), JobStatus::Failed);

    let (status, _, body) = send(&router, get(&format!("/api/v1/jobs/{job_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    let record: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(record["status"], "failed");
    assert_eq!(record["document_name"], "deed.pdf");

    let retry = Request::builder()
        .method("POST")
        .uri(format!("/api/v1/jobs/{job_id}/retry"))
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&router, retry).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let retried: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(retried["retry_of"], job_id.to_string());

    let retry_id: Uuid = retried["id"].as_str().unwrap().parse().unwrap();
    assert_eq!(wait_for_job(&app.state().queue, retry_id).await.status(), JobStatus::Succeeded);

    let (status, _, body) = send(&router, get("/api/v1/jobs")).await;
    assert_eq!(status, StatusCode::OK);
    let jobs: Vec<serde_json::Value> = serde_json::from_slice(&body).unwrap();
    assert_eq!(jobs.len(), 2);

    // A succeeded job cannot be retried
    let retry = Request::builder()
        .method("POST")
        .uri(format!("/api/v1/jobs/{retry_id}/retry"))
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(&router, retry).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.shutdown().await;
}
