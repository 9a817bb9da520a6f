//! Wire-format tests for the HTTP backend client
//!
//! Runs `HttpBackend` against an in-process axum server that records what it
//! receives.

use axum::body::Bytes;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use batchdoc::artifact::{Artifact, ArtifactKind};
use batchdoc::backend::{DocumentBackend, GenerationRequest, HttpBackend, SessionId};
use batchdoc::error::Error;
use batchdoc::format::OutputFormat;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
struct ReceivedUpload {
    route: String,
    field: String,
    file_name: Option<String>,
    content_type: Option<String>,
    size: usize,
    session_id: Option<String>,
}

#[derive(Default)]
struct Recorded {
    uploads: Vec<ReceivedUpload>,
    json_bodies: Vec<(String, Value)>,
}

type Shared = Arc<Mutex<Recorded>>;

async fn upload(
    State(state): State<Shared>,
    Path(route): Path<String>,
    mut multipart: Multipart,
) -> Json<Value> {
    let mut received = ReceivedUpload {
        route,
        field: String::new(),
        file_name: None,
        content_type: None,
        size: 0,
        session_id: None,
    };

    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        if name == "sessionId" {
            received.session_id = Some(field.text().await.unwrap());
        } else {
            received.field = name;
            received.file_name = field.file_name().map(str::to_string);
            received.content_type = field.content_type().map(str::to_string);
            received.size = field.bytes().await.unwrap().len();
        }
    }

    let session_id = received
        .session_id
        .clone()
        .unwrap_or_else(|| "sess-http".to_string());
    state.lock().unwrap().uploads.push(received);
    Json(json!({ "data": { "sessionId": session_id } }))
}

async fn validate(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    state
        .lock()
        .unwrap()
        .json_bodies
        .push(("validate".to_string(), body.clone()));

    if body["sessionId"] == "expired" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Session not found" })),
        )
            .into_response();
    }

    Json(json!({
        "data": {
            "placeholders": ["STUDENT_NAME", "AMOUNT"],
            "excelHeaders": ["STUDENT_NAME", "AMOUNT", "EMAIL"],
            "rowCount": 12,
            "validation": {
                "valid": true,
                "missingInExcel": [],
                "extraInExcel": ["EMAIL"],
                "warnings": []
            }
        }
    }))
    .into_response()
}

async fn preview(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    state
        .lock()
        .unwrap()
        .json_bodies
        .push(("preview".to_string(), body));
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": { "message": "Template could not be rendered" } })),
    )
        .into_response()
}

async fn generate(State(state): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let session_id = body["sessionId"].clone();
    state
        .lock()
        .unwrap()
        .json_bodies
        .push(("generate".to_string(), body));
    Json(json!({
        "data": {
            "sessionId": session_id,
            "totalGenerated": 12,
            "downloadUrl": "/files/out.zip"
        }
    }))
}

async fn archive(Path(session_id): Path<String>) -> Response {
    if session_id == "sess http" {
        Bytes::from_static(b"PK\x03\x04archive").into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

async fn direct_file() -> Bytes {
    Bytes::from_static(b"PK\x03\x04direct")
}

async fn start_server() -> (HttpBackend, Shared) {
    let state = Shared::default();
    let app = Router::new()
        .route("/api/upload/{route}", post(upload))
        .route("/api/validate", post(validate))
        .route("/api/preview", post(preview))
        .route("/api/generate", post(generate))
        .route("/api/download/zip/{session_id}", get(archive))
        .route("/files/out.zip", get(direct_file))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let backend = HttpBackend::new(&format!("http://{addr}"), Duration::from_secs(5)).unwrap();
    (backend, state)
}

#[tokio::test]
async fn test_upload_sends_multipart_field_per_kind() {
    let (backend, state) = start_server().await;
    let template =
        Artifact::new(ArtifactKind::Template, "receipt.docx", b"template-bytes".to_vec()).unwrap();
    let dataset = Artifact::new(ArtifactKind::Dataset, "students.xlsx", b"rows".to_vec()).unwrap();

    let receipt = backend.upload_artifact(&template, None).await.unwrap();
    assert_eq!(receipt.session_id.as_str(), "sess-http");

    let receipt = backend
        .upload_artifact(&dataset, Some(&receipt.session_id))
        .await
        .unwrap();
    assert_eq!(receipt.session_id.as_str(), "sess-http");

    let uploads = state.lock().unwrap().uploads.clone();
    assert_eq!(
        uploads,
        vec![
            ReceivedUpload {
                route: "template".to_string(),
                field: "template".to_string(),
                file_name: Some("receipt.docx".to_string()),
                content_type: Some(
                    "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
                        .to_string()
                ),
                size: 14,
                session_id: None,
            },
            ReceivedUpload {
                route: "excel".to_string(),
                field: "excel".to_string(),
                file_name: Some("students.xlsx".to_string()),
                content_type: Some(
                    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet".to_string()
                ),
                size: 4,
                session_id: Some("sess-http".to_string()),
            },
        ]
    );
}

#[tokio::test]
async fn test_validate_posts_session_and_reads_envelope() {
    let (backend, state) = start_server().await;

    let report = backend
        .validate(&SessionId::from_string("sess-1"))
        .await
        .unwrap();

    assert_eq!(report.row_count, 12);
    assert_eq!(report.placeholders.as_slice(), &["STUDENT_NAME", "AMOUNT"]);
    assert!(report.excel_headers.contains("EMAIL"));
    assert!(report.validation.unwrap().valid);
    assert_eq!(
        state.lock().unwrap().json_bodies,
        vec![("validate".to_string(), json!({ "sessionId": "sess-1" }))]
    );
}

#[tokio::test]
async fn test_error_body_string_becomes_detail() {
    let (backend, _state) = start_server().await;

    let err = backend
        .validate(&SessionId::from_string("expired"))
        .await
        .unwrap_err();

    match &err {
        Error::Backend { status, detail } => {
            assert_eq!(*status, 404);
            assert_eq!(detail.as_deref(), Some("Session not found"));
        }
        other => panic!("expected backend error, got {other:?}"),
    }
    assert_eq!(err.user_message("Failed to validate files"), "Session not found");
}

#[tokio::test]
async fn test_error_body_object_message_becomes_detail() {
    let (backend, _state) = start_server().await;

    let err = backend
        .preview(&SessionId::from_string("sess-1"))
        .await
        .unwrap_err();

    assert_eq!(
        err.user_message("Failed to generate preview"),
        "Template could not be rendered"
    );
}

#[tokio::test]
async fn test_generate_request_wire_format() {
    let (backend, state) = start_server().await;
    let request = GenerationRequest {
        session_id: SessionId::from_string("sess-1"),
        formats: vec![OutputFormat::Docx, OutputFormat::Pdf],
        file_name_pattern: "Receipt_{{STUDENT_NAME}}".to_string(),
    };

    let result = backend.generate(&request).await.unwrap();

    assert_eq!(result.total_generated, 12);
    assert_eq!(result.download_url.as_deref(), Some("/files/out.zip"));
    assert_eq!(
        result.session_id,
        Some(SessionId::from_string("sess-1"))
    );
    assert_eq!(
        state.lock().unwrap().json_bodies[0].1,
        json!({
            "sessionId": "sess-1",
            "formats": [".docx", ".pdf"],
            "fileNamePattern": "Receipt_{{STUDENT_NAME}}"
        })
    );
}

#[tokio::test]
async fn test_archive_route_escapes_session_id() {
    let (backend, _state) = start_server().await;

    let bytes = backend
        .download_archive(&SessionId::from_string("sess http"))
        .await
        .unwrap();
    assert_eq!(bytes, b"PK\x03\x04archive".to_vec());

    let err = backend
        .download_archive(&SessionId::from_string("unknown"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Backend { status: 404, detail: None }));
}

#[tokio::test]
async fn test_fetch_resolves_relative_urls() {
    let (backend, _state) = start_server().await;

    let bytes = backend.fetch("/files/out.zip").await.unwrap();

    assert_eq!(bytes, b"PK\x03\x04direct".to_vec());
}
