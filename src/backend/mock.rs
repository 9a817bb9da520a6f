//! Scripted backend for tests

use super::{
    DocumentBackend, GenerationRequest, GenerationResult, PreviewSample, SessionId,
    UploadReceipt, ValidationReport,
};
use crate::artifact::{Artifact, ArtifactKind};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A call received by [`MockBackend`], in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Upload {
        kind: ArtifactKind,
        file_name: String,
        session_id: Option<SessionId>,
    },
    Validate(SessionId),
    Preview(SessionId),
    Generate(GenerationRequest),
    DownloadArchive(SessionId),
    Fetch(String),
}

type Queue<T> = Arc<Mutex<VecDeque<Result<T>>>>;

/// Mock implementation of `DocumentBackend` for testing
///
/// Each operation pops the next scripted response for that operation; an
/// operation with nothing scripted fails.
#[derive(Default, Clone)]
pub struct MockBackend {
    uploads: Queue<UploadReceipt>,
    validations: Queue<ValidationReport>,
    previews: Queue<PreviewSample>,
    generations: Queue<GenerationResult>,
    archives: Queue<Vec<u8>>,
    fetches: Queue<Vec<u8>>,
    calls: Arc<Mutex<Vec<BackendCall>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_upload_response(&self, response: Result<UploadReceipt>) {
        self.uploads.lock().await.push_back(response);
    }

    /// Script a successful upload answering with `session_id`.
    pub async fn add_upload_session(&self, session_id: &str) {
        self.add_upload_response(Ok(UploadReceipt {
            session_id: SessionId::from_string(session_id),
        }))
        .await;
    }

    pub async fn add_validate_response(&self, response: Result<ValidationReport>) {
        self.validations.lock().await.push_back(response);
    }

    pub async fn add_preview_response(&self, response: Result<PreviewSample>) {
        self.previews.lock().await.push_back(response);
    }

    pub async fn add_generate_response(&self, response: Result<GenerationResult>) {
        self.generations.lock().await.push_back(response);
    }

    pub async fn add_archive_response(&self, response: Result<Vec<u8>>) {
        self.archives.lock().await.push_back(response);
    }

    pub async fn add_fetch_response(&self, response: Result<Vec<u8>>) {
        self.fetches.lock().await.push_back(response);
    }

    /// Get the list of calls received so far
    pub async fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    async fn record(&self, call: BackendCall) {
        self.calls.lock().await.push(call);
    }
}

async fn next<T>(queue: &Queue<T>, operation: &str) -> Result<T> {
    queue.lock().await.pop_front().unwrap_or_else(|| {
        Err(Error::backend(
            500,
            Some(format!("No mock response configured for {operation}")),
        ))
    })
}

#[async_trait]
impl DocumentBackend for MockBackend {
    async fn upload_artifact(
        &self,
        artifact: &Artifact,
        session_id: Option<&SessionId>,
    ) -> Result<UploadReceipt> {
        self.record(BackendCall::Upload {
            kind: artifact.kind(),
            file_name: artifact.file_name().to_string(),
            session_id: session_id.cloned(),
        })
        .await;
        next(&self.uploads, "upload").await
    }

    async fn validate(&self, session_id: &SessionId) -> Result<ValidationReport> {
        self.record(BackendCall::Validate(session_id.clone())).await;
        next(&self.validations, "validate").await
    }

    async fn preview(&self, session_id: &SessionId) -> Result<PreviewSample> {
        self.record(BackendCall::Preview(session_id.clone())).await;
        next(&self.previews, "preview").await
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        self.record(BackendCall::Generate(request.clone())).await;
        next(&self.generations, "generate").await
    }

    async fn download_archive(&self, session_id: &SessionId) -> Result<Vec<u8>> {
        self.record(BackendCall::DownloadArchive(session_id.clone()))
            .await;
        next(&self.archives, "download").await
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.record(BackendCall::Fetch(url.to_string())).await;
        next(&self.fetches, "fetch").await
    }
}
