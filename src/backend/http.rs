//! HTTP client for the document backend

use super::{
    DocumentBackend, GenerationRequest, GenerationResult, PreviewSample, SessionId,
    UploadReceipt, ValidationReport,
};
use crate::artifact::Artifact;
use crate::error::{structured_error, Error, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Success responses wrap their payload in `{"data": ...}`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionBody<'a> {
    session_id: &'a SessionId,
}

/// Talks to the backend's `/api` routes.
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    /// Create a client for the backend rooted at `api_url`.
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self> {
        let mut base_url = Url::parse(api_url)?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!("{api_url} cannot be used as an API base URL")));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, route: &str) -> Result<Url> {
        Ok(self.base_url.join(&format!("api/{route}"))?)
    }

    async fn post_json<B, T>(&self, route: &str, body: &B) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint(route)?;
        debug!("POST {}", url);
        let response = self.client.post(url).json(body).send().await?;
        read_data(response).await
    }

    async fn get_bytes(&self, url: Url) -> Result<Vec<u8>> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        let response = check_status(response).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// Turn a non-success response into `Error::Backend`, keeping the body's
/// structured error message when there is one.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|value| structured_error(&value));
    debug!("Backend error {}: {}", status, body);
    Err(Error::backend(status.as_u16(), detail))
}

async fn read_data<T: DeserializeOwned>(response: Response) -> Result<T> {
    let response = check_status(response).await?;
    let envelope: Envelope<T> = response.json().await?;
    Ok(envelope.data)
}

#[async_trait]
impl DocumentBackend for HttpBackend {
    async fn upload_artifact(
        &self,
        artifact: &Artifact,
        session_id: Option<&SessionId>,
    ) -> Result<UploadReceipt> {
        let field = artifact.kind().wire_name();
        let url = self.endpoint(&format!("upload/{field}"))?;

        let part = Part::bytes(artifact.bytes().to_vec())
            .file_name(artifact.file_name().to_string())
            .mime_str(artifact.media_type())?;
        let mut form = Form::new().part(field, part);
        if let Some(id) = session_id {
            form = form.text("sessionId", id.to_string());
        }

        info!(
            "Uploading {} {} ({} bytes, session: {})",
            artifact.kind(),
            artifact.file_name(),
            artifact.size(),
            session_id.map(SessionId::as_str).unwrap_or("new")
        );
        let response = self.client.post(url).multipart(form).send().await?;
        read_data(response).await
    }

    async fn validate(&self, session_id: &SessionId) -> Result<ValidationReport> {
        self.post_json("validate", &SessionBody { session_id }).await
    }

    async fn preview(&self, session_id: &SessionId) -> Result<PreviewSample> {
        self.post_json("preview", &SessionBody { session_id }).await
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        self.post_json("generate", request).await
    }

    async fn download_archive(&self, session_id: &SessionId) -> Result<Vec<u8>> {
        let mut url = self.endpoint("download/zip")?;
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("{} cannot be a base URL", self.base_url)))?
            .push(session_id.as_str());
        self.get_bytes(url).await
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        // Relative URLs are resolved against the API host.
        let url = self.base_url.join(url)?;
        self.get_bytes(url).await
    }
}
