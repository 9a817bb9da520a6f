//! Document backend abstraction
//!
//! The rendering service is reached through the [`DocumentBackend`] trait so
//! the workflow can be driven against the real HTTP service or a recording
//! mock in tests.

pub mod http;
pub mod mock;

pub use http::HttpBackend;
pub use mock::{BackendCall, MockBackend};

use crate::artifact::Artifact;
use crate::error::Result;
use crate::format::OutputFormat;
use crate::reconcile::{HeaderSet, PlaceholderSet, ValidationResult};
use crate::row::RowRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Server-issued session identifier. Opaque to the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Create from an existing string
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Some backends answer with an empty id instead of omitting it.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Response to an artifact upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    pub session_id: SessionId,
}

/// Placeholders and headers extracted by the backend for a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    #[serde(default)]
    pub placeholders: PlaceholderSet,
    #[serde(default)]
    pub excel_headers: HeaderSet,
    #[serde(default)]
    pub row_count: usize,
    /// The backend's own verdict, when it sends one.
    #[serde(default)]
    pub validation: Option<ValidationResult>,
}

/// A sample row rendered for the operator before generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewSample {
    #[serde(default)]
    pub session_id: Option<SessionId>,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub preview_data: Option<RowRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub session_id: SessionId,
    pub formats: Vec<OutputFormat>,
    pub file_name_pattern: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    #[serde(default)]
    pub session_id: Option<SessionId>,
    pub total_generated: usize,
    #[serde(default)]
    pub download_url: Option<String>,
}

/// Operations offered by the document rendering service.
///
/// Implementations must not retry; every failure is reported to the caller
/// once.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Upload a template or dataset. Without a session id the backend opens a
    /// new session and returns its id.
    async fn upload_artifact(
        &self,
        artifact: &Artifact,
        session_id: Option<&SessionId>,
    ) -> Result<UploadReceipt>;

    /// Extract placeholders, headers and row count for the session.
    async fn validate(&self, session_id: &SessionId) -> Result<ValidationReport>;

    /// Render a preview for the first row of the dataset.
    async fn preview(&self, session_id: &SessionId) -> Result<PreviewSample>;

    /// Generate one document per row in each requested format.
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult>;

    /// Fetch the archive of generated documents for the session.
    async fn download_archive(&self, session_id: &SessionId) -> Result<Vec<u8>>;

    /// Fetch a download URL handed out by `generate`.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validation_report_from_wire() {
        let report: ValidationReport = serde_json::from_value(json!({
            "placeholders": ["NAME", "AMOUNT", "NAME"],
            "excelHeaders": ["NAME", "AMOUNT", "EMAIL"],
            "rowCount": 12,
            "validation": {
                "valid": true,
                "missingInExcel": [],
                "extraInExcel": ["EMAIL"],
                "warnings": ["EMAIL ignored"]
            }
        }))
        .unwrap();

        assert_eq!(report.placeholders.as_slice(), &["NAME", "AMOUNT"]);
        assert_eq!(report.row_count, 12);
        assert_eq!(
            report.validation.unwrap().extra_in_excel,
            vec!["EMAIL".to_string()]
        );
    }

    #[test]
    fn test_generation_request_to_wire() {
        let request = GenerationRequest {
            session_id: SessionId::from_string("abc"),
            formats: vec![OutputFormat::Docx, OutputFormat::Odt],
            file_name_pattern: "Receipt_{{NAME}}".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "sessionId": "abc",
                "formats": [".docx", ".odt"],
                "fileNamePattern": "Receipt_{{NAME}}"
            })
        );
    }

    #[test]
    fn test_generation_result_optional_fields() {
        let result: GenerationResult =
            serde_json::from_value(json!({ "totalGenerated": 3 })).unwrap();
        assert_eq!(result.total_generated, 3);
        assert!(result.session_id.is_none());
        assert!(result.download_url.is_none());
    }
}
