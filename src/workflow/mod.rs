//! Workflow state machine
//!
//! Sequences a batch run through its phases:
//!
//! ```text
//! Upload ──validate──▶ Validate ──proceed──▶ Generate ──generate──▶ Download
//!    ▲                    │                     │                      │
//!    └──────────── reset / cancel ──────────────┴──────────────────────┘
//! ```
//!
//! The preview request is part of `proceed`; there is no separate preview
//! phase. Every operation checks the phase it starts from. A failed backend
//! call leaves the phase where it was and records an error notification.
//! `reset` is the only operation that clears state.

pub mod notification;
pub mod progress;

pub use notification::{Notification, NotificationKind};
pub use progress::{
    GenerationProgress, InstantTicker, IntervalTicker, NullSink, ProgressReplay, ProgressSink,
    ReplayHandle, Ticker,
};

use crate::artifact::{Artifact, ArtifactKind};
use crate::backend::{DocumentBackend, GenerationRequest, SessionId, ValidationReport};
use crate::error::{Error, Result};
use crate::filename::{insert_token, resolve, unknown_tokens};
use crate::format::{FormatSelection, OutputFormat};
use crate::reconcile::{reconcile, HeaderSet, PlaceholderSet, ValidationResult};
use crate::row::RowRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub const DEFAULT_FILE_NAME_PATTERN: &str = "Receipt_{{STUDENT_NAME}}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Upload,
    Validate,
    Generate,
    Download,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Upload => "upload",
            Phase::Validate => "validate",
            Phase::Generate => "generate",
            Phase::Download => "download",
        };
        f.write_str(name)
    }
}

/// Generation settings a fresh workflow starts with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowDefaults {
    pub formats: FormatSelection,
    pub file_name_pattern: String,
}

impl Default for WorkflowDefaults {
    fn default() -> Self {
        Self {
            formats: FormatSelection::default(),
            file_name_pattern: DEFAULT_FILE_NAME_PATTERN.to_string(),
        }
    }
}

/// Everything the workflow has accumulated for the current run.
///
/// Read through [`Workflow::state`]; only workflow operations change it.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowState {
    pub phase: Phase,
    pub template: Option<Artifact>,
    pub dataset: Option<Artifact>,
    pub session_id: Option<SessionId>,
    pub placeholders: PlaceholderSet,
    pub excel_headers: HeaderSet,
    pub row_count: usize,
    pub validation: Option<ValidationResult>,
    pub preview: Option<RowRecord>,
    pub preview_url: Option<String>,
    pub selected_formats: FormatSelection,
    pub file_name_pattern: String,
    /// Present while a generate request or its replay is in flight.
    pub generating: Option<GenerationProgress>,
    pub files_generated: usize,
    pub download_url: Option<String>,
    pub notification: Option<Notification>,
}

impl WorkflowState {
    pub fn new(defaults: &WorkflowDefaults) -> Self {
        Self {
            phase: Phase::Upload,
            template: None,
            dataset: None,
            session_id: None,
            placeholders: PlaceholderSet::default(),
            excel_headers: HeaderSet::default(),
            row_count: 0,
            validation: None,
            preview: None,
            preview_url: None,
            selected_formats: defaults.formats.clone(),
            file_name_pattern: defaults.file_name_pattern.clone(),
            generating: None,
            files_generated: 0,
            download_url: None,
            notification: None,
        }
    }
}

/// Where a downloaded archive came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadSource {
    /// The URL returned by the generate call.
    Direct(String),
    /// The session archive route.
    Archive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedArchive {
    pub source: DownloadSource,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Drives one batch run against a document backend.
pub struct Workflow {
    backend: Arc<dyn DocumentBackend>,
    replay: ProgressReplay,
    defaults: WorkflowDefaults,
    state: WorkflowState,
}

impl Workflow {
    pub fn new(
        backend: Arc<dyn DocumentBackend>,
        ticker: Arc<dyn Ticker>,
        defaults: WorkflowDefaults,
    ) -> Self {
        let state = WorkflowState::new(&defaults);
        Self {
            backend,
            replay: ProgressReplay::new(ticker),
            defaults,
            state,
        }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    /// Handle for cutting the progress replay short.
    pub fn replay_handle(&self) -> ReplayHandle {
        self.replay.handle()
    }

    // ---- Upload ----------------------------------------------------------

    /// Hold `artifact` as the pending template or dataset, replacing any
    /// earlier selection of the same kind.
    pub fn select(&mut self, artifact: Artifact) -> Result<()> {
        self.expect_phase(Phase::Upload, "select a file")?;
        debug!("Selected {} {}", artifact.kind(), artifact.file_name());
        match artifact.kind() {
            ArtifactKind::Template => self.state.template = Some(artifact),
            ArtifactKind::Dataset => self.state.dataset = Some(artifact),
        }
        Ok(())
    }

    pub fn clear(&mut self, kind: ArtifactKind) -> Result<()> {
        self.expect_phase(Phase::Upload, "remove a file")?;
        match kind {
            ArtifactKind::Template => self.state.template = None,
            ArtifactKind::Dataset => self.state.dataset = None,
        }
        Ok(())
    }

    /// Upload both artifacts and reconcile the template against the dataset.
    ///
    /// The template goes first; the session id it returns is attached to the
    /// dataset upload. A mismatch between placeholders and columns still moves
    /// the workflow to `Validate`; the operator decides whether to proceed.
    pub async fn validate(&mut self) -> Result<ValidationResult> {
        self.expect_phase(Phase::Upload, "validate")?;

        let (Some(template), Some(dataset)) =
            (self.state.template.clone(), self.state.dataset.clone())
        else {
            return Err(self.refuse(Error::Precondition(
                "Please upload both template and Excel files".to_string(),
            )));
        };

        let report = match self.upload_and_validate(&template, &dataset).await {
            Ok(report) => report,
            Err(e) => return Err(self.fail(e, "Failed to validate files")),
        };

        let validation = reconcile(&report.placeholders, &report.excel_headers);
        if let Some(remote) = &report.validation {
            if remote.valid != validation.valid {
                warn!(
                    "Backend verdict (valid: {}) disagrees with local reconciliation (valid: {}); using local result",
                    remote.valid, validation.valid
                );
            }
        }

        info!(
            "Validated {} placeholders against {} columns ({} rows, valid: {})",
            report.placeholders.len(),
            report.excel_headers.len(),
            report.row_count,
            validation.valid
        );

        self.state.placeholders = report.placeholders;
        self.state.excel_headers = report.excel_headers;
        self.state.row_count = report.row_count;
        self.state.validation = Some(validation.clone());
        self.transition(Phase::Validate);
        self.notify(Notification::success("Validation complete!"));

        Ok(validation)
    }

    async fn upload_and_validate(
        &mut self,
        template: &Artifact,
        dataset: &Artifact,
    ) -> Result<ValidationReport> {
        let receipt = self
            .backend
            .upload_artifact(template, self.state.session_id.as_ref())
            .await?;
        self.adopt_session(receipt.session_id);

        // The dataset must land in the session the template opened.
        let receipt = self
            .backend
            .upload_artifact(dataset, self.state.session_id.as_ref())
            .await?;
        self.adopt_session(receipt.session_id);

        let session_id = self.state.session_id.clone().ok_or_else(|| {
            Error::Protocol("upload responses did not include a session id".to_string())
        })?;
        self.backend.validate(&session_id).await
    }

    // ---- Validate --------------------------------------------------------

    /// Request the preview sample and move on to generation settings.
    pub async fn proceed(&mut self) -> Result<()> {
        self.expect_phase(Phase::Validate, "proceed")?;
        let session_id = self.require_session()?;

        match self.backend.preview(&session_id).await {
            Ok(sample) => {
                if let Some(id) = sample.session_id {
                    self.adopt_session(id);
                }
                self.state.preview = sample.preview_data;
                self.state.preview_url = sample.preview_url;
                self.transition(Phase::Generate);
                self.notify(Notification::success(
                    "Preview ready! Review the sample below.",
                ));
                Ok(())
            }
            Err(e) => Err(self.fail(e, "Failed to generate preview")),
        }
    }

    /// Abandon the run. The server-side session is left to expire.
    pub fn cancel(&mut self) {
        info!("Cancelled in the {} phase", self.state.phase);
        self.reset();
    }

    // ---- Generate --------------------------------------------------------

    pub fn toggle_format(&mut self, format: OutputFormat) -> Result<()> {
        self.expect_phase(Phase::Generate, "change formats")?;
        self.state.selected_formats.toggle(format);
        Ok(())
    }

    pub fn set_file_name_pattern(&mut self, pattern: impl Into<String>) -> Result<()> {
        self.expect_phase(Phase::Generate, "change the filename pattern")?;
        self.state.file_name_pattern = pattern.into();
        Ok(())
    }

    /// Append a `{{token}}` marker to the filename pattern.
    pub fn insert_token(&mut self, token: &str) -> Result<()> {
        self.expect_phase(Phase::Generate, "change the filename pattern")?;
        self.state.file_name_pattern = insert_token(&self.state.file_name_pattern, token);
        Ok(())
    }

    /// The filename the current pattern yields for the preview row.
    pub fn sample_file_name(&self) -> Option<String> {
        self.state
            .preview
            .as_ref()
            .map(|row| resolve(&self.state.file_name_pattern, row))
    }

    /// Generate every document, replay progress to `sink`, and move to
    /// `Download`. Returns the number of documents generated.
    pub async fn generate(&mut self, sink: &dyn ProgressSink) -> Result<usize> {
        self.expect_phase(Phase::Generate, "generate")?;

        if self.state.selected_formats.is_empty() {
            let message = "Please select at least one format";
            self.notify(Notification::warning(message));
            return Err(Error::Precondition(message.to_string()));
        }
        let session_id = self.require_session()?;

        let unknown = unknown_tokens(&self.state.file_name_pattern, &self.state.excel_headers);
        if !unknown.is_empty() {
            warn!(
                "Filename pattern references unknown columns ({}); they will be left empty",
                unknown.join(", ")
            );
        }

        let request = GenerationRequest {
            session_id,
            formats: self.state.selected_formats.as_slice().to_vec(),
            file_name_pattern: self.state.file_name_pattern.clone(),
        };
        let total = self.state.row_count;

        self.state.generating = Some(GenerationProgress::new(0, total));
        sink.started(total);
        info!(
            "Generating {} rows as {}",
            total,
            request
                .formats
                .iter()
                .map(OutputFormat::tag)
                .collect::<Vec<_>>()
                .join(", ")
        );

        let result = match self.backend.generate(&request).await {
            Ok(result) => result,
            Err(e) => {
                self.state.generating = None;
                return Err(self.fail(e, "Failed to generate documents"));
            }
        };

        if let Some(id) = result.session_id {
            self.adopt_session(id);
        }
        if result.total_generated > total {
            warn!(
                "Backend reports {} documents for {} rows",
                result.total_generated, total
            );
        }
        self.state.files_generated = result.total_generated;
        self.state.download_url = result.download_url.filter(|url| !url.is_empty());

        let done = self.replay.run(result.total_generated, total, sink).await;
        self.state.generating = None;
        debug!("Replay finished at {}/{}", done.current, done.total);

        self.transition(Phase::Download);
        self.notify(Notification::success(
            "All documents generated successfully! Ready to download.",
        ));
        Ok(result.total_generated)
    }

    // ---- Download --------------------------------------------------------

    /// Retrieve the generated documents, preferring the direct URL.
    pub async fn download(&self) -> Result<DownloadedArchive> {
        if self.state.download_url.is_some() {
            self.download_direct().await
        } else {
            self.download_archive().await
        }
    }

    pub async fn download_direct(&self) -> Result<DownloadedArchive> {
        self.expect_phase(Phase::Download, "download")?;
        let url = self.state.download_url.clone().ok_or_else(|| {
            Error::Precondition("The backend did not provide a download URL".to_string())
        })?;
        let file_name = self.archive_file_name()?;

        info!("Starting cloud download from {}", url);
        let bytes = self.backend.fetch(&url).await?;
        Ok(DownloadedArchive {
            source: DownloadSource::Direct(url),
            file_name,
            bytes,
        })
    }

    pub async fn download_archive(&self) -> Result<DownloadedArchive> {
        self.expect_phase(Phase::Download, "download")?;
        let session_id = self.require_session_ref()?;
        let file_name = self.archive_file_name()?;

        info!("Downloading ZIP archive for session {}", session_id);
        let bytes = self.backend.download_archive(session_id).await?;
        Ok(DownloadedArchive {
            source: DownloadSource::Archive,
            file_name,
            bytes,
        })
    }

    fn archive_file_name(&self) -> Result<String> {
        Ok(format!("documents_{}.zip", self.require_session_ref()?))
    }

    // ---- Reset -----------------------------------------------------------

    /// Return to `Upload` with every field at its initial value.
    pub fn reset(&mut self) {
        self.state = WorkflowState::new(&self.defaults);
        info!("Workflow reset");
    }

    pub fn dismiss_notification(&mut self) {
        self.state.notification = None;
    }

    // ---- helpers ---------------------------------------------------------

    fn expect_phase(&self, expected: Phase, action: &str) -> Result<()> {
        if self.state.phase == expected {
            return Ok(());
        }
        Err(Error::InvalidTransition {
            phase: self.state.phase.to_string(),
            action: action.to_string(),
        })
    }

    fn transition(&mut self, next: Phase) {
        info!("Phase {} -> {}", self.state.phase, next);
        self.state.phase = next;
    }

    /// Record the first session id the backend issues. Later ids that differ
    /// are ignored.
    fn adopt_session(&mut self, id: SessionId) {
        if id.is_empty() {
            return;
        }
        match &self.state.session_id {
            None => {
                info!("Session {} opened", id);
                self.state.session_id = Some(id);
            }
            Some(current) if *current != id => {
                warn!(
                    "Backend answered with session {} while {} is active; keeping {}",
                    id, current, current
                );
            }
            Some(_) => {}
        }
    }

    fn require_session_ref(&self) -> Result<&SessionId> {
        self.state
            .session_id
            .as_ref()
            .ok_or_else(|| Error::Precondition("No active session".to_string()))
    }

    fn require_session(&mut self) -> Result<SessionId> {
        match self.state.session_id.clone() {
            Some(id) => Ok(id),
            None => Err(self.refuse(Error::Precondition("No active session".to_string()))),
        }
    }

    fn notify(&mut self, notification: Notification) {
        match notification.kind {
            NotificationKind::Success => info!("{}", notification.message),
            NotificationKind::Warning => warn!("{}", notification.message),
            NotificationKind::Error => error!("{}", notification.message),
        }
        self.state.notification = Some(notification);
    }

    /// Surface a locally detected problem; nothing was sent.
    fn refuse(&mut self, err: Error) -> Error {
        self.notify(Notification::error(err.to_string()));
        err
    }

    /// Surface a failed backend call; the phase is left untouched.
    fn fail(&mut self, err: Error, fallback: &str) -> Error {
        self.notify(Notification::error(err.user_message(fallback)));
        err
    }
}
