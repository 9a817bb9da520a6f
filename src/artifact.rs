//! Client-side handles for uploaded files
//!
//! Media type and size are checked here, before anything is sent to the
//! backend.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Largest artifact accepted for upload (10 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

pub const DOCX_MEDIA_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const ODT_MEDIA_TYPE: &str = "application/vnd.oasis.opendocument.text";
pub const XLSX_MEDIA_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Which slot of the session an artifact fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Template,
    Dataset,
}

impl ArtifactKind {
    pub fn accepted_media_types(&self) -> &'static [&'static str] {
        match self {
            ArtifactKind::Template => &[DOCX_MEDIA_TYPE, ODT_MEDIA_TYPE],
            ArtifactKind::Dataset => &[XLSX_MEDIA_TYPE],
        }
    }

    /// Human-readable list of accepted extensions.
    pub fn accept_label(&self) -> &'static str {
        match self {
            ArtifactKind::Template => ".docx, .odt",
            ArtifactKind::Dataset => ".xlsx",
        }
    }

    /// Upload route segment and multipart field name used by the backend.
    pub fn wire_name(&self) -> &'static str {
        match self {
            ArtifactKind::Template => "template",
            ArtifactKind::Dataset => "excel",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Template => write!(f, "template"),
            ArtifactKind::Dataset => write!(f, "dataset"),
        }
    }
}

/// A file selected for upload, held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    kind: ArtifactKind,
    file_name: String,
    media_type: String,
    bytes: Vec<u8>,
}

impl Artifact {
    /// Build an artifact, guessing the media type from the file extension.
    pub fn new(kind: ArtifactKind, file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let file_name = file_name.into();
        let media_type = mime_guess::from_path(&file_name)
            .first_raw()
            .unwrap_or("application/octet-stream")
            .to_string();
        Self::with_media_type(kind, file_name, media_type, bytes)
    }

    pub fn with_media_type(
        kind: ArtifactKind,
        file_name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<Self> {
        let file_name = file_name.into();
        let media_type = media_type.into();
        check_media_type(kind, &file_name, &media_type)?;
        check_size(&file_name, bytes.len() as u64)?;

        Ok(Self {
            kind,
            file_name,
            media_type,
            bytes,
        })
    }

    /// Read an artifact from disk. The size limit is checked before reading.
    pub async fn from_path(kind: ArtifactKind, path: &Path) -> Result<Self> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::InvalidArtifact(format!("{} is not a file", path.display())))?;

        let metadata = fs::metadata(path).await?;
        check_size(&file_name, metadata.len())?;

        let bytes = fs::read(path).await?;
        debug!("Loaded {} {} ({} bytes)", kind, file_name, bytes.len());
        Self::new(kind, file_name, bytes)
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

fn check_media_type(kind: ArtifactKind, file_name: &str, media_type: &str) -> Result<()> {
    if kind.accepted_media_types().contains(&media_type) {
        return Ok(());
    }
    Err(Error::InvalidArtifact(format!(
        "{file_name} is not an accepted {kind} file (accepted: {})",
        kind.accept_label()
    )))
}

fn check_size(file_name: &str, size: u64) -> Result<()> {
    if size > MAX_UPLOAD_BYTES {
        return Err(Error::InvalidArtifact(format!(
            "{file_name} is {size} bytes; the limit is {MAX_UPLOAD_BYTES} bytes"
        )));
    }
    Ok(())
}
