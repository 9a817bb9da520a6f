//! Output formats recognised by the generate call

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OutputFormat {
    #[serde(rename = ".docx")]
    Docx,
    #[serde(rename = ".pdf")]
    Pdf,
    #[serde(rename = ".odt")]
    Odt,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 3] = [OutputFormat::Docx, OutputFormat::Pdf, OutputFormat::Odt];

    /// The tag sent on the wire, e.g. `.docx`.
    pub fn tag(&self) -> &'static str {
        match self {
            OutputFormat::Docx => ".docx",
            OutputFormat::Pdf => ".pdf",
            OutputFormat::Odt => ".odt",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OutputFormat::Docx => "Word (.docx)",
            OutputFormat::Pdf => "PDF (.pdf)",
            OutputFormat::Odt => "OpenDoc (.odt)",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    /// Accepts `docx`, `.docx` and any casing of either.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_lowercase().as_str() {
            "docx" => Ok(OutputFormat::Docx),
            "pdf" => Ok(OutputFormat::Pdf),
            "odt" => Ok(OutputFormat::Odt),
            other => Err(format!(
                "unknown output format '{other}' (expected docx, pdf or odt)"
            )),
        }
    }
}

/// Formats chosen for generation, kept in the order they were selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormatSelection(Vec<OutputFormat>);

impl FormatSelection {
    pub fn new<I: IntoIterator<Item = OutputFormat>>(formats: I) -> Self {
        let mut selection = Self(Vec::new());
        for format in formats {
            if !selection.contains(format) {
                selection.0.push(format);
            }
        }
        selection
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Add the format if absent, remove it if present.
    pub fn toggle(&mut self, format: OutputFormat) {
        if self.contains(format) {
            self.0.retain(|f| *f != format);
        } else {
            self.0.push(format);
        }
    }

    pub fn contains(&self, format: OutputFormat) -> bool {
        self.0.contains(&format)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[OutputFormat] {
        &self.0
    }
}

impl Default for FormatSelection {
    fn default() -> Self {
        Self::new([OutputFormat::Docx, OutputFormat::Pdf])
    }
}
