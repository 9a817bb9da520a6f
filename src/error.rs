use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Non-success response from the document backend. `detail` holds the
    /// structured `error` field of the response body when one was present.
    #[error("Backend returned HTTP {status}{}", format_detail(.detail))]
    Backend { status: u16, detail: Option<String> },

    #[error("Unexpected backend response: {0}")]
    Protocol(String),

    #[error("{0}")]
    Precondition(String),

    #[error("Invalid artifact: {0}")]
    InvalidArtifact(String),

    #[error("Cannot {action} while in the {phase} phase")]
    InvalidTransition { phase: String, action: String },
}

impl Error {
    pub fn backend(status: u16, detail: Option<String>) -> Self {
        Error::Backend { status, detail }
    }

    /// Whether the error was raised locally, before any request went out.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Error::Precondition(_) | Error::InvalidArtifact(_) | Error::InvalidTransition { .. }
        )
    }

    /// The single message shown to the operator for a failed attempt.
    ///
    /// The backend's structured error field is used verbatim. Anything else is
    /// reported under `fallback`, the name of the failed operation.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Error::Backend {
                detail: Some(detail),
                ..
            } if !detail.trim().is_empty() => detail.clone(),
            Error::Backend { status, .. } => format!("{fallback} (HTTP {status})"),
            other => {
                let rendered = other.to_string();
                if rendered.trim().is_empty() {
                    fallback.to_string()
                } else {
                    format!("{fallback}: {rendered}")
                }
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

fn format_detail(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|d| format!(": {d}"))
        .unwrap_or_default()
}

/// Pull a human-readable message out of a backend error body.
///
/// Accepts `{"error": "text"}`, `{"error": {"message": "text"}}` and, for any
/// other `error` object, its JSON rendering.
pub fn structured_error(body: &serde_json::Value) -> Option<String> {
    match body.get("error")? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Object(obj) => match obj.get("message") {
            Some(serde_json::Value::String(m)) if !m.is_empty() => Some(m.clone()),
            _ => Some(serde_json::Value::Object(obj.clone()).to_string()),
        },
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}
