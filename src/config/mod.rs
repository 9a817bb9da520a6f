use crate::error::{Error, Result};
use crate::format::{FormatSelection, OutputFormat};
use crate::workflow::{WorkflowDefaults, DEFAULT_FILE_NAME_PATTERN};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;
use url::Url;

pub mod loader;

pub use loader::ConfigLoader;

pub const DEFAULT_API_URL: &str = "http://localhost:5002";
pub const PROJECT_CONFIG_FILE: &str = "batchdoc.toml";

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Path of the per-user configuration file, if a home directory can be found
pub fn global_config_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "batchdoc", "batchdoc")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchdocConfig {
    /// Base URL of the document backend; routes live under `{api_url}/api`.
    pub api_url: String,
    pub request_timeout_secs: u64,
    /// Delay between progress replay steps.
    pub replay_tick_ms: u64,
    pub default_formats: Vec<OutputFormat>,
    pub default_pattern: String,
    pub log_level: String,
}

impl Default for BatchdocConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout_secs: 120,
            replay_tick_ms: 50,
            default_formats: vec![OutputFormat::Docx, OutputFormat::Pdf],
            default_pattern: DEFAULT_FILE_NAME_PATTERN.to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// One configuration file. Every key is optional; present keys override the
/// layers below.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub api_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub replay_tick_ms: Option<u64>,
    pub default_formats: Option<Vec<OutputFormat>>,
    pub default_pattern: Option<String>,
    pub log_level: Option<String>,
}

impl BatchdocConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, file: ConfigFile) {
        if let Some(api_url) = file.api_url {
            self.api_url = api_url;
        }
        if let Some(timeout) = file.request_timeout_secs {
            self.request_timeout_secs = timeout;
        }
        if let Some(tick) = file.replay_tick_ms {
            self.replay_tick_ms = tick;
        }
        if let Some(formats) = file.default_formats {
            self.default_formats = formats;
        }
        if let Some(pattern) = file.default_pattern {
            self.default_pattern = pattern;
        }
        if let Some(level) = file.log_level {
            self.log_level = level;
        }
    }

    pub fn merge_env_vars(&mut self) {
        self.merge_env_from(|key| std::env::var(key).ok());
    }

    /// Apply environment overrides read through `lookup`.
    pub fn merge_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(api_url) = lookup("BATCHDOC_API_URL") {
            self.api_url = api_url;
        } else if let Some(api_url) = lookup("API_URL") {
            self.api_url = api_url;
        }

        if let Some(level) = lookup("BATCHDOC_LOG_LEVEL") {
            self.log_level = level;
        }

        if let Some(tick) = lookup("BATCHDOC_REPLAY_TICK_MS") {
            match tick.parse::<u64>() {
                Ok(value) => self.replay_tick_ms = value,
                Err(_) => warn!("Ignoring BATCHDOC_REPLAY_TICK_MS={tick}: not a number"),
            }
        }

        if let Some(timeout) = lookup("BATCHDOC_TIMEOUT_SECS") {
            match timeout.parse::<u64>() {
                Ok(value) => self.request_timeout_secs = value,
                Err(_) => warn!("Ignoring BATCHDOC_TIMEOUT_SECS={timeout}: not a number"),
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.api_url)
            .map_err(|e| Error::Config(format!("api_url {:?} is invalid: {e}", self.api_url)))?;
        if url.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "api_url {:?} cannot be used as a base URL",
                self.api_url
            )));
        }

        if self.default_formats.is_empty() {
            return Err(Error::Config(
                "default_formats must name at least one format".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }

        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(Error::Config(format!(
                "log_level {:?} is not one of {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }

    pub fn workflow_defaults(&self) -> WorkflowDefaults {
        WorkflowDefaults {
            formats: FormatSelection::new(self.default_formats.iter().copied()),
            file_name_pattern: self.default_pattern.clone(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn replay_tick(&self) -> Duration {
        Duration::from_millis(self.replay_tick_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_config_new_creates_defaults() {
        let config = BatchdocConfig::new();
        assert_eq!(config.api_url, "http://localhost:5002");
        assert_eq!(config.request_timeout(), Duration::from_secs(120));
        assert_eq!(config.replay_tick(), Duration::from_millis(50));
        assert_eq!(config.default_pattern, "Receipt_{{STUDENT_NAME}}");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_apply_only_overrides_present_keys() {
        let mut config = BatchdocConfig::new();
        let file: ConfigFile = toml::from_str(
            r#"
api_url = "https://docs.example.com"
default_formats = [".pdf"]
"#,
        )
        .unwrap();

        config.apply(file);

        assert_eq!(config.api_url, "https://docs.example.com");
        assert_eq!(config.default_formats, vec![OutputFormat::Pdf]);
        assert_eq!(config.replay_tick_ms, 50);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(toml::from_str::<ConfigFile>("api_key = \"x\"").is_err());
    }

    #[test]
    fn test_merge_env_vars() {
        let mut config = BatchdocConfig::new();
        config.merge_env_from(env(&[
            ("BATCHDOC_API_URL", "http://backend:8080"),
            ("API_URL", "http://ignored"),
            ("BATCHDOC_LOG_LEVEL", "debug"),
            ("BATCHDOC_REPLAY_TICK_MS", "5"),
            ("BATCHDOC_TIMEOUT_SECS", "soon"),
        ]));

        assert_eq!(config.api_url, "http://backend:8080");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.replay_tick_ms, 5);
        assert_eq!(config.request_timeout_secs, 120);
    }

    #[test]
    fn test_merge_env_vars_api_url_fallback() {
        let mut config = BatchdocConfig::new();
        config.merge_env_from(env(&[("API_URL", "http://proxy:5002")]));
        assert_eq!(config.api_url, "http://proxy:5002");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = BatchdocConfig::new();
        config.api_url = "not a url".to_string();
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = BatchdocConfig::new();
        config.default_formats.clear();
        assert!(config.validate().is_err());

        let mut config = BatchdocConfig::new();
        config.log_level = "loud".to_string();
        assert!(config.validate().is_err());

        let mut config = BatchdocConfig::new();
        config.log_level = "WARN".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_workflow_defaults_dedups_formats() {
        let mut config = BatchdocConfig::new();
        config.default_formats = vec![OutputFormat::Odt, OutputFormat::Odt, OutputFormat::Pdf];
        config.default_pattern = "Invoice_{{ID}}".to_string();

        let defaults = config.workflow_defaults();

        assert_eq!(
            defaults.formats.as_slice(),
            &[OutputFormat::Odt, OutputFormat::Pdf]
        );
        assert_eq!(defaults.file_name_pattern, "Invoice_{{ID}}");
    }
}
