use super::{global_config_path, BatchdocConfig, ConfigFile, PROJECT_CONFIG_FILE};
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Builds a [`BatchdocConfig`] from defaults, config files and the
/// environment, in that order.
pub struct ConfigLoader {
    config: BatchdocConfig,
    sources: Vec<PathBuf>,
}

/// A finished configuration and the files it was read from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: BatchdocConfig,
    pub sources: Vec<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            config: BatchdocConfig::default(),
            sources: Vec::new(),
        }
    }

    pub async fn load_global(&mut self) -> Result<()> {
        match global_config_path() {
            Some(path) if path.exists() => self.load_file(&path).await,
            _ => Ok(()),
        }
    }

    /// Overlay `batchdoc.toml` from `project_dir` when present.
    pub async fn load_project(&mut self, project_dir: &Path) -> Result<()> {
        let path = project_dir.join(PROJECT_CONFIG_FILE);
        if path.exists() {
            self.load_file(&path).await?;
        }
        Ok(())
    }

    /// Overlay an explicitly named file; a missing file is an error.
    pub async fn load_file(&mut self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::Config(format!("Cannot read config file {}: {e}", path.display()))
        })?;
        let file: ConfigFile = toml::from_str(&content)?;
        self.config.apply(file);
        self.sources.push(path.to_path_buf());
        Ok(())
    }

    /// Apply environment overrides and validate the result.
    pub fn finish(mut self) -> Result<BatchdocConfig> {
        self.config.merge_env_vars();
        self.config.validate()?;
        Ok(self.config)
    }

    pub fn get_config(&self) -> &BatchdocConfig {
        &self.config
    }

    /// Files applied so far, in the order they were applied.
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }
}

/// Load the layered configuration. An explicit path is applied after the
/// global and project files.
pub async fn load(project_dir: &Path, explicit: Option<&Path>) -> Result<LoadedConfig> {
    let mut loader = ConfigLoader::new();
    loader.load_global().await?;
    loader.load_project(project_dir).await?;
    if let Some(path) = explicit {
        loader.load_file(path).await?;
    }
    let sources = loader.sources().to_vec();
    Ok(LoadedConfig {
        config: loader.finish()?,
        sources,
    })
}
