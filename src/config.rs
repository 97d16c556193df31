use crate::paths;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
};

const CONFIG_FILE_NAME: &str = "config.toml";
const ENV_BASE_URL: &str = "STEM_SEPARATOR_URL";
const ENV_MODEL: &str = "STEM_SEPARATOR_MODEL";
const ENV_DOWNLOAD_DIR: &str = "STEM_SEPARATOR_DOWNLOAD_DIR";

/// Client configuration, layered defaults → config file → environment.
/// CLI flags override on top of this.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    base_url: Option<String>,
    model: String,
    download_dir: PathBuf,
}

impl ClientConfig {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(path) = Self::default_config_path() {
            if path.exists() {
                config.apply_partial(read_partial(&path)?);
            }
        }

        config.apply_env();
        Ok(config)
    }

    /// Backend base URL, if configured; `None` means the built-in default.
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj = directories::ProjectDirs::from("dev", "StemSeparator", "stem-separator-client")
            .context("unable to determine config directory")?;
        Ok(proj.config_dir().join(CONFIG_FILE_NAME))
    }

    fn apply_partial(&mut self, partial: PartialConfig) {
        if let Some(url) = partial.base_url {
            self.base_url = Some(url);
        }
        if let Some(model) = partial.model {
            self.model = model;
        }
        if let Some(dir) = partial.download_dir {
            self.download_dir = dir;
        }
    }

    fn apply_env(&mut self) {
        if let Ok(value) = env::var(ENV_BASE_URL) {
            if !value.trim().is_empty() {
                self.base_url = Some(value);
            }
        }
        if let Ok(value) = env::var(ENV_MODEL) {
            if !value.trim().is_empty() {
                self.model = value;
            }
        }
        if let Ok(value) = env::var(ENV_DOWNLOAD_DIR) {
            if !value.trim().is_empty() {
                self.download_dir = PathBuf::from(value);
            }
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            model: "htdemucs".into(),
            download_dir: paths::stems_download_dir()
                .unwrap_or_else(|_| PathBuf::from("./stems")),
        }
    }
}

fn read_partial(path: &Path) -> Result<PartialConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct PartialConfig {
    base_url: Option<String>,
    model: Option<String>,
    download_dir: Option<PathBuf>,
}
