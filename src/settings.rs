use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{Result, WrapErr};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::backend::Backend;
use crate::gemini_client::DEFAULT_GEMINI_API_URL;
use crate::ollama_client::{DEFAULT_OLLAMA_MODEL, DEFAULT_OLLAMA_URL};

/// Optional on-disk overrides, `<config dir>/dual-chat/config.json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileSettings {
    pub gemini_api_key: Option<String>,
    pub gemini_api_url: Option<String>,
    pub ollama_url: Option<String>,
    pub ollama_model: Option<String>,
    pub default_model: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

/// Resolved configuration. Values are only checked for presence.
#[derive(Clone)]
pub struct Settings {
    pub gemini_api_key: Option<String>,
    pub gemini_api_url: String,
    pub ollama_url: String,
    pub ollama_model: String,
    pub default_backend: Backend,
    pub request_timeout: Option<Duration>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_api_url: DEFAULT_GEMINI_API_URL.to_string(),
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            ollama_model: DEFAULT_OLLAMA_MODEL.to_string(),
            default_backend: Backend::default(),
            request_timeout: None,
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("gemini_api_key", &self.gemini_api_key.as_ref().map(|_| "<redacted>"))
            .field("gemini_api_url", &self.gemini_api_url)
            .field("ollama_url", &self.ollama_url)
            .field("ollama_model", &self.ollama_model)
            .field("default_backend", &self.default_backend)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl Settings {
    /// Defaults, then the config file, then the process environment.
    pub fn load() -> Result<Self> {
        let lookup = |key: &str| env::var(key).ok();
        match Self::config_path() {
            Some(path) => Self::load_from(&path, lookup),
            None => Ok(Self::from_sources(FileSettings::default(), lookup)),
        }
    }

    /// Like [`Settings::load`] but with an explicit config file and variable lookup.
    pub fn load_from(path: &Path, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let file = if path.exists() {
            Self::read_file(path)?
        } else {
            FileSettings::default()
        };

        Ok(Self::from_sources(file, lookup))
    }

    fn read_file(path: &Path) -> Result<FileSettings> {
        debug!("Loading settings from {}", path.display());
        let content = fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&content).wrap_err_with(|| format!("failed to parse {}", path.display()))
    }

    pub fn from_sources(file: FileSettings, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let env = |key: &str| present(lookup(key));
        let defaults = Self::default();

        let default_model = env("DEFAULT_MODEL").or(present(file.default_model));
        let default_backend = match default_model {
            Some(name) => name.parse::<Backend>().unwrap_or_else(|e| {
                warn!("{}; using {}", e, defaults.default_backend);
                defaults.default_backend
            }),
            None => defaults.default_backend,
        };

        let request_timeout = env("REQUEST_TIMEOUT_SECS")
            .and_then(|value| match value.parse::<u64>() {
                Ok(secs) => Some(secs),
                Err(_) => {
                    warn!("Ignoring REQUEST_TIMEOUT_SECS={}: not a number of seconds", value);
                    None
                }
            })
            .or(file.request_timeout_secs)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        Self {
            gemini_api_key: env("GEMINI_API_KEY").or(present(file.gemini_api_key)),
            gemini_api_url: env("GEMINI_API_URL")
                .or(present(file.gemini_api_url))
                .unwrap_or(defaults.gemini_api_url),
            ollama_url: env("OLLAMA_URL")
                .or(present(file.ollama_url))
                .unwrap_or(defaults.ollama_url),
            ollama_model: env("OLLAMA_MODEL")
                .or(present(file.ollama_model))
                .unwrap_or(defaults.ollama_model),
            default_backend,
            request_timeout,
        }
    }

    pub fn http_client(&self) -> reqwest::Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.request_timeout {
            builder = builder.timeout(timeout);
        }
        builder.build()
    }

    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("dual-chat").join("config.json"))
    }
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
