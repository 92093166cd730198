// Configuration module: builds the `Config` value passed to the API client
// and the prompt loop. Values come from an optional JSON file and are then
// overridden by environment variables. Nothing is guessed: the key and the
// endpoint must be supplied by whoever runs the tool.

use anyhow::{bail, Context, Result};
use reqwest::Url;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_CONFIG_PATH: &str = "GVISION_CONFIG";
pub const ENV_PREDICTION_KEY: &str = "PREDICTION_KEY";
pub const ENV_PREDICTION_ENDPOINT_URL: &str = "PREDICTION_ENDPOINT_URL";
pub const ENV_MAX_ATTEMPTS: &str = "GVISION_MAX_ATTEMPTS";
pub const ENV_TIMEOUT_SECS: &str = "GVISION_TIMEOUT_SECS";
pub const ENV_IMAGES_ONLY: &str = "GVISION_IMAGES_ONLY";

pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Runtime settings, immutable once loaded.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub prediction_key: String,
    pub prediction_endpoint_url: String,
    /// How many directory paths the prompt accepts before giving up.
    pub max_attempts: u32,
    /// `None` leaves requests unbounded.
    pub timeout_secs: Option<u64>,
    /// Only upload `.jpg`, `.jpeg` and `.png` files.
    pub images_only: bool,
}

// Keeps the key out of debug logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("prediction_key", &"<redacted>")
            .field("prediction_endpoint_url", &self.prediction_endpoint_url)
            .field("max_attempts", &self.max_attempts)
            .field("timeout_secs", &self.timeout_secs)
            .field("images_only", &self.images_only)
            .finish()
    }
}

/// Shape of the optional JSON config file. Every field may be omitted.
#[derive(Deserialize, Debug, Default, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub prediction_key: Option<String>,
    pub prediction_endpoint_url: Option<String>,
    pub max_attempts: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub images_only: Option<bool>,
}

impl Config {
    /// Load configuration from the config file (if any) and the process
    /// environment.
    pub fn from_env() -> Result<Self> {
        let file = match std::env::var_os(ENV_CONFIG_PATH) {
            // An explicitly named file has to exist.
            Some(path) => Some(read_file_config(Path::new(&path))?),
            None => match default_config_path() {
                Some(path) if path.is_file() => Some(read_file_config(&path)?),
                _ => None,
            },
        };
        Self::from_sources(file, |name| std::env::var(name).ok())
    }

    /// Merge a file config with variables resolved through `lookup`.
    /// Variables win over file values.
    pub fn from_sources<F>(file: Option<FileConfig>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = file.unwrap_or_default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let prediction_key = var(ENV_PREDICTION_KEY)
            .or(file.prediction_key)
            .with_context(|| format!("Missing prediction key (set {})", ENV_PREDICTION_KEY))?;
        let prediction_endpoint_url = var(ENV_PREDICTION_ENDPOINT_URL)
            .or(file.prediction_endpoint_url)
            .with_context(|| {
                format!("Missing prediction endpoint URL (set {})", ENV_PREDICTION_ENDPOINT_URL)
            })?;

        let max_attempts = match var(ENV_MAX_ATTEMPTS) {
            Some(v) => v
                .trim()
                .parse::<u32>()
                .with_context(|| format!("Invalid {} value '{}'", ENV_MAX_ATTEMPTS, v))?,
            None => file.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
        };
        let timeout_secs = match var(ENV_TIMEOUT_SECS) {
            Some(v) => Some(
                v.trim()
                    .parse::<u64>()
                    .with_context(|| format!("Invalid {} value '{}'", ENV_TIMEOUT_SECS, v))?,
            ),
            None => file.timeout_secs,
        };
        let images_only = match var(ENV_IMAGES_ONLY) {
            Some(v) => parse_flag(&v)
                .with_context(|| format!("Invalid {} value '{}'", ENV_IMAGES_ONLY, v))?,
            None => file.images_only.unwrap_or(false),
        };

        let config = Config {
            prediction_key,
            prediction_endpoint_url,
            max_attempts,
            timeout_secs,
            images_only,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            bail!("max_attempts must be at least 1");
        }
        if self.timeout_secs == Some(0) {
            bail!("timeout_secs must be at least 1 when set");
        }
        let url = Url::parse(&self.prediction_endpoint_url).with_context(|| {
            format!("Invalid prediction endpoint URL '{}'", self.prediction_endpoint_url)
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            bail!("Prediction endpoint must use http or https, got '{}'", url.scheme());
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// `<config dir>/gvision/config.json`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("gvision").join("config.json"))
}

pub fn read_file_config(path: &Path) -> Result<FileConfig> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let parsed: FileConfig = serde_json::from_str(&data)
        .with_context(|| format!("Parsing config file {}", path.display()))?;
    Ok(parsed)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
