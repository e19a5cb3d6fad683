//! Layered settings.
//!
//! Loaded in increasing precedence: defaults, global config
//! (`~/.spendcast/config.toml`), local config (`./.spendcastrc`), an explicit file,
//! environment variables. CLI flags are applied last by the binary.

use serde::{Deserialize, Serialize};
use spendcast_clients::{billing, forecast, openai};
use std::path::{Path, PathBuf};
use thiserror::Error;
use toml::Value;

/// Environment variable overriding the billing base URL.
pub const BILLING_BASE_URL_ENV: &str = "VANTAGE_BASE_URL";
/// Environment variable overriding the text generation base URL.
pub const TEXTGEN_BASE_URL_ENV: &str = "TEXTGEN_BASE_URL";
/// Environment variable overriding the text generation model.
pub const TEXTGEN_MODEL_ENV: &str = "TEXTGEN_MODEL";
/// Environment variable overriding the report id.
pub const REPORT_ID_ENV: &str = "VANTAGE_REPORT_ID";

/// Top-level settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub billing: BillingSettings,
    pub forecast: ForecastSettings,
    pub narration: NarrationSettings,
    pub pipeline: PipelineSettings,
    /// Log level used when no `--log-level` flag is given.
    pub log_level: Option<String>,
}

/// Billing API access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingSettings {
    pub base_url: String,
    pub token: Option<String>,
    pub cache_ttl_secs: u64,
}

impl Default for BillingSettings {
    fn default() -> Self {
        Self {
            base_url: billing::DEFAULT_BASE_URL.to_string(),
            token: None,
            cache_ttl_secs: billing::DEFAULT_CACHE_TTL.as_secs(),
        }
    }
}

/// Forecast endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastSettings {
    /// Forward forecast endpoint.
    pub url: Option<String>,
    /// In-sample forecast endpoint.
    pub insample_url: Option<String>,
    pub cache_ttl_secs: u64,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self { url: None, insample_url: None, cache_ttl_secs: forecast::DEFAULT_CACHE_TTL.as_secs() }
    }
}

/// Text generation endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrationSettings {
    pub base_url: String,
    pub token: Option<String>,
    pub model: String,
}

impl Default for NarrationSettings {
    fn default() -> Self {
        Self {
            base_url: openai::DEFAULT_BASE_URL.to_string(),
            token: None,
            model: openai::DEFAULT_MODEL.to_string(),
        }
    }
}

/// Pipeline defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub report_id: String,
    /// Grouping dimension name; validated when the pipeline is built.
    pub grouping: String,
    pub horizon: u32,
    pub level: u8,
    pub finetune_steps: u32,
    /// Attach month-start features to forward forecasts.
    pub exogenous: bool,
    /// Attach month-start features to in-sample forecasts.
    pub insample_exogenous: bool,
    /// Explain anomalies as part of a full run.
    pub explain: bool,
    pub start_date: Option<String>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            report_id: "3637".to_string(),
            grouping: "account_id".to_string(),
            horizon: 30,
            level: 90,
            finetune_steps: 1,
            exogenous: true,
            insample_exogenous: false,
            explain: false,
            start_date: None,
        }
    }
}

/// Errors that can occur while loading settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Configuration file not found.
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    /// Failed to read configuration file.
    #[error("Failed to read configuration file: {0}")]
    Read(String),

    /// Failed to parse configuration file.
    #[error("Failed to parse configuration file: {0}")]
    Parse(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Result type for settings operations.
pub type SettingsResult<T> = std::result::Result<T, SettingsError>;

impl Settings {
    /// Default global configuration file path.
    pub fn default_global_path() -> PathBuf {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(".spendcast")
            .join("config.toml")
    }

    /// Default local configuration file path.
    pub fn default_local_path() -> PathBuf {
        PathBuf::from(".spendcastrc")
    }

    /// Load settings from a single TOML file on top of the defaults, then validate them.
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let settings = Self::from_layers(vec![read_table(path)?])?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load the global and local files, an optional explicit file, then the environment.
    ///
    /// Missing global or local files are skipped; a missing explicit file is an error.
    pub fn load(explicit: Option<&Path>) -> SettingsResult<Self> {
        let mut layers = Vec::new();
        for path in [Self::default_global_path(), Self::default_local_path()] {
            match read_table(&path) {
                Ok(layer) => layers.push(layer),
                Err(SettingsError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        if let Some(path) = explicit {
            layers.push(read_table(path)?);
        }

        let mut settings = Self::from_layers(layers)?;
        settings.apply_env();
        settings.validate()?;
        Ok(settings)
    }

    /// Merge TOML layers in order and deserialize the result.
    fn from_layers(layers: Vec<Value>) -> SettingsResult<Self> {
        let mut merged = Value::Table(toml::map::Map::new());
        for layer in layers {
            merge_values(&mut merged, layer);
        }
        merged.try_into::<Self>().map_err(|e| SettingsError::Parse(e.to_string()))
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    /// Apply overrides from `lookup`; blank values are ignored.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get(BILLING_BASE_URL_ENV) {
            self.billing.base_url = v;
        }
        if let Some(v) = get(billing::TOKEN_ENV) {
            self.billing.token = Some(v);
        }
        if let Some(v) = get(forecast::FORWARD_URL_ENV) {
            self.forecast.url = Some(v);
        }
        if let Some(v) = get(forecast::INSAMPLE_URL_ENV) {
            self.forecast.insample_url = Some(v);
        }
        if let Some(v) = get(TEXTGEN_BASE_URL_ENV) {
            self.narration.base_url = v;
        }
        if let Some(v) = get(openai::TOKEN_ENV) {
            self.narration.token = Some(v);
        }
        if let Some(v) = get(TEXTGEN_MODEL_ENV) {
            self.narration.model = v;
        }
        if let Some(v) = get(REPORT_ID_ENV) {
            self.pipeline.report_id = v;
        }
    }

    /// Check value ranges. Missing tokens and URLs are not errors here.
    pub fn validate(&self) -> SettingsResult<()> {
        let pipeline = &self.pipeline;
        if pipeline.horizon == 0 {
            return Err(SettingsError::InvalidValue("pipeline.horizon must be greater than 0".to_string()));
        }
        if pipeline.level == 0 || pipeline.level >= 100 {
            return Err(SettingsError::InvalidValue(format!(
                "pipeline.level must be between 1 and 99, got {}",
                pipeline.level
            )));
        }
        if self.billing.cache_ttl_secs == 0 || self.forecast.cache_ttl_secs == 0 {
            return Err(SettingsError::InvalidValue("cache_ttl_secs must be greater than 0".to_string()));
        }
        if pipeline.report_id.trim().is_empty() {
            return Err(SettingsError::InvalidValue("pipeline.report_id must not be empty".to_string()));
        }
        Ok(())
    }
}

fn read_table(path: &Path) -> SettingsResult<Value> {
    if !path.exists() {
        return Err(SettingsError::NotFound(path.display().to_string()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| SettingsError::Read(format!("{}: {}", path.display(), e)))?;

    toml::from_str::<toml::Table>(&content)
        .map(Value::Table)
        .map_err(|e| SettingsError::Parse(format!("{}: {}", path.display(), e)))
}

/// Deep-merge `overlay` into `base`; tables merge by key, everything else replaces.
fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Table(base), Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
