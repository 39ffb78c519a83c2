use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

/// Environment variable that overrides the stored API key.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

/// Remote endpoints. Overridable so tests can point at a mock server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub geocode: String,
    pub weather: String,
    pub forecast: String,
    pub icon_host: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            geocode: "https://api.openweathermap.org/geo/1.0/direct".to_string(),
            weather: "https://api.openweathermap.org/data/2.5/weather".to_string(),
            forecast: "https://api.openweathermap.org/data/2.5/forecast".to_string(),
            icon_host: "https://openweathermap.org/img/wn".to_string(),
        }
    }
}

impl Endpoints {
    /// Every endpoint rooted at `base`, e.g. a `wiremock` server URI.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            geocode: format!("{base}/geo/1.0/direct"),
            weather: format!("{base}/data/2.5/weather"),
            forecast: format!("{base}/data/2.5/forecast"),
            icon_host: format!("{base}/img/wn"),
        }
    }
}

/// Search-as-you-type tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub quiet_interval_ms: u64,
    pub min_query_chars: usize,
    pub result_limit: u8,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self { quiet_interval_ms: 300, min_query_chars: 3, result_limit: 5 }
    }
}

impl SearchSettings {
    pub fn quiet_interval(&self) -> Duration {
        Duration::from_millis(self.quiet_interval_ms)
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
///
/// [search]
/// quiet_interval_ms = 300
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
    pub units: String,
    pub lang: String,
    pub endpoints: Endpoints,
    pub search: SearchSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            request_timeout_secs: 10,
            units: "metric".to_string(),
            lang: "en".to_string(),
            endpoints: Endpoints::default(),
            search: SearchSettings::default(),
        }
    }
}

/// Immutable settings injected into the fetch client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub api_key: String,
    pub endpoints: Endpoints,
    pub timeout: Duration,
    pub units: String,
    pub lang: String,
    pub result_limit: u8,
}

impl ApiConfig {
    /// Minimal config for a given key and endpoints, everything else defaulted.
    pub fn new(api_key: impl Into<String>, endpoints: Endpoints) -> Self {
        let defaults = Config::default();
        Self {
            api_key: api_key.into(),
            endpoints,
            timeout: Duration::from_secs(defaults.request_timeout_secs),
            units: defaults.units,
            lang: defaults.lang,
            result_limit: defaults.search.result_limit,
        }
    }
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    ///
    /// `OPENWEATHER_API_KEY` wins over the stored key.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        let mut cfg = Self::load_from(&path)?;

        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                cfg.api_key = Some(key.trim().to_string());
            }
        }

        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Per-user data path of the favorites list.
    pub fn favorites_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.data_dir().join("favorites.json"))
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "weather-task", "weather-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key.trim().to_string());
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    /// Build the immutable client configuration.
    pub fn api_config(&self) -> Result<ApiConfig> {
        let api_key = self.api_key.as_deref().filter(|k| !k.is_empty()).ok_or_else(|| {
            anyhow!(
                "No API key configured.\n\
                 Hint: run `weather configure` and enter your OpenWeather API key, \
                 or set {API_KEY_ENV}."
            )
        })?;

        Ok(ApiConfig {
            api_key: api_key.to_string(),
            endpoints: self.endpoints.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
            units: self.units.clone(),
            lang: self.lang.clone(),
            result_limit: self.search.result_limit,
        })
    }
}
