use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

pub const DEFAULT_API_BASE_URL: &str = "https://api.openweathermap.org";
pub const DEFAULT_HISTORY_DIR: &str = "db";
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:3001";
pub const DEFAULT_CLIENT_DIR: &str = "client/dist";

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// history_dir = "db"
/// listen_addr = "127.0.0.1:3001"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// OpenWeather API key.
    pub api_key: Option<String>,

    /// Provider base URL; defaults to the public OpenWeather host.
    pub api_base_url: Option<String>,

    /// Directory holding `searchHistory.json`.
    pub history_dir: Option<PathBuf>,

    /// Address the HTTP server binds to.
    pub listen_addr: Option<String>,

    /// Built browser client served as static files.
    pub client_dir: Option<PathBuf>,
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-task", "weather-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Apply process environment overrides on top of the file values.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup.
    ///
    /// Recognised keys: `OPENWEATHER_API_KEY`, `OPENWEATHER_BASE_URL`,
    /// `WEATHER_HISTORY_DIR` and `PORT`. Empty values are ignored.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("OPENWEATHER_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(url) = get("OPENWEATHER_BASE_URL") {
            self.api_base_url = Some(url);
        }
        if let Some(dir) = get("WEATHER_HISTORY_DIR") {
            self.history_dir = Some(PathBuf::from(dir));
        }
        if let Some(port) = get("PORT") {
            let addr = self.listen_addr();
            let host = addr.rsplit_once(':').map(|(host, _)| host).unwrap_or("127.0.0.1");
            self.listen_addr = Some(format!("{host}:{port}"));
        }

        self
    }

    /// Returns the API key, or a hint on how to configure one.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                anyhow!(
                    "No OpenWeather API key configured.\n\
                     Hint: run `weather configure` or set OPENWEATHER_API_KEY."
                )
            })
    }

    /// Convenience helper: set/replace the API key.
    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key);
    }

    pub fn api_base_url(&self) -> &str {
        self.api_base_url.as_deref().unwrap_or(DEFAULT_API_BASE_URL)
    }

    pub fn history_dir(&self) -> PathBuf {
        self.history_dir.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_HISTORY_DIR))
    }

    pub fn listen_addr(&self) -> String {
        self.listen_addr.clone().unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string())
    }

    pub fn client_dir(&self) -> PathBuf {
        self.client_dir.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_CLIENT_DIR))
    }
}
