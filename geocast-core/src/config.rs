use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::provider::ServiceId;

pub const TOKEN_ENV: &str = "IPINFO_TOKEN";
pub const USER_AGENT_ENV: &str = "GEOCAST_USER_AGENT";

/// Settings for ipinfo.io.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IpInfoConfig {
    pub token: Option<String>,
    pub base_url: String,
}

impl Default for IpInfoConfig {
    fn default() -> Self {
        Self {
            token: None,
            base_url: ServiceId::IpInfo.default_base_url().to_string(),
        }
    }
}

/// Settings for a service that only needs an endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub base_url: String,
}

fn nominatim_endpoint() -> EndpointConfig {
    EndpointConfig {
        base_url: ServiceId::Nominatim.default_base_url().to_string(),
    }
}

fn nws_endpoint() -> EndpointConfig {
    EndpointConfig {
        base_url: ServiceId::Nws.default_base_url().to_string(),
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// user_agent = "geocast (me@example.com)"
///
/// [ipinfo]
/// token = "..."
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Client identification sent to Nominatim and api.weather.gov.
    #[serde(default)]
    pub user_agent: Option<String>,

    #[serde(default)]
    pub ipinfo: IpInfoConfig,

    #[serde(default = "nominatim_endpoint")]
    pub nominatim: EndpointConfig,

    #[serde(default = "nws_endpoint")]
    pub nws: EndpointConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_agent: None,
            ipinfo: IpInfoConfig::default(),
            nominatim: nominatim_endpoint(),
            nws: nws_endpoint(),
        }
    }
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
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
        self.save_to(&Self::config_file_path()?)
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
        let dirs = ProjectDirs::from("dev", "geocast", "geocast")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Override file values with `IPINFO_TOKEN` / `GEOCAST_USER_AGENT` when set.
    pub fn apply_env(&mut self) {
        self.apply_overrides(env::var(TOKEN_ENV).ok(), env::var(USER_AGENT_ENV).ok());
    }

    fn apply_overrides(&mut self, token: Option<String>, user_agent: Option<String>) {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.ipinfo.token = Some(token);
        }
        if let Some(ua) = user_agent.filter(|u| !u.trim().is_empty()) {
            self.user_agent = Some(ua);
        }
    }

    pub fn ipinfo_token(&self) -> Option<&str> {
        self.ipinfo.token.as_deref().filter(|t| !t.is_empty())
    }

    pub fn set_ipinfo_token(&mut self, token: String) {
        self.ipinfo.token = Some(token);
    }

    /// Configured client identification, or `fallback` when none is set.
    pub fn user_agent_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.user_agent
            .as_deref()
            .filter(|ua| !ua.trim().is_empty())
            .unwrap_or(fallback)
    }

    pub fn set_user_agent(&mut self, user_agent: String) {
        self.user_agent = Some(user_agent);
    }

    pub fn base_url(&self, id: ServiceId) -> &str {
        match id {
            ServiceId::IpInfo => &self.ipinfo.base_url,
            ServiceId::Nominatim => &self.nominatim.base_url,
            ServiceId::Nws => &self.nws.base_url,
        }
    }

    pub fn set_base_url(&mut self, id: ServiceId, url: String) {
        match id {
            ServiceId::IpInfo => self.ipinfo.base_url = url,
            ServiceId::Nominatim => self.nominatim.base_url = url,
            ServiceId::Nws => self.nws.base_url = url,
        }
    }

    pub fn is_service_configured(&self, id: ServiceId) -> bool {
        match id {
            ServiceId::IpInfo => self.ipinfo_token().is_some(),
            ServiceId::Nominatim | ServiceId::Nws => self.user_agent.is_some(),
        }
    }
}
