//! `AppConfig` struct, TOML read/write and override layering.

use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tmdbgw_api::auth::{generate_token, validate_token};
use tmdbgw_api::tmdb::{DEFAULT_LANGUAGE, DEFAULT_RATE_LIMIT};

/// Accepted values of `logging.level`.
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Top-level application configuration.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Upstream TMDB settings.
    #[serde(default)]
    pub tmdb: TmdbConfig,
    /// Inbound HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[tmdb]` section.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TmdbConfig {
    /// TMDB v3 API key.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_key: String,
    /// Default response language.
    #[serde(default = "default_language")]
    pub language: String,
    /// Requests per 10-second window.
    #[serde(default = "default_rate_limit")]
    pub rate_limit: u32,
    /// Upstream base URL override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            language: default_language(),
            rate_limit: default_rate_limit(),
            base_url: None,
        }
    }
}

/// `[server]` section.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bearer token. Generated on first `serve` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            token: None,
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// One of `trace`, `debug`, `info`, `warn`, `error`.
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_owned()
}

const fn default_rate_limit() -> u32 {
    DEFAULT_RATE_LIMIT
}

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    8910
}

fn default_level() -> String {
    String::from("info")
}

/// Values given on the command line. `None` leaves the layer below intact.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    /// `--api-key`
    pub api_key: Option<String>,
    /// `--language`
    pub language: Option<String>,
    /// `--rate-limit`
    pub rate_limit: Option<u32>,
    /// `--host`
    pub host: Option<String>,
    /// `--port`
    pub port: Option<u16>,
    /// `--token`
    pub token: Option<String>,
    /// `--log-level`
    pub log_level: Option<String>,
}

impl AppConfig {
    /// Loads config from a TOML file. Returns default if file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Saves config to a TOML file readable by the owner only, creating
    /// parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation or file write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("failed to serialize config to TOML")?;
        write_private(path, &content).with_context(|| format!("failed to write {}", path.display()))
    }

    /// Applies environment variables through `lookup`. Empty values are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable cannot be parsed.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(value) = get("TMDB_API_KEY") {
            self.tmdb.api_key = value;
        }
        if let Some(value) = get("TMDB_LANGUAGE") {
            self.tmdb.language = value;
        }
        if let Some(value) = get("TMDB_RATE_LIMIT") {
            self.tmdb.rate_limit = value
                .trim()
                .parse()
                .with_context(|| format!("TMDB_RATE_LIMIT is not a valid number: {value}"))?;
        }
        if let Some(value) = get("TMDB_BASE_URL") {
            self.tmdb.base_url = Some(value);
        }
        if let Some(value) = get("SERVER_HOST") {
            self.server.host = value;
        }
        if let Some(value) = get("SERVER_PORT") {
            self.server.port = value
                .trim()
                .parse()
                .with_context(|| format!("SERVER_PORT is not a valid port: {value}"))?;
        }
        if let Some(value) = get("SERVER_TOKEN") {
            self.server.token = Some(value);
        }
        if let Some(value) = get("LOGGING_LEVEL") {
            self.logging.level = value;
        }
        Ok(())
    }

    /// Applies command-line values on top of everything else.
    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(value) = &overrides.api_key {
            self.tmdb.api_key.clone_from(value);
        }
        if let Some(value) = &overrides.language {
            self.tmdb.language.clone_from(value);
        }
        if let Some(value) = overrides.rate_limit {
            self.tmdb.rate_limit = value;
        }
        if let Some(value) = &overrides.host {
            self.server.host.clone_from(value);
        }
        if let Some(value) = overrides.port {
            self.server.port = value;
        }
        if let Some(value) = &overrides.token {
            self.server.token = Some(value.clone());
        }
        if let Some(value) = &overrides.log_level {
            self.logging.level.clone_from(value);
        }
    }

    /// Checks the merged configuration. The API key is checked separately
    /// by [`Self::api_key`] since not every command needs it.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.tmdb.rate_limit == 0 {
            bail!("tmdb.rate_limit must be greater than 0");
        }
        if self.tmdb.language.trim().is_empty() {
            bail!("tmdb.language must not be empty");
        }
        let level = self.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            bail!(
                "logging.level must be one of {}, got {:?}",
                LOG_LEVELS.join(", "),
                self.logging.level
            );
        }
        if let Some(token) = &self.server.token {
            validate_token(token).context("invalid server.token")?;
        }
        Ok(())
    }

    /// Returns the API key.
    ///
    /// # Errors
    ///
    /// Returns an error if no key was configured.
    pub fn api_key(&self) -> Result<&str> {
        let key = self.tmdb.api_key.trim();
        if key.is_empty() {
            bail!("TMDB API key is required (set tmdb.api_key, TMDB_API_KEY or --api-key)");
        }
        Ok(key)
    }
}

/// Returns the token stored in the config file at `path`, generating and
/// persisting a new one when the file has none.
///
/// Only the file layer is rewritten, so values taken from the environment
/// or the command line never end up on disk.
///
/// # Errors
///
/// Returns an error if the file cannot be read or written, or the OS random
/// source fails.
pub fn bootstrap_token(path: &Path) -> Result<String> {
    let mut file_config = AppConfig::load(path)?;
    if let Some(token) = &file_config.server.token {
        return Ok(token.clone());
    }
    let token = generate_token()?;
    file_config.server.token = Some(token.clone());
    file_config.save(path)?;
    tracing::info!(path = %path.display(), "Generated a new access token");
    Ok(token)
}

#[cfg(unix)]
fn write_private(path: &Path, content: &str) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies on creation
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    file.write_all(content.as_bytes())
}

#[cfg(not(unix))]
fn write_private(path: &Path, content: &str) -> std::io::Result<()> {
    std::fs::write(path, content)
}
