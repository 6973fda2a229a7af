//! Application configuration module.
//!
//! Layers the TOML config file, `TMDB_*` / `SERVER_*` / `LOGGING_*`
//! environment variables and command-line flags into one [`AppConfig`].

#[allow(clippy::module_inception)]
mod config;
mod paths;

#[allow(clippy::module_name_repetitions)]
pub use config::{AppConfig, Overrides, bootstrap_token};
pub use paths::resolve_config_path;
