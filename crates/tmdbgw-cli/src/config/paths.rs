//! Config file location.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};

/// Application directory name under the config root.
const APP_DIR: &str = "tmdbgw";

/// Config file name.
const CONFIG_FILE: &str = "config.toml";

/// Resolves the config file path from the process environment.
///
/// - `dir` given: `{dir}/config.toml`.
/// - `XDG_CONFIG_HOME` set: `$XDG_CONFIG_HOME/tmdbgw/config.toml`.
/// - Otherwise: `~/.config/tmdbgw/config.toml`.
///
/// # Errors
///
/// Returns an error if neither `XDG_CONFIG_HOME` nor `HOME` is usable
/// (when `dir` is `None`).
pub fn resolve_config_path(dir: Option<&PathBuf>) -> Result<PathBuf> {
    resolve_with(dir, |key| std::env::var_os(key).map(PathBuf::from))
}

fn resolve_with<F>(dir: Option<&PathBuf>, lookup: F) -> Result<PathBuf>
where
    F: Fn(&str) -> Option<PathBuf>,
{
    if let Some(d) = dir {
        return Ok(d.join(CONFIG_FILE));
    }

    // Relative values are ignored, as the XDG base directory rules require
    let absolute = |key: &str| lookup(key).filter(|path| path.is_absolute());

    if let Some(config_home) = absolute("XDG_CONFIG_HOME") {
        return Ok(in_app_dir(&config_home));
    }
    match absolute("HOME") {
        Some(home) => Ok(in_app_dir(&home.join(".config"))),
        None => bail!("cannot locate the config directory: set HOME, XDG_CONFIG_HOME or --dir"),
    }
}

fn in_app_dir(root: &Path) -> PathBuf {
    root.join(APP_DIR).join(CONFIG_FILE)
}
