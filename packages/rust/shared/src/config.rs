//! Application configuration for ProspectCue.
//!
//! User config lives at `~/.prospectcue/prospectcue.toml`.
//! CLI flags override config file values, which override defaults.
//! The route fragment table is compiled in and not configurable.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ProspectCueError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "prospectcue.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".prospectcue";

/// Time the host app's router gets to update the location after a click.
pub const SETTLE_DELAY: Duration = Duration::from_millis(500);

// ---------------------------------------------------------------------------
// Config structs (matching prospectcue.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Navigation watcher settings.
    #[serde(default)]
    pub watcher: WatcherSection,

    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[watcher]` section. Read by `prospectcue replay`; page loads always use [`SETTLE_DELAY`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherSection {
    /// Milliseconds to wait after a click before re-reading the location.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

impl Default for WatcherSection {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

fn default_settle_delay_ms() -> u64 {
    SETTLE_DELAY.as_millis() as u64
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `text` or `json`.
    #[serde(default)]
    pub format: LogFormat,
}

// ---------------------------------------------------------------------------
// Watcher config (runtime, merged from config + session overrides)
// ---------------------------------------------------------------------------

/// Runtime watcher configuration.
///
/// [`Default`] is what a page load uses. The `[watcher]` config section and
/// session scripts override the delay for replayed sessions only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatcherConfig {
    /// Delay between a click and the settle check.
    pub settle_delay: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            settle_delay: SETTLE_DELAY,
        }
    }
}

impl From<&AppConfig> for WatcherConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            settle_delay: Duration::from_millis(config.watcher.settle_delay_ms),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.prospectcue/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ProspectCueError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.prospectcue/prospectcue.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ProspectCueError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        ProspectCueError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ProspectCueError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ProspectCueError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ProspectCueError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
