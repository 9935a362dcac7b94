//! Compositor configuration.
//!
//! The configuration is a TOML file with one table per bootstrap step. Every
//! field has a default, so a missing file (or an empty one) starts the
//! compositor as `headless`, 800x600, gray background, `xdg_wm_base` v1.
//!
//! ```toml
//! [logging]
//! level = "debug"
//!
//! [backend]
//! name = "headless"
//! rendering_mode = "software"
//!
//! [output]
//! width = 1280
//! height = 720
//!
//! [background]
//! color = [0.1, 0.1, 0.1, 1.0]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use directories_next::ProjectDirs;
use novade_compositor_core::{
    BackendConfig, Color, GeometryError, KeyboardLayout, OutputGeometry, Transform, DEFAULT_BACKGROUND_COLOR,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConfigError;

/// Environment variable overriding the configuration file location.
pub const CONFIG_PATH_ENV: &str = "NOVA_COMPOSITOR_CONFIG";

const QUALIFIER: &str = "org";
const ORGANIZATION: &str = "NovaDE";
const APPLICATION: &str = "nova-compositor";
const CONFIG_FILE_NAME: &str = "config.toml";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub logging: LoggingConfig,
    pub socket: SocketConfig,
    pub backend: BackendConfig,
    pub output: OutputConfig,
    pub background: BackgroundConfig,
    pub keyboard: KeyboardLayout,
    pub shell: ShellConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// One of `trace`, `debug`, `info`, `warn`, `error`. `RUST_LOG` wins.
    pub level: String,
    pub format: LogFormat,
    /// Daily-rotated log file, in addition to stderr.
    pub file_path: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            file_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SocketConfig {
    /// Directory for the listening socket; `$XDG_RUNTIME_DIR` when unset.
    pub runtime_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Output name; the backend picks one when unset.
    pub name: Option<String>,
    pub transform: Transform,
    pub width: i32,
    pub height: i32,
    pub scale: i32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            name: None,
            transform: Transform::Normal,
            width: 800,
            height: 600,
            scale: 1,
        }
    }
}

impl OutputConfig {
    pub fn geometry(&self) -> Result<OutputGeometry, GeometryError> {
        OutputGeometry::new(self.transform, self.width, self.height, self.scale)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackgroundConfig {
    pub color: Color,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        let [r, g, b, a] = DEFAULT_BACKGROUND_COLOR;
        Self {
            color: Color::new(r, g, b, a).unwrap_or(Color::BLACK),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShellConfig {
    /// Advertised `xdg_wm_base` version.
    pub version: u32,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self { version: 1 }
    }
}

impl Config {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the file at `path`. A missing file yields the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!(path = %path.display(), "no configuration file, using defaults");
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loading configuration");
        Self::from_toml_str(&content)
    }

    /// Loads from `$NOVA_COMPOSITOR_CONFIG`, else from the user configuration
    /// directory, else returns the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        match default_config_path() {
            Some(path) => Self::load_from_path(&path),
            None => {
                info!("no configuration directory, using defaults");
                Ok(Config::default())
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let level = self.logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "invalid logging.level '{}', expected one of {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            )));
        }
        if self.backend.name.trim().is_empty() {
            return Err(ConfigError::Validation("backend.name must not be empty".into()));
        }
        self.output
            .geometry()
            .map_err(|e| ConfigError::Validation(format!("output: {e}")))?;
        if self.shell.version == 0 {
            return Err(ConfigError::Validation("shell.version must be at least 1".into()));
        }
        Ok(())
    }
}

/// `$NOVA_COMPOSITOR_CONFIG`, or `config.toml` in the user configuration
/// directory of the application.
pub fn default_config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return Some(PathBuf::from(path));
    }
    ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION).map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}
