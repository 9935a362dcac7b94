//! Error types of the compositor process.
//!
//! Every bootstrap step has its own error enum; [`CompositorError`] wraps
//! them all and decides the process exit code.

use std::path::PathBuf;

use novade_compositor_core::{BackendError, SceneError};
use thiserror::Error;
use wayland_server::BindError;

use crate::shell::ClientKey;

/// Exit code for any fatal bootstrap or configuration error.
pub const EXIT_FAILURE: i32 = 1;
/// Exit code when the shell global could not be registered.
pub const EXIT_SHELL_REGISTRATION: i32 = 255;

/// Top-level error of the compositor process.
#[derive(Debug, Error)]
pub enum CompositorError {
    #[error("Configuration Error: {0}")]
    Config(#[from] ConfigError),

    #[error("Logging Initialization Failed: {0}")]
    Logging(#[from] LoggingError),

    #[error("Display server error: {0}")]
    Display(#[from] DisplayError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    #[error("Failed to register the shell global: {0}")]
    ShellRegistration(#[from] ShellError),

    #[error("Event loop error: {0}")]
    EventLoop(String),

    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),
}

impl CompositorError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CompositorError::ShellRegistration(_) => EXIT_SHELL_REGISTRATION,
            _ => EXIT_FAILURE,
        }
    }
}

impl From<calloop::Error> for CompositorError {
    fn from(e: calloop::Error) -> Self {
        CompositorError::EventLoop(e.to_string())
    }
}

/// Errors of the display server handle.
#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("Failed to allocate the display server: {0}")]
    Create(String),

    #[error("XDG_RUNTIME_DIR is not set and no socket.runtime_dir is configured")]
    RuntimeDirNotSet,

    #[error("Failed to bind socket {path:?}")]
    SocketBind {
        path: PathBuf,
        #[source]
        source: BindError,
    },

    #[error("No free wayland socket name in {dir:?}")]
    NoFreeSocket { dir: PathBuf },

    #[error("Keyboard layout is already set")]
    KeyboardLayoutAlreadySet,

    #[error("Global {interface} is already advertised")]
    GlobalCollision { interface: String },

    #[error("Global {interface} is not advertised")]
    UnknownGlobal { interface: String },
}

/// Errors of the shell global registrar.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("The shell global is not registered")]
    NotRegistered,

    #[error("The shell global is already registered (version {version})")]
    AlreadyRegistered { version: u32 },

    #[error("Unsupported {interface} version {requested} (supported: 1..={max})")]
    UnsupportedVersion {
        interface: &'static str,
        requested: u32,
        max: u32,
    },

    #[error(transparent)]
    Display(#[from] DisplayError),

    #[error("Bind rejected: {0}")]
    Session(#[from] SessionError),
}

/// Raised by a bind handler that cannot build a session for a client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Client {client} rejected: {reason}")]
    Rejected { client: ClientKey, reason: String },

    #[error("Client {client} requested version {version}, above the advertised {advertised}")]
    VersionMismatch {
        client: ClientKey,
        version: u32,
        advertised: u32,
    },
}

/// Errors of configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file from {path:?}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Configuration validation failed: {0}")]
    Validation(String),
}

/// Errors of logging initialization.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log level: {0}")]
    InvalidLevel(String),

    #[error("Failed to prepare log directory {path:?}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to set global tracing subscriber: {0}")]
    InitializationFailure(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let shell = CompositorError::from(ShellError::NotRegistered);
        assert_eq!(shell.exit_code(), 255);

        let display = CompositorError::from(DisplayError::RuntimeDirNotSet);
        assert_eq!(display.exit_code(), 1);

        let config = CompositorError::from(ConfigError::Validation("bad".into()));
        assert_eq!(config.exit_code(), 1);
    }

    #[test]
    fn test_session_error_display() {
        let err = SessionError::Rejected {
            client: ClientKey::from_raw(10),
            reason: "quota".into(),
        };
        assert_eq!(err.to_string(), "Client client#10 rejected: quota");
    }
}
