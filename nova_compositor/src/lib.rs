//! # Nova Compositor
//!
//! A bootstrap Wayland compositor. It allocates a display server, brings up
//! one backend with one output, paints a flat background and advertises
//! `xdg_wm_base`, then serves clients from a single-threaded calloop event
//! loop.
//!
//! Scene, output and backend types live in `novade_compositor_core`; this
//! crate adds the Wayland side and the process plumbing (configuration,
//! logging, exit codes).

pub mod bootstrap;
pub mod config;
pub mod display;
pub mod error;
pub mod logging;
pub mod protocols;
pub mod shell;
pub mod state;

pub use bootstrap::{Bootstrap, Compositor, LoopData};
pub use config::Config;
pub use display::{DisplayServer, Environment, ProcessEnvironment};
pub use error::{CompositorError, ConfigError, DisplayError, LoggingError, SessionError, ShellError};
pub use shell::{ClientKey, DefaultShellHandler, SessionKey, ShellBindHandler, ShellRegistrar, ShellSession};
pub use state::{ClientState, CompositorState};
