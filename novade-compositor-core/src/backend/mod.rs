//! Rendering backends and the selector that initializes exactly one of them.
//!
//! A backend turns the scene into pixels on some device and materializes the
//! output. The selector holds named factories; [`BackendSelector::initialize`]
//! consumes it and yields an [`ActiveBackend`], the only handle through which
//! an output can be created. That makes "output before backend" impossible to
//! express.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{BackendError, OutputError};
use crate::keyboard::KeyboardLayout;
use crate::output::{Output, OutputGeometry, OutputId};
use crate::scene::SceneRoot;
use crate::surface::SurfaceId;

pub mod headless;

pub use headless::HeadlessBackend;

/// Draw path used by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderingMode {
    /// CPU rasterization.
    Software,
    /// GPU rendering.
    #[default]
    Accelerated,
}

impl fmt::Display for RenderingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderingMode::Software => f.write_str("software"),
            RenderingMode::Accelerated => f.write_str("accelerated"),
        }
    }
}

/// Backend tunables, fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
    /// Name of the registered backend to start.
    pub name: String,
    pub rendering_mode: RenderingMode,
    /// Whether the backend feeds input events into the server.
    pub input_enabled: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            name: HeadlessBackend::NAME.to_string(),
            rendering_mode: RenderingMode::default(),
            input_enabled: true,
        }
    }
}

/// What the display server hands to a backend during initialization.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackendContext<'a> {
    pub keyboard_layout: Option<&'a KeyboardLayout>,
}

/// Outcome of one repaint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    /// Surfaces whose damage (or forced refresh) was consumed, top first.
    pub repainted: Vec<SurfaceId>,
    /// Pixels covered by the consumed damage.
    pub damaged_area: i64,
    /// Views placed in the scene when the frame was built.
    pub views: usize,
}

impl FrameReport {
    pub fn is_idle(&self) -> bool {
        self.repainted.is_empty()
    }
}

/// A rendering backend.
///
/// Backends are driven from the event-loop thread only.
pub trait Backend {
    fn name(&self) -> &str;

    /// Whether the backend can draw with `mode`.
    fn supports(&self, _mode: RenderingMode) -> bool {
        true
    }

    /// Brings the backend up. Called exactly once, before any output exists.
    fn init(&mut self, ctx: &BackendContext<'_>, config: &BackendConfig) -> Result<(), BackendError>;

    /// Materializes an output with the given geometry.
    fn create_output(&mut self, name: &str, geometry: OutputGeometry) -> Result<Output, BackendError>;

    /// Paints one frame of `scene` on `output`, consuming the damage it
    /// repaints.
    fn repaint(&mut self, output: &Output, scene: &mut SceneRoot) -> Result<FrameReport, BackendError>;

    /// Releases an output at shutdown.
    fn destroy_output(&mut self, _output: &Output) {}
}

type BackendFactory = Box<dyn Fn() -> Box<dyn Backend>>;

/// Registry of named backend factories.
pub struct BackendSelector {
    factories: Vec<(String, BackendFactory)>,
}

impl Default for BackendSelector {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl BackendSelector {
    /// A selector without any backend.
    pub fn empty() -> Self {
        Self { factories: Vec::new() }
    }

    /// A selector with the backends shipped in this crate.
    pub fn with_builtin() -> Self {
        Self::empty().register(HeadlessBackend::NAME, || Box::new(HeadlessBackend::new()))
    }

    /// Adds (or replaces) a backend factory.
    pub fn register<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Backend> + 'static,
    {
        let name = name.into();
        self.factories.retain(|(n, _)| *n != name);
        self.factories.push((name, Box::new(factory)));
        self
    }

    pub fn available(&self) -> Vec<&str> {
        self.factories.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Instantiates and initializes the configured backend. The selector is
    /// consumed: one process, one backend.
    pub fn initialize(self, config: &BackendConfig, ctx: BackendContext<'_>) -> Result<ActiveBackend, BackendError> {
        let Some((_, factory)) = self.factories.iter().find(|(n, _)| *n == config.name) else {
            return Err(BackendError::Unknown {
                name: config.name.clone(),
                available: self.available().join(", "),
            });
        };
        if config.input_enabled && ctx.keyboard_layout.is_none() {
            return Err(BackendError::KeyboardLayoutMissing(config.name.clone()));
        }

        let mut backend = factory();
        if !backend.supports(config.rendering_mode) {
            return Err(BackendError::UnsupportedRenderingMode {
                backend: config.name.clone(),
                mode: config.rendering_mode.to_string(),
            });
        }
        info!(
            backend = %config.name,
            rendering_mode = %config.rendering_mode,
            input_enabled = config.input_enabled,
            "initializing backend"
        );
        backend.init(&ctx, config)?;
        Ok(ActiveBackend {
            backend,
            config: config.clone(),
            output: None,
        })
    }
}

/// An initialized backend. Owns the single output slot.
pub struct ActiveBackend {
    backend: Box<dyn Backend>,
    config: BackendConfig,
    output: Option<(OutputId, String)>,
}

impl fmt::Debug for ActiveBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveBackend")
            .field("backend", &self.backend.name())
            .field("config", &self.config)
            .field("output", &self.output)
            .finish()
    }
}

impl ActiveBackend {
    pub fn name(&self) -> &str {
        self.backend.name()
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Creates the process's only output. Without a name the output is
    /// called `<backend>-1`.
    pub fn create_output(&mut self, name: Option<&str>, geometry: OutputGeometry) -> Result<Output, BackendError> {
        if let Some((_, existing)) = &self.output {
            return Err(OutputError::AlreadyCreated { existing: existing.clone() }.into());
        }
        let name = match name {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => format!("{}-1", self.backend.name()),
        };
        let output = self.backend.create_output(&name, geometry)?;
        info!(
            output = %output.name(),
            width = geometry.width(),
            height = geometry.height(),
            scale = geometry.scale(),
            transform = ?geometry.transform(),
            "output created"
        );
        self.output = Some((output.id(), output.name().to_string()));
        Ok(output)
    }

    pub fn repaint(&mut self, output: &Output, scene: &mut SceneRoot) -> Result<FrameReport, BackendError> {
        let report = self.backend.repaint(output, scene)?;
        if !report.is_idle() {
            debug!(
                output = %output.name(),
                repainted = report.repainted.len(),
                damaged_area = report.damaged_area,
                "frame repainted"
            );
        }
        Ok(report)
    }

    pub fn destroy_output(&mut self, output: &Output) {
        match &self.output {
            Some((id, _)) if *id == output.id() => {
                self.backend.destroy_output(output);
                self.output = None;
                debug!(output = %output.name(), "output destroyed");
            }
            _ => warn!(output = %output.name(), "asked to destroy an output this backend does not own"),
        }
    }
}
