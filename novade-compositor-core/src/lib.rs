//! # Novade Compositor Core
//!
//! This crate forms the core logic of the Nova bootstrap compositor.
//! It includes management of:
//! - Regions: immutable rectangle sets used for damage and opaque areas.
//! - Surfaces: content descriptors (solid colors), size, damage tracking.
//! - The scene graph: an ordered list of layers, each holding an ordered
//!   list of views that reference surfaces.
//! - Outputs: fixed-geometry display surfaces materialized by a backend.
//! - The background: the flat-color surface every output starts with.
//! - Backends: the `Backend` trait, the selector that initializes exactly one
//!   backend per process, and the built-in headless backend.
//!
//! Nothing in here talks to Wayland clients; the protocol side lives in
//! `nova_compositor`, which drives these types from its event loop.

pub mod background;
pub mod backend;
pub mod error;
pub mod keyboard;
pub mod output;
pub mod region;
pub mod scene;
pub mod surface;

pub use backend::{
    ActiveBackend, Backend, BackendConfig, BackendContext, BackendSelector, FrameReport,
    HeadlessBackend, RenderingMode,
};
pub use background::{install_background, Background, DEFAULT_BACKGROUND_COLOR};
pub use error::{BackendError, ColorError, GeometryError, OutputError, SceneError};
pub use keyboard::KeyboardLayout;
pub use output::{Output, OutputGeometry, OutputId, Transform};
pub use region::{Rectangle, Region};
pub use scene::{LayerId, Placement, SceneRoot, View, ViewId};
pub use surface::{Color, Surface, SurfaceContent, SurfaceId};
