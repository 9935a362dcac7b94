//! Error types for the compositor core.
//!
//! Each layer of the core gets its own `thiserror` enum so that callers can
//! match on the failure they care about. `BackendError` wraps output errors
//! because outputs are only ever created through a backend.

use thiserror::Error;

use crate::scene::{LayerId, ViewId};
use crate::surface::SurfaceId;

/// Invalid color channel values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ColorError {
    /// A channel was NaN or outside `[0.0, 1.0]`.
    #[error("color channel {channel} is out of range: {value} (expected 0.0..=1.0)")]
    ChannelOutOfRange { channel: char, value: f32 },
}

/// Invalid output or surface geometry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("width must be positive, got {0}")]
    InvalidWidth(i32),

    #[error("height must be positive, got {0}")]
    InvalidHeight(i32),

    #[error("scale must be positive, got {0}")]
    InvalidScale(i32),

    #[error("scale {scale} leaves no logical pixels on a {width}x{height} mode")]
    ScaleExceedsMode { scale: i32, width: i32, height: i32 },

    #[error("refresh rate must be positive, got {0} mHz")]
    InvalidRefresh(i32),
}

/// Errors raised while mutating the scene graph.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SceneError {
    #[error("surface {0:?} does not exist")]
    UnknownSurface(SurfaceId),

    #[error("view {0:?} does not exist")]
    UnknownView(ViewId),

    #[error("layer {0:?} does not exist")]
    UnknownLayer(LayerId),

    #[error("surface size {width}x{height} is invalid")]
    InvalidSize { width: i32, height: i32 },

    /// Opaque regions are a promise to the renderer that no blending is
    /// needed; translucent content cannot make that promise.
    #[error("surface {surface:?} cannot declare an opaque region over translucent content (alpha {alpha})")]
    OpaqueOverTranslucent { surface: SurfaceId, alpha: f32 },

    #[error(transparent)]
    Color(#[from] ColorError),
}

/// Errors raised by the output manager.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OutputError {
    #[error("invalid output geometry: {0}")]
    Geometry(#[from] GeometryError),

    /// Only one output exists per process; hot-plug is not supported.
    #[error("output '{existing}' already exists; only a single output is supported")]
    AlreadyCreated { existing: String },
}

/// Errors raised while selecting, initializing or driving a backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("unknown backend '{name}' (available: {available})")]
    Unknown { name: String, available: String },

    #[error("backend '{name}' failed to initialize: {reason}")]
    Initialization { name: String, reason: String },

    #[error("backend '{backend}' does not support {mode} rendering")]
    UnsupportedRenderingMode { backend: String, mode: String },

    /// Input cannot be processed before a keymap exists.
    #[error("backend '{0}' has input enabled but no keyboard layout was configured")]
    KeyboardLayoutMissing(String),

    #[error("output error: {0}")]
    Output(#[from] OutputError),

    #[error("frame failed on output '{output}': {reason}")]
    Frame { output: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_error_wraps_geometry() {
        let err = OutputError::from(GeometryError::InvalidWidth(0));
        assert_eq!(
            err.to_string(),
            "invalid output geometry: width must be positive, got 0"
        );
    }

    #[test]
    fn test_backend_error_wraps_output() {
        let err = BackendError::from(OutputError::AlreadyCreated {
            existing: "headless-1".into(),
        });
        assert!(matches!(err, BackendError::Output(OutputError::AlreadyCreated { .. })));
        assert!(err.to_string().contains("headless-1"));
    }

    #[test]
    fn test_scene_error_from_color() {
        let err: SceneError = ColorError::ChannelOutOfRange { channel: 'r', value: 1.5 }.into();
        assert_eq!(
            err.to_string(),
            "color channel r is out of range: 1.5 (expected 0.0..=1.0)"
        );
    }
}
