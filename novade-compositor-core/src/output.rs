//! Outputs: display surfaces with a fixed geometry.
//!
//! An output is materialized by the active backend and keeps its geometry
//! for the lifetime of the process. Everything sized against it (the
//! background, future client placement) reads [`Output::logical_rect`].

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;
use crate::region::Rectangle;

/// Default refresh rate of virtual outputs, in mHz.
pub const DEFAULT_REFRESH_MHZ: i32 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputId(u64);

impl OutputId {
    pub fn new_unique() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        OutputId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Output transform, matching the `wl_output.transform` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    #[default]
    Normal,
    Rotate90,
    Rotate180,
    Rotate270,
    Flipped,
    Flipped90,
    Flipped180,
    Flipped270,
}

impl Transform {
    /// Whether the transform swaps the horizontal and vertical axes.
    pub fn swaps_axes(&self) -> bool {
        matches!(
            self,
            Transform::Rotate90 | Transform::Rotate270 | Transform::Flipped90 | Transform::Flipped270
        )
    }
}

/// Mode, transform and scale of an output. Width, height and scale are
/// always positive once constructed, and the scale never exceeds either
/// dimension, so the logical size is at least 1x1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputGeometry {
    transform: Transform,
    width: i32,
    height: i32,
    scale: i32,
}

impl OutputGeometry {
    pub fn new(transform: Transform, width: i32, height: i32, scale: i32) -> Result<Self, GeometryError> {
        if width <= 0 {
            return Err(GeometryError::InvalidWidth(width));
        }
        if height <= 0 {
            return Err(GeometryError::InvalidHeight(height));
        }
        if scale <= 0 {
            return Err(GeometryError::InvalidScale(scale));
        }
        if scale > width.min(height) {
            return Err(GeometryError::ScaleExceedsMode { scale, width, height });
        }
        Ok(Self { transform, width, height, scale })
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    /// Mode width in device pixels.
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Mode height in device pixels.
    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn scale(&self) -> i32 {
        self.scale
    }

    /// Size in compositor coordinates: transformed, then divided by scale.
    pub fn logical_size(&self) -> (i32, i32) {
        let (w, h) = if self.transform.swaps_axes() {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        };
        (w / self.scale, h / self.scale)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    id: OutputId,
    name: String,
    geometry: OutputGeometry,
    refresh_mhz: i32,
}

impl Output {
    /// Describes an output materialized by a backend.
    pub fn new(name: impl Into<String>, geometry: OutputGeometry, refresh_mhz: i32) -> Result<Self, GeometryError> {
        if refresh_mhz <= 0 {
            return Err(GeometryError::InvalidRefresh(refresh_mhz));
        }
        Ok(Self {
            id: OutputId::new_unique(),
            name: name.into(),
            geometry,
            refresh_mhz,
        })
    }

    pub fn id(&self) -> OutputId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn geometry(&self) -> &OutputGeometry {
        &self.geometry
    }

    pub fn refresh_mhz(&self) -> i32 {
        self.refresh_mhz
    }

    /// `[0, 0, width, height]` in compositor coordinates.
    pub fn logical_rect(&self) -> Rectangle {
        let (w, h) = self.geometry.logical_size();
        Rectangle::from_size(w, h)
    }

    /// Time between two frames at the output's refresh rate.
    pub fn frame_interval(&self) -> std::time::Duration {
        std::time::Duration::from_micros(1_000_000_000 / self.refresh_mhz as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 600, 1, GeometryError::InvalidWidth(0))]
    #[case(800, -1, 1, GeometryError::InvalidHeight(-1))]
    #[case(800, 600, 0, GeometryError::InvalidScale(0))]
    #[case(1, 1, 2, GeometryError::ScaleExceedsMode { scale: 2, width: 1, height: 1 })]
    #[case(800, 1, 2, GeometryError::ScaleExceedsMode { scale: 2, width: 800, height: 1 })]
    fn test_geometry_rejects_invalid(
        #[case] w: i32,
        #[case] h: i32,
        #[case] scale: i32,
        #[case] expected: GeometryError,
    ) {
        assert_eq!(OutputGeometry::new(Transform::Normal, w, h, scale), Err(expected));
    }

    #[rstest]
    #[case(Transform::Normal, 1, (800, 600))]
    #[case(Transform::Rotate90, 1, (600, 800))]
    #[case(Transform::Flipped270, 1, (600, 800))]
    #[case(Transform::Normal, 2, (400, 300))]
    #[case(Transform::Normal, 600, (1, 1))]
    fn test_logical_size(#[case] transform: Transform, #[case] scale: i32, #[case] expected: (i32, i32)) {
        let geometry = OutputGeometry::new(transform, 800, 600, scale).unwrap();
        assert_eq!(geometry.logical_size(), expected);
    }

    #[test]
    fn test_output_logical_rect_and_interval() {
        let geometry = OutputGeometry::new(Transform::Normal, 800, 600, 1).unwrap();
        let output = Output::new("virtual-1", geometry, DEFAULT_REFRESH_MHZ).unwrap();
        assert_eq!(output.logical_rect(), Rectangle::new(0, 0, 800, 600));
        assert_eq!(output.frame_interval().as_micros(), 16_666);
        assert!(Output::new("bad", geometry, 0).is_err());
    }
}
