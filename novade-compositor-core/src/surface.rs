//! Surfaces: pixel content descriptors tracked by the scene.
//!
//! A surface carries its content (currently only flat colors), its size,
//! the region it declares opaque and the damage accumulated since the
//! renderer last looked at it. Every visible change must be followed by
//! [`Surface::damage`], otherwise the backend has no reason to repaint it.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ColorError, SceneError};
use crate::region::{Rectangle, Region};

/// Unique identifier of a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(u64);

impl SurfaceId {
    /// Creates a new, unique `SurfaceId`.
    pub fn new_unique() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        SurfaceId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// An RGBA color with channels in `[0.0, 1.0]`.
///
/// Serialized as a `[r, g, b, a]` array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f32; 4]", into = "[f32; 4]")]
pub struct Color {
    r: f32,
    g: f32,
    b: f32,
    a: f32,
}

impl Color {
    pub const BLACK: Color = Color { r: 0.0, g: 0.0, b: 0.0, a: 1.0 };

    /// Validates and creates a color.
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Result<Self, ColorError> {
        for (channel, value) in [('r', r), ('g', g), ('b', b), ('a', a)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ColorError::ChannelOutOfRange { channel, value });
            }
        }
        Ok(Self { r, g, b, a })
    }

    pub fn r(&self) -> f32 {
        self.r
    }

    pub fn g(&self) -> f32 {
        self.g
    }

    pub fn b(&self) -> f32 {
        self.b
    }

    pub fn a(&self) -> f32 {
        self.a
    }

    pub fn is_opaque(&self) -> bool {
        self.a >= 1.0
    }
}

impl TryFrom<[f32; 4]> for Color {
    type Error = ColorError;

    fn try_from([r, g, b, a]: [f32; 4]) -> Result<Self, Self::Error> {
        Color::new(r, g, b, a)
    }
}

impl From<Color> for [f32; 4] {
    fn from(c: Color) -> Self {
        [c.r, c.g, c.b, c.a]
    }
}

/// What a surface shows.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SurfaceContent {
    /// Freshly created, nothing to draw yet.
    #[default]
    Undefined,
    /// Flat color fill of the whole surface.
    SolidColor(Color),
}

#[derive(Debug, Clone)]
pub struct Surface {
    id: SurfaceId,
    content: SurfaceContent,
    width: i32,
    height: i32,
    opaque: Region,
    damage: Region,
    force_refresh: bool,
}

impl Surface {
    pub(crate) fn new() -> Self {
        Self {
            id: SurfaceId::new_unique(),
            content: SurfaceContent::Undefined,
            width: 0,
            height: 0,
            opaque: Region::empty(),
            damage: Region::empty(),
            force_refresh: false,
        }
    }

    pub fn id(&self) -> SurfaceId {
        self.id
    }

    pub fn content(&self) -> SurfaceContent {
        self.content
    }

    pub fn size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    /// The surface-local rectangle `[0, 0, width, height]`.
    pub fn bounds(&self) -> Rectangle {
        Rectangle::from_size(self.width, self.height)
    }

    pub fn opaque_region(&self) -> &Region {
        &self.opaque
    }

    /// Damage accumulated since the last [`Surface::take_damage`].
    pub fn pending_damage(&self) -> &Region {
        &self.damage
    }

    pub fn force_refresh(&self) -> bool {
        self.force_refresh
    }

    /// Makes the surface a flat color fill.
    ///
    /// Switching to translucent content drops any opaque region, which can
    /// no longer hold.
    pub fn set_solid_color(&mut self, color: Color) {
        self.content = SurfaceContent::SolidColor(color);
        if !color.is_opaque() && !self.opaque.is_empty() {
            debug!(surface = ?self.id, alpha = color.a(), "dropping opaque region of translucent surface");
            self.opaque = Region::empty();
        }
    }

    pub fn set_size(&mut self, width: i32, height: i32) -> Result<(), SceneError> {
        if width < 0 || height < 0 {
            return Err(SceneError::InvalidSize { width, height });
        }
        self.width = width;
        self.height = height;
        self.opaque = self.opaque.intersect_rect(self.bounds());
        Ok(())
    }

    /// Replaces the opaque region, clipped to the surface bounds.
    pub fn set_opaque_region(&mut self, region: Region) -> Result<(), SceneError> {
        if let SurfaceContent::SolidColor(color) = self.content {
            if !color.is_opaque() && !region.is_empty() {
                return Err(SceneError::OpaqueOverTranslucent {
                    surface: self.id,
                    alpha: color.a(),
                });
            }
        }
        self.opaque = region.intersect_rect(self.bounds());
        Ok(())
    }

    /// Marks the whole surface as needing a repaint. Repeated calls before
    /// the renderer consumes the damage are no-ops.
    pub fn damage(&mut self) {
        self.damage_rect(self.bounds());
    }

    /// Adds a surface-local rectangle to the pending damage.
    pub fn damage_rect(&mut self, rect: Rectangle) {
        self.damage = self.damage.union_rect(rect.intersection(&self.bounds()).unwrap_or_default());
    }

    /// Requests a repaint on the next frame even without damage.
    pub fn set_force_refresh(&mut self, force: bool) {
        self.force_refresh = force;
    }

    /// Whether the next frame must repaint this surface.
    pub fn needs_repaint(&self) -> bool {
        self.force_refresh || !self.damage.is_empty()
    }

    /// Hands the accumulated damage to the renderer and resets it, together
    /// with the force-refresh flag.
    pub fn take_damage(&mut self) -> Region {
        self.force_refresh = false;
        std::mem::take(&mut self.damage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray() -> Color {
        Color::new(0.5, 0.5, 0.5, 1.0).unwrap()
    }

    #[test]
    fn test_unique_surface_ids() {
        let id1 = SurfaceId::new_unique();
        let id2 = SurfaceId::new_unique();
        assert_ne!(id1, id2, "SurfaceId::new_unique should generate unique IDs.");
    }

    #[test]
    fn test_color_rejects_out_of_range_channels() {
        assert!(Color::new(0.0, 0.0, 0.0, 1.0).is_ok());
        assert_eq!(
            Color::new(0.0, 1.2, 0.0, 1.0),
            Err(ColorError::ChannelOutOfRange { channel: 'g', value: 1.2 })
        );
        assert!(Color::new(f32::NAN, 0.0, 0.0, 1.0).is_err());
    }

    #[test]
    fn test_surface_creation_defaults() {
        let surface = Surface::new();
        assert_eq!(surface.content(), SurfaceContent::Undefined);
        assert_eq!(surface.size(), (0, 0));
        assert!(surface.opaque_region().is_empty());
        assert!(!surface.needs_repaint());
    }

    #[test]
    fn test_opaque_region_is_clipped_to_bounds() {
        let mut surface = Surface::new();
        surface.set_solid_color(gray());
        surface.set_size(100, 50).unwrap();
        surface
            .set_opaque_region(Region::from_rect(Rectangle::new(-10, -10, 500, 500)))
            .unwrap();
        assert_eq!(surface.opaque_region(), &Region::from_rect(Rectangle::from_size(100, 50)));

        surface.set_size(40, 40).unwrap();
        assert_eq!(surface.opaque_region(), &Region::from_rect(Rectangle::from_size(40, 40)));
    }

    #[test]
    fn test_opaque_over_translucent_is_rejected() {
        let mut surface = Surface::new();
        surface.set_solid_color(Color::new(1.0, 1.0, 1.0, 0.5).unwrap());
        surface.set_size(10, 10).unwrap();
        let err = surface
            .set_opaque_region(Region::from_rect(surface.bounds()))
            .unwrap_err();
        assert!(matches!(err, SceneError::OpaqueOverTranslucent { .. }));
        assert!(surface.set_opaque_region(Region::empty()).is_ok());
    }

    #[test]
    fn test_translucent_color_drops_opaque_region() {
        let mut surface = Surface::new();
        surface.set_solid_color(gray());
        surface.set_size(10, 10).unwrap();
        surface.set_opaque_region(Region::from_rect(surface.bounds())).unwrap();
        surface.set_solid_color(Color::new(0.5, 0.5, 0.5, 0.25).unwrap());
        assert!(surface.opaque_region().is_empty());
    }

    #[test]
    fn test_damage_accumulates_instead_of_multiplying() {
        let mut once = Surface::new();
        once.set_size(800, 600).unwrap();
        once.damage();

        let mut many = Surface::new();
        many.set_size(800, 600).unwrap();
        for _ in 0..5 {
            many.damage();
        }

        assert_eq!(many.pending_damage(), once.pending_damage());
        assert_eq!(many.pending_damage().area(), 800 * 600);
        assert_eq!(many.take_damage(), once.take_damage());
        assert!(!many.needs_repaint());
    }

    #[test]
    fn test_take_damage_clears_force_refresh() {
        let mut surface = Surface::new();
        surface.set_force_refresh(true);
        assert!(surface.needs_repaint());
        assert!(surface.take_damage().is_empty());
        assert!(!surface.needs_repaint());
    }

    #[test]
    fn test_color_array_conversion() {
        let arr: [f32; 4] = gray().into();
        assert_eq!(arr, [0.5, 0.5, 0.5, 1.0]);
        assert!(Color::try_from([0.0, 0.0, 0.0, -0.1]).is_err());
    }
}
