//! The background: a flat-color surface covering the whole output.

use tracing::info;

use crate::error::SceneError;
use crate::output::Output;
use crate::region::Region;
use crate::scene::{Placement, SceneRoot, ViewId};
use crate::surface::{Color, SurfaceId};

/// Default background color, a neutral gray.
pub const DEFAULT_BACKGROUND_COLOR: [f32; 4] = [0.5, 0.5, 0.5, 1.0];

/// Ids of the installed background.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Background {
    pub surface: SurfaceId,
    pub view: ViewId,
}

/// Creates the background surface for `output` and places it on top of the
/// default layer at (0, 0).
///
/// The surface covers the output's logical rectangle, is opaque over that
/// whole rectangle when `color` is opaque, starts fully damaged and is
/// forced to repaint on the first frame.
pub fn install_background(scene: &mut SceneRoot, output: &Output, color: Color) -> Result<Background, SceneError> {
    let rect = output.logical_rect();
    let surface = scene.create_surface();
    {
        let s = scene.surface_mut(surface)?;
        s.set_solid_color(color);
        s.set_size(rect.width, rect.height)?;
        if color.is_opaque() {
            s.set_opaque_region(Region::from_rect(rect))?;
        }
        s.damage();
        s.set_force_refresh(true);
    }

    let view = scene.create_view(surface)?;
    scene.set_view_position(view, 0, 0)?;
    scene.insert_view(scene.default_layer(), view, Placement::Top)?;

    let rgba: [f32; 4] = color.into();
    info!(
        output = %output.name(),
        width = rect.width,
        height = rect.height,
        color = ?rgba,
        "background installed"
    );
    Ok(Background { surface, view })
}
