//! The scene graph: layers of views referencing surfaces.
//!
//! `SceneRoot` owns every surface, view and layer. Layers are kept sorted by
//! descending position, so the first layer is painted on top; inside a layer
//! the first view is on top. A view only references its surface by id and is
//! destroyed together with it.
//!
//! The scene is mutated from the event-loop thread only and is therefore not
//! `Sync`-guarded.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, trace};

use crate::error::SceneError;
use crate::surface::{Surface, SurfaceId};

/// Stacking position of the layer for normal application content.
pub const LAYER_POSITION_NORMAL: u32 = 0x5000_0000;
/// Name of the default layer created with every scene.
pub const DEFAULT_LAYER_NAME: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewId(u64);

fn next_id() -> u64 {
    static NEXT_ID: AtomicU64 = AtomicU64::new(1);
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Where a view goes inside its layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// First in the list, painted above the other views.
    Top,
    /// Last in the list, painted below the other views.
    Bottom,
}

/// A positioned reference to a surface.
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    id: ViewId,
    surface: SurfaceId,
    x: i32,
    y: i32,
    layer: Option<LayerId>,
}

impl View {
    pub fn id(&self) -> ViewId {
        self.id
    }

    pub fn surface(&self) -> SurfaceId {
        self.surface
    }

    /// Position in output coordinates.
    pub fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    pub fn layer(&self) -> Option<LayerId> {
        self.layer
    }
}

#[derive(Debug, Clone)]
struct Layer {
    id: LayerId,
    name: String,
    position: u32,
    views: Vec<ViewId>,
}

#[derive(Debug)]
pub struct SceneRoot {
    layers: Vec<Layer>,
    surfaces: HashMap<SurfaceId, Surface>,
    views: HashMap<ViewId, View>,
    default_layer: LayerId,
}

impl Default for SceneRoot {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneRoot {
    /// Creates a scene holding only the empty default layer.
    pub fn new() -> Self {
        let mut scene = Self {
            layers: Vec::new(),
            surfaces: HashMap::new(),
            views: HashMap::new(),
            default_layer: LayerId(0),
        };
        scene.default_layer = scene.add_layer(DEFAULT_LAYER_NAME, LAYER_POSITION_NORMAL);
        scene
    }

    pub fn default_layer(&self) -> LayerId {
        self.default_layer
    }

    /// Adds a layer. Layers with equal positions keep insertion order.
    pub fn add_layer(&mut self, name: impl Into<String>, position: u32) -> LayerId {
        let id = LayerId(next_id());
        let index = self
            .layers
            .iter()
            .position(|l| l.position < position)
            .unwrap_or(self.layers.len());
        let name = name.into();
        debug!(?id, %name, position, "adding scene layer");
        self.layers.insert(index, Layer { id, name, position, views: Vec::new() });
        id
    }

    /// Layer ids, top first.
    pub fn layers(&self) -> Vec<LayerId> {
        self.layers.iter().map(|l| l.id).collect()
    }

    pub fn layer_name(&self, layer: LayerId) -> Option<&str> {
        self.layer(layer).ok().map(|l| l.name.as_str())
    }

    /// Views of a layer, top first.
    pub fn layer_views(&self, layer: LayerId) -> Result<&[ViewId], SceneError> {
        Ok(&self.layer(layer)?.views)
    }

    pub fn create_surface(&mut self) -> SurfaceId {
        let surface = Surface::new();
        let id = surface.id();
        trace!(surface = ?id, "surface created");
        self.surfaces.insert(id, surface);
        id
    }

    pub fn surface(&self, id: SurfaceId) -> Result<&Surface, SceneError> {
        self.surfaces.get(&id).ok_or(SceneError::UnknownSurface(id))
    }

    pub fn surface_mut(&mut self, id: SurfaceId) -> Result<&mut Surface, SceneError> {
        self.surfaces.get_mut(&id).ok_or(SceneError::UnknownSurface(id))
    }

    /// Destroys a surface and every view showing it.
    pub fn destroy_surface(&mut self, id: SurfaceId) -> Result<(), SceneError> {
        self.surfaces.remove(&id).ok_or(SceneError::UnknownSurface(id))?;
        let orphaned: Vec<ViewId> = self
            .views
            .values()
            .filter(|v| v.surface == id)
            .map(|v| v.id)
            .collect();
        for view in orphaned {
            self.destroy_view(view)?;
        }
        Ok(())
    }

    /// Creates an unplaced view of `surface` at (0, 0).
    pub fn create_view(&mut self, surface: SurfaceId) -> Result<ViewId, SceneError> {
        if !self.surfaces.contains_key(&surface) {
            return Err(SceneError::UnknownSurface(surface));
        }
        let id = ViewId(next_id());
        self.views.insert(id, View { id, surface, x: 0, y: 0, layer: None });
        Ok(id)
    }

    pub fn view(&self, id: ViewId) -> Result<&View, SceneError> {
        self.views.get(&id).ok_or(SceneError::UnknownView(id))
    }

    /// Views showing `surface`.
    pub fn views_of(&self, surface: SurfaceId) -> Vec<ViewId> {
        self.views
            .values()
            .filter(|v| v.surface == surface)
            .map(|v| v.id)
            .collect()
    }

    pub fn set_view_position(&mut self, id: ViewId, x: i32, y: i32) -> Result<(), SceneError> {
        let view = self.views.get_mut(&id).ok_or(SceneError::UnknownView(id))?;
        view.x = x;
        view.y = y;
        Ok(())
    }

    /// Inserts a view into a layer, moving it out of its previous layer.
    pub fn insert_view(&mut self, layer: LayerId, view: ViewId, placement: Placement) -> Result<(), SceneError> {
        let previous = self.view(view)?.layer;
        self.layer(layer)?;
        if let Some(previous) = previous {
            self.layer_mut(previous)?.views.retain(|v| *v != view);
        }
        let target = self.layer_mut(layer)?;
        match placement {
            Placement::Top => target.views.insert(0, view),
            Placement::Bottom => target.views.push(view),
        }
        if let Some(v) = self.views.get_mut(&view) {
            v.layer = Some(layer);
        }
        Ok(())
    }

    pub fn destroy_view(&mut self, id: ViewId) -> Result<(), SceneError> {
        let view = self.views.remove(&id).ok_or(SceneError::UnknownView(id))?;
        if let Some(layer) = view.layer {
            self.layer_mut(layer)?.views.retain(|v| *v != id);
        }
        Ok(())
    }

    /// Every placed view in paint order from top to bottom: layer order
    /// first, then order inside the layer.
    pub fn render_order(&self) -> Vec<ViewId> {
        self.layers.iter().flat_map(|l| l.views.iter().copied()).collect()
    }

    /// Surfaces with damage or a forced refresh pending.
    pub fn surfaces_needing_repaint(&self) -> Vec<SurfaceId> {
        let mut ids: Vec<SurfaceId> = self
            .surfaces
            .values()
            .filter(|s| s.needs_repaint())
            .map(Surface::id)
            .collect();
        ids.sort();
        ids
    }

    /// Drops all views and surfaces. Layers stay, empty.
    pub fn clear(&mut self) {
        for layer in &mut self.layers {
            layer.views.clear();
        }
        self.views.clear();
        self.surfaces.clear();
    }

    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    fn layer(&self, id: LayerId) -> Result<&Layer, SceneError> {
        self.layers.iter().find(|l| l.id == id).ok_or(SceneError::UnknownLayer(id))
    }

    fn layer_mut(&mut self, id: LayerId) -> Result<&mut Layer, SceneError> {
        self.layers
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or(SceneError::UnknownLayer(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_scene_has_empty_default_layer() {
        let scene = SceneRoot::new();
        assert_eq!(scene.layers(), vec![scene.default_layer()]);
        assert_eq!(scene.layer_name(scene.default_layer()), Some(DEFAULT_LAYER_NAME));
        assert!(scene.layer_views(scene.default_layer()).unwrap().is_empty());
    }

    #[test]
    fn test_layers_sorted_top_first() {
        let mut scene = SceneRoot::new();
        let background = scene.add_layer("background", 0x0000_0002);
        let cursor = scene.add_layer("cursor", 0xffff_fffe);
        assert_eq!(scene.layers(), vec![cursor, scene.default_layer(), background]);
    }

    #[test]
    fn test_default_layer_precedes_later_layers_at_same_position() {
        let mut scene = SceneRoot::new();
        let normal = scene.add_layer("windows", LAYER_POSITION_NORMAL);
        assert_ne!(normal, scene.default_layer());
        assert_eq!(scene.layers(), vec![scene.default_layer(), normal]);
    }

    #[test]
    fn test_insert_top_and_bottom() {
        let mut scene = SceneRoot::new();
        let layer = scene.default_layer();
        let s = scene.create_surface();
        let a = scene.create_view(s).unwrap();
        let b = scene.create_view(s).unwrap();
        let c = scene.create_view(s).unwrap();
        scene.insert_view(layer, a, Placement::Top).unwrap();
        scene.insert_view(layer, b, Placement::Top).unwrap();
        scene.insert_view(layer, c, Placement::Bottom).unwrap();
        assert_eq!(scene.layer_views(layer).unwrap(), &[b, a, c]);
    }

    #[test]
    fn test_reinsert_moves_view_between_layers() {
        let mut scene = SceneRoot::new();
        let top = scene.add_layer("ui", LAYER_POSITION_NORMAL + 1);
        let s = scene.create_surface();
        let v = scene.create_view(s).unwrap();
        scene.insert_view(scene.default_layer(), v, Placement::Top).unwrap();
        scene.insert_view(top, v, Placement::Top).unwrap();
        assert!(scene.layer_views(scene.default_layer()).unwrap().is_empty());
        assert_eq!(scene.layer_views(top).unwrap(), &[v]);
        assert_eq!(scene.view(v).unwrap().layer(), Some(top));
    }

    #[test]
    fn test_render_order_follows_layers_then_views() {
        let mut scene = SceneRoot::new();
        let bottom = scene.add_layer("background", 1);
        let s = scene.create_surface();
        let backdrop = scene.create_view(s).unwrap();
        let window = scene.create_view(s).unwrap();
        scene.insert_view(bottom, backdrop, Placement::Top).unwrap();
        scene.insert_view(scene.default_layer(), window, Placement::Top).unwrap();
        assert_eq!(scene.render_order(), vec![window, backdrop]);
    }

    #[test]
    fn test_surface_with_many_views_and_cascade_destroy() {
        let mut scene = SceneRoot::new();
        let s = scene.create_surface();
        let other = scene.create_surface();
        let v1 = scene.create_view(s).unwrap();
        let v2 = scene.create_view(s).unwrap();
        let keep = scene.create_view(other).unwrap();
        scene.insert_view(scene.default_layer(), v1, Placement::Top).unwrap();
        scene.insert_view(scene.default_layer(), keep, Placement::Top).unwrap();
        assert_eq!(scene.views_of(s).len(), 2);

        scene.destroy_surface(s).unwrap();
        assert!(scene.view(v1).is_err());
        assert!(scene.view(v2).is_err());
        assert_eq!(scene.render_order(), vec![keep]);
        assert_eq!(scene.view_count(), 1);
    }

    #[test]
    fn test_unknown_ids_are_errors() {
        let mut scene = SceneRoot::new();
        let ghost = SurfaceId::new_unique();
        assert_eq!(scene.create_view(ghost), Err(SceneError::UnknownSurface(ghost)));
        let s = scene.create_surface();
        let v = scene.create_view(s).unwrap();
        scene.destroy_view(v).unwrap();
        assert_eq!(scene.set_view_position(v, 1, 1), Err(SceneError::UnknownView(v)));
    }

    #[test]
    fn test_surfaces_needing_repaint() {
        let mut scene = SceneRoot::new();
        let _clean = scene.create_surface();
        let dirty = scene.create_surface();
        scene.surface_mut(dirty).unwrap().set_size(4, 4).unwrap();
        scene.surface_mut(dirty).unwrap().damage();
        assert_eq!(scene.surfaces_needing_repaint(), vec![dirty]);
        scene.surface_mut(dirty).unwrap().take_damage();
        assert!(scene.surfaces_needing_repaint().is_empty());
    }

    #[test]
    fn test_clear_keeps_layers() {
        let mut scene = SceneRoot::new();
        let s = scene.create_surface();
        let v = scene.create_view(s).unwrap();
        scene.insert_view(scene.default_layer(), v, Placement::Top).unwrap();
        scene.clear();
        assert_eq!(scene.surface_count(), 0);
        assert_eq!(scene.view_count(), 0);
        assert_eq!(scene.layers().len(), 1);
        assert!(scene.render_order().is_empty());
    }
}
