//! Headless backend: virtual outputs, no display device.
//!
//! Used for nested testing and CI. It accepts both rendering modes, keeps
//! virtual outputs at 60 Hz and, on every frame, walks the scene in paint
//! order and consumes the damage of the surfaces that need a repaint. It
//! never rasterizes anything.

use std::collections::HashSet;

use tracing::{debug, info, trace};

use super::{Backend, BackendConfig, BackendContext, FrameReport, RenderingMode};
use crate::error::{BackendError, OutputError};
use crate::output::{Output, OutputGeometry, DEFAULT_REFRESH_MHZ};
use crate::scene::SceneRoot;
use crate::surface::SurfaceId;

#[derive(Debug, Default)]
pub struct HeadlessBackend {
    rendering_mode: Option<RenderingMode>,
    frames: u64,
}

impl HeadlessBackend {
    pub const NAME: &'static str = "headless";

    pub fn new() -> Self {
        Self::default()
    }

    /// Frames painted so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn rendering_mode(&self) -> Option<RenderingMode> {
        self.rendering_mode
    }
}

impl Backend for HeadlessBackend {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn init(&mut self, ctx: &BackendContext<'_>, config: &BackendConfig) -> Result<(), BackendError> {
        if config.input_enabled {
            // No devices to read from; the layout is only recorded.
            debug!(layout = ?ctx.keyboard_layout.and_then(|l| l.layout()), "headless backend has no input devices");
        }
        self.rendering_mode = Some(config.rendering_mode);
        info!(rendering_mode = %config.rendering_mode, "headless backend ready");
        Ok(())
    }

    fn create_output(&mut self, name: &str, geometry: OutputGeometry) -> Result<Output, BackendError> {
        if self.rendering_mode.is_none() {
            return Err(BackendError::Initialization {
                name: Self::NAME.to_string(),
                reason: "create_output called before init".to_string(),
            });
        }
        Output::new(name, geometry, DEFAULT_REFRESH_MHZ)
            .map_err(|e| BackendError::Output(OutputError::Geometry(e)))
    }

    fn repaint(&mut self, output: &Output, scene: &mut SceneRoot) -> Result<FrameReport, BackendError> {
        let order = scene.render_order();
        let mut report = FrameReport {
            views: order.len(),
            ..FrameReport::default()
        };
        let mut pending: HashSet<SurfaceId> = scene.surfaces_needing_repaint().into_iter().collect();
        for view_id in order {
            if pending.is_empty() {
                break;
            }
            let surface_id = scene
                .view(view_id)
                .map_err(|e| BackendError::Frame {
                    output: output.name().to_string(),
                    reason: e.to_string(),
                })?
                .surface();
            // A surface shown by several views is repainted once.
            if !pending.remove(&surface_id) {
                continue;
            }
            let surface = scene.surface_mut(surface_id).map_err(|e| BackendError::Frame {
                output: output.name().to_string(),
                reason: e.to_string(),
            })?;
            report.damaged_area += surface.take_damage().area();
            report.repainted.push(surface_id);
        }
        self.frames += 1;
        trace!(frame = self.frames, output = %output.name(), "headless frame");
        Ok(report)
    }
}
