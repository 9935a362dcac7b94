//! Compositor state handed to every protocol handler.

use novade_compositor_core::{ActiveBackend, Background, FrameReport, Output, SceneRoot};
use tracing::{debug, error};
use wayland_server::backend::{ClientData, ClientId, DisconnectReason};

use crate::shell::{ClientKey, ShellRegistrar};

/// Everything the event loop mutates, apart from the display itself.
#[derive(Debug)]
pub struct CompositorState {
    pub backend: ActiveBackend,
    pub output: Output,
    pub scene: SceneRoot,
    pub background: Background,
    pub shell: ShellRegistrar,
    frames: u64,
}

impl CompositorState {
    pub fn new(
        backend: ActiveBackend,
        output: Output,
        scene: SceneRoot,
        background: Background,
        shell: ShellRegistrar,
    ) -> Self {
        Self {
            backend,
            output,
            scene,
            background,
            shell,
            frames: 0,
        }
    }

    /// Paints one frame. Backend failures are logged and the next frame is
    /// attempted as usual.
    pub fn repaint(&mut self) -> Option<FrameReport> {
        self.frames += 1;
        match self.backend.repaint(&self.output, &mut self.scene) {
            Ok(report) => Some(report),
            Err(e) => {
                error!(output = %self.output.name(), frame = self.frames, error = %e, "frame failed");
                None
            }
        }
    }

    /// Frame ticks seen so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

/// Per-connection data attached to every client.
#[derive(Debug)]
pub struct ClientState {
    key: ClientKey,
}

impl Default for ClientState {
    fn default() -> Self {
        Self {
            key: ClientKey::new_unique(),
        }
    }
}

impl ClientState {
    pub fn key(&self) -> ClientKey {
        self.key
    }
}

impl ClientData for ClientState {
    fn initialized(&self, client_id: ClientId) {
        debug!(client = %self.key, ?client_id, "client connected");
    }

    fn disconnected(&self, client_id: ClientId, reason: DisconnectReason) {
        debug!(client = %self.key, ?client_id, ?reason, "client disconnected");
    }
}
