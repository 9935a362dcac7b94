//! Compositor bootstrap, event loop and teardown.
//!
//! [`Bootstrap::start`] runs the startup steps strictly in dependency order:
//!
//! 1. allocate the display server and bind its listening socket,
//! 2. store the keyboard layout and initialize the configured backend,
//! 3. create the single output,
//! 4. install the background in a fresh scene,
//! 5. register the shell global,
//! 6. wire the event loop and publish `WAYLAND_DISPLAY`.
//!
//! Any failure aborts the sequence. The socket name is published last, so a
//! failed start never advertises a socket.

use std::sync::Arc;
use std::time::Duration;

use calloop::generic::Generic;
use calloop::timer::{TimeoutAction, Timer};
use calloop::{EventLoop, Interest, LoopHandle, LoopSignal, Mode, PostAction};
use novade_compositor_core::{
    install_background, BackendError, BackendSelector, OutputError, SceneRoot,
};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::display::{display_env_value, resolve_runtime_dir, DisplayServer, Environment, WAYLAND_DISPLAY_ENV};
use crate::error::CompositorError;
use crate::shell::{DefaultShellHandler, ShellBindHandler, ShellRegistrar};
use crate::state::{ClientState, CompositorState};

/// Data owned by the event loop.
///
/// Field order is drop order: the state goes before the display.
pub struct LoopData {
    pub state: CompositorState,
    pub display: DisplayServer,
}

impl LoopData {
    fn accept_clients(&mut self) {
        loop {
            match self.display.accept() {
                Ok(Some(stream)) => {
                    let client = Arc::new(ClientState::default());
                    let key = client.key();
                    match self.display.handle().insert_client(stream, client) {
                        Ok(_) => debug!(client = %key, "client accepted"),
                        Err(e) => warn!(error = %e, "failed to insert client"),
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "accept on wayland socket failed");
                    break;
                }
            }
        }
    }

    fn dispatch_clients(&mut self) {
        if let Err(e) = self.display.dispatch_clients(&mut self.state) {
            warn!(error = %e, "failed to dispatch clients");
        }
    }

    fn flush(&mut self) {
        if let Err(e) = self.display.flush_clients() {
            warn!(error = %e, "failed to flush clients");
        }
    }
}

/// Startup parameters of a compositor.
pub struct Bootstrap<'a> {
    config: &'a Config,
    backends: BackendSelector,
    shell_handler: Box<dyn ShellBindHandler>,
}

impl<'a> Bootstrap<'a> {
    /// Built-in backends and a shell handler that accepts every client.
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            backends: BackendSelector::with_builtin(),
            shell_handler: Box::new(DefaultShellHandler),
        }
    }

    pub fn with_backends(mut self, backends: BackendSelector) -> Self {
        self.backends = backends;
        self
    }

    pub fn with_shell_handler(mut self, handler: Box<dyn ShellBindHandler>) -> Self {
        self.shell_handler = handler;
        self
    }

    /// Brings the compositor up, ready to run its event loop.
    pub fn start(self, env: &mut dyn Environment) -> Result<Compositor, CompositorError> {
        let config = self.config;

        let mut display = DisplayServer::create()?;
        let runtime_dir = resolve_runtime_dir(config.socket.runtime_dir.as_deref(), env)?;
        let socket_name = display.add_socket_auto(&runtime_dir)?;
        display.set_keyboard_layout(config.keyboard.clone())?;

        let mut backend = self
            .backends
            .initialize(&config.backend, display.backend_context())?;

        let geometry = config
            .output
            .geometry()
            .map_err(|e| BackendError::Output(OutputError::Geometry(e)))?;
        let output = backend.create_output(config.output.name.as_deref(), geometry)?;

        let mut scene = SceneRoot::new();
        let background = install_background(&mut scene, &output, config.background.color)?;

        let mut shell = ShellRegistrar::new(self.shell_handler);
        shell.register(&mut display, config.shell.version)?;

        let frame_interval = output.frame_interval();
        let state = CompositorState::new(backend, output, scene, background, shell);
        let event_loop = EventLoop::try_new()?;
        insert_sources(&event_loop.handle(), &mut display, frame_interval)?;

        let published = display_env_value(&runtime_dir, &socket_name, env);
        env.set_var(WAYLAND_DISPLAY_ENV, &published);
        info!(socket = %socket_name, wayland_display = %published, "compositor ready");

        Ok(Compositor {
            event_loop,
            data: LoopData { state, display },
            socket_name,
        })
    }
}

fn insert_sources(
    handle: &LoopHandle<'static, LoopData>,
    display: &mut DisplayServer,
    frame_interval: Duration,
) -> Result<(), CompositorError> {
    if let Some(fd) = display.listening_fd()? {
        handle
            .insert_source(Generic::new(fd, Interest::READ, Mode::Level), |_, _, data| {
                data.accept_clients();
                Ok(PostAction::Continue)
            })
            .map_err(|e| e.error)?;
    }

    handle
        .insert_source(
            Generic::new(display.poll_fd()?, Interest::READ, Mode::Level),
            |_, _, data| {
                data.dispatch_clients();
                Ok(PostAction::Continue)
            },
        )
        .map_err(|e| e.error)?;

    handle
        .insert_source(Timer::from_duration(frame_interval), move |_, _, data| {
            data.state.repaint();
            TimeoutAction::ToDuration(frame_interval)
        })
        .map_err(|e| e.error)?;

    Ok(())
}

/// A started compositor.
pub struct Compositor {
    event_loop: EventLoop<'static, LoopData>,
    data: LoopData,
    socket_name: String,
}

impl Compositor {
    /// Name of the listening socket, as published in `WAYLAND_DISPLAY`.
    pub fn socket_name(&self) -> &str {
        &self.socket_name
    }

    pub fn display(&self) -> &DisplayServer {
        &self.data.display
    }

    pub fn state(&self) -> &CompositorState {
        &self.data.state
    }

    pub fn state_mut(&mut self) -> &mut CompositorState {
        &mut self.data.state
    }

    /// Handle that stops [`Compositor::run`] from any thread.
    pub fn loop_signal(&self) -> LoopSignal {
        self.event_loop.get_signal()
    }

    /// Runs one iteration of the event loop, then flushes the clients.
    pub fn dispatch(&mut self, timeout: Option<Duration>) -> Result<(), CompositorError> {
        self.event_loop.dispatch(timeout, &mut self.data)?;
        self.data.flush();
        Ok(())
    }

    /// Runs the event loop until stopped through [`Compositor::loop_signal`],
    /// then shuts down.
    pub fn run(mut self) -> Result<(), CompositorError> {
        info!(socket = %self.socket_name, "entering event loop");
        let result = self.event_loop.run(None, &mut self.data, |data| data.flush());
        if let Err(e) = &result {
            error!(error = %e, "event loop failed");
        }
        self.shutdown();
        result.map_err(CompositorError::from)
    }

    /// Tears down in order: shell global, scene, output, display.
    pub fn shutdown(self) {
        let Compositor {
            event_loop,
            data,
            socket_name,
        } = self;
        drop(event_loop);
        let LoopData { mut state, mut display } = data;

        if state.shell.is_registered() {
            if let Err(e) = state.shell.unregister(&mut display) {
                warn!(error = %e, "failed to withdraw shell global");
            }
        }
        state.scene.clear();
        state.backend.destroy_output(&state.output);
        drop(state);
        drop(display);
        info!(socket = %socket_name, "compositor shut down");
    }
}
