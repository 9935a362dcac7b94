//! The display server handle.
//!
//! [`DisplayServer`] owns the wayland-server [`Display`], the client
//! listening socket, the table of advertised globals and the keyboard
//! layout. It is an ordinary value: nothing in this crate keeps it in a
//! global, so a process (or a test) may run several of them.

use std::collections::HashMap;
use std::io;
use std::os::fd::{AsFd, OwnedFd};
use std::path::{Path, PathBuf};

use novade_compositor_core::{BackendContext, KeyboardLayout};
use once_cell::unsync::OnceCell;
use tracing::{debug, info, trace};
use wayland_server::backend::GlobalId;
use wayland_server::{BindError, Display, DisplayHandle, GlobalDispatch, ListeningSocket, Resource};

use crate::error::DisplayError;
use crate::state::CompositorState;

/// Environment variable through which clients find the socket.
pub const WAYLAND_DISPLAY_ENV: &str = "WAYLAND_DISPLAY";
/// Environment variable naming the default socket directory.
pub const XDG_RUNTIME_DIR_ENV: &str = "XDG_RUNTIME_DIR";

/// Socket names tried by [`DisplayServer::add_socket_auto`]: `wayland-1`
/// up to `wayland-32`.
const SOCKET_NAME_PREFIX: &str = "wayland";
const SOCKET_SUFFIXES: std::ops::RangeInclusive<u32> = 1..=32;

/// Process environment as seen by the compositor.
pub trait Environment {
    fn var(&self, key: &str) -> Option<String>;
    fn set_var(&mut self, key: &str, value: &str);
}

/// The real process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }

    fn set_var(&mut self, key: &str, value: &str) {
        std::env::set_var(key, value);
    }
}

/// Picks the socket directory: the configured one, else `$XDG_RUNTIME_DIR`.
pub fn resolve_runtime_dir(configured: Option<&Path>, env: &dyn Environment) -> Result<PathBuf, DisplayError> {
    if let Some(dir) = configured {
        return Ok(dir.to_path_buf());
    }
    env.var(XDG_RUNTIME_DIR_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .ok_or(DisplayError::RuntimeDirNotSet)
}

/// Value to publish as `WAYLAND_DISPLAY` for a socket bound in `runtime_dir`.
///
/// Clients resolve a bare name against `$XDG_RUNTIME_DIR`, so the bare name
/// is only published when the socket lives there; otherwise the absolute
/// socket path is.
pub fn display_env_value(runtime_dir: &Path, socket_name: &str, env: &dyn Environment) -> String {
    let canonical = |p: &Path| p.canonicalize().unwrap_or_else(|_| p.to_path_buf());
    let bound_in = canonical(runtime_dir);
    let in_xdg_dir = env
        .var(XDG_RUNTIME_DIR_ENV)
        .filter(|v| !v.is_empty())
        .is_some_and(|xdg| canonical(Path::new(&xdg)) == bound_in);
    if in_xdg_dir {
        socket_name.to_string()
    } else {
        bound_in.join(socket_name).to_string_lossy().into_owned()
    }
}

#[derive(Debug)]
struct AdvertisedGlobal {
    id: GlobalId,
    version: u32,
}

pub struct DisplayServer {
    display: Display<CompositorState>,
    socket: Option<(ListeningSocket, String)>,
    globals: HashMap<&'static str, AdvertisedGlobal>,
    keyboard_layout: OnceCell<KeyboardLayout>,
}

impl std::fmt::Debug for DisplayServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplayServer")
            .field("socket", &self.socket_name())
            .field("globals", &self.globals)
            .field("keyboard_layout", &self.keyboard_layout.get())
            .finish()
    }
}

impl DisplayServer {
    /// Allocates a server without any socket or global.
    pub fn create() -> Result<Self, DisplayError> {
        let display = Display::new().map_err(|e| DisplayError::Create(e.to_string()))?;
        debug!("display server created");
        Ok(Self {
            display,
            socket: None,
            globals: HashMap::new(),
            keyboard_layout: OnceCell::new(),
        })
    }

    pub fn handle(&self) -> DisplayHandle {
        self.display.handle()
    }

    /// Binds the first free `wayland-N` socket in `runtime_dir` and returns
    /// its name. Calling it again returns the name already bound.
    pub fn add_socket_auto(&mut self, runtime_dir: &Path) -> Result<String, DisplayError> {
        if let Some((_, name)) = &self.socket {
            return Ok(name.clone());
        }
        for suffix in SOCKET_SUFFIXES {
            let name = format!("{SOCKET_NAME_PREFIX}-{suffix}");
            let path = runtime_dir.join(&name);
            match ListeningSocket::bind_absolute(path.clone()) {
                Ok(socket) => {
                    info!(socket = %name, dir = %runtime_dir.display(), "listening on wayland socket");
                    self.socket = Some((socket, name.clone()));
                    return Ok(name);
                }
                Err(BindError::AlreadyInUse) => {
                    trace!(socket = %name, "socket name in use");
                }
                Err(source) => return Err(DisplayError::SocketBind { path, source }),
            }
        }
        Err(DisplayError::NoFreeSocket {
            dir: runtime_dir.to_path_buf(),
        })
    }

    pub fn socket_name(&self) -> Option<&str> {
        self.socket.as_ref().map(|(_, name)| name.as_str())
    }

    /// Accepts one pending connection, if any.
    pub fn accept(&self) -> io::Result<Option<std::os::unix::net::UnixStream>> {
        match &self.socket {
            Some((socket, _)) => socket.accept(),
            None => Ok(None),
        }
    }

    /// Duplicate of the listening socket fd, for the event loop.
    pub(crate) fn listening_fd(&self) -> io::Result<Option<OwnedFd>> {
        self.socket
            .as_ref()
            .map(|(socket, _)| socket.as_fd().try_clone_to_owned())
            .transpose()
    }

    /// Duplicate of the fd signalling pending client requests.
    pub(crate) fn poll_fd(&mut self) -> io::Result<OwnedFd> {
        self.display.backend().poll_fd().try_clone_to_owned()
    }

    /// Processes pending client requests.
    pub fn dispatch_clients(&mut self, state: &mut CompositorState) -> io::Result<usize> {
        self.display.dispatch_clients(state)
    }

    /// Sends queued events to every client.
    pub fn flush_clients(&mut self) -> io::Result<()> {
        self.display.flush_clients()
    }

    /// Stores the keyboard layout. Write-once.
    pub fn set_keyboard_layout(&self, layout: KeyboardLayout) -> Result<(), DisplayError> {
        debug!(?layout, "keyboard layout set");
        self.keyboard_layout
            .set(layout)
            .map_err(|_| DisplayError::KeyboardLayoutAlreadySet)
    }

    pub fn keyboard_layout(&self) -> Option<&KeyboardLayout> {
        self.keyboard_layout.get()
    }

    /// What a backend gets to see of this server.
    pub fn backend_context(&self) -> BackendContext<'_> {
        BackendContext {
            keyboard_layout: self.keyboard_layout.get(),
        }
    }

    /// Creates a global for interface `I`. An interface is advertised at
    /// most once per server.
    pub fn advertise_global<I, U>(&mut self, version: u32, data: U) -> Result<GlobalId, DisplayError>
    where
        I: Resource + 'static,
        U: Send + Sync + 'static,
        CompositorState: GlobalDispatch<I, U>,
    {
        let interface = I::interface().name;
        if self.globals.contains_key(interface) {
            return Err(DisplayError::GlobalCollision {
                interface: interface.to_string(),
            });
        }
        let id = self.display.handle().create_global::<CompositorState, I, U>(version, data);
        info!(interface, version, "global advertised");
        self.globals.insert(interface, AdvertisedGlobal { id: id.clone(), version });
        Ok(id)
    }

    /// Withdraws the global advertised for `interface`.
    pub fn remove_global(&mut self, interface: &str) -> Result<(), DisplayError> {
        let global = self
            .globals
            .remove(interface)
            .ok_or_else(|| DisplayError::UnknownGlobal {
                interface: interface.to_string(),
            })?;
        self.display.handle().remove_global::<CompositorState>(global.id);
        info!(interface, "global removed");
        Ok(())
    }

    /// Advertised version of `interface`.
    pub fn global_version(&self, interface: &str) -> Option<u32> {
        self.globals.get(interface).map(|g| g.version)
    }

    /// Names of the advertised interfaces, sorted.
    pub fn globals(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.globals.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;
    use tempfile::TempDir;
    use wayland_protocols::xdg::shell::server::xdg_wm_base::XdgWmBase;

    use crate::protocols::xdg_shell::ShellGlobalData;

    #[derive(Default)]
    struct FakeEnv(Map<String, String>);

    impl Environment for FakeEnv {
        fn var(&self, key: &str) -> Option<String> {
            self.0.get(key).cloned()
        }

        fn set_var(&mut self, key: &str, value: &str) {
            self.0.insert(key.to_string(), value.to_string());
        }
    }

    #[test]
    fn test_runtime_dir_resolution() {
        let mut env = FakeEnv::default();
        assert!(matches!(
            resolve_runtime_dir(None, &env),
            Err(DisplayError::RuntimeDirNotSet)
        ));
        env.set_var(XDG_RUNTIME_DIR_ENV, "/run/user/1000");
        assert_eq!(resolve_runtime_dir(None, &env).unwrap(), PathBuf::from("/run/user/1000"));
        assert_eq!(
            resolve_runtime_dir(Some(Path::new("/tmp/x")), &env).unwrap(),
            PathBuf::from("/tmp/x")
        );
    }

    #[test]
    fn test_display_env_value_is_bare_only_in_xdg_runtime_dir() {
        let xdg = TempDir::new().unwrap();
        let other = TempDir::new().unwrap();
        let mut env = FakeEnv::default();
        env.set_var(XDG_RUNTIME_DIR_ENV, xdg.path().to_str().unwrap());

        assert_eq!(display_env_value(xdg.path(), "wayland-3", &env), "wayland-3");
        let published = display_env_value(other.path(), "wayland-3", &env);
        assert_eq!(
            PathBuf::from(published),
            other.path().canonicalize().unwrap().join("wayland-3")
        );
    }

    #[test]
    fn test_add_socket_auto_skips_names_in_use() {
        let dir = TempDir::new().unwrap();
        let mut first = DisplayServer::create().unwrap();
        let mut second = DisplayServer::create().unwrap();
        assert_eq!(first.add_socket_auto(dir.path()).unwrap(), "wayland-1");
        assert_eq!(second.add_socket_auto(dir.path()).unwrap(), "wayland-2");
        assert_eq!(first.add_socket_auto(dir.path()).unwrap(), "wayland-1");
        assert!(dir.path().join("wayland-2").exists());
    }

    #[test]
    fn test_keyboard_layout_is_write_once() {
        let server = DisplayServer::create().unwrap();
        assert!(server.backend_context().keyboard_layout.is_none());
        server.set_keyboard_layout(KeyboardLayout::default()).unwrap();
        assert!(matches!(
            server.set_keyboard_layout(KeyboardLayout::default()),
            Err(DisplayError::KeyboardLayoutAlreadySet)
        ));
        assert_eq!(server.backend_context().keyboard_layout.and_then(|l| l.layout()), Some("us"));
    }

    #[test]
    fn test_global_collision() {
        let mut server = DisplayServer::create().unwrap();
        server.advertise_global::<XdgWmBase, _>(1, ShellGlobalData).unwrap();
        let err = server.advertise_global::<XdgWmBase, _>(2, ShellGlobalData).unwrap_err();
        assert!(matches!(err, DisplayError::GlobalCollision { ref interface } if interface == "xdg_wm_base"));
        assert_eq!(server.global_version("xdg_wm_base"), Some(1));

        server.remove_global("xdg_wm_base").unwrap();
        assert!(server.globals().is_empty());
        assert!(server.remove_global("xdg_wm_base").is_err());
    }

    #[test]
    fn test_independent_instances() {
        let a = DisplayServer::create().unwrap();
        let b = DisplayServer::create().unwrap();
        a.set_keyboard_layout(KeyboardLayout::default()).unwrap();
        assert!(b.keyboard_layout().is_none());
    }
}
