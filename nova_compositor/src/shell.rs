//! Shell global registrar and client sessions.
//!
//! The registrar advertises `xdg_wm_base` once and, for every client bind,
//! asks its [`ShellBindHandler`] for a [`ShellSession`]. Sessions are
//! independent of each other: a rejected bind or an ended session leaves
//! every other session untouched.
//!
//! ```text
//! Unregistered --register()--> Registered --bind()--> (one session per bind)
//!      ^                            |
//!      +--------unregister()--------+
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info, warn};
use wayland_protocols::xdg::shell::server::xdg_wm_base::XdgWmBase;
use wayland_server::Resource;

use crate::display::DisplayServer;
use crate::error::{SessionError, ShellError};
use crate::protocols::xdg_shell::ShellGlobalData;

/// Interface name of the shell global.
pub const SHELL_INTERFACE: &str = "xdg_wm_base";

/// Identifies a connected client for the lifetime of its connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientKey(u64);

impl ClientKey {
    pub fn new_unique() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        ClientKey(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn from_raw(raw: u64) -> Self {
        ClientKey(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client#{}", self.0)
    }
}

/// Key of a session inside the registrar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionKey(u64);

#[cfg(test)]
impl SessionKey {
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

/// Per-bind state of a client's shell object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellSession {
    client: ClientKey,
    object_id: u32,
    version: u32,
    last_pong: Option<u32>,
    positioners: u32,
}

impl ShellSession {
    pub fn new(client: ClientKey, object_id: u32, version: u32) -> Self {
        Self {
            client,
            object_id,
            version,
            last_pong: None,
            positioners: 0,
        }
    }

    pub fn client(&self) -> ClientKey {
        self.client
    }

    /// Protocol id of the client's `xdg_wm_base` object.
    pub fn object_id(&self) -> u32 {
        self.object_id
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn last_pong(&self) -> Option<u32> {
        self.last_pong
    }

    pub fn record_pong(&mut self, serial: u32) {
        self.last_pong = Some(serial);
    }

    /// Positioners created through this session.
    pub fn positioners(&self) -> u32 {
        self.positioners
    }

    pub fn add_positioner(&mut self) {
        self.positioners += 1;
    }
}

/// Builds the session for a client bind.
pub trait ShellBindHandler {
    fn on_bind(&mut self, client: ClientKey, id: u32, version: u32) -> Result<ShellSession, SessionError>;
}

/// Accepts every bind.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultShellHandler;

impl ShellBindHandler for DefaultShellHandler {
    fn on_bind(&mut self, client: ClientKey, id: u32, version: u32) -> Result<ShellSession, SessionError> {
        Ok(ShellSession::new(client, id, version))
    }
}

impl<F> ShellBindHandler for F
where
    F: FnMut(ClientKey, u32, u32) -> Result<ShellSession, SessionError>,
{
    fn on_bind(&mut self, client: ClientKey, id: u32, version: u32) -> Result<ShellSession, SessionError> {
        self(client, id, version)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Registration {
    Unregistered,
    Registered { version: u32 },
}

pub struct ShellRegistrar {
    registration: Registration,
    handler: Box<dyn ShellBindHandler>,
    sessions: BTreeMap<SessionKey, ShellSession>,
    next_session: u64,
}

impl fmt::Debug for ShellRegistrar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShellRegistrar")
            .field("registration", &self.registration)
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}

impl Default for ShellRegistrar {
    fn default() -> Self {
        Self::new(Box::new(DefaultShellHandler))
    }
}

impl ShellRegistrar {
    pub fn new(handler: Box<dyn ShellBindHandler>) -> Self {
        Self {
            registration: Registration::Unregistered,
            handler,
            sessions: BTreeMap::new(),
            next_session: 1,
        }
    }

    /// Highest `xdg_wm_base` version the protocol bindings know.
    pub fn max_version() -> u32 {
        XdgWmBase::interface().version
    }

    pub fn is_registered(&self) -> bool {
        matches!(self.registration, Registration::Registered { .. })
    }

    /// Advertised version, once registered.
    pub fn version(&self) -> Option<u32> {
        match self.registration {
            Registration::Registered { version } => Some(version),
            Registration::Unregistered => None,
        }
    }

    /// Advertises the shell global on `display`.
    pub fn register(&mut self, display: &mut DisplayServer, version: u32) -> Result<(), ShellError> {
        if let Registration::Registered { version } = self.registration {
            return Err(ShellError::AlreadyRegistered { version });
        }
        let max = Self::max_version();
        if version == 0 || version > max {
            return Err(ShellError::UnsupportedVersion {
                interface: SHELL_INTERFACE,
                requested: version,
                max,
            });
        }
        display.advertise_global::<XdgWmBase, _>(version, ShellGlobalData)?;
        self.registration = Registration::Registered { version };
        info!(interface = SHELL_INTERFACE, version, "shell global registered");
        Ok(())
    }

    /// Withdraws the global. Existing sessions stay until their clients
    /// destroy them.
    pub fn unregister(&mut self, display: &mut DisplayServer) -> Result<(), ShellError> {
        if !self.is_registered() {
            return Err(ShellError::NotRegistered);
        }
        display.remove_global(SHELL_INTERFACE)?;
        self.registration = Registration::Unregistered;
        debug!(sessions = self.sessions.len(), "shell global withdrawn");
        Ok(())
    }

    /// Runs the bind handler for a client and stores the new session.
    pub fn bind(&mut self, client: ClientKey, id: u32, version: u32) -> Result<SessionKey, ShellError> {
        let Registration::Registered { version: advertised } = self.registration else {
            return Err(ShellError::NotRegistered);
        };
        if version > advertised {
            return Err(SessionError::VersionMismatch {
                client,
                version,
                advertised,
            }
            .into());
        }
        match self.handler.on_bind(client, id, version) {
            Ok(session) => {
                let key = SessionKey(self.next_session);
                self.next_session += 1;
                debug!(%client, id, version, ?key, "shell session started");
                self.sessions.insert(key, session);
                Ok(key)
            }
            Err(e) => {
                warn!(%client, id, error = %e, "shell bind rejected");
                Err(e.into())
            }
        }
    }

    /// Ends one session; the others are unaffected.
    pub fn end_session(&mut self, key: SessionKey) -> Option<ShellSession> {
        let session = self.sessions.remove(&key);
        if let Some(s) = &session {
            debug!(client = %s.client(), id = s.object_id(), ?key, "shell session ended");
        }
        session
    }

    pub fn session(&self, key: SessionKey) -> Option<&ShellSession> {
        self.sessions.get(&key)
    }

    pub fn session_mut(&mut self, key: SessionKey) -> Option<&mut ShellSession> {
        self.sessions.get_mut(&key)
    }

    /// Sessions in creation order.
    pub fn sessions(&self) -> impl Iterator<Item = (SessionKey, &ShellSession)> {
        self.sessions.iter().map(|(k, s)| (*k, s))
    }

    pub fn sessions_of(&self, client: ClientKey) -> Vec<SessionKey> {
        self.sessions
            .iter()
            .filter(|(_, s)| s.client == client)
            .map(|(k, _)| *k)
            .collect()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}
