//! `xdg_wm_base` and `xdg_positioner` request handling.
//!
//! Binding the global goes through [`ShellRegistrar::bind`]; the resulting
//! session key is stored in the resource's user data so that later requests
//! and the destruction of the object find their session again. A rejected
//! bind disconnects that client only, with an `implementation` error on its
//! `wl_display`.
//!
//! [`ShellRegistrar::bind`]: crate::shell::ShellRegistrar::bind

use once_cell::sync::OnceCell;
use tracing::{debug, trace, warn};
use wayland_protocols::xdg::shell::server::{xdg_positioner, xdg_surface, xdg_wm_base};
use wayland_server::backend::protocol::ProtocolError;
use wayland_server::backend::ClientId;
use wayland_server::{Client, DataInit, Dispatch, DisplayHandle, GlobalDispatch, New, Resource};

use crate::shell::{ClientKey, SessionKey};
use crate::state::{ClientState, CompositorState};

/// User data of the `xdg_wm_base` global.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellGlobalData;

/// User data of a bound `xdg_wm_base` object.
#[derive(Debug, Default)]
pub struct ShellBinding {
    session: OnceCell<SessionKey>,
}

impl ShellBinding {
    pub fn session(&self) -> Option<SessionKey> {
        self.session.get().copied()
    }

    /// Attaches `session` to this binding. Returns `false`, leaving the
    /// existing session in place, when one is already attached.
    pub fn attach(&self, session: SessionKey) -> bool {
        self.session.set(session).is_ok()
    }
}

/// `wl_display.error.implementation`.
const DISPLAY_IMPLEMENTATION_ERROR: u32 = 3;
const DISPLAY_OBJECT_ID: u32 = 1;

fn client_key(client: &Client) -> Option<ClientKey> {
    client.get_data::<ClientState>().map(|data| data.key())
}

/// Disconnects `client` with an `implementation` error on its display.
fn reject_client(handle: &DisplayHandle, client: &Client, message: String) {
    client.kill(
        handle,
        ProtocolError {
            code: DISPLAY_IMPLEMENTATION_ERROR,
            object_id: DISPLAY_OBJECT_ID,
            object_interface: "wl_display".into(),
            message,
        },
    );
}

impl GlobalDispatch<xdg_wm_base::XdgWmBase, ShellGlobalData> for CompositorState {
    fn bind(
        state: &mut Self,
        handle: &DisplayHandle,
        client: &Client,
        resource: New<xdg_wm_base::XdgWmBase>,
        _global_data: &ShellGlobalData,
        data_init: &mut DataInit<'_, Self>,
    ) {
        let wm_base = data_init.init(resource, ShellBinding::default());
        let Some(key) = client_key(client) else {
            warn!("xdg_wm_base bound by a client without compositor data");
            reject_client(handle, client, "unknown client".into());
            return;
        };

        let id = wm_base.id().protocol_id();
        match state.shell.bind(key, id, wm_base.version()) {
            Ok(session) => {
                let attached = wm_base
                    .data::<ShellBinding>()
                    .is_some_and(|binding| binding.attach(session));
                if !attached {
                    warn!(%key, id, ?session, "session could not be attached to xdg_wm_base");
                    state.shell.end_session(session);
                }
            }
            Err(e) => reject_client(handle, client, e.to_string()),
        }
    }
}

impl Dispatch<xdg_wm_base::XdgWmBase, ShellBinding> for CompositorState {
    fn request(
        state: &mut Self,
        _client: &Client,
        resource: &xdg_wm_base::XdgWmBase,
        request: xdg_wm_base::Request,
        data: &ShellBinding,
        _dhandle: &DisplayHandle,
        data_init: &mut DataInit<'_, Self>,
    ) {
        let session = data.session().and_then(|key| state.shell.session_mut(key));
        match request {
            xdg_wm_base::Request::CreatePositioner { id } => {
                data_init.init(id, ());
                if let Some(session) = session {
                    session.add_positioner();
                }
            }
            xdg_wm_base::Request::GetXdgSurface { id, .. } => {
                data_init.init(id, ());
                resource.post_error(
                    xdg_wm_base::Error::Role,
                    "this compositor does not offer wl_surface roles",
                );
            }
            xdg_wm_base::Request::Pong { serial } => {
                trace!(serial, "pong");
                if let Some(session) = session {
                    session.record_pong(serial);
                }
            }
            xdg_wm_base::Request::Destroy => {}
            _ => {}
        }
    }

    fn destroyed(state: &mut Self, _client: ClientId, _resource: &xdg_wm_base::XdgWmBase, data: &ShellBinding) {
        if let Some(key) = data.session() {
            state.shell.end_session(key);
        }
    }
}

impl Dispatch<xdg_positioner::XdgPositioner, ()> for CompositorState {
    fn request(
        _state: &mut Self,
        _client: &Client,
        resource: &xdg_positioner::XdgPositioner,
        _request: xdg_positioner::Request,
        _data: &(),
        _dhandle: &DisplayHandle,
        _data_init: &mut DataInit<'_, Self>,
    ) {
        debug!(positioner = resource.id().protocol_id(), "positioner request ignored");
    }
}

impl Dispatch<xdg_surface::XdgSurface, ()> for CompositorState {
    fn request(
        _state: &mut Self,
        _client: &Client,
        resource: &xdg_surface::XdgSurface,
        _request: xdg_surface::Request,
        _data: &(),
        _dhandle: &DisplayHandle,
        _data_init: &mut DataInit<'_, Self>,
    ) {
        trace!(xdg_surface = resource.id().protocol_id(), "request on rejected xdg_surface");
    }
}
