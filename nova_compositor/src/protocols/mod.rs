//! Wayland protocol implementations of the compositor.
//!
//! Each submodule holds the `GlobalDispatch`/`Dispatch` implementations on
//! [`CompositorState`](crate::state::CompositorState) for one global and
//! the objects created through it.

pub mod xdg_shell;
