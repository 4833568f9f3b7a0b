//! Bound shell globals.
//!
//! A [`ShellGlobals`] wraps a transport whose globals were bound once, up
//! front, and answers availability queries without further protocol traffic.
//! Build one from [`WaylandShell`](crate::transport::wayland::WaylandShell)
//! for a real session, or from any other [`ShellTransport`] implementation.

use std::rc::Rc;

use crate::transport::ShellTransport;

/// The shell globals available in this session.
#[derive(Clone)]
pub struct ShellGlobals {
    transport: Rc<dyn ShellTransport>,
}

impl std::fmt::Debug for ShellGlobals {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellGlobals")
            .field("layer_shell_version", &self.layer_shell_version())
            .field("xdg_shell_available", &self.xdg_shell_available())
            .finish()
    }
}

impl ShellGlobals {
    /// Wrap an already-connected transport.
    pub fn new(transport: Rc<dyn ShellTransport>) -> ShellGlobals {
        ShellGlobals { transport }
    }

    pub(crate) fn transport(&self) -> Rc<dyn ShellTransport> {
        self.transport.clone()
    }

    /// Whether layer surfaces will actually work in this session.
    ///
    /// When `false`, attaching still succeeds if the generic shell is
    /// present, but windows are presented as plain toplevels.
    pub fn is_supported(&self) -> bool {
        self.transport.layer_shell_available()
    }

    /// Bound version of the layer-shell global, `0` if unavailable.
    pub fn layer_shell_version(&self) -> u32 {
        self.transport.layer_shell_version()
    }

    /// Whether the generic desktop shell is advertised.
    pub fn xdg_shell_available(&self) -> bool {
        self.transport.xdg_shell_available()
    }
}

/// This library's own version as `(major, minor, micro)`.
pub fn library_version() -> (u32, u32, u32) {
    (
        env!("CARGO_PKG_VERSION_MAJOR").parse().unwrap_or(0),
        env!("CARGO_PKG_VERSION_MINOR").parse().unwrap_or(0),
        env!("CARGO_PKG_VERSION_PATCH").parse().unwrap_or(0),
    )
}
