//! The protocol-transport seam.
//!
//! Everything the surface roles say to the compositor goes through the
//! object-safe traits in this module, and everything the compositor says back
//! arrives through the `*Events` sink traits. The [`wayland`] submodule
//! implements the seam over `wayland-client`; the test suite drives the same
//! traits with a recording mock instead of a socket.
//!
//! All requests are fire-and-forget: the only operations with a synchronous
//! result are the `create_*` calls, which yield a handle (or `None` when the
//! matching protocol global is missing). Replies — configure, closed,
//! popup-done — are delivered later, from the embedder's event loop.

use std::rc::Rc;

use downcast_rs::{impl_downcast, Downcast};

use crate::shell::layer::types::{Anchor, KeyboardInteractivity, Layer, Margins};
use crate::shell::popup::PositionerConfig;
use crate::utils::{Rectangle, Size};

#[cfg(test)]
pub(crate) mod mock;
#[cfg(feature = "wayland")]
pub mod wayland;

/// Opaque reference to the toolkit window's underlying protocol surface.
///
/// The embedder obtains this from its windowing toolkit once the window is
/// realized; the transport downcasts it to its own concrete type.
pub trait SurfaceHandle: Downcast + std::fmt::Debug {}
impl_downcast!(SurfaceHandle);

/// Opaque reference to an output a layer surface can be pinned to.
pub trait MonitorHandle: Downcast + std::fmt::Debug {
    /// Whether this handle refers to the same output as `other`.
    fn same_monitor(&self, other: &dyn MonitorHandle) -> bool;
}
impl_downcast!(MonitorHandle);

/// Opaque reference to an input seat, used only for popup grabs.
pub trait SeatHandle: Downcast + std::fmt::Debug {}
impl_downcast!(SeatHandle);

/// A seat plus the most recent input-event serial seen on any of its
/// devices, as required to legitimize a popup grab.
#[derive(Debug)]
pub struct SeatGrab {
    /// The seat issuing the grab.
    pub seat: Box<dyn SeatHandle>,
    /// `max()` over the last serials of the seat's input devices. Any device
    /// is sufficient for the protocol.
    pub serial: u32,
}

/// Compositor events for a layer surface.
///
/// Sinks are called between, never inside, public API calls: the transport
/// dispatches them from the embedder's event loop.
pub trait LayerEvents {
    /// The compositor proposed a size. The serial must be acknowledged via
    /// [`LayerHandle::ack_configure`].
    fn configure(&self, serial: u32, width: i32, height: i32);
    /// The compositor asked for the surface to go away.
    fn closed(&self);
}

/// Compositor events for a toplevel-fallback surface. The transport
/// acknowledges the underlying configure itself.
pub trait ToplevelEvents {
    /// A configure cycle completed; `size` is the compositor-proposed size,
    /// if it proposed one.
    fn configure(&self, size: Option<Size>);
    /// The compositor asked for the window to close.
    fn close(&self);
}

/// Compositor events for a popup surface. The transport acknowledges the
/// underlying configure itself.
pub trait PopupEvents {
    /// The compositor placed the popup at `geometry`, relative to the parent
    /// surface's window geometry.
    fn configure(&self, geometry: Rectangle);
    /// The popup was dismissed.
    fn done(&self);
}

/// A live layer-surface protocol object. Dropping the handle destroys it.
pub trait LayerHandle: Downcast {
    /// Request a size; `0` on an axis lets the compositor decide.
    fn set_size(&self, size: Size);
    /// Replace the anchored edge set.
    fn set_anchor(&self, anchor: Anchor);
    /// Replace all four margins.
    fn set_margin(&self, margins: Margins);
    /// Set the exclusive zone (`-1` don't care, `0` neutral, positive size).
    fn set_exclusive_zone(&self, zone: i32);
    /// Set the keyboard interactivity mode.
    fn set_keyboard_interactivity(&self, mode: KeyboardInteractivity);
    /// Move the surface to another layer. Only honored on protocol version
    /// 2 and above; the state machine remaps instead on older versions.
    fn set_layer(&self, layer: Layer);
    /// Acknowledge a configure serial.
    fn ack_configure(&self, serial: u32);
    /// Commit pending protocol state on the underlying surface.
    fn commit(&self);
}
impl_downcast!(LayerHandle);

/// A live toplevel-fallback protocol object. Dropping the handle destroys it.
pub trait ToplevelHandle: Downcast {
    /// Update the window geometry (content area) of the surface.
    fn set_window_geometry(&self, geometry: Rectangle);
    /// Commit pending protocol state on the underlying surface.
    fn commit(&self);
}
impl_downcast!(ToplevelHandle);

/// A live popup protocol object. Dropping the handle destroys it (role
/// object first, then its shell surface).
pub trait PopupHandle: Downcast {
    /// Update the window geometry (content area) of the surface.
    fn set_window_geometry(&self, geometry: Rectangle);
    /// Commit pending protocol state on the underlying surface.
    fn commit(&self);
}
impl_downcast!(PopupHandle);

/// The shell surface a popup is positioned against.
pub enum PopupParent<'a> {
    /// Popup of a layer surface.
    Layer(&'a dyn LayerHandle),
    /// Popup of a toplevel-fallback surface.
    Toplevel(&'a dyn ToplevelHandle),
    /// Popup of another popup.
    Popup(&'a dyn PopupHandle),
}

impl std::fmt::Debug for PopupParent<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PopupParent::Layer(_) => f.write_str("PopupParent::Layer"),
            PopupParent::Toplevel(_) => f.write_str("PopupParent::Toplevel"),
            PopupParent::Popup(_) => f.write_str("PopupParent::Popup"),
        }
    }
}

/// Factory side of the transport: the two shell globals, bound once per
/// process.
pub trait ShellTransport {
    /// Whether the compositor advertises the layer-shell factory.
    fn layer_shell_available(&self) -> bool;
    /// Bound version of the layer-shell factory, `0` if unavailable.
    fn layer_shell_version(&self) -> u32;
    /// Whether the compositor advertises the generic (xdg) shell factory.
    fn xdg_shell_available(&self) -> bool;

    /// Give `surface` the layer-surface role.
    ///
    /// Returns `None` when the layer-shell global is missing or the surface
    /// handle does not belong to this transport.
    fn create_layer_surface(
        &self,
        surface: &dyn SurfaceHandle,
        monitor: Option<&dyn MonitorHandle>,
        layer: Layer,
        namespace: &str,
        events: Rc<dyn LayerEvents>,
    ) -> Option<Box<dyn LayerHandle>>;

    /// Give `surface` the plain toplevel role (layer-shell fallback).
    fn create_toplevel(
        &self,
        surface: &dyn SurfaceHandle,
        events: Rc<dyn ToplevelEvents>,
    ) -> Option<Box<dyn ToplevelHandle>>;

    /// Give `surface` the popup role, positioned against `parent` as
    /// described by `config`, optionally with an input grab.
    fn create_popup(
        &self,
        surface: &dyn SurfaceHandle,
        parent: PopupParent<'_>,
        config: &PositionerConfig,
        grab: Option<&SeatGrab>,
        events: Rc<dyn PopupEvents>,
    ) -> Option<Box<dyn PopupHandle>>;
}
