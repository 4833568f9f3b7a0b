//! Shell surface roles and the public per-window handle.
//!
//! A [`ShellSurface`] attaches shell behavior to one toolkit window. The
//! window's protocol role is decided at attach time: the layer-surface role
//! when the compositor implements the layer shell, a plain toplevel as a
//! fallback, or the popup role for transient children. The embedder forwards
//! the toolkit's lifecycle signals through the `notify_*` methods and uses
//! the setters to control panel behavior.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::{error, warn};

use crate::registry::ShellGlobals;
use crate::transport::{
    LayerEvents, MonitorHandle, PopupEvents, PopupParent, ToplevelEvents,
};
use crate::utils::{Rectangle, Size};
use crate::window::HostWindow;

pub mod layer;
pub mod popup;
pub mod toplevel;

pub use layer::{Anchor, Edge, KeyboardInteractivity, Layer, Margins};
pub use popup::{AdjustmentFlags, Corner, PopupPosition};

use layer::LayerSurface;
use popup::PopupSurface;
use toplevel::ToplevelSurface;

/// Attaching a shell role to a window failed.
#[derive(Debug, thiserror::Error)]
pub enum ShellAttachError {
    /// The compositor advertises neither the layer shell nor the generic
    /// desktop shell, so the window cannot be presented at all.
    #[error("compositor advertises neither the layer shell nor the xdg shell")]
    NoShellAvailable,
}

/// The protocol role bound to a window.
pub(crate) enum SurfaceRole {
    Layer(LayerSurface),
    Toplevel(ToplevelSurface),
    Popup(PopupSurface),
}

impl SurfaceRole {
    fn map(&mut self) {
        match self {
            SurfaceRole::Layer(role) => role.map(),
            SurfaceRole::Toplevel(role) => role.map(),
            SurfaceRole::Popup(role) => role.map(),
        }
    }

    fn unmap(&mut self) {
        match self {
            SurfaceRole::Layer(role) => role.unmap(),
            SurfaceRole::Toplevel(role) => role.unmap(),
            SurfaceRole::Popup(role) => role.unmap(),
        }
    }

    fn on_size_allocate(&mut self, allocation: Size) {
        match self {
            SurfaceRole::Layer(role) => role.on_size_allocate(allocation),
            SurfaceRole::Toplevel(role) => role.on_size_allocate(allocation),
            SurfaceRole::Popup(role) => role.on_size_allocate(allocation),
        }
    }

    /// The live protocol object a popup can be parented on, if any.
    pub(crate) fn popup_parent(&self) -> Option<PopupParent<'_>> {
        match self {
            SurfaceRole::Layer(role) => role.handle().map(PopupParent::Layer),
            SurfaceRole::Toplevel(role) => role.handle().map(PopupParent::Toplevel),
            SurfaceRole::Popup(role) => role.handle().map(PopupParent::Popup),
        }
    }
}

pub(crate) struct Inner {
    window: Rc<dyn HostWindow>,
    role: RefCell<SurfaceRole>,
}

/// Shell behavior attached to one toolkit window.
///
/// Cheap to clone; clones refer to the same underlying surface.
#[derive(Clone)]
pub struct ShellSurface {
    inner: Rc<Inner>,
}

impl std::fmt::Debug for ShellSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let role = match &*self.inner.role.borrow() {
            SurfaceRole::Layer(_) => "layer",
            SurfaceRole::Toplevel(_) => "toplevel",
            SurfaceRole::Popup(_) => "popup",
        };
        f.debug_struct("ShellSurface").field("role", &role).finish()
    }
}

/// Non-owning reference to a [`ShellSurface`], used for parent links.
#[derive(Debug, Clone)]
pub struct WeakShellSurface {
    inner: Weak<Inner>,
}

impl WeakShellSurface {
    pub(crate) fn upgrade(&self) -> Option<ShellSurface> {
        self.inner.upgrade().map(|inner| ShellSurface { inner })
    }
}

impl ShellSurface {
    /// Attach panel behavior to `window`.
    ///
    /// When the compositor implements the layer shell the window becomes a
    /// layer surface; otherwise it falls back to an ordinary toplevel and
    /// every layer-specific setter becomes a logged no-op. Server-side
    /// decorations are disabled either way.
    pub fn attach_layer(
        globals: &ShellGlobals,
        window: Rc<dyn HostWindow>,
    ) -> Result<ShellSurface, ShellAttachError> {
        let transport = globals.transport();
        window.set_decorated(false);
        if transport.layer_shell_available() {
            Ok(ShellSurface::build(window, |window, sinks| {
                SurfaceRole::Layer(LayerSurface::new(window, transport.clone(), sinks.layer()))
            }))
        } else if transport.xdg_shell_available() {
            warn!(
                "compositor does not support the layer shell; \
                 presenting the window as a normal toplevel"
            );
            Ok(ShellSurface::build(window, |window, sinks| {
                SurfaceRole::Toplevel(ToplevelSurface::new(
                    window,
                    transport.clone(),
                    sinks.toplevel(),
                ))
            }))
        } else {
            Err(ShellAttachError::NoShellAvailable)
        }
    }

    /// Attach the popup role to `window`, as a transient child of
    /// `transient_for` placed per `position`.
    pub fn attach_popup(
        globals: &ShellGlobals,
        window: Rc<dyn HostWindow>,
        transient_for: &ShellSurface,
        position: PopupPosition,
    ) -> Result<ShellSurface, ShellAttachError> {
        let transport = globals.transport();
        if !transport.xdg_shell_available() {
            return Err(ShellAttachError::NoShellAvailable);
        }
        window.set_decorated(false);
        let parent = transient_for.downgrade();
        Ok(ShellSurface::build(window, |window, sinks| {
            SurfaceRole::Popup(PopupSurface::new(
                window,
                transport.clone(),
                parent,
                position,
                sinks.popup(),
            ))
        }))
    }

    fn build(
        window: Rc<dyn HostWindow>,
        make_role: impl FnOnce(Rc<dyn HostWindow>, &SinkFactory) -> SurfaceRole,
    ) -> ShellSurface {
        let inner = Rc::new_cyclic(|weak: &Weak<Inner>| {
            let sinks = SinkFactory { inner: weak.clone() };
            Inner {
                window: window.clone(),
                role: RefCell::new(make_role(window, &sinks)),
            }
        });
        ShellSurface { inner }
    }

    /// A weak reference for parent links; never keeps the surface alive.
    pub fn downgrade(&self) -> WeakShellSurface {
        WeakShellSurface {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub(crate) fn window(&self) -> &Rc<dyn HostWindow> {
        &self.inner.window
    }

    pub(crate) fn with_role<T>(&self, f: impl FnOnce(&SurfaceRole) -> T) -> T {
        f(&self.inner.role.borrow())
    }

    /// The content-area rectangle of the surface: the compositor-assigned
    /// geometry for a configured popup, the window's own logical geometry
    /// otherwise.
    pub(crate) fn logical_geometry(&self) -> Rectangle {
        match &*self.inner.role.borrow() {
            SurfaceRole::Popup(role) => role.logical_geometry(),
            _ => self.inner.window.logical_geometry(),
        }
    }

    /// Whether the window actually holds the layer-surface role (as opposed
    /// to the toplevel fallback).
    pub fn is_layer_window(&self) -> bool {
        matches!(&*self.inner.role.borrow(), SurfaceRole::Layer(_))
    }

    // ---- lifecycle notifications from the embedder ----

    /// The toolkit realized the window. Re-disables decorations, which some
    /// toolkits reset on realize.
    pub fn notify_realize(&self) {
        self.inner.window.set_decorated(false);
    }

    /// The toolkit mapped the window: create the protocol surface.
    pub fn notify_map(&self) {
        self.inner.role.borrow_mut().map();
    }

    /// The toolkit unmapped the window: destroy the protocol surface.
    pub fn notify_unmap(&self) {
        self.inner.role.borrow_mut().unmap();
    }

    /// The toolkit allocated a new size to the window.
    pub fn notify_size_allocate(&self, allocation: Size) {
        self.inner.role.borrow_mut().on_size_allocate(allocation);
    }

    // ---- layer-surface properties ----

    /// Anchor or un-anchor the surface from one screen edge.
    pub fn set_anchor(&self, edge: Edge, anchored: bool) {
        self.with_layer_mut("set_anchor", |role| role.set_anchor(edge, anchored));
    }

    /// Whether the surface is anchored to `edge`.
    pub fn anchor(&self, edge: Edge) -> bool {
        self.query_layer(false, |role| role.anchor(edge))
    }

    /// Set the margin between the surface and one screen edge.
    pub fn set_margin(&self, edge: Edge, margin: i32) {
        self.with_layer_mut("set_margin", |role| role.set_margin(edge, margin));
    }

    /// The margin for `edge`.
    pub fn margin(&self, edge: Edge) -> i32 {
        self.query_layer(0, |role| role.margin(edge))
    }

    /// Reserve `zone` pixels of screen space along the anchored edge.
    /// Disables [automatic zone sizing](Self::auto_exclusive_zone_enable).
    pub fn set_exclusive_zone(&self, zone: i32) {
        self.with_layer_mut("set_exclusive_zone", |role| role.set_exclusive_zone(zone));
    }

    /// The current exclusive zone.
    pub fn exclusive_zone(&self) -> i32 {
        self.query_layer(0, |role| role.exclusive_zone())
    }

    /// Keep the exclusive zone in sync with the surface's own size.
    pub fn auto_exclusive_zone_enable(&self) {
        self.with_layer_mut("auto_exclusive_zone_enable", |role| {
            role.auto_exclusive_zone_enable()
        });
    }

    /// Whether automatic exclusive-zone sizing is active.
    pub fn auto_exclusive_zone_enabled(&self) -> bool {
        self.query_layer(false, |role| role.auto_exclusive_zone_enabled())
    }

    /// Legacy boolean form of [`set_keyboard_mode`](Self::set_keyboard_mode):
    /// `true` maps to [`KeyboardInteractivity::Exclusive`], `false` to
    /// [`KeyboardInteractivity::None`].
    pub fn set_keyboard_interactivity(&self, interactive: bool) {
        self.set_keyboard_mode(if interactive {
            KeyboardInteractivity::Exclusive
        } else {
            KeyboardInteractivity::None
        });
    }

    /// Whether the surface gets keyboard input in any form.
    pub fn keyboard_interactivity(&self) -> bool {
        self.keyboard_mode() != KeyboardInteractivity::None
    }

    /// Set how the surface interacts with keyboard focus.
    pub fn set_keyboard_mode(&self, mode: KeyboardInteractivity) {
        self.with_layer_mut("set_keyboard_mode", |role| role.set_keyboard_mode(mode));
    }

    /// The current keyboard interactivity mode.
    pub fn keyboard_mode(&self) -> KeyboardInteractivity {
        self.query_layer(KeyboardInteractivity::default(), |role| role.keyboard_mode())
    }

    /// Move the surface to another layer.
    pub fn set_layer(&self, layer: Layer) {
        self.with_layer_mut("set_layer", |role| role.set_layer(layer));
    }

    /// The layer the surface is on.
    pub fn layer(&self) -> Layer {
        self.query_layer(Layer::default(), |role| role.layer())
    }

    /// Pin the surface to a specific monitor, or let the compositor choose.
    pub fn set_monitor(&self, monitor: Option<Box<dyn MonitorHandle>>) {
        self.with_layer_mut("set_monitor", |role| role.set_monitor(monitor));
    }

    /// Inspect the monitor the surface is pinned to, `None` when the
    /// compositor chooses (or the window is not a layer surface).
    pub fn with_monitor<T>(&self, f: impl FnOnce(Option<&dyn MonitorHandle>) -> T) -> T {
        match &*self.inner.role.borrow() {
            SurfaceRole::Layer(role) => f(role.monitor()),
            _ => f(None),
        }
    }

    /// Set the namespace reported to the compositor.
    pub fn set_namespace(&self, namespace: &str) {
        self.with_layer_mut("set_namespace", |role| role.set_namespace(namespace));
    }

    /// The namespace reported to the compositor.
    pub fn namespace(&self) -> String {
        self.query_layer(layer::DEFAULT_NAMESPACE.to_owned(), |role| {
            role.namespace().to_owned()
        })
    }

    // ---- popup properties ----

    /// Replace a popup's placement request. Takes effect on the next map.
    pub fn set_popup_position(&self, position: PopupPosition) {
        match &mut *self.inner.role.borrow_mut() {
            SurfaceRole::Popup(role) => role.update_position(position),
            _ => error!("set_popup_position called on a non-popup surface"),
        }
    }

    // ---- helpers ----

    fn with_layer_mut(&self, operation: &str, f: impl FnOnce(&mut LayerSurface)) {
        match &mut *self.inner.role.borrow_mut() {
            SurfaceRole::Layer(role) => f(role),
            SurfaceRole::Toplevel(_) => warn!(
                operation,
                "layer operation ignored: compositor lacks the layer shell"
            ),
            SurfaceRole::Popup(_) => {
                error!(operation, "layer operation called on a popup surface");
            }
        }
    }

    fn query_layer<T>(&self, fallback: T, f: impl FnOnce(&LayerSurface) -> T) -> T {
        match &*self.inner.role.borrow() {
            SurfaceRole::Layer(role) => f(role),
            _ => fallback,
        }
    }
}

/// Builds the event-sink adapters that route compositor events back into
/// the role, without keeping the surface alive.
struct SinkFactory {
    inner: Weak<Inner>,
}

impl SinkFactory {
    fn layer(&self) -> Rc<LayerSink> {
        Rc::new(LayerSink {
            inner: self.inner.clone(),
        })
    }

    fn toplevel(&self) -> Rc<ToplevelSink> {
        Rc::new(ToplevelSink {
            inner: self.inner.clone(),
        })
    }

    fn popup(&self) -> Rc<PopupSink> {
        Rc::new(PopupSink {
            inner: self.inner.clone(),
        })
    }
}

struct LayerSink {
    inner: Weak<Inner>,
}

impl LayerEvents for LayerSink {
    fn configure(&self, serial: u32, width: i32, height: i32) {
        if let Some(inner) = self.inner.upgrade() {
            if let SurfaceRole::Layer(role) = &mut *inner.role.borrow_mut() {
                role.on_configure(serial, width, height);
            }
        }
    }

    fn closed(&self) {
        if let Some(inner) = self.inner.upgrade() {
            if let SurfaceRole::Layer(role) = &mut *inner.role.borrow_mut() {
                role.on_closed();
            }
        }
    }
}

struct ToplevelSink {
    inner: Weak<Inner>,
}

impl ToplevelEvents for ToplevelSink {
    fn configure(&self, size: Option<Size>) {
        if let Some(inner) = self.inner.upgrade() {
            if let SurfaceRole::Toplevel(role) = &mut *inner.role.borrow_mut() {
                role.on_configure(size);
            }
        }
    }

    fn close(&self) {
        if let Some(inner) = self.inner.upgrade() {
            if let SurfaceRole::Toplevel(role) = &mut *inner.role.borrow_mut() {
                role.on_close();
            }
        }
    }
}

struct PopupSink {
    inner: Weak<Inner>,
}

impl PopupEvents for PopupSink {
    fn configure(&self, geometry: Rectangle) {
        if let Some(inner) = self.inner.upgrade() {
            if let SurfaceRole::Popup(role) = &mut *inner.role.borrow_mut() {
                role.on_configure(geometry);
            }
        }
    }

    fn done(&self) {
        if let Some(inner) = self.inner.upgrade() {
            if let SurfaceRole::Popup(role) = &mut *inner.role.borrow_mut() {
                role.on_done();
            }
        }
    }
}
