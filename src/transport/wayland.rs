//! The transport implementation over `wayland-client`.
//!
//! [`WaylandShell`] owns the connection-side state: it binds the two shell
//! globals once at startup and hands out a [`ShellGlobals`] for attaching
//! surfaces. The embedder remains in charge of the event loop; it calls one
//! of the dispatch methods whenever the connection's file descriptor is
//! readable, and compositor events are routed to the role objects from
//! there.
//!
//! The `wl_surface`s themselves belong to the windowing toolkit. This module
//! only creates and destroys role objects on top of them.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use tracing::{debug, warn};
use wayland_client::backend::{ObjectId, WaylandError};
use wayland_client::globals::{registry_queue_init, BindError, GlobalError, GlobalListContents};
use wayland_client::protocol::{wl_output::WlOutput, wl_registry, wl_seat::WlSeat, wl_surface::WlSurface};
use wayland_client::{
    ConnectError, Connection, Dispatch, DispatchError, EventQueue, Proxy, QueueHandle,
};
use wayland_protocols::xdg::shell::client::{
    xdg_popup::{self, XdgPopup},
    xdg_positioner::{self, XdgPositioner},
    xdg_surface::{self, XdgSurface},
    xdg_toplevel::{self, XdgToplevel},
    xdg_wm_base::{self, XdgWmBase},
};
use wayland_protocols_wlr::layer_shell::v1::client::{
    zwlr_layer_shell_v1::ZwlrLayerShellV1,
    zwlr_layer_surface_v1::{self, ZwlrLayerSurfaceV1},
};

use crate::registry::ShellGlobals;
use crate::shell::layer::types::{KeyboardInteractivity, Layer};
use crate::shell::popup::{Corner, PositionerConfig};
use crate::utils::{Rectangle, Size};

use super::{
    LayerEvents, LayerHandle, MonitorHandle, PopupEvents, PopupHandle, PopupParent, SeatGrab,
    SeatHandle, ShellTransport, SurfaceHandle, ToplevelEvents, ToplevelHandle,
};

/// Highest layer-shell version this crate understands.
const LAYER_SHELL_MAX_VERSION: u32 = 4;
/// Highest xdg-shell version this crate understands.
const XDG_SHELL_MAX_VERSION: u32 = 6;

/// Connecting to the compositor failed.
#[derive(Debug, thiserror::Error)]
pub enum ShellConnectError {
    /// No usable wayland socket in the environment.
    #[error("could not connect to the wayland display")]
    Connect(#[from] ConnectError),
    /// The initial registry exchange failed.
    #[error("initial registry roundtrip failed")]
    Registry(#[from] GlobalError),
}

/// A toolkit window's `wl_surface`, wrapped for the transport seam.
#[derive(Debug, Clone)]
pub struct WaylandWindowSurface(pub WlSurface);
impl SurfaceHandle for WaylandWindowSurface {}

/// A `wl_output`, wrapped for the transport seam.
#[derive(Debug, Clone)]
pub struct WaylandMonitor(pub WlOutput);

impl MonitorHandle for WaylandMonitor {
    fn same_monitor(&self, other: &dyn MonitorHandle) -> bool {
        other
            .downcast_ref::<WaylandMonitor>()
            .is_some_and(|other| other.0.id() == self.0.id())
    }
}

/// A `wl_seat`, wrapped for the transport seam.
#[derive(Debug, Clone)]
pub struct WaylandSeat(pub WlSeat);
impl SeatHandle for WaylandSeat {}

/// Connection-side shell state: the bound globals and the event queue that
/// routes their events.
pub struct WaylandShell {
    conn: Connection,
    queue: EventQueue<RouterState>,
    router: RouterState,
    transport: Rc<WaylandTransport>,
}

impl std::fmt::Debug for WaylandShell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaylandShell")
            .field("layer_shell_version", &self.transport.layer_shell_version())
            .field("xdg_shell_available", &self.transport.xdg_shell_available())
            .finish_non_exhaustive()
    }
}

impl WaylandShell {
    /// Connect to the compositor named by the environment and bind the shell
    /// globals.
    pub fn connect() -> Result<WaylandShell, ShellConnectError> {
        let conn = Connection::connect_to_env()?;
        WaylandShell::from_connection(conn)
    }

    /// Bind the shell globals on an existing connection (one shared with the
    /// windowing toolkit, usually).
    pub fn from_connection(conn: Connection) -> Result<WaylandShell, ShellConnectError> {
        let (globals, queue) = registry_queue_init::<RouterState>(&conn)?;
        let qh = queue.handle();
        let sinks = Rc::new(RefCell::new(SinkMap::default()));

        let layer_shell =
            match globals.bind::<ZwlrLayerShellV1, _, _>(&qh, 1..=LAYER_SHELL_MAX_VERSION, ()) {
                Ok(shell) => Some(shell),
                Err(BindError::NotPresent) => {
                    warn!("compositor does not advertise zwlr_layer_shell_v1");
                    None
                }
                Err(BindError::UnsupportedVersion) => {
                    warn!("compositor advertises an incompatible zwlr_layer_shell_v1");
                    None
                }
            };
        let wm_base = match globals.bind::<XdgWmBase, _, _>(&qh, 1..=XDG_SHELL_MAX_VERSION, ()) {
            Ok(base) => Some(base),
            Err(err) => {
                warn!("could not bind xdg_wm_base: {err}");
                None
            }
        };
        debug!(
            layer_shell = layer_shell.as_ref().map(Proxy::version),
            xdg_shell = wm_base.as_ref().map(Proxy::version),
            "bound shell globals"
        );

        Ok(WaylandShell {
            conn,
            queue,
            router: RouterState {
                sinks: sinks.clone(),
            },
            transport: Rc::new(WaylandTransport {
                qh,
                layer_shell,
                wm_base,
                sinks,
            }),
        })
    }

    /// The globals handle used to attach surfaces.
    pub fn globals(&self) -> ShellGlobals {
        ShellGlobals::new(self.transport.clone())
    }

    /// The underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Flush outgoing requests, then block until the compositor has
    /// processed them and all replies are dispatched.
    pub fn roundtrip(&mut self) -> Result<usize, DispatchError> {
        self.queue.roundtrip(&mut self.router)
    }

    /// Dispatch events that are already queued, without blocking.
    pub fn dispatch_pending(&mut self) -> Result<usize, DispatchError> {
        self.queue.dispatch_pending(&mut self.router)
    }

    /// Block until at least one event is dispatched.
    pub fn blocking_dispatch(&mut self) -> Result<usize, DispatchError> {
        self.queue.blocking_dispatch(&mut self.router)
    }

    /// Flush outgoing requests without dispatching.
    pub fn flush(&self) -> Result<(), WaylandError> {
        self.conn.flush()
    }
}

// ---- event routing ----

struct ToplevelEntry {
    events: Weak<dyn ToplevelEvents>,
    /// Size from the last `xdg_toplevel.configure`, delivered when the
    /// enclosing `xdg_surface.configure` lands.
    pending: Option<Size>,
}

struct PopupEntry {
    events: Weak<dyn PopupEvents>,
    /// Geometry from the last `xdg_popup.configure`, delivered when the
    /// enclosing `xdg_surface.configure` lands.
    pending: Option<Rectangle>,
}

/// Sink registry, keyed by the role's protocol object:
/// `zwlr_layer_surface_v1` for layers, `xdg_surface` for the xdg roles.
#[derive(Default)]
struct SinkMap {
    layers: HashMap<ObjectId, Weak<dyn LayerEvents>>,
    toplevels: HashMap<ObjectId, ToplevelEntry>,
    popups: HashMap<ObjectId, PopupEntry>,
}

/// The dispatch state for the shell event queue.
struct RouterState {
    sinks: Rc<RefCell<SinkMap>>,
}

impl Dispatch<wl_registry::WlRegistry, GlobalListContents> for RouterState {
    fn event(
        _state: &mut Self,
        _proxy: &wl_registry::WlRegistry,
        _event: wl_registry::Event,
        _data: &GlobalListContents,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        // Globals are bound once at startup; dynamic appearance of a shell
        // global mid-session is not supported.
    }
}

impl Dispatch<ZwlrLayerShellV1, ()> for RouterState {
    fn event(
        _state: &mut Self,
        _proxy: &ZwlrLayerShellV1,
        event: <ZwlrLayerShellV1 as Proxy>::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        let _ = event; // no events defined
    }
}

impl Dispatch<XdgWmBase, ()> for RouterState {
    fn event(
        _state: &mut Self,
        proxy: &XdgWmBase,
        event: xdg_wm_base::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        if let xdg_wm_base::Event::Ping { serial } = event {
            proxy.pong(serial);
        }
    }
}

impl Dispatch<ZwlrLayerSurfaceV1, ()> for RouterState {
    fn event(
        state: &mut Self,
        proxy: &ZwlrLayerSurfaceV1,
        event: zwlr_layer_surface_v1::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        // Clone the sink out and release the borrow: the sink may create or
        // destroy surfaces, which mutates the map.
        let sink = state.sinks.borrow().layers.get(&proxy.id()).cloned();
        let Some(events) = sink.and_then(|weak| weak.upgrade()) else {
            return;
        };
        match event {
            zwlr_layer_surface_v1::Event::Configure {
                serial,
                width,
                height,
            } => events.configure(serial, width as i32, height as i32),
            zwlr_layer_surface_v1::Event::Closed => events.closed(),
            _ => {}
        }
    }
}

impl Dispatch<XdgSurface, ()> for RouterState {
    fn event(
        state: &mut Self,
        proxy: &XdgSurface,
        event: xdg_surface::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        let serial = match event {
            xdg_surface::Event::Configure { serial } => serial,
            _ => return,
        };
        proxy.ack_configure(serial);

        enum Ready {
            Toplevel(Rc<dyn ToplevelEvents>, Option<Size>),
            Popup(Rc<dyn PopupEvents>, Option<Rectangle>),
        }
        let ready = {
            let mut sinks = state.sinks.borrow_mut();
            if let Some(entry) = sinks.toplevels.get_mut(&proxy.id()) {
                entry
                    .events
                    .upgrade()
                    .map(|events| Ready::Toplevel(events, entry.pending.take()))
            } else if let Some(entry) = sinks.popups.get_mut(&proxy.id()) {
                entry
                    .events
                    .upgrade()
                    .map(|events| Ready::Popup(events, entry.pending.take()))
            } else {
                None
            }
        };
        match ready {
            Some(Ready::Toplevel(events, pending)) => events.configure(pending),
            Some(Ready::Popup(events, Some(geometry))) => events.configure(geometry),
            Some(Ready::Popup(_, None)) | None => {}
        }
    }
}

impl Dispatch<XdgToplevel, ObjectId> for RouterState {
    fn event(
        state: &mut Self,
        _proxy: &XdgToplevel,
        event: xdg_toplevel::Event,
        surface_id: &ObjectId,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        match event {
            xdg_toplevel::Event::Configure { width, height, .. } => {
                let mut sinks = state.sinks.borrow_mut();
                if let Some(entry) = sinks.toplevels.get_mut(surface_id) {
                    entry.pending = (width > 0 && height > 0).then(|| Size::new(width, height));
                }
            }
            xdg_toplevel::Event::Close => {
                let sink = state
                    .sinks
                    .borrow()
                    .toplevels
                    .get(surface_id)
                    .map(|entry| entry.events.clone());
                if let Some(events) = sink.and_then(|weak| weak.upgrade()) {
                    events.close();
                }
            }
            _ => {}
        }
    }
}

impl Dispatch<XdgPopup, ObjectId> for RouterState {
    fn event(
        state: &mut Self,
        _proxy: &XdgPopup,
        event: xdg_popup::Event,
        surface_id: &ObjectId,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        match event {
            xdg_popup::Event::Configure {
                x,
                y,
                width,
                height,
            } => {
                let mut sinks = state.sinks.borrow_mut();
                if let Some(entry) = sinks.popups.get_mut(surface_id) {
                    entry.pending = Some(Rectangle::new(x, y, width, height));
                }
            }
            xdg_popup::Event::PopupDone => {
                let sink = state
                    .sinks
                    .borrow()
                    .popups
                    .get(surface_id)
                    .map(|entry| entry.events.clone());
                if let Some(events) = sink.and_then(|weak| weak.upgrade()) {
                    events.done();
                }
            }
            _ => {}
        }
    }
}

impl Dispatch<XdgPositioner, ()> for RouterState {
    fn event(
        _state: &mut Self,
        _proxy: &XdgPositioner,
        event: <XdgPositioner as Proxy>::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        let _ = event; // no events defined
    }
}

// ---- the transport ----

struct WaylandTransport {
    qh: QueueHandle<RouterState>,
    layer_shell: Option<ZwlrLayerShellV1>,
    wm_base: Option<XdgWmBase>,
    sinks: Rc<RefCell<SinkMap>>,
}

impl ShellTransport for WaylandTransport {
    fn layer_shell_available(&self) -> bool {
        self.layer_shell.is_some()
    }

    fn layer_shell_version(&self) -> u32 {
        self.layer_shell.as_ref().map_or(0, Proxy::version)
    }

    fn xdg_shell_available(&self) -> bool {
        self.wm_base.is_some()
    }

    fn create_layer_surface(
        &self,
        surface: &dyn SurfaceHandle,
        monitor: Option<&dyn MonitorHandle>,
        layer: Layer,
        namespace: &str,
        events: Rc<dyn LayerEvents>,
    ) -> Option<Box<dyn LayerHandle>> {
        let shell = self.layer_shell.as_ref()?;
        let surface = surface.downcast_ref::<WaylandWindowSurface>()?;
        let output = monitor.and_then(|monitor| monitor.downcast_ref::<WaylandMonitor>());
        let layer_surface = shell.get_layer_surface(
            &surface.0,
            output.map(|output| &output.0),
            layer.into(),
            namespace.to_owned(),
            &self.qh,
            (),
        );
        self.sinks
            .borrow_mut()
            .layers
            .insert(layer_surface.id(), Rc::downgrade(&events));
        Some(Box::new(WaylandLayerHandle {
            layer_surface,
            wl_surface: surface.0.clone(),
            sinks: self.sinks.clone(),
            _events: events,
        }))
    }

    fn create_toplevel(
        &self,
        surface: &dyn SurfaceHandle,
        events: Rc<dyn ToplevelEvents>,
    ) -> Option<Box<dyn ToplevelHandle>> {
        let wm_base = self.wm_base.as_ref()?;
        let surface = surface.downcast_ref::<WaylandWindowSurface>()?;
        let xdg_surface = wm_base.get_xdg_surface(&surface.0, &self.qh, ());
        let toplevel = xdg_surface.get_toplevel(&self.qh, xdg_surface.id());
        self.sinks.borrow_mut().toplevels.insert(
            xdg_surface.id(),
            ToplevelEntry {
                events: Rc::downgrade(&events),
                pending: None,
            },
        );
        Some(Box::new(WaylandToplevelHandle {
            toplevel,
            xdg_surface,
            wl_surface: surface.0.clone(),
            sinks: self.sinks.clone(),
            _events: events,
        }))
    }

    fn create_popup(
        &self,
        surface: &dyn SurfaceHandle,
        parent: PopupParent<'_>,
        config: &PositionerConfig,
        grab: Option<&SeatGrab>,
        events: Rc<dyn PopupEvents>,
    ) -> Option<Box<dyn PopupHandle>> {
        let wm_base = self.wm_base.as_ref()?;
        let surface = surface.downcast_ref::<WaylandWindowSurface>()?;

        let positioner = wm_base.create_positioner(&self.qh, ());
        positioner.set_size(config.size.w.max(1), config.size.h.max(1));
        positioner.set_anchor_rect(
            config.anchor_rect.loc.x,
            config.anchor_rect.loc.y,
            config.anchor_rect.size.w,
            config.anchor_rect.size.h,
        );
        positioner.set_offset(config.offset.x, config.offset.y);
        positioner.set_anchor(positioner_anchor(config.anchor));
        positioner.set_gravity(positioner_gravity(config.gravity));
        positioner.set_constraint_adjustment(
            xdg_positioner::ConstraintAdjustment::from_bits_truncate(
                config.constraint_adjustment.bits(),
            )
            .into(),
        );

        let xdg_surface = wm_base.get_xdg_surface(&surface.0, &self.qh, ());
        let parent_xdg = match parent {
            PopupParent::Layer(_) => None,
            PopupParent::Toplevel(parent) => {
                let parent = parent.downcast_ref::<WaylandToplevelHandle>()?;
                Some(parent.xdg_surface.clone())
            }
            PopupParent::Popup(parent) => {
                let parent = parent.downcast_ref::<WaylandPopupHandle>()?;
                Some(parent.xdg_surface.clone())
            }
        };
        let popup = xdg_surface.get_popup(
            parent_xdg.as_ref(),
            &positioner,
            &self.qh,
            xdg_surface.id(),
        );
        if let PopupParent::Layer(parent) = parent {
            // Layer surfaces adopt a popup through their own request rather
            // than an xdg parent link.
            let parent = parent.downcast_ref::<WaylandLayerHandle>()?;
            parent.layer_surface.get_popup(&popup);
        }
        if let Some(grab) = grab {
            if let Some(seat) = grab.seat.downcast_ref::<WaylandSeat>() {
                popup.grab(&seat.0, grab.serial);
            }
        }
        positioner.destroy();

        self.sinks.borrow_mut().popups.insert(
            xdg_surface.id(),
            PopupEntry {
                events: Rc::downgrade(&events),
                pending: None,
            },
        );
        Some(Box::new(WaylandPopupHandle {
            popup,
            xdg_surface,
            wl_surface: surface.0.clone(),
            sinks: self.sinks.clone(),
            _events: events,
        }))
    }
}

fn positioner_anchor(corner: Corner) -> xdg_positioner::Anchor {
    match corner {
        Corner::None => xdg_positioner::Anchor::None,
        Corner::Top => xdg_positioner::Anchor::Top,
        Corner::Bottom => xdg_positioner::Anchor::Bottom,
        Corner::Left => xdg_positioner::Anchor::Left,
        Corner::Right => xdg_positioner::Anchor::Right,
        Corner::TopLeft => xdg_positioner::Anchor::TopLeft,
        Corner::TopRight => xdg_positioner::Anchor::TopRight,
        Corner::BottomLeft => xdg_positioner::Anchor::BottomLeft,
        Corner::BottomRight => xdg_positioner::Anchor::BottomRight,
    }
}

fn positioner_gravity(corner: Corner) -> xdg_positioner::Gravity {
    match corner {
        Corner::None => xdg_positioner::Gravity::None,
        Corner::Top => xdg_positioner::Gravity::Top,
        Corner::Bottom => xdg_positioner::Gravity::Bottom,
        Corner::Left => xdg_positioner::Gravity::Left,
        Corner::Right => xdg_positioner::Gravity::Right,
        Corner::TopLeft => xdg_positioner::Gravity::TopLeft,
        Corner::TopRight => xdg_positioner::Gravity::TopRight,
        Corner::BottomLeft => xdg_positioner::Gravity::BottomLeft,
        Corner::BottomRight => xdg_positioner::Gravity::BottomRight,
    }
}

// ---- role handles ----

struct WaylandLayerHandle {
    layer_surface: ZwlrLayerSurfaceV1,
    wl_surface: WlSurface,
    sinks: Rc<RefCell<SinkMap>>,
    _events: Rc<dyn LayerEvents>,
}

impl LayerHandle for WaylandLayerHandle {
    fn set_size(&self, size: Size) {
        self.layer_surface
            .set_size(size.w.max(0) as u32, size.h.max(0) as u32);
    }

    fn set_anchor(&self, anchor: crate::shell::layer::types::Anchor) {
        self.layer_surface.set_anchor(anchor.into());
    }

    fn set_margin(&self, margins: crate::shell::layer::types::Margins) {
        self.layer_surface
            .set_margin(margins.top, margins.right, margins.bottom, margins.left);
    }

    fn set_exclusive_zone(&self, zone: i32) {
        self.layer_surface.set_exclusive_zone(zone);
    }

    fn set_keyboard_interactivity(&self, mode: KeyboardInteractivity) {
        let mode = if mode == KeyboardInteractivity::OnDemand
            && self.layer_surface.version() < 4
        {
            warn!("on-demand keyboard interactivity needs layer shell v4, using exclusive");
            KeyboardInteractivity::Exclusive
        } else {
            mode
        };
        self.layer_surface.set_keyboard_interactivity(mode.into());
    }

    fn set_layer(&self, layer: Layer) {
        if self.layer_surface.version() >= 2 {
            self.layer_surface.set_layer(layer.into());
        }
    }

    fn ack_configure(&self, serial: u32) {
        self.layer_surface.ack_configure(serial);
    }

    fn commit(&self) {
        self.wl_surface.commit();
    }
}

impl Drop for WaylandLayerHandle {
    fn drop(&mut self) {
        self.sinks.borrow_mut().layers.remove(&self.layer_surface.id());
        self.layer_surface.destroy();
    }
}

struct WaylandToplevelHandle {
    toplevel: XdgToplevel,
    xdg_surface: XdgSurface,
    wl_surface: WlSurface,
    sinks: Rc<RefCell<SinkMap>>,
    _events: Rc<dyn ToplevelEvents>,
}

impl ToplevelHandle for WaylandToplevelHandle {
    fn set_window_geometry(&self, geometry: Rectangle) {
        self.xdg_surface.set_window_geometry(
            geometry.loc.x,
            geometry.loc.y,
            geometry.size.w,
            geometry.size.h,
        );
    }

    fn commit(&self) {
        self.wl_surface.commit();
    }
}

impl Drop for WaylandToplevelHandle {
    fn drop(&mut self) {
        self.sinks.borrow_mut().toplevels.remove(&self.xdg_surface.id());
        // Role object before its xdg_surface, as the protocol requires.
        self.toplevel.destroy();
        self.xdg_surface.destroy();
    }
}

struct WaylandPopupHandle {
    popup: XdgPopup,
    xdg_surface: XdgSurface,
    wl_surface: WlSurface,
    sinks: Rc<RefCell<SinkMap>>,
    _events: Rc<dyn PopupEvents>,
}

impl PopupHandle for WaylandPopupHandle {
    fn set_window_geometry(&self, geometry: Rectangle) {
        self.xdg_surface.set_window_geometry(
            geometry.loc.x,
            geometry.loc.y,
            geometry.size.w,
            geometry.size.h,
        );
    }

    fn commit(&self) {
        self.wl_surface.commit();
    }
}

impl Drop for WaylandPopupHandle {
    fn drop(&mut self) {
        self.sinks.borrow_mut().popups.remove(&self.xdg_surface.id());
        self.popup.destroy();
        self.xdg_surface.destroy();
    }
}
