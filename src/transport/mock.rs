//! A recording transport for the test suite.
//!
//! Every request a role object makes lands in a shared message log; tests
//! drive compositor events back in through the stored sinks. No protocol
//! objects exist, so the mock can be as strict about message ordering as
//! the tests need it to be.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::shell::layer::types::{Anchor, KeyboardInteractivity, Layer, Margins};
use crate::shell::popup::PositionerConfig;
use crate::utils::{Rectangle, Size};

use super::{
    LayerEvents, LayerHandle, MonitorHandle, PopupEvents, PopupHandle, PopupParent, SeatGrab,
    SeatHandle, ShellTransport, SurfaceHandle, ToplevelEvents, ToplevelHandle,
};

/// Stand-in surface handle; the payload is only used for `Debug` output.
#[derive(Debug)]
pub struct MockSurfaceHandle(pub usize);
impl SurfaceHandle for MockSurfaceHandle {}

/// Stand-in monitor handle, compared by id.
#[derive(Debug)]
pub struct MockMonitor(pub u32);

impl MonitorHandle for MockMonitor {
    fn same_monitor(&self, other: &dyn MonitorHandle) -> bool {
        other
            .downcast_ref::<MockMonitor>()
            .is_some_and(|other| other.0 == self.0)
    }
}

/// Stand-in seat handle.
#[derive(Debug)]
pub struct MockSeat;
impl SeatHandle for MockSeat {}

/// One recorded transport request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockMessage {
    CreateLayer {
        layer: Layer,
        namespace: String,
        has_monitor: bool,
    },
    CreateToplevel,
    CreatePopup {
        config: PositionerConfig,
        grabbed: bool,
    },
    SetSize(Size),
    SetAnchor(Anchor),
    SetMargin(Margins),
    SetExclusiveZone(i32),
    SetKeyboardInteractivity(KeyboardInteractivity),
    SetLayer(Layer),
    AckConfigure(u32),
    SetWindowGeometry(Rectangle),
    Commit,
}

#[derive(Default)]
struct Shared {
    log: RefCell<Vec<MockMessage>>,
    create_count: Cell<usize>,
    destroy_count: Cell<usize>,
    layer_sink: RefCell<Option<Weak<dyn LayerEvents>>>,
    toplevel_sink: RefCell<Option<Weak<dyn ToplevelEvents>>>,
    popup_sink: RefCell<Option<Weak<dyn PopupEvents>>>,
}

impl Shared {
    fn push(&self, message: MockMessage) {
        self.log.borrow_mut().push(message);
    }
}

/// A [`ShellTransport`] that records requests instead of sending them.
pub struct MockTransport {
    shared: Rc<Shared>,
    layer_version: u32,
    xdg_available: bool,
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("layer_version", &self.layer_version)
            .field("xdg_available", &self.xdg_available)
            .finish_non_exhaustive()
    }
}

impl MockTransport {
    /// A transport advertising layer shell version 4 and the xdg shell.
    pub fn new() -> Rc<MockTransport> {
        MockTransport::with_versions(4, true)
    }

    /// A transport advertising layer shell at `layer_version` (`0` meaning
    /// not advertised at all) and optionally the xdg shell.
    pub fn with_versions(layer_version: u32, xdg_available: bool) -> Rc<MockTransport> {
        Rc::new(MockTransport {
            shared: Rc::new(Shared::default()),
            layer_version,
            xdg_available,
        })
    }

    /// Drain and return the recorded request log.
    pub fn take_log(&self) -> Vec<MockMessage> {
        std::mem::take(&mut self.shared.log.borrow_mut())
    }

    /// Number of surfaces created so far (any role).
    pub fn create_count(&self) -> usize {
        self.shared.create_count.get()
    }

    /// Number of surfaces destroyed so far (any role).
    pub fn destroy_count(&self) -> usize {
        self.shared.destroy_count.get()
    }

    /// Deliver a layer configure event to the most recent layer sink.
    pub fn deliver_configure(&self, serial: u32, width: i32, height: i32) {
        let sink = self.shared.layer_sink.borrow().clone();
        if let Some(sink) = sink.and_then(|sink| sink.upgrade()) {
            sink.configure(serial, width, height);
        }
    }

    /// Deliver a layer closed event to the most recent layer sink.
    pub fn deliver_closed(&self) {
        let sink = self.shared.layer_sink.borrow().clone();
        if let Some(sink) = sink.and_then(|sink| sink.upgrade()) {
            sink.closed();
        }
    }

    /// Deliver a toplevel configure to the most recent toplevel sink.
    pub fn deliver_toplevel_configure(&self, size: Option<Size>) {
        let sink = self.shared.toplevel_sink.borrow().clone();
        if let Some(sink) = sink.and_then(|sink| sink.upgrade()) {
            sink.configure(size);
        }
    }

    /// Deliver a close request to the most recent toplevel sink.
    pub fn deliver_toplevel_close(&self) {
        let sink = self.shared.toplevel_sink.borrow().clone();
        if let Some(sink) = sink.and_then(|sink| sink.upgrade()) {
            sink.close();
        }
    }

    /// Deliver a popup configure to the most recent popup sink.
    pub fn deliver_popup_configure(&self, geometry: Rectangle) {
        let sink = self.shared.popup_sink.borrow().clone();
        if let Some(sink) = sink.and_then(|sink| sink.upgrade()) {
            sink.configure(geometry);
        }
    }

    /// Deliver a popup-done event to the most recent popup sink.
    pub fn deliver_popup_done(&self) {
        let sink = self.shared.popup_sink.borrow().clone();
        if let Some(sink) = sink.and_then(|sink| sink.upgrade()) {
            sink.done();
        }
    }
}

impl ShellTransport for MockTransport {
    fn layer_shell_available(&self) -> bool {
        self.layer_version > 0
    }

    fn layer_shell_version(&self) -> u32 {
        self.layer_version
    }

    fn xdg_shell_available(&self) -> bool {
        self.xdg_available
    }

    fn create_layer_surface(
        &self,
        _surface: &dyn SurfaceHandle,
        monitor: Option<&dyn MonitorHandle>,
        layer: Layer,
        namespace: &str,
        events: Rc<dyn LayerEvents>,
    ) -> Option<Box<dyn LayerHandle>> {
        if self.layer_version == 0 {
            return None;
        }
        self.shared.push(MockMessage::CreateLayer {
            layer,
            namespace: namespace.to_owned(),
            has_monitor: monitor.is_some(),
        });
        self.shared.create_count.set(self.shared.create_count.get() + 1);
        *self.shared.layer_sink.borrow_mut() = Some(Rc::downgrade(&events));
        Some(Box::new(MockLayerHandle {
            shared: self.shared.clone(),
            _events: events,
        }))
    }

    fn create_toplevel(
        &self,
        _surface: &dyn SurfaceHandle,
        events: Rc<dyn ToplevelEvents>,
    ) -> Option<Box<dyn ToplevelHandle>> {
        if !self.xdg_available {
            return None;
        }
        self.shared.push(MockMessage::CreateToplevel);
        self.shared.create_count.set(self.shared.create_count.get() + 1);
        *self.shared.toplevel_sink.borrow_mut() = Some(Rc::downgrade(&events));
        Some(Box::new(MockToplevelHandle {
            shared: self.shared.clone(),
            _events: events,
        }))
    }

    fn create_popup(
        &self,
        _surface: &dyn SurfaceHandle,
        _parent: PopupParent<'_>,
        config: &PositionerConfig,
        grab: Option<&SeatGrab>,
        events: Rc<dyn PopupEvents>,
    ) -> Option<Box<dyn PopupHandle>> {
        if !self.xdg_available {
            return None;
        }
        self.shared.push(MockMessage::CreatePopup {
            config: *config,
            grabbed: grab.is_some(),
        });
        self.shared.create_count.set(self.shared.create_count.get() + 1);
        *self.shared.popup_sink.borrow_mut() = Some(Rc::downgrade(&events));
        Some(Box::new(MockPopupHandle {
            shared: self.shared.clone(),
            _events: events,
        }))
    }
}

struct MockLayerHandle {
    shared: Rc<Shared>,
    // Sinks are handed out as weak references; the handle keeps the sink
    // alive for as long as the surface exists, as a real transport would.
    _events: Rc<dyn LayerEvents>,
}

impl LayerHandle for MockLayerHandle {
    fn set_size(&self, size: Size) {
        self.shared.push(MockMessage::SetSize(size));
    }

    fn set_anchor(&self, anchor: Anchor) {
        self.shared.push(MockMessage::SetAnchor(anchor));
    }

    fn set_margin(&self, margins: Margins) {
        self.shared.push(MockMessage::SetMargin(margins));
    }

    fn set_exclusive_zone(&self, zone: i32) {
        self.shared.push(MockMessage::SetExclusiveZone(zone));
    }

    fn set_keyboard_interactivity(&self, mode: KeyboardInteractivity) {
        self.shared.push(MockMessage::SetKeyboardInteractivity(mode));
    }

    fn set_layer(&self, layer: Layer) {
        self.shared.push(MockMessage::SetLayer(layer));
    }

    fn ack_configure(&self, serial: u32) {
        self.shared.push(MockMessage::AckConfigure(serial));
    }

    fn commit(&self) {
        self.shared.push(MockMessage::Commit);
    }
}

impl Drop for MockLayerHandle {
    fn drop(&mut self) {
        self.shared.destroy_count.set(self.shared.destroy_count.get() + 1);
    }
}

struct MockToplevelHandle {
    shared: Rc<Shared>,
    _events: Rc<dyn ToplevelEvents>,
}

impl ToplevelHandle for MockToplevelHandle {
    fn set_window_geometry(&self, geometry: Rectangle) {
        self.shared.push(MockMessage::SetWindowGeometry(geometry));
    }

    fn commit(&self) {
        self.shared.push(MockMessage::Commit);
    }
}

impl Drop for MockToplevelHandle {
    fn drop(&mut self) {
        self.shared.destroy_count.set(self.shared.destroy_count.get() + 1);
    }
}

struct MockPopupHandle {
    shared: Rc<Shared>,
    _events: Rc<dyn PopupEvents>,
}

impl PopupHandle for MockPopupHandle {
    fn set_window_geometry(&self, geometry: Rectangle) {
        self.shared.push(MockMessage::SetWindowGeometry(geometry));
    }

    fn commit(&self) {
        self.shared.push(MockMessage::Commit);
    }
}

impl Drop for MockPopupHandle {
    fn drop(&mut self) {
        self.shared.destroy_count.set(self.shared.destroy_count.get() + 1);
    }
}

/// A layer event sink that ignores everything, for tests that drive the
/// state machine directly.
#[derive(Debug)]
pub struct NullLayerEvents;

impl LayerEvents for NullLayerEvents {
    fn configure(&self, _serial: u32, _width: i32, _height: i32) {}
    fn closed(&self) {}
}
