//! The layer-surface role and its size-negotiation state machine.
//!
//! One [`LayerSurface`] owns one protocol surface's lifecycle: the
//! configure/ack handshake, anchors, margins, layer, target monitor,
//! namespace, keyboard mode and exclusive zone. Property changes the bound
//! protocol version cannot apply to a live surface (monitor, namespace, and
//! layer before version 2) are handled by remapping — destroying and
//! recreating the protocol surface.
//!
//! Remapping is deferred while the initial configure is still outstanding: a
//! remap from inside that window creates a fresh surface whose own
//! configure/closed events can re-trigger the same property change and
//! recurse without bound. The `pending_remap` flag is the sole mechanism
//! guarding against that; the deferred remap runs once the configure
//! arrives, or never if the peer closes the surface first.

use std::rc::Rc;

use tracing::{debug, error, warn};

use crate::transport::{LayerEvents, LayerHandle, MonitorHandle, ShellTransport};
use crate::utils::Size;
use crate::window::{HostWindow, UNCONSTRAINED};

pub mod types;

pub use types::{Anchor, Edge, KeyboardInteractivity, Layer, Margins};

/// Namespace reported to the compositor when the embedder does not set one.
pub const DEFAULT_NAMESPACE: &str = "waylayer";

/// Layer shell protocol version that introduced the live `set_layer`
/// request.
const SET_LAYER_SINCE: u32 = 2;

/// Internal sentinel: exclusive zone not yet determined. Never transmitted.
const ZONE_UNSET: i32 = -1;

/// Protocol lifecycle of the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MapState {
    /// No protocol surface exists.
    Unmapped,
    /// Surface created and committed, initial configure outstanding.
    AwaitingConfigure,
    /// At least one configure has been acknowledged.
    Configured,
    /// The peer closed the surface before ever configuring it. Terminal
    /// until the host window is explicitly unmapped.
    ClosedBeforeConfigure,
}

/// State for one window holding the layer-surface role.
pub struct LayerSurface {
    window: Rc<dyn HostWindow>,
    transport: Rc<dyn ShellTransport>,
    events: Rc<dyn LayerEvents>,

    state: MapState,
    pending_remap: bool,

    anchor: Anchor,
    margins: Margins,
    layer: Layer,
    monitor: Option<Box<dyn MonitorHandle>>,
    namespace: String,
    exclusive_zone: i32,
    auto_exclusive_zone: bool,
    keyboard_mode: KeyboardInteractivity,

    current_allocation: Size,
    cached_sent_size: Option<Size>,
    last_configure_size: Size,
    forced_size: Size,

    handle: Option<Box<dyn LayerHandle>>,
}

impl std::fmt::Debug for LayerSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerSurface")
            .field("state", &self.state)
            .field("pending_remap", &self.pending_remap)
            .field("anchor", &self.anchor)
            .field("margins", &self.margins)
            .field("layer", &self.layer)
            .field("namespace", &self.namespace)
            .field("exclusive_zone", &self.exclusive_zone)
            .field("auto_exclusive_zone", &self.auto_exclusive_zone)
            .field("keyboard_mode", &self.keyboard_mode)
            .field("current_allocation", &self.current_allocation)
            .field("last_configure_size", &self.last_configure_size)
            .finish_non_exhaustive()
    }
}

impl LayerSurface {
    pub(crate) fn new(
        window: Rc<dyn HostWindow>,
        transport: Rc<dyn ShellTransport>,
        events: Rc<dyn LayerEvents>,
    ) -> Self {
        LayerSurface {
            window,
            transport,
            events,
            state: MapState::Unmapped,
            pending_remap: false,
            anchor: Anchor::empty(),
            margins: Margins::default(),
            layer: Layer::default(),
            monitor: None,
            namespace: DEFAULT_NAMESPACE.to_owned(),
            exclusive_zone: ZONE_UNSET,
            auto_exclusive_zone: false,
            keyboard_mode: KeyboardInteractivity::default(),
            current_allocation: Size::ZERO,
            cached_sent_size: None,
            last_configure_size: Size::ZERO,
            forced_size: Size::new(UNCONSTRAINED, UNCONSTRAINED),
            handle: None,
        }
    }

    pub(crate) fn handle(&self) -> Option<&dyn LayerHandle> {
        self.handle.as_deref()
    }

    /// Whether a protocol surface currently exists.
    pub(crate) fn is_mapped(&self) -> bool {
        self.handle.is_some()
    }

    // ---- lifecycle ----

    pub(crate) fn map(&mut self) {
        if self.handle.is_some() {
            debug!("layer surface already mapped");
            return;
        }
        let Some(surface) = self.window.surface_handle() else {
            error!("layer window mapped before it was realized");
            return;
        };
        let Some(handle) = self.transport.create_layer_surface(
            surface.as_ref(),
            self.monitor.as_deref(),
            self.layer,
            &self.namespace,
            self.events.clone(),
        ) else {
            warn!("compositor does not support the layer shell protocol");
            return;
        };

        // None of these depend on size negotiation, send them up front.
        handle.set_keyboard_interactivity(self.keyboard_mode);
        if self.exclusive_zone != ZONE_UNSET {
            handle.set_exclusive_zone(self.exclusive_zone);
        }
        handle.set_anchor(self.anchor);
        handle.set_margin(self.margins);

        let initial = self.target_size();
        handle.set_size(initial);
        handle.commit();

        self.cached_sent_size = Some(initial);
        self.last_configure_size = Size::ZERO;
        self.handle = Some(handle);
        self.state = MapState::AwaitingConfigure;
    }

    pub(crate) fn unmap(&mut self) {
        self.handle = None;
        self.cached_sent_size = None;
        self.pending_remap = false;
        self.state = MapState::Unmapped;
    }

    /// Recreate the protocol surface so that create-time properties take
    /// effect. Deferred while the initial configure is outstanding.
    fn remap(&mut self) {
        match self.state {
            MapState::AwaitingConfigure => {
                debug!("deferring remap until the initial configure arrives");
                self.pending_remap = true;
            }
            MapState::Configured => {
                self.unmap();
                self.map();
            }
            MapState::Unmapped | MapState::ClosedBeforeConfigure => {}
        }
    }

    // ---- protocol events ----

    pub(crate) fn on_configure(&mut self, serial: u32, width: i32, height: i32) {
        let Some(handle) = &self.handle else {
            // Stale event raced with an unmap.
            return;
        };
        // Acking is mandatory, even for a configure we cannot honor.
        handle.ack_configure(serial);

        if width < 0 || height < 0 {
            warn!(width, height, "peer sent a configure with invalid dimensions");
            return;
        }

        self.last_configure_size = Size::new(width, height);
        self.state = MapState::Configured;
        self.update_size();

        if std::mem::take(&mut self.pending_remap) {
            self.unmap();
            self.map();
        }
    }

    pub(crate) fn on_closed(&mut self) {
        if self.handle.is_none() {
            // Stale event raced with an unmap.
            return;
        }
        // No remap may be attempted from inside this callback: the peer has
        // taken the surface away for good.
        self.state = if self.state == MapState::AwaitingConfigure {
            MapState::ClosedBeforeConfigure
        } else {
            MapState::Unmapped
        };
        self.pending_remap = false;
        self.handle = None;
        self.cached_sent_size = None;
        self.window.close();
    }

    pub(crate) fn on_size_allocate(&mut self, allocation: Size) {
        if self.current_allocation == allocation {
            return;
        }
        self.current_allocation = allocation;
        self.send_set_size();
        self.update_auto_exclusive_zone();
    }

    // ---- setters ----

    pub(crate) fn set_anchor(&mut self, edge: Edge, anchored: bool) {
        let bit = edge.anchor_bit();
        let new = if anchored {
            self.anchor | bit
        } else {
            self.anchor - bit
        };
        if new == self.anchor {
            return;
        }
        self.anchor = new;
        if let Some(handle) = &self.handle {
            handle.set_anchor(new);
            handle.commit();
        }
        self.update_size();
        self.update_auto_exclusive_zone();
    }

    pub(crate) fn anchor(&self, edge: Edge) -> bool {
        self.anchor.contains(edge.anchor_bit())
    }

    pub(crate) fn set_margin(&mut self, edge: Edge, margin: i32) {
        if self.margins.get(edge) == margin {
            return;
        }
        self.margins.set(edge, margin);
        if let Some(handle) = &self.handle {
            handle.set_margin(self.margins);
            handle.commit();
        }
        self.update_auto_exclusive_zone();
    }

    pub(crate) fn margin(&self, edge: Edge) -> i32 {
        self.margins.get(edge)
    }

    pub(crate) fn set_exclusive_zone(&mut self, zone: i32) {
        let zone = zone.max(0);
        if !self.auto_exclusive_zone && self.exclusive_zone == zone {
            return;
        }
        self.auto_exclusive_zone = false;
        self.send_exclusive_zone(zone);
    }

    pub(crate) fn exclusive_zone(&self) -> i32 {
        self.exclusive_zone.max(0)
    }

    pub(crate) fn auto_exclusive_zone_enable(&mut self) {
        if self.auto_exclusive_zone {
            return;
        }
        self.auto_exclusive_zone = true;
        self.update_auto_exclusive_zone();
    }

    pub(crate) fn auto_exclusive_zone_enabled(&self) -> bool {
        self.auto_exclusive_zone
    }

    pub(crate) fn set_keyboard_mode(&mut self, mode: KeyboardInteractivity) {
        if self.keyboard_mode == mode {
            return;
        }
        self.keyboard_mode = mode;
        if let Some(handle) = &self.handle {
            handle.set_keyboard_interactivity(mode);
            handle.commit();
        }
    }

    pub(crate) fn keyboard_mode(&self) -> KeyboardInteractivity {
        self.keyboard_mode
    }

    pub(crate) fn set_layer(&mut self, layer: Layer) {
        if self.layer == layer {
            return;
        }
        self.layer = layer;
        if self.transport.layer_shell_version() >= SET_LAYER_SINCE {
            if let Some(handle) = &self.handle {
                handle.set_layer(layer);
                handle.commit();
            }
        } else {
            self.remap();
        }
    }

    pub(crate) fn layer(&self) -> Layer {
        self.layer
    }

    pub(crate) fn set_monitor(&mut self, monitor: Option<Box<dyn MonitorHandle>>) {
        let same = match (&self.monitor, &monitor) {
            (None, None) => true,
            (Some(a), Some(b)) => a.same_monitor(b.as_ref()),
            _ => false,
        };
        if same {
            return;
        }
        self.monitor = monitor;
        self.remap();
    }

    pub(crate) fn monitor(&self) -> Option<&dyn MonitorHandle> {
        self.monitor.as_deref()
    }

    pub(crate) fn set_namespace(&mut self, namespace: &str) {
        if self.namespace == namespace {
            return;
        }
        self.namespace = namespace.to_owned();
        self.remap();
    }

    pub(crate) fn namespace(&self) -> &str {
        &self.namespace
    }

    // ---- derived geometry ----

    /// The size to request from the compositor: `0` on stretched axes (the
    /// compositor dictates those), the window's allocation elsewhere. A zero
    /// request on an un-stretched axis is a protocol violation, so axes with
    /// no allocation yet get a non-zero placeholder instead.
    fn target_size(&self) -> Size {
        Size::new(
            if self.anchor.anchored_horizontally() {
                0
            } else {
                self.current_allocation.w.max(1)
            },
            if self.anchor.anchored_vertically() {
                0
            } else {
                self.current_allocation.h.max(1)
            },
        )
    }

    /// Push the requested size to the compositor, suppressing sends that
    /// would repeat the last one (they would otherwise ping-pong with
    /// configure responses).
    fn send_set_size(&mut self) {
        let target = self.target_size();
        if self.cached_sent_size == Some(target) {
            return;
        }
        if let Some(handle) = &self.handle {
            handle.set_size(target);
            handle.commit();
            self.cached_sent_size = Some(target);
        }
    }

    /// Re-derive host-window size constraints from the last configure.
    ///
    /// On a stretched axis the configure size is authoritative and forced on
    /// the window regardless of its content size; un-stretched axes stay
    /// free so the window sizes itself from content.
    fn update_size(&mut self) {
        let forced = Size::new(
            if self.anchor.anchored_horizontally() && self.last_configure_size.w > 0 {
                self.last_configure_size.w
            } else {
                UNCONSTRAINED
            },
            if self.anchor.anchored_vertically() && self.last_configure_size.h > 0 {
                self.last_configure_size.h
            } else {
                UNCONSTRAINED
            },
        );
        if forced != self.forced_size {
            self.forced_size = forced;
            self.window.set_size_constraints(forced, forced);
            if forced.w != UNCONSTRAINED || forced.h != UNCONSTRAINED {
                // Free-axis components fall back to the allocation, which
                // may still be zero; toolkits reject zero sizes.
                self.window.resize(Size::new(
                    if forced.w != UNCONSTRAINED {
                        forced.w
                    } else {
                        self.current_allocation.w.max(1)
                    },
                    if forced.h != UNCONSTRAINED {
                        forced.h
                    } else {
                        self.current_allocation.h.max(1)
                    },
                ));
            }
        }
        self.send_set_size();
    }

    /// Derive the exclusive zone from the window's own size, when auto mode
    /// is active and exactly one axis is unambiguously anchored.
    fn update_auto_exclusive_zone(&mut self) {
        if !self.auto_exclusive_zone {
            return;
        }
        let horiz = self.anchor.contains(Anchor::LEFT) == self.anchor.contains(Anchor::RIGHT);
        let vert = self.anchor.contains(Anchor::TOP) == self.anchor.contains(Anchor::BOTTOM);
        let zone = if horiz && !vert {
            let mut zone = self.current_allocation.h;
            if !self.anchor.contains(Anchor::TOP) {
                zone += self.margins.top;
            }
            if !self.anchor.contains(Anchor::BOTTOM) {
                zone += self.margins.bottom;
            }
            zone
        } else if vert && !horiz {
            let mut zone = self.current_allocation.w;
            if !self.anchor.contains(Anchor::LEFT) {
                zone += self.margins.left;
            }
            if !self.anchor.contains(Anchor::RIGHT) {
                zone += self.margins.right;
            }
            zone
        } else {
            // Both or neither axis fully anchored: indeterminate, keep the
            // current zone.
            return;
        };
        if zone != self.exclusive_zone {
            self.send_exclusive_zone(zone.max(0));
        }
    }

    fn send_exclusive_zone(&mut self, zone: i32) {
        self.exclusive_zone = zone;
        if let Some(handle) = &self.handle {
            handle.set_exclusive_zone(zone);
            handle.commit();
        }
    }
}
