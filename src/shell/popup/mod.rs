//! The popup surface role.
//!
//! A popup is a transient child of another shell surface — a menu or
//! tooltip of a panel, for example. Mapping one resolves the toolkit's
//! placement request into a positioner description, creates the protocol
//! popup parented on the transient-for surface's own protocol object, and
//! optionally takes an input grab.

use std::rc::Rc;

use tracing::{error, warn};

use crate::shell::WeakShellSurface;
use crate::transport::{PopupEvents, PopupHandle, ShellTransport};
use crate::utils::{Point, Rectangle, Size};
use crate::window::HostWindow;

pub mod positioner;

pub use positioner::{AdjustmentFlags, Corner, PositionerConfig};

/// A popup placement request, as issued by the toolkit.
///
/// Immutable per map; replace it with
/// [`PopupSurface::update_position`] before remapping to move the popup.
pub struct PopupPosition {
    /// The window whose coordinate space `anchor_rect` is expressed in. It
    /// must be a descendant (or the window itself) of the transient-for
    /// window.
    pub anchor_owner: Rc<dyn HostWindow>,
    /// The rectangle the popup is anchored to.
    pub anchor_rect: Rectangle,
    /// Corner of the anchor rectangle the popup attaches to.
    pub rect_anchor: Corner,
    /// Direction the popup extends away from the anchor point.
    pub window_anchor: Corner,
    /// Permitted constraint adjustments if the popup would go off-screen.
    pub constraint_adjustment: AdjustmentFlags,
    /// Extra displacement applied after anchoring.
    pub offset: Point,
}

impl std::fmt::Debug for PopupPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PopupPosition")
            .field("anchor_rect", &self.anchor_rect)
            .field("rect_anchor", &self.rect_anchor)
            .field("window_anchor", &self.window_anchor)
            .field("constraint_adjustment", &self.constraint_adjustment)
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}

/// State for one window holding the popup role.
pub struct PopupSurface {
    window: Rc<dyn HostWindow>,
    transport: Rc<dyn ShellTransport>,
    transient_for: WeakShellSurface,
    position: PopupPosition,
    cached_allocation: Size,
    logical_geom: Rectangle,
    handle: Option<Box<dyn PopupHandle>>,
    awaiting_configure: bool,
    events: Rc<dyn PopupEvents>,
}

impl std::fmt::Debug for PopupSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PopupSurface")
            .field("position", &self.position)
            .field("logical_geom", &self.logical_geom)
            .field("mapped", &self.handle.is_some())
            .field("awaiting_configure", &self.awaiting_configure)
            .finish_non_exhaustive()
    }
}

impl PopupSurface {
    pub(crate) fn new(
        window: Rc<dyn HostWindow>,
        transport: Rc<dyn ShellTransport>,
        transient_for: WeakShellSurface,
        position: PopupPosition,
        events: Rc<dyn PopupEvents>,
    ) -> Self {
        PopupSurface {
            window,
            transport,
            transient_for,
            position,
            cached_allocation: Size::ZERO,
            logical_geom: Rectangle::default(),
            handle: None,
            awaiting_configure: false,
            events,
        }
    }

    /// Replace the placement request. Takes effect on the next map.
    pub(crate) fn update_position(&mut self, position: PopupPosition) {
        self.position = position;
    }

    pub(crate) fn handle(&self) -> Option<&dyn PopupHandle> {
        self.handle.as_deref()
    }

    pub(crate) fn logical_geometry(&self) -> Rectangle {
        if self.logical_geom.size.is_positive() {
            self.logical_geom
        } else {
            self.window.logical_geometry()
        }
    }

    pub(crate) fn map(&mut self) {
        if self.handle.is_some() {
            return;
        }
        let Some(parent) = self.transient_for.upgrade() else {
            warn!("popup mapped after its transient-for surface was destroyed");
            return;
        };
        let Some(surface) = self.window.surface_handle() else {
            error!("popup window mapped before it was realized");
            return;
        };

        let popup_geom = self.window.logical_geometry();
        let config = positioner::resolve(
            &self.position,
            parent.window(),
            parent.logical_geometry().loc,
            popup_geom,
            self.window.allocation(),
        );
        let grab = self.window.grab_seat();

        let handle = parent.with_role(|role| {
            let Some(parent_handle) = role.popup_parent() else {
                error!("transient-for surface has no protocol object to parent a popup on");
                return None;
            };
            self.transport.create_popup(
                surface.as_ref(),
                parent_handle,
                &config,
                grab.as_ref(),
                self.events.clone(),
            )
        });
        let Some(handle) = handle else { return };

        handle.commit();
        self.handle = Some(handle);
        self.awaiting_configure = true;
    }

    pub(crate) fn unmap(&mut self) {
        self.handle = None;
        self.awaiting_configure = false;
    }

    pub(crate) fn on_size_allocate(&mut self, allocation: Size) {
        if self.cached_allocation == allocation {
            return;
        }
        self.cached_allocation = allocation;
        if let Some(handle) = &self.handle {
            if !self.awaiting_configure {
                handle.set_window_geometry(self.window.logical_geometry());
                handle.commit();
            }
        }
    }

    pub(crate) fn on_configure(&mut self, geometry: Rectangle) {
        if self.handle.is_none() {
            return;
        }
        self.awaiting_configure = false;
        self.logical_geom = geometry;
        if geometry.size.is_positive() {
            self.window.resize(geometry.size);
        }
    }

    pub(crate) fn on_done(&mut self) {
        self.handle = None;
        self.awaiting_configure = false;
        self.window.close();
    }
}
