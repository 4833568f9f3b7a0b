//! The plain-toplevel fallback role.
//!
//! Used when the compositor does not implement the layer shell but does
//! offer the generic desktop shell. The window shows up as an ordinary
//! toplevel; layer-specific properties are accepted and ignored upstream so
//! applications keep working, just without panel semantics.

use std::rc::Rc;

use tracing::error;

use crate::transport::{ShellTransport, ToplevelEvents, ToplevelHandle};
use crate::utils::Size;
use crate::window::HostWindow;

/// State for one window holding the fallback toplevel role.
pub struct ToplevelSurface {
    window: Rc<dyn HostWindow>,
    transport: Rc<dyn ShellTransport>,
    events: Rc<dyn ToplevelEvents>,
    cached_allocation: Size,
    handle: Option<Box<dyn ToplevelHandle>>,
}

impl std::fmt::Debug for ToplevelSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToplevelSurface")
            .field("cached_allocation", &self.cached_allocation)
            .field("mapped", &self.handle.is_some())
            .finish_non_exhaustive()
    }
}

impl ToplevelSurface {
    pub(crate) fn new(
        window: Rc<dyn HostWindow>,
        transport: Rc<dyn ShellTransport>,
        events: Rc<dyn ToplevelEvents>,
    ) -> Self {
        ToplevelSurface {
            window,
            transport,
            events,
            cached_allocation: Size::ZERO,
            handle: None,
        }
    }

    pub(crate) fn handle(&self) -> Option<&dyn ToplevelHandle> {
        self.handle.as_deref()
    }

    pub(crate) fn map(&mut self) {
        if self.handle.is_some() {
            return;
        }
        let Some(surface) = self.window.surface_handle() else {
            error!("window mapped before it was realized");
            return;
        };
        let Some(handle) = self
            .transport
            .create_toplevel(surface.as_ref(), self.events.clone())
        else {
            return;
        };
        handle.set_window_geometry(self.window.logical_geometry());
        handle.commit();
        self.handle = Some(handle);
    }

    pub(crate) fn unmap(&mut self) {
        self.handle = None;
    }

    pub(crate) fn on_size_allocate(&mut self, allocation: Size) {
        if self.cached_allocation == allocation {
            return;
        }
        self.cached_allocation = allocation;
        if let Some(handle) = &self.handle {
            handle.set_window_geometry(self.window.logical_geometry());
            handle.commit();
        }
    }

    pub(crate) fn on_configure(&mut self, size: Option<Size>) {
        if self.handle.is_none() {
            return;
        }
        if let Some(size) = size {
            if size.is_positive() {
                self.window.resize(size);
            }
        }
    }

    pub(crate) fn on_close(&mut self) {
        self.window.close();
    }
}
