//! The host-window adapter seam.
//!
//! The windowing toolkit owns the actual window; this crate only needs a
//! narrow view of it. The embedder implements [`HostWindow`] once per
//! toolkit, forwards the toolkit's lifecycle signals into
//! [`ShellSurface::notify_map`](crate::ShellSurface::notify_map) and
//! friends, and receives resize/constraint/close commands back through the
//! trait.

use std::rc::Rc;

use crate::transport::{SeatGrab, SurfaceHandle};
use crate::utils::{Point, Rectangle, Size};

/// Size constraint component meaning "unconstrained" on that axis.
pub const UNCONSTRAINED: i32 = -1;

/// Adapter over one toolkit window.
///
/// All methods are commands or queries issued from inside the surface state
/// machines; they must not call back into the owning
/// [`ShellSurface`](crate::ShellSurface) synchronously. Toolkits deliver the
/// resulting lifecycle events (size-allocate and the like) on a later event
/// loop turn.
pub trait HostWindow {
    /// Ask the toolkit to resize the window.
    fn resize(&self, size: Size);

    /// Force a size range on the window. A [`UNCONSTRAINED`] component
    /// leaves that axis free; `min == max` pins it.
    fn set_size_constraints(&self, min: Size, max: Size);

    /// Disable (or re-enable) server-side decorations.
    fn set_decorated(&self, decorated: bool);

    /// Close the window.
    fn close(&self);

    /// The content area of the window, excluding decoration and shadows,
    /// in window-local coordinates.
    fn logical_geometry(&self) -> Rectangle;

    /// The window's current allocated size, including decoration.
    fn allocation(&self) -> Size;

    /// The protocol surface backing this window, available once the window
    /// is realized.
    fn surface_handle(&self) -> Option<Box<dyn SurfaceHandle>>;

    /// The toolkit parent of this window, if any. Implementations must hand
    /// out the same `Rc` for the same window every time, so that ancestor
    /// chains can be walked by identity.
    fn parent(&self) -> Option<Rc<dyn HostWindow>> {
        None
    }

    /// Position of this window's origin within its parent.
    fn position_in_parent(&self) -> Point {
        Point::ZERO
    }

    /// A grab-capable seat and its most recent input serial, if the window
    /// has access to one. Popups map without a grab when this is `None`.
    fn grab_seat(&self) -> Option<SeatGrab> {
        None
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use super::*;
    use crate::transport::mock::{MockSeat, MockSurfaceHandle};

    /// Commands a window received from the shell machinery.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum WindowCommand {
        Resize(Size),
        SetSizeConstraints(Size, Size),
        SetDecorated(bool),
        Close,
    }

    pub struct MockWindow {
        pub commands: RefCell<Vec<WindowCommand>>,
        pub allocation: Cell<Size>,
        pub logical_geometry: Cell<Rectangle>,
        pub realized: Cell<bool>,
        pub parent: RefCell<Option<Rc<dyn HostWindow>>>,
        pub position_in_parent: Cell<Point>,
        pub grab_serial: Cell<Option<u32>>,
    }

    impl MockWindow {
        pub fn new() -> Rc<MockWindow> {
            Rc::new(MockWindow {
                commands: RefCell::new(Vec::new()),
                allocation: Cell::new(Size::ZERO),
                logical_geometry: Cell::new(Rectangle::default()),
                realized: Cell::new(true),
                parent: RefCell::new(None),
                position_in_parent: Cell::new(Point::ZERO),
                grab_serial: Cell::new(None),
            })
        }

        pub fn closed(&self) -> bool {
            self.commands.borrow().contains(&WindowCommand::Close)
        }
    }

    impl HostWindow for MockWindow {
        fn resize(&self, size: Size) {
            self.commands.borrow_mut().push(WindowCommand::Resize(size));
        }

        fn set_size_constraints(&self, min: Size, max: Size) {
            self.commands
                .borrow_mut()
                .push(WindowCommand::SetSizeConstraints(min, max));
        }

        fn set_decorated(&self, decorated: bool) {
            self.commands
                .borrow_mut()
                .push(WindowCommand::SetDecorated(decorated));
        }

        fn close(&self) {
            self.commands.borrow_mut().push(WindowCommand::Close);
        }

        fn logical_geometry(&self) -> Rectangle {
            self.logical_geometry.get()
        }

        fn allocation(&self) -> Size {
            self.allocation.get()
        }

        fn surface_handle(&self) -> Option<Box<dyn SurfaceHandle>> {
            self.realized.get().then(|| {
                Box::new(MockSurfaceHandle(self as *const _ as usize)) as Box<dyn SurfaceHandle>
            })
        }

        fn parent(&self) -> Option<Rc<dyn HostWindow>> {
            self.parent.borrow().clone()
        }

        fn position_in_parent(&self) -> Point {
            self.position_in_parent.get()
        }

        fn grab_seat(&self) -> Option<SeatGrab> {
            self.grab_serial.get().map(|serial| SeatGrab {
                seat: Box::new(MockSeat),
                serial,
            })
        }
    }
}
