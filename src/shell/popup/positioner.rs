//! Pure popup position resolution; no protocol I/O happens here.
//!
//! The toolkit hands us an anchor rectangle in the coordinate space of some
//! descendant window of the popup's transient-for window. The protocol wants
//! it relative to the transient-for surface's *logical* origin, so the
//! resolver walks the ancestor chain, accumulates window offsets and strips
//! the decoration inset.

use std::rc::Rc;

use tracing::warn;

use crate::utils::{Point, Rectangle, Size};
use crate::window::HostWindow;

use super::PopupPosition;

/// Bail out of the ancestor walk after this many steps; a deeper chain is a
/// cycle in the toolkit's parent links.
const MAX_ANCESTOR_DEPTH: usize = 1000;

/// Abstract positioner corner: one of the nine compass points.
///
/// `None` is the center; it is encoded identically to an unset corner on the
/// wire.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Corner {
    /// Center of the rectangle (no corner preference)
    #[default]
    None,
    /// Center of the top edge
    Top,
    /// Center of the bottom edge
    Bottom,
    /// Center of the left edge
    Left,
    /// Center of the right edge
    Right,
    /// Top-left corner
    TopLeft,
    /// Top-right corner
    TopRight,
    /// Bottom-left corner
    BottomLeft,
    /// Bottom-right corner
    BottomRight,
}

impl Corner {
    /// The point on the popup that attaches to the anchor when this corner
    /// is used as the gravity, as fractions of the popup size.
    ///
    /// Gravity `Left` extends the popup leftwards, so its right edge
    /// (`x = 1.0`) is the attachment point, and so on.
    pub(crate) fn attachment_fraction(self) -> (f64, f64) {
        let fx = match self {
            Corner::Left | Corner::TopLeft | Corner::BottomLeft => 1.0,
            Corner::None | Corner::Top | Corner::Bottom => 0.5,
            Corner::Right | Corner::TopRight | Corner::BottomRight => 0.0,
        };
        let fy = match self {
            Corner::Top | Corner::TopLeft | Corner::TopRight => 1.0,
            Corner::None | Corner::Left | Corner::Right => 0.5,
            Corner::Bottom | Corner::BottomLeft | Corner::BottomRight => 0.0,
        };
        (fx, fy)
    }
}

bitflags::bitflags! {
    /// How the compositor may adjust a popup that would be constrained.
    ///
    /// The bit values match the `xdg_positioner` wire encoding.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AdjustmentFlags: u32 {
        /// Slide along the x axis until unconstrained
        const SLIDE_X = 1;
        /// Slide along the y axis until unconstrained
        const SLIDE_Y = 2;
        /// Flip to the other side of the anchor on the x axis
        const FLIP_X = 4;
        /// Flip to the other side of the anchor on the y axis
        const FLIP_Y = 8;
        /// Shrink along the x axis until unconstrained
        const RESIZE_X = 16;
        /// Shrink along the y axis until unconstrained
        const RESIZE_Y = 32;
    }
}

/// Everything the transport needs to describe a popup placement to the
/// compositor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionerConfig {
    /// Logical size of the popup
    pub size: Size,
    /// Anchor rectangle, relative to the transient-for surface's logical
    /// origin
    pub anchor_rect: Rectangle,
    /// Corner of the anchor rectangle the popup attaches to
    pub anchor: Corner,
    /// Direction the popup extends from the anchor point
    pub gravity: Corner,
    /// Permitted constraint adjustments
    pub constraint_adjustment: AdjustmentFlags,
    /// Extra displacement applied after anchoring
    pub offset: Point,
}

/// Resolve a popup placement request against the transient-for window.
///
/// `parent_logical_origin` is the transient-for surface's content-area
/// origin; `popup_geom` and `popup_raw_size` describe the popup window's own
/// logical geometry and full allocated size. When the popup window carries
/// decoration insets (raw size larger than logical), the offset is shifted
/// so that the *logical* corner lands on the anchor point.
pub fn resolve(
    position: &PopupPosition,
    transient_for: &Rc<dyn HostWindow>,
    parent_logical_origin: Point,
    popup_geom: Rectangle,
    popup_raw_size: Size,
) -> PositionerConfig {
    let mut rect = position.anchor_rect;
    // Zero-size anchor rects are a protocol violation downstream.
    rect.size = rect.size.at_least(1);

    match accumulate_offset(&position.anchor_owner, transient_for) {
        Some(offset) => {
            rect.loc += offset;
            rect.loc -= parent_logical_origin;
        }
        None => {
            warn!(
                "anchor window is not a descendant of the popup's transient-for window; \
                 using the anchor rectangle uncorrected"
            );
        }
    }

    let (fx, fy) = position.window_anchor.attachment_fraction();
    let inset = Point::new(
        ((popup_raw_size.w - popup_geom.size.w) as f64 * fx) as i32 - popup_geom.loc.x,
        ((popup_raw_size.h - popup_geom.size.h) as f64 * fy) as i32 - popup_geom.loc.y,
    );

    PositionerConfig {
        size: popup_geom.size.at_least(1),
        anchor_rect: rect,
        anchor: position.rect_anchor,
        gravity: position.window_anchor,
        constraint_adjustment: position.constraint_adjustment,
        offset: position.offset + inset,
    }
}

/// Accumulated position of `start`'s origin within `target`, walking up the
/// toolkit parent chain. `None` when the chain never reaches `target`.
fn accumulate_offset(start: &Rc<dyn HostWindow>, target: &Rc<dyn HostWindow>) -> Option<Point> {
    let mut acc = Point::ZERO;
    let mut current = start.clone();
    for _ in 0..MAX_ANCESTOR_DEPTH {
        if same_window(&current, target) {
            return Some(acc);
        }
        acc += current.position_in_parent();
        current = current.parent()?;
    }
    None
}

/// Identity comparison by data pointer; vtable pointers are not stable
/// enough for `Rc::ptr_eq` on trait objects.
fn same_window(a: &Rc<dyn HostWindow>, b: &Rc<dyn HostWindow>) -> bool {
    std::ptr::eq(Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::popup::PopupPosition;
    use crate::window::mock::MockWindow;

    fn position(owner: Rc<dyn HostWindow>, rect: Rectangle) -> PopupPosition {
        PopupPosition {
            anchor_owner: owner,
            anchor_rect: rect,
            rect_anchor: Corner::BottomLeft,
            window_anchor: Corner::BottomRight,
            constraint_adjustment: AdjustmentFlags::FLIP_X | AdjustmentFlags::FLIP_Y,
            offset: Point::ZERO,
        }
    }

    #[test]
    fn direct_child_translation() {
        let parent = MockWindow::new();
        parent.logical_geometry.set(Rectangle::new(12, 7, 400, 300));
        let child = MockWindow::new();
        child.position_in_parent.set(Point::new(50, 60));
        *child.parent.borrow_mut() = Some(parent.clone() as Rc<dyn HostWindow>);

        let pos = position(child, Rectangle::new(10, 20, 30, 40));
        let parent_dyn: Rc<dyn HostWindow> = parent;
        let config = resolve(
            &pos,
            &parent_dyn,
            Point::new(12, 7),
            Rectangle::new(0, 0, 100, 80),
            Size::new(100, 80),
        );

        // 10 + 50 - 12 = 48, 20 + 60 - 7 = 73
        assert_eq!(config.anchor_rect, Rectangle::new(48, 73, 30, 40));
        assert_eq!(config.size, Size::new(100, 80));
        assert_eq!(config.offset, Point::ZERO);
    }

    #[test]
    fn anchor_rect_clamped_to_one() {
        let window = MockWindow::new();
        let pos = position(window.clone(), Rectangle::new(5, 5, 0, 0));
        let window_dyn: Rc<dyn HostWindow> = window;
        let config = resolve(
            &pos,
            &window_dyn,
            Point::ZERO,
            Rectangle::new(0, 0, 10, 10),
            Size::new(10, 10),
        );
        assert_eq!(config.anchor_rect.size, Size::new(1, 1));
    }

    #[test]
    fn unreachable_chain_uses_rect_uncorrected() {
        let orphan = MockWindow::new();
        let unrelated = MockWindow::new();
        unrelated.logical_geometry.set(Rectangle::new(99, 99, 10, 10));

        let pos = position(orphan, Rectangle::new(10, 20, 30, 40));
        let unrelated_dyn: Rc<dyn HostWindow> = unrelated;
        let config = resolve(
            &pos,
            &unrelated_dyn,
            Point::new(99, 99),
            Rectangle::new(0, 0, 10, 10),
            Size::new(10, 10),
        );
        // No translation, no logical-origin subtraction.
        assert_eq!(config.anchor_rect, Rectangle::new(10, 20, 30, 40));
    }

    #[test]
    fn decoration_inset_shifts_offset() {
        let window = MockWindow::new();
        let pos = PopupPosition {
            window_anchor: Corner::Left, // attaches its right edge
            ..position(window.clone(), Rectangle::new(0, 0, 10, 10))
        };
        let window_dyn: Rc<dyn HostWindow> = window;
        // Raw surface 120x100, logical content 100x80 at (10, 10).
        let config = resolve(
            &pos,
            &window_dyn,
            Point::ZERO,
            Rectangle::new(10, 10, 100, 80),
            Size::new(120, 100),
        );
        // x: (120 - 100) * 1.0 - 10 = 10; y: (100 - 80) * 0.5 - 10 = 0
        assert_eq!(config.offset, Point::new(10, 0));
    }

    #[test]
    fn deep_chain_accumulates() {
        let top = MockWindow::new();
        let mid = MockWindow::new();
        mid.position_in_parent.set(Point::new(100, 0));
        *mid.parent.borrow_mut() = Some(top.clone() as Rc<dyn HostWindow>);
        let leaf = MockWindow::new();
        leaf.position_in_parent.set(Point::new(1, 2));
        *leaf.parent.borrow_mut() = Some(mid.clone() as Rc<dyn HostWindow>);

        let pos = position(leaf, Rectangle::new(0, 0, 5, 5));
        let top_dyn: Rc<dyn HostWindow> = top;
        let config = resolve(
            &pos,
            &top_dyn,
            Point::ZERO,
            Rectangle::new(0, 0, 10, 10),
            Size::new(10, 10),
        );
        assert_eq!(config.anchor_rect.loc, Point::new(101, 2));
    }
}
