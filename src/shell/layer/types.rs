//! Value types shared between the layer-surface state machine and the
//! protocol transport.

#[cfg(feature = "wayland")]
use wayland_protocols_wlr::layer_shell::v1::client::{zwlr_layer_shell_v1, zwlr_layer_surface_v1};

/// One edge of the output a layer surface can be anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    /// The left edge of the output
    Left,
    /// The right edge of the output
    Right,
    /// The top edge of the output
    Top,
    /// The bottom edge of the output
    Bottom,
}

impl Edge {
    /// All four edges, in a fixed order.
    pub const ALL: [Edge; 4] = [Edge::Left, Edge::Right, Edge::Top, Edge::Bottom];

    /// The anchor bit corresponding to this edge.
    pub fn anchor_bit(self) -> Anchor {
        match self {
            Edge::Left => Anchor::LEFT,
            Edge::Right => Anchor::RIGHT,
            Edge::Top => Anchor::TOP,
            Edge::Bottom => Anchor::BOTTOM,
        }
    }
}

bitflags::bitflags! {
    /// Anchor bitflags, describing which output edges the surface is pinned to.
    ///
    /// Anchoring to two opposite edges stretches the surface across that axis;
    /// the compositor then dictates the surface size on it.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Anchor: u32 {
        /// The top edge of the output
        const TOP = 1;
        /// The bottom edge of the output
        const BOTTOM = 2;
        /// The left edge of the output
        const LEFT = 4;
        /// The right edge of the output
        const RIGHT = 8;
    }
}

impl Anchor {
    /// Whether both the left and right edges are anchored, stretching the
    /// surface horizontally.
    pub fn anchored_horizontally(&self) -> bool {
        self.contains(Anchor::LEFT) && self.contains(Anchor::RIGHT)
    }

    /// Whether both the top and bottom edges are anchored, stretching the
    /// surface vertically.
    pub fn anchored_vertically(&self) -> bool {
        self.contains(Anchor::TOP) && self.contains(Anchor::BOTTOM)
    }
}

impl Default for Anchor {
    fn default() -> Self {
        Anchor::empty()
    }
}

/// Stacking band a layer surface is rendered in, bottom-most first.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    /// The lowest layer, usually used for wallpapers
    Background,
    /// Below ordinary windows, above the wallpaper
    Bottom,
    /// Above ordinary windows, below overlay
    #[default]
    Top,
    /// Above everything else
    Overlay,
}

/// How keyboard events are delivered to a layer surface.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyboardInteractivity {
    /// The surface is never given keyboard focus.
    #[default]
    None,
    /// The surface takes exclusive keyboard focus while it is above the
    /// ordinary window layer, as a lock screen or password prompt would.
    Exclusive,
    /// The surface can be focused and unfocused with the compositor's usual
    /// focus semantics. Requires layer shell protocol version 4; older
    /// compositors are sent `Exclusive` instead.
    OnDemand,
}

/// Distance between the surface and each anchored output edge.
///
/// A margin is only meaningful on an edge that is anchored; the auto
/// exclusive zone additionally folds in the margins of *unanchored* edges on
/// the un-stretched axis.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Margins {
    /// Distance from the top edge
    pub top: i32,
    /// Distance from the right edge
    pub right: i32,
    /// Distance from the bottom edge
    pub bottom: i32,
    /// Distance from the left edge
    pub left: i32,
}

impl Margins {
    /// The margin for one edge.
    pub fn get(&self, edge: Edge) -> i32 {
        match edge {
            Edge::Left => self.left,
            Edge::Right => self.right,
            Edge::Top => self.top,
            Edge::Bottom => self.bottom,
        }
    }

    /// Set the margin for one edge.
    pub fn set(&mut self, edge: Edge, value: i32) {
        match edge {
            Edge::Left => self.left = value,
            Edge::Right => self.right = value,
            Edge::Top => self.top = value,
            Edge::Bottom => self.bottom = value,
        }
    }
}

#[cfg(feature = "wayland")]
impl From<Layer> for zwlr_layer_shell_v1::Layer {
    fn from(layer: Layer) -> Self {
        match layer {
            Layer::Background => zwlr_layer_shell_v1::Layer::Background,
            Layer::Bottom => zwlr_layer_shell_v1::Layer::Bottom,
            Layer::Top => zwlr_layer_shell_v1::Layer::Top,
            Layer::Overlay => zwlr_layer_shell_v1::Layer::Overlay,
        }
    }
}

#[cfg(feature = "wayland")]
impl From<KeyboardInteractivity> for zwlr_layer_surface_v1::KeyboardInteractivity {
    fn from(ki: KeyboardInteractivity) -> Self {
        match ki {
            KeyboardInteractivity::None => zwlr_layer_surface_v1::KeyboardInteractivity::None,
            KeyboardInteractivity::Exclusive => {
                zwlr_layer_surface_v1::KeyboardInteractivity::Exclusive
            }
            KeyboardInteractivity::OnDemand => {
                zwlr_layer_surface_v1::KeyboardInteractivity::OnDemand
            }
        }
    }
}

#[cfg(feature = "wayland")]
impl From<Anchor> for zwlr_layer_surface_v1::Anchor {
    fn from(anchor: Anchor) -> Self {
        zwlr_layer_surface_v1::Anchor::from_bits_truncate(anchor.bits())
    }
}
