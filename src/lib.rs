//! Client-side support for building desktop-shell components — panels,
//! docks, notifications, wallpapers, lock screens — on compositors that
//! implement the wlr layer shell protocol.
//!
//! The windowing toolkit keeps ownership of its windows and surfaces; this
//! crate attaches a shell *role* to a window and runs the protocol side of
//! it: the configure/ack size negotiation, anchors, margins, exclusive
//! zones, keyboard interactivity, and popup placement. On compositors
//! without the layer shell, windows degrade gracefully to ordinary
//! toplevels.
//!
//! The pieces fit together like this:
//!
//! - implement [`HostWindow`] once for your toolkit's window type;
//! - connect a [`transport::wayland::WaylandShell`] (or share the toolkit's
//!   existing connection) and take its [`ShellGlobals`];
//! - attach a [`ShellSurface`] to each window and forward the toolkit's
//!   realize/map/unmap/size-allocate signals into it;
//! - drive the shell event queue from your event loop.
//!
//! ```no_run
//! use waylayer::{Edge, Layer, ShellSurface};
//! use waylayer::transport::wayland::WaylandShell;
//! # fn toolkit_window() -> std::rc::Rc<dyn waylayer::HostWindow> { unimplemented!() }
//!
//! let shell = WaylandShell::connect()?;
//! let surface = ShellSurface::attach_layer(&shell.globals(), toolkit_window())?;
//! surface.set_layer(Layer::Top);
//! surface.set_anchor(Edge::Left, true);
//! surface.set_anchor(Edge::Right, true);
//! surface.set_anchor(Edge::Top, true);
//! surface.auto_exclusive_zone_enable();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

pub mod registry;
pub mod shell;
pub mod transport;
pub mod utils;
pub mod window;

pub use registry::{library_version, ShellGlobals};
pub use shell::{
    AdjustmentFlags, Anchor, Corner, Edge, KeyboardInteractivity, Layer, Margins, PopupPosition,
    ShellAttachError, ShellSurface, WeakShellSurface,
};
pub use window::HostWindow;
