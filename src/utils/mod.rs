//! Small helpers used across the crate.

mod geometry;

pub use geometry::{Point, Rectangle, Size};
