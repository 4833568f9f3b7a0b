use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// A point in logical (surface-local) coordinates.
#[derive(Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    /// horizontal coordinate
    pub x: i32,
    /// vertical coordinate
    pub y: i32,
}

impl Point {
    /// The origin `(0, 0)`.
    pub const ZERO: Point = Point { x: 0, y: 0 };

    /// Create a new point.
    pub const fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, other: Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, other: Point) {
        self.x += other.x;
        self.y += other.y;
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }
}

impl SubAssign for Point {
    fn sub_assign(&mut self, other: Point) {
        self.x -= other.x;
        self.y -= other.y;
    }
}

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A size in logical coordinates.
#[derive(Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Size {
    /// width
    pub w: i32,
    /// height
    pub h: i32,
}

impl Size {
    /// The empty size `0x0`.
    pub const ZERO: Size = Size { w: 0, h: 0 };

    /// Create a new size.
    pub const fn new(w: i32, h: i32) -> Self {
        Size { w, h }
    }

    /// Clamp both components to be at least `min`.
    pub fn at_least(self, min: i32) -> Size {
        Size::new(self.w.max(min), self.h.max(min))
    }

    /// Whether both components are strictly positive.
    pub fn is_positive(self) -> bool {
        self.w > 0 && self.h > 0
    }
}

impl fmt::Debug for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.w, self.h)
    }
}

/// A rectangle in logical coordinates.
#[derive(Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rectangle {
    /// Location of the top-left corner
    pub loc: Point,
    /// Size of the rectangle
    pub size: Size,
}

impl Rectangle {
    /// Create a rectangle from raw location and size components.
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Rectangle {
            loc: Point::new(x, y),
            size: Size::new(w, h),
        }
    }

    /// Create a rectangle from a location and a size.
    pub const fn from_loc_and_size(loc: Point, size: Size) -> Self {
        Rectangle { loc, size }
    }
}

impl fmt::Debug for Rectangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} @ ({}, {})",
            self.size.w, self.size.h, self.loc.x, self.loc.y
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_arithmetic() {
        let mut p = Point::new(3, 4) + Point::new(1, -2);
        assert_eq!(p, Point::new(4, 2));
        p -= Point::new(4, 2);
        assert_eq!(p, Point::ZERO);
    }

    #[test]
    fn size_at_least() {
        assert_eq!(Size::new(0, 5).at_least(1), Size::new(1, 5));
        assert_eq!(Size::new(-3, 0).at_least(1), Size::new(1, 1));
        assert_eq!(Size::new(7, 7).at_least(1), Size::new(7, 7));
    }
}
