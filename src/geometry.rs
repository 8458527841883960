//! Shared geometry types.

use std::ops::{Add, Mul, Sub};

/// 2D object position.
#[derive(PartialEq, Eq, Copy, Clone, Default, Debug)]
pub struct Point<T = i32> {
    pub x: T,
    pub y: T,
}

impl<T> Point<T> {
    pub const fn new(x: T, y: T) -> Self {
        Self { x, y }
    }
}

impl Point<f64> {
    /// Euclidean length of the vector.
    pub fn length(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Clamp both components to `[-max, max]`.
    pub fn clamp_components(self, max: f64) -> Self {
        let max = max.abs();
        Self::new(self.x.clamp(-max, max), self.y.clamp(-max, max))
    }
}

impl Point {
    /// Distance between two screen points.
    pub fn distance(&self, other: Point) -> f64 {
        Point::<f64>::from(*self - other).length()
    }
}

impl<T> From<(T, T)> for Point<T> {
    fn from((x, y): (T, T)) -> Self {
        Self { x, y }
    }
}

impl From<Point> for Point<f64> {
    fn from(point: Point) -> Self {
        Self::new(point.x as f64, point.y as f64)
    }
}

impl<T: Add<Output = T>> Add<Point<T>> for Point<T> {
    type Output = Self;

    fn add(mut self, other: Point<T>) -> Self {
        self.x = self.x + other.x;
        self.y = self.y + other.y;
        self
    }
}

impl<T: Sub<Output = T>> Sub<Point<T>> for Point<T> {
    type Output = Self;

    fn sub(mut self, other: Point<T>) -> Self {
        self.x = self.x - other.x;
        self.y = self.y - other.y;
        self
    }
}

impl Mul<f64> for Point<f64> {
    type Output = Point<f64>;

    fn mul(mut self, scale: f64) -> Self {
        self.x *= scale;
        self.y *= scale;
        self
    }
}

/// 2D object size.
#[derive(PartialEq, Eq, Copy, Clone, Default, Debug)]
pub struct Size<T = u32> {
    pub width: T,
    pub height: T,
}

impl<T> Size<T> {
    pub const fn new(width: T, height: T) -> Self {
        Self { width, height }
    }
}

impl Size {
    /// Check if either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl<T> From<(T, T)> for Size<T> {
    fn from((width, height): (T, T)) -> Self {
        Self { width, height }
    }
}

impl From<Size> for Size<f64> {
    fn from(size: Size) -> Self {
        Self { width: size.width as f64, height: size.height as f64 }
    }
}

/// Scale a size, truncating fractional pixels.
impl Mul<f64> for Size {
    type Output = Self;

    fn mul(mut self, scale: f64) -> Self {
        self.width = (self.width as f64 * scale) as u32;
        self.height = (self.height as f64 * scale) as u32;
        self
    }
}

/// Screen-space rectangle.
#[derive(PartialEq, Eq, Copy, Clone, Default, Debug)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { origin: Point::new(x, y), size: Size::new(width, height) }
    }

    pub fn left(&self) -> i32 {
        self.origin.x
    }

    pub fn top(&self) -> i32 {
        self.origin.y
    }

    pub fn right(&self) -> i32 {
        self.origin.x + self.size.width as i32
    }

    pub fn bottom(&self) -> i32 {
        self.origin.y + self.size.height as i32
    }

    /// Check whether a point lies inside the rectangle.
    ///
    /// The right and bottom edges are exclusive.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left()
            && point.x < self.right()
            && point.y >= self.top()
            && point.y < self.bottom()
    }

    /// Check whether `other` lies entirely inside this rectangle.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.left() >= self.left()
            && other.top() >= self.top()
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_edges_are_half_open() {
        let rect = Rect::new(10, 20, 30, 40);
        assert!(rect.contains(Point::new(10, 20)));
        assert!(rect.contains(Point::new(39, 59)));
        assert!(!rect.contains(Point::new(40, 59)));
        assert!(!rect.contains(Point::new(39, 60)));
    }

    #[test]
    fn size_scaling_truncates() {
        assert_eq!(Size::new(300, 169) * 0.2, Size::new(60, 33));
    }

    #[test]
    fn component_clamp_keeps_sign() {
        let clamped = Point::new(-500., 12.).clamp_components(80.);
        assert_eq!(clamped, Point::new(-80., 12.));
    }
}
