//! Core geometry types
//!
//! Points, sizes, rectangles and 2D affine transforms shared by the text
//! and rendering crates. All coordinates are in logical units with the
//! origin at the top-left and y growing downwards.

/// 2D point
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// 2D size
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0.0,
        height: 0.0,
    };

    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// 2D rectangle
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub const ZERO: Rect = Rect {
        origin: Point::ZERO,
        size: Size::ZERO,
    };

    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub fn x(&self) -> f32 {
        self.origin.x
    }

    pub fn y(&self) -> f32 {
        self.origin.y
    }

    pub fn width(&self) -> f32 {
        self.size.width
    }

    pub fn height(&self) -> f32 {
        self.size.height
    }

    pub fn max_x(&self) -> f32 {
        self.origin.x + self.size.width
    }

    pub fn max_y(&self) -> f32 {
        self.origin.y + self.size.height
    }

    /// True when either dimension is zero (or negative)
    pub fn is_empty(&self) -> bool {
        self.size.width <= 0.0 || self.size.height <= 0.0
    }

    pub fn area(&self) -> f32 {
        self.size.width.max(0.0) * self.size.height.max(0.0)
    }

    /// Smallest rectangle containing both `self` and `other`
    pub fn union(&self, other: &Rect) -> Rect {
        let min_x = self.origin.x.min(other.origin.x);
        let min_y = self.origin.y.min(other.origin.y);
        let max_x = self.max_x().max(other.max_x());
        let max_y = self.max_y().max(other.max_y());
        Rect::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    /// Offset the rect by a delta
    pub fn offset(&self, dx: f32, dy: f32) -> Self {
        Rect {
            origin: Point::new(self.origin.x + dx, self.origin.y + dy),
            size: self.size,
        }
    }

    /// Corners in clockwise order starting at the top-left
    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.origin.x, self.origin.y),
            Point::new(self.max_x(), self.origin.y),
            Point::new(self.max_x(), self.max_y()),
            Point::new(self.origin.x, self.max_y()),
        ]
    }
}

/// 2D affine transformation
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Affine2D {
    /// Matrix elements [a, b, c, d, tx, ty]
    /// | a  c  tx |
    /// | b  d  ty |
    /// | 0  0   1 |
    pub elements: [f32; 6],
}

impl Default for Affine2D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine2D {
    pub const IDENTITY: Affine2D = Affine2D {
        elements: [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
    };

    pub fn translation(x: f32, y: f32) -> Self {
        Self {
            elements: [1.0, 0.0, 0.0, 1.0, x, y],
        }
    }

    pub fn scale(sx: f32, sy: f32) -> Self {
        Self {
            elements: [sx, 0.0, 0.0, sy, 0.0, 0.0],
        }
    }

    pub fn transform_point(&self, point: Point) -> Point {
        let [a, b, c, d, tx, ty] = self.elements;
        Point::new(a * point.x + c * point.y + tx, b * point.x + d * point.y + ty)
    }

    /// Transform the four corners of a rectangle
    pub fn transform_rect(&self, rect: &Rect) -> [Point; 4] {
        rect.corners().map(|p| self.transform_point(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_union() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 20.0, 10.0, 5.0);
        assert_eq!(a.union(&b), Rect::new(0.0, 0.0, 15.0, 25.0));
    }

    #[test]
    fn test_zero_rect_is_empty() {
        assert!(Rect::ZERO.is_empty());
        assert_eq!(Rect::ZERO.area(), 0.0);
    }

    #[test]
    fn test_scale_then_translate_point() {
        let t = Affine2D {
            elements: [2.0, 0.0, 0.0, 3.0, 10.0, 0.0],
        };
        assert_eq!(t.transform_point(Point::new(1.0, 1.0)), Point::new(12.0, 3.0));
        assert_eq!(
            Affine2D::scale(2.0, 2.0).transform_point(Point::new(1.5, 2.0)),
            Point::new(3.0, 4.0)
        );
    }

    #[test]
    fn test_transform_rect_corners() {
        let t = Affine2D::translation(1.0, 2.0);
        let corners = t.transform_rect(&Rect::new(0.0, 0.0, 4.0, 3.0));
        assert_eq!(corners[0], Point::new(1.0, 2.0));
        assert_eq!(corners[2], Point::new(5.0, 5.0));
    }
}
