/// An x,y coordinate pair
#[derive(Debug, PartialEq, Eq, Copy, Clone, Default)]
pub struct Point {
    /// An absolute x coordinate relative to the root window
    pub x: i32,
    /// An absolute y coordinate relative to the root window
    pub y: i32,
}

impl Point {
    /// Create a new Point.
    pub fn new(x: i32, y: i32) -> Point {
        Point { x, y }
    }
}

/// An X window / screen position: top left corner + extent
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct Rectangle {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

impl Rectangle {
    /// Create a new Rectangle.
    pub fn new(x: i32, y: i32, w: u32, h: u32) -> Rectangle {
        Rectangle { x, y, w, h }
    }

    /// Destructure this Rectangle into its component values (x, y, w, h).
    pub fn values(&self) -> (i32, i32, u32, u32) {
        (self.x, self.y, self.w, self.h)
    }

    pub fn right(&self) -> i32 {
        self.x + self.w as i32
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.h as i32
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.right() && p.y >= self.y && p.y < self.bottom()
    }

    /// Area shared between this rectangle and `other`, zero when they do not overlap.
    pub fn intersect_area(&self, other: &Rectangle) -> u64 {
        let w = (self.right().min(other.right()) - self.x.max(other.x)).max(0);
        let h = (self.bottom().min(other.bottom()) - self.y.max(other.y)).max(0);
        w as u64 * h as u64
    }

    /// Shrink the extent by a border of `bw` pixels on every side, keeping the origin.
    ///
    /// Layout algorithms work with outer rectangles and X wants the inner size.
    pub fn without_border(&self, bw: u32) -> Rectangle {
        Rectangle {
            x: self.x,
            y: self.y,
            w: self.w.saturating_sub(2 * bw).max(1),
            h: self.h.saturating_sub(2 * bw).max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersect_area_of_disjoint_rects_is_zero() {
        let a = Rectangle::new(0, 0, 100, 100);
        let b = Rectangle::new(100, 0, 100, 100);
        assert_eq!(a.intersect_area(&b), 0);
    }

    #[test]
    fn intersect_area_of_overlapping_rects() {
        let a = Rectangle::new(0, 0, 100, 100);
        let b = Rectangle::new(50, 50, 100, 100);
        assert_eq!(a.intersect_area(&b), 2500);
    }

    #[test]
    fn without_border_never_collapses() {
        let r = Rectangle::new(5, 5, 3, 3).without_border(4);
        assert_eq!((r.w, r.h), (1, 1));
    }
}
