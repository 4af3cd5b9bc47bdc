/// 2D point with floating point coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// X coordinate
    pub x: f32,
    /// Y coordinate
    pub y: f32,
}

impl Point {
    /// Create a new point
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another point
    pub fn distance(&self, other: &Point) -> f32 {
        self.distance_squared(other).sqrt()
    }

    /// Calculate squared distance (faster, no sqrt)
    pub fn distance_squared(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// Four corner points of a located symbol, in the pixel space of the
/// raster it was found in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    /// Corner points as reported by the detector (any winding)
    pub corners: [Point; 4],
}

impl Quad {
    /// Create a quadrilateral from four corners
    pub fn new(corners: [Point; 4]) -> Self {
        Self { corners }
    }

    /// Axis-aligned quadrilateral covering `(x, y, w, h)`
    pub fn from_rect(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self::new([
            Point::new(x, y),
            Point::new(x + w, y),
            Point::new(x + w, y + h),
            Point::new(x, y + h),
        ])
    }

    /// Min/max envelope as `(min_x, min_y, max_x, max_y)`
    pub fn envelope(&self) -> (f32, f32, f32, f32) {
        let mut min_x = f32::INFINITY;
        let mut min_y = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut max_y = f32::NEG_INFINITY;
        for p in &self.corners {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        (min_x, min_y, max_x, max_y)
    }

    /// Corners reordered as top-left, top-right, bottom-right, bottom-left.
    ///
    /// Top-left has the smallest `x + y`, bottom-right the largest; of the
    /// remaining two, top-right has the smallest `y - x`.
    pub fn ordered(&self) -> [Point; 4] {
        let by = |key: fn(&Point) -> f32, max: bool| -> Point {
            let mut best = self.corners[0];
            for p in &self.corners[1..] {
                let better = if max { key(p) > key(&best) } else { key(p) < key(&best) };
                if better {
                    best = *p;
                }
            }
            best
        };
        let sum = |p: &Point| p.x + p.y;
        let diff = |p: &Point| p.y - p.x;
        [by(sum, false), by(diff, false), by(sum, true), by(diff, true)]
    }

    /// Map local coordinates into a parent raster: divide by `scale`, then
    /// offset by `origin`.
    pub fn to_parent(&self, origin: (f32, f32), scale: f32) -> Self {
        let mut corners = self.corners;
        for p in &mut corners {
            *p = Point::new(p.x / scale + origin.0, p.y / scale + origin.1);
        }
        Self { corners }
    }
}
