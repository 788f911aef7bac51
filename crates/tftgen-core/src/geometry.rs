use serde::{Deserialize, Serialize};

use crate::cell::Transform;
use crate::LayerId;

/// Tolerance for coordinate comparisons, well below the 1 nm database grid.
pub const EPSILON: f64 = 1e-6;

/// A 2D point in layout coordinates (micrometres).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    pub fn approx_eq(&self, other: &Point) -> bool {
        (self.x - other.x).abs() < EPSILON && (self.y - other.y).abs() < EPSILON
    }
}

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min: Point,
    pub max: Point,
}

impl BBox {
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    /// Box spanning two opposite corners given in any order.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            min: Point::new(a.x.min(b.x), a.y.min(b.y)),
            max: Point::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    pub fn from_points(points: &[Point]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut bb = BBox::new(*first, *first);
        for p in rest {
            bb.min.x = bb.min.x.min(p.x);
            bb.min.y = bb.min.y.min(p.y);
            bb.max.x = bb.max.x.max(p.x);
            bb.max.y = bb.max.y.max(p.y);
        }
        Some(bb)
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn xmin(&self) -> f64 {
        self.min.x
    }

    pub fn xmax(&self) -> f64 {
        self.max.x
    }

    pub fn ymin(&self) -> f64 {
        self.min.y
    }

    pub fn ymax(&self) -> f64 {
        self.max.y
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn contains_point(&self, p: &Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Whether `other` lies entirely inside this box (edges may coincide).
    pub fn contains_bbox(&self, other: &BBox) -> bool {
        other.min.x >= self.min.x - EPSILON
            && other.min.y >= self.min.y - EPSILON
            && other.max.x <= self.max.x + EPSILON
            && other.max.y <= self.max.y + EPSILON
    }

    pub fn intersects(&self, other: &BBox) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    pub fn union(&self, other: &BBox) -> Self {
        Self {
            min: Point::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Point::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    /// Grow (or shrink, for negative `delta`) on every side.
    pub fn expanded(&self, delta: f64) -> Self {
        Self {
            min: self.min.translate(-delta, -delta),
            max: self.max.translate(delta, delta),
        }
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self {
            min: self.min.translate(dx, dy),
            max: self.max.translate(dx, dy),
        }
    }

    /// Edge-to-edge distance. Zero when the boxes touch or overlap,
    /// Euclidean corner distance when they are diagonal to each other.
    pub fn gap_to(&self, other: &BBox) -> f64 {
        let dx = (other.min.x - self.max.x).max(self.min.x - other.max.x).max(0.0);
        let dy = (other.min.y - self.max.y).max(self.min.y - other.max.y).max(0.0);
        (dx * dx + dy * dy).sqrt()
    }

    pub fn transformed(&self, t: &Transform) -> Self {
        BBox::from_corners(t.apply(&self.min), t.apply(&self.max))
    }
}

/// Union of a sequence of boxes.
pub fn union_all<I: IntoIterator<Item = BBox>>(boxes: I) -> Option<BBox> {
    boxes.into_iter().reduce(|acc, bb| acc.union(&bb))
}

/// A rectangle defined by lower-left and upper-right corners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub layer_id: LayerId,
    pub lower_left: Point,
    pub upper_right: Point,
}

impl Rect {
    pub fn new(layer_id: LayerId, x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            layer_id,
            lower_left: Point::new(x1.min(x2), y1.min(y2)),
            upper_right: Point::new(x1.max(x2), y1.max(y2)),
        }
    }

    pub fn from_bbox(layer_id: LayerId, bbox: BBox) -> Self {
        Self::new(layer_id, bbox.min.x, bbox.min.y, bbox.max.x, bbox.max.y)
    }

    /// A `width` x `height` rectangle centred on `center`.
    pub fn centered(layer_id: LayerId, center: Point, width: f64, height: f64) -> Self {
        Self::new(
            layer_id,
            center.x - width / 2.0,
            center.y - height / 2.0,
            center.x + width / 2.0,
            center.y + height / 2.0,
        )
    }

    pub fn bbox(&self) -> BBox {
        BBox::new(self.lower_left, self.upper_right)
    }

    pub fn width(&self) -> f64 {
        self.upper_right.x - self.lower_left.x
    }

    pub fn height(&self) -> f64 {
        self.upper_right.y - self.lower_left.y
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Corners in counter-clockwise order starting at the lower left.
    pub fn corners(&self) -> [Point; 4] {
        [
            self.lower_left,
            Point::new(self.upper_right.x, self.lower_left.y),
            self.upper_right,
            Point::new(self.lower_left.x, self.upper_right.y),
        ]
    }
}

/// A polygon defined by a list of vertices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub layer_id: LayerId,
    pub vertices: Vec<Point>,
}

impl Polygon {
    pub fn new(layer_id: LayerId, vertices: Vec<Point>) -> Self {
        Self { layer_id, vertices }
    }

    pub fn bbox(&self) -> Option<BBox> {
        BBox::from_points(&self.vertices)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }
}

/// A trace defined by a centerline and width. Ends are flush with the
/// first and last points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub layer_id: LayerId,
    pub points: Vec<Point>,
    pub width: f64,
}

impl Path {
    pub fn new(layer_id: LayerId, points: Vec<Point>, width: f64) -> Self {
        Self {
            layer_id,
            points,
            width,
        }
    }

    /// Outline rectangles, one per segment. Interior joints are extended by
    /// half the width so that corners are filled the way a mitred GDS path is.
    /// Diagonal segments fall back to their expanded bounding box.
    pub fn to_rects(&self) -> Vec<Rect> {
        let half = self.width / 2.0;
        let last = self.points.len().saturating_sub(2);
        self.points
            .windows(2)
            .enumerate()
            .filter(|(_, w)| !w[0].approx_eq(&w[1]))
            .map(|(i, w)| {
                let (a, b) = (w[0], w[1]);
                let ext_start = if i == 0 { 0.0 } else { half };
                let ext_end = if i == last { 0.0 } else { half };
                if (a.y - b.y).abs() < EPSILON {
                    let dir = (b.x - a.x).signum();
                    Rect::new(
                        self.layer_id,
                        a.x - dir * ext_start,
                        a.y - half,
                        b.x + dir * ext_end,
                        a.y + half,
                    )
                } else if (a.x - b.x).abs() < EPSILON {
                    let dir = (b.y - a.y).signum();
                    Rect::new(
                        self.layer_id,
                        a.x - half,
                        a.y - dir * ext_start,
                        a.x + half,
                        b.y + dir * ext_end,
                    )
                } else {
                    Rect::from_bbox(self.layer_id, BBox::from_corners(a, b).expanded(half))
                }
            })
            .collect()
    }

    pub fn bbox(&self) -> Option<BBox> {
        union_all(self.to_rects().iter().map(Rect::bbox))
    }

    pub fn length(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| w[0].distance_to(&w[1]))
            .sum()
    }
}

/// A geometric primitive in the layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GeomPrimitive {
    Rect(Rect),
    Polygon(Polygon),
    Path(Path),
}

impl GeomPrimitive {
    pub fn bbox(&self) -> Option<BBox> {
        match self {
            GeomPrimitive::Rect(r) => Some(r.bbox()),
            GeomPrimitive::Polygon(p) => p.bbox(),
            GeomPrimitive::Path(p) => p.bbox(),
        }
    }

    pub fn layer_id(&self) -> LayerId {
        match self {
            GeomPrimitive::Rect(r) => r.layer_id,
            GeomPrimitive::Polygon(p) => p.layer_id,
            GeomPrimitive::Path(p) => p.layer_id,
        }
    }

    /// The primitive as rectangles. Polygons are approximated by their bbox.
    pub fn to_rects(&self) -> Vec<Rect> {
        match self {
            GeomPrimitive::Rect(r) => vec![r.clone()],
            GeomPrimitive::Polygon(p) => p
                .bbox()
                .map(|bb| Rect::from_bbox(p.layer_id, bb))
                .into_iter()
                .collect(),
            GeomPrimitive::Path(p) => p.to_rects(),
        }
    }

    pub fn transformed(&self, t: &Transform) -> Self {
        match self {
            GeomPrimitive::Rect(r) => {
                let a = t.apply(&r.lower_left);
                let b = t.apply(&r.upper_right);
                GeomPrimitive::Rect(Rect::new(r.layer_id, a.x, a.y, b.x, b.y))
            }
            GeomPrimitive::Polygon(p) => GeomPrimitive::Polygon(Polygon::new(
                p.layer_id,
                p.vertices.iter().map(|v| t.apply(v)).collect(),
            )),
            GeomPrimitive::Path(p) => GeomPrimitive::Path(Path::new(
                p.layer_id,
                p.points.iter().map(|v| t.apply(v)).collect(),
                p.width,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const L: LayerId = LayerId::new(2, 0);

    #[test]
    fn test_point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_rect_area() {
        let r = Rect::new(L, 0.0, 0.0, 10.0, 5.0);
        assert!((r.area() - 50.0).abs() < 1e-10);
    }

    #[test]
    fn test_bbox_intersection() {
        let a = BBox::new(Point::new(0.0, 0.0), Point::new(10.0, 10.0));
        let b = BBox::new(Point::new(5.0, 5.0), Point::new(15.0, 15.0));
        let c = BBox::new(Point::new(20.0, 20.0), Point::new(30.0, 30.0));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert!(a.union(&c).contains_bbox(&b));
    }

    #[test]
    fn test_bbox_gap() {
        let a = BBox::new(Point::new(0.0, 0.0), Point::new(10.0, 10.0));
        let right = BBox::new(Point::new(12.0, 0.0), Point::new(20.0, 10.0));
        let touching = BBox::new(Point::new(10.0, 2.0), Point::new(20.0, 4.0));
        let diagonal = BBox::new(Point::new(13.0, 14.0), Point::new(20.0, 20.0));
        assert!((a.gap_to(&right) - 2.0).abs() < 1e-10);
        assert!(a.gap_to(&touching).abs() < 1e-10);
        assert!((a.gap_to(&diagonal) - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_l_path_rects_fill_corner() {
        let path = Path::new(
            L,
            vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(10.0, -10.0)],
            2.0,
        );
        let rects = path.to_rects();
        assert_eq!(rects.len(), 2);
        // First segment starts flush, runs past the corner by half the width.
        assert_eq!(rects[0].bbox(), BBox::new(Point::new(0.0, -1.0), Point::new(11.0, 1.0)));
        // Second segment starts half a width above the corner, ends flush.
        assert_eq!(rects[1].bbox(), BBox::new(Point::new(9.0, -10.0), Point::new(11.0, 1.0)));
        let bb = path.bbox().unwrap();
        assert!((bb.width() - 11.0).abs() < 1e-10);
        assert!((path.length() - 20.0).abs() < 1e-10);
    }

    #[test]
    fn test_rect_rotated_quarter_turn() {
        let r = GeomPrimitive::Rect(Rect::new(L, 0.0, 0.0, 4.0, 2.0));
        let t = Transform::rotation(90.0).unwrap();
        let bb = r.transformed(&t).bbox().unwrap();
        assert!((bb.xmin() + 2.0).abs() < 1e-12);
        assert!((bb.ymax() - 4.0).abs() < 1e-12);
    }
}
