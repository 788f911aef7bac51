use crate::cell::CellInstance;
use crate::geometry::{BBox, Point};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AlignMode {
    Left,
    Right,
    Bottom,
    Top,
    CenterHorizontal,
    CenterVertical,
    ToTheRight,
    ToTheLeft,
    Beneath,
    Above,
}

/// Positioning helpers for anything with a bounding box that can be moved.
pub trait Placeable {
    fn bbox(&self) -> BBox;
    fn move_by(&mut self, dx: f64, dy: f64);

    fn movex(&mut self, dx: f64) -> &mut Self {
        self.move_by(dx, 0.0);
        self
    }

    fn movey(&mut self, dy: f64) -> &mut Self {
        self.move_by(0.0, dy);
        self
    }

    /// Translate so that `from` ends up at `to`.
    fn move_to(&mut self, from: Point, to: Point) -> &mut Self {
        self.move_by(to.x - from.x, to.y - from.y);
        self
    }

    fn set_center(&mut self, center: Point) -> &mut Self {
        let c = self.bbox().center();
        self.move_to(c, center)
    }

    fn set_x(&mut self, x: f64) -> &mut Self {
        let c = self.bbox().center();
        self.movex(x - c.x)
    }

    fn set_y(&mut self, y: f64) -> &mut Self {
        let c = self.bbox().center();
        self.movey(y - c.y)
    }

    fn set_xmin(&mut self, x: f64) -> &mut Self {
        let bb = self.bbox();
        self.movex(x - bb.xmin())
    }

    fn set_xmax(&mut self, x: f64) -> &mut Self {
        let bb = self.bbox();
        self.movex(x - bb.xmax())
    }

    fn set_ymin(&mut self, y: f64) -> &mut Self {
        let bb = self.bbox();
        self.movey(y - bb.ymin())
    }

    fn set_ymax(&mut self, y: f64) -> &mut Self {
        let bb = self.bbox();
        self.movey(y - bb.ymax())
    }

    fn align(&mut self, mode: AlignMode, obox: BBox, space: f64) -> &mut Self {
        let sbox = self.bbox();
        let (dx, dy) = match mode {
            AlignMode::Left => (obox.xmin() - sbox.xmin() + space, 0.0),
            AlignMode::Right => (obox.xmax() - sbox.xmax() + space, 0.0),
            AlignMode::Bottom => (0.0, obox.ymin() - sbox.ymin() + space),
            AlignMode::Top => (0.0, obox.ymax() - sbox.ymax() + space),
            AlignMode::ToTheRight => (obox.xmax() - sbox.xmin() + space, 0.0),
            AlignMode::ToTheLeft => (obox.xmin() - sbox.xmax() - space, 0.0),
            AlignMode::CenterHorizontal => (obox.center().x - sbox.center().x + space, 0.0),
            AlignMode::CenterVertical => (0.0, obox.center().y - sbox.center().y + space),
            AlignMode::Beneath => (0.0, obox.ymin() - sbox.ymax() - space),
            AlignMode::Above => (0.0, obox.ymax() - sbox.ymin() + space),
        };
        self.move_by(dx, dy);
        self
    }

    fn align_centers(&mut self, other: BBox) -> &mut Self {
        self.align(AlignMode::CenterHorizontal, other, 0.0)
            .align(AlignMode::CenterVertical, other, 0.0)
    }

    fn align_to_the_right_of(&mut self, other: BBox, space: f64) -> &mut Self {
        self.align(AlignMode::ToTheRight, other, space)
    }

    fn align_to_the_left_of(&mut self, other: BBox, space: f64) -> &mut Self {
        self.align(AlignMode::ToTheLeft, other, space)
    }

    fn align_beneath(&mut self, other: BBox, space: f64) -> &mut Self {
        self.align(AlignMode::Beneath, other, space)
    }

    fn align_above(&mut self, other: BBox, space: f64) -> &mut Self {
        self.align(AlignMode::Above, other, space)
    }
}

impl Placeable for CellInstance {
    fn bbox(&self) -> BBox {
        CellInstance::bbox(self)
    }

    fn move_by(&mut self, dx: f64, dy: f64) {
        self.translate(dx, dy);
    }
}
