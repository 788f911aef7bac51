use std::sync::Arc;

use uuid::Uuid;

use crate::error::{LayoutError, Result};
use crate::geometry::{union_all, BBox, GeomPrimitive, Point, Rect, EPSILON};
use crate::LayerId;

/// Unique cell identifier.
pub type CellId = Uuid;

/// Normalise an angle into `[0, 360)`.
pub fn normalize_angle(deg: f64) -> f64 {
    let a = deg.rem_euclid(360.0);
    if (a - 360.0).abs() < EPSILON {
        0.0
    } else {
        a
    }
}

fn quarter_turns(deg: f64) -> Result<i64> {
    let q = deg / 90.0;
    if (q - q.round()).abs() > 1e-9 {
        return Err(LayoutError::UnsupportedRotation(deg));
    }
    Ok((q.round() as i64).rem_euclid(4))
}

/// Placement of a subcell: mirror about the x axis, then rotate
/// counter-clockwise, then translate (the GDS SREF convention).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Translation offset.
    pub offset: Point,
    /// Rotation in degrees (0, 90, 180, 270).
    pub rotation: f64,
    /// Mirror about X axis.
    pub mirror_x: bool,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            offset: Point::new(0.0, 0.0),
            rotation: 0.0,
            mirror_x: false,
        }
    }
}

impl Transform {
    pub fn translate(x: f64, y: f64) -> Self {
        Self {
            offset: Point::new(x, y),
            ..Default::default()
        }
    }

    pub fn rotation(deg: f64) -> Result<Self> {
        quarter_turns(deg)?;
        Ok(Self {
            rotation: normalize_angle(deg),
            ..Default::default()
        })
    }

    pub fn apply(&self, point: &Point) -> Point {
        let y = if self.mirror_x { -point.y } else { point.y };
        let x = point.x;
        // Rotations are restricted to quarter turns so the result stays on grid.
        let (rx, ry) = match ((self.rotation / 90.0).round() as i64).rem_euclid(4) {
            0 => (x, y),
            1 => (-y, x),
            2 => (-x, -y),
            _ => (y, -x),
        };
        Point::new(rx + self.offset.x, ry + self.offset.y)
    }

    /// Orientation of a port after this transform.
    pub fn apply_angle(&self, deg: f64) -> f64 {
        let a = if self.mirror_x { -deg } else { deg };
        normalize_angle(a + self.rotation)
    }

    /// The transform equivalent to applying `self` and then `outer`.
    pub fn then(&self, outer: &Transform) -> Transform {
        let rotation = if outer.mirror_x {
            outer.rotation - self.rotation
        } else {
            outer.rotation + self.rotation
        };
        Transform {
            offset: outer.apply(&self.offset),
            rotation: normalize_angle(rotation),
            mirror_x: self.mirror_x != outer.mirror_x,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.offset.approx_eq(&Point::new(0.0, 0.0)) && self.rotation == 0.0 && !self.mirror_x
    }
}

/// An electrical port: where a trace may attach to a cell.
/// The orientation points away from the geometry the port sits on.
#[derive(Debug, Clone, PartialEq)]
pub struct Port {
    pub name: String,
    pub center: Point,
    /// Degrees, one of 0 (east), 90 (north), 180 (west), 270 (south).
    pub orientation: f64,
    pub width: f64,
    pub layer: LayerId,
}

impl Port {
    pub fn new(name: &str, center: Point, orientation: f64, width: f64, layer: LayerId) -> Self {
        Self {
            name: name.to_string(),
            center,
            orientation: normalize_angle(orientation),
            width,
            layer,
        }
    }

    /// Unit vector of the orientation, if it is Manhattan.
    pub fn direction(&self) -> Option<(f64, f64)> {
        match quarter_turns(self.orientation).ok()? {
            0 => Some((1.0, 0.0)),
            1 => Some((0.0, 1.0)),
            2 => Some((-1.0, 0.0)),
            _ => Some((0.0, -1.0)),
        }
    }

    pub fn is_horizontal(&self) -> bool {
        matches!(self.direction(), Some((dx, _)) if dx != 0.0)
    }

    pub fn transformed(&self, t: &Transform) -> Port {
        Port {
            name: self.name.clone(),
            center: t.apply(&self.center),
            orientation: t.apply_angle(self.orientation),
            width: self.width,
            layer: self.layer,
        }
    }

    pub fn renamed(&self, name: &str) -> Port {
        Port {
            name: name.to_string(),
            ..self.clone()
        }
    }

    /// The same port flipped to face the opposite way.
    pub fn flipped(&self) -> Port {
        Port {
            orientation: normalize_angle(self.orientation + 180.0),
            ..self.clone()
        }
    }

    pub fn x(&self) -> f64 {
        self.center.x
    }

    pub fn y(&self) -> f64 {
        self.center.y
    }
}

/// A reference to a subcell placed within a parent cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CellInstance {
    pub cell: Arc<Cell>,
    pub transform: Transform,
}

impl CellInstance {
    pub fn new(cell: Arc<Cell>) -> Self {
        Self {
            cell,
            transform: Transform::default(),
        }
    }

    pub fn with_transform(cell: Arc<Cell>, transform: Transform) -> Self {
        Self { cell, transform }
    }

    pub fn cell_name(&self) -> &str {
        &self.cell.name
    }

    /// Bounding box in parent coordinates. An empty cell collapses to its origin.
    pub fn bbox(&self) -> BBox {
        match self.cell.bbox() {
            Some(bb) => bb.transformed(&self.transform),
            None => BBox::new(self.transform.offset, self.transform.offset),
        }
    }

    pub fn port(&self, name: &str) -> Result<Port> {
        Ok(self.cell.port(name)?.transformed(&self.transform))
    }

    pub fn ports(&self) -> Vec<Port> {
        self.cell
            .ports()
            .iter()
            .map(|p| p.transformed(&self.transform))
            .collect()
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.transform.offset = self.transform.offset.translate(dx, dy);
    }

    /// Rotate counter-clockwise about the parent origin.
    pub fn rotate(&mut self, deg: f64) -> Result<()> {
        self.transform = self.transform.then(&Transform::rotation(deg)?);
        Ok(())
    }

    /// Rotate counter-clockwise about `center` (parent coordinates).
    pub fn rotate_about(&mut self, deg: f64, center: Point) -> Result<()> {
        let mut rot = Transform::rotation(deg)?;
        let moved = rot.apply(&center);
        rot.offset = Point::new(center.x - moved.x, center.y - moved.y);
        self.transform = self.transform.then(&rot);
        Ok(())
    }

    /// Mirror about the parent x axis.
    pub fn mirror_x(&mut self) {
        let flip = Transform {
            mirror_x: true,
            ..Default::default()
        };
        self.transform = self.transform.then(&flip);
    }

    /// Rotate and move this instance so that its port `port` lands on `target`,
    /// facing it.
    pub fn connect(&mut self, port: &str, target: &Port) -> Result<()> {
        let current = self.port(port)?;
        let turn = target.orientation + 180.0 - current.orientation;
        self.rotate_about(turn, current.center)?;
        let placed = self.port(port)?;
        self.translate(
            target.center.x - placed.center.x,
            target.center.y - placed.center.y,
        );
        Ok(())
    }
}

/// A layout cell containing geometric primitives, subcell references and ports.
#[derive(Debug, Clone)]
pub struct Cell {
    pub id: CellId,
    pub name: String,
    pub geometries: Vec<GeomPrimitive>,
    pub instances: Vec<CellInstance>,
    ports: Vec<Port>,
}

/// Content equality; the identifier is ignored.
impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.geometries == other.geometries
            && self.ports == other.ports
            && self.instances == other.instances
    }
}

impl Cell {
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            geometries: Vec::new(),
            instances: Vec::new(),
            ports: Vec::new(),
        }
    }

    pub fn add_geometry(&mut self, geom: GeomPrimitive) {
        self.geometries.push(geom);
    }

    pub fn add_rect(&mut self, rect: Rect) {
        self.geometries.push(GeomPrimitive::Rect(rect));
    }

    /// Add a reference and return its index in `instances`.
    pub fn add_instance(&mut self, instance: CellInstance) -> usize {
        self.instances.push(instance);
        self.instances.len() - 1
    }

    pub fn add_port(&mut self, port: Port) -> Result<()> {
        if self.has_port(&port.name) {
            return Err(LayoutError::DuplicatePort {
                cell: self.name.clone(),
                port: port.name,
            });
        }
        self.ports.push(port);
        Ok(())
    }

    /// Re-export `ports` under `prefix` + original name.
    pub fn add_ports_prefixed<I>(&mut self, ports: I, prefix: &str) -> Result<()>
    where
        I: IntoIterator<Item = Port>,
    {
        for p in ports {
            let name = format!("{}{}", prefix, p.name);
            self.add_port(p.renamed(&name))?;
        }
        Ok(())
    }

    pub fn port(&self, name: &str) -> Result<&Port> {
        self.ports
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| LayoutError::PortNotFound {
                cell: self.name.clone(),
                port: name.to_string(),
            })
    }

    pub fn has_port(&self, name: &str) -> bool {
        self.ports.iter().any(|p| p.name == name)
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    /// Compute the bounding box of all geometry in this cell (not including subcells).
    pub fn local_bbox(&self) -> Option<BBox> {
        union_all(self.geometries.iter().filter_map(|g| g.bbox()))
    }

    /// Bounding box including every subcell.
    pub fn bbox(&self) -> Option<BBox> {
        let local = self.local_bbox();
        let children = self
            .instances
            .iter()
            .filter_map(|inst| inst.cell.bbox().map(|bb| bb.transformed(&inst.transform)));
        union_all(local.into_iter().chain(children))
    }

    /// All geometry of the hierarchy, expressed in this cell's coordinates.
    pub fn flatten(&self) -> Vec<GeomPrimitive> {
        let mut out = self.geometries.clone();
        for inst in &self.instances {
            out.extend(
                inst.cell
                    .flatten()
                    .iter()
                    .map(|g| g.transformed(&inst.transform)),
            );
        }
        out
    }

    /// Get all local geometries on a specific layer.
    pub fn geometries_on_layer(&self, layer_id: LayerId) -> Vec<&GeomPrimitive> {
        self.geometries
            .iter()
            .filter(|g| g.layer_id() == layer_id)
            .collect()
    }

    pub fn geometry_count(&self) -> usize {
        self.geometries.len()
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }
}

fn format_param(value: f64) -> String {
    format!("{}", value).replace('.', "p").replace('-', "m")
}

/// Deterministic name for a parametric cell, e.g. `transistor_LM50_LG2p5`.
pub fn cell_name(prefix: &str, params: &[(&str, f64)]) -> String {
    let mut name = prefix.to_string();
    for (key, value) in params {
        name.push('_');
        name.push_str(key);
        name.push_str(&format_param(*value));
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: LayerId = LayerId::new(2, 0);
    const NI: LayerId = LayerId::new(5, 0);

    fn block(name: &str) -> Arc<Cell> {
        let mut cell = Cell::new(name);
        cell.add_rect(Rect::new(W, 0.0, 0.0, 10.0, 4.0));
        cell.add_port(Port::new("e3", Point::new(10.0, 2.0), 0.0, 4.0, W))
            .unwrap();
        Arc::new(cell)
    }

    #[test]
    fn test_cell_bbox() {
        let mut cell = Cell::new("test_cell");
        cell.add_rect(Rect::new(W, 0.0, 0.0, 100.0, 50.0));
        cell.add_rect(Rect::new(NI, 50.0, 25.0, 200.0, 75.0));
        let bb = cell.local_bbox().unwrap();
        assert!((bb.min.x - 0.0).abs() < 1e-10);
        assert!((bb.min.y - 0.0).abs() < 1e-10);
        assert!((bb.max.x - 200.0).abs() < 1e-10);
        assert!((bb.max.y - 75.0).abs() < 1e-10);
    }

    #[test]
    fn test_hierarchical_bbox_and_flatten() {
        let child = block("child");
        let mut parent = Cell::new("parent");
        let mut inst = CellInstance::new(child);
        inst.translate(100.0, 0.0);
        parent.add_instance(inst);
        parent.add_rect(Rect::new(NI, 0.0, 0.0, 1.0, 1.0));

        let bb = parent.bbox().unwrap();
        assert!((bb.xmax() - 110.0).abs() < 1e-10);
        let flat = parent.flatten();
        assert_eq!(flat.len(), 2);
        assert_eq!(
            flat[1].bbox().unwrap(),
            BBox::new(Point::new(100.0, 0.0), Point::new(110.0, 4.0))
        );
    }

    #[test]
    fn test_transform_translate() {
        let t = Transform::translate(10.0, 20.0);
        let p = Point::new(5.0, 5.0);
        let result = t.apply(&p);
        assert!((result.x - 15.0).abs() < 1e-10);
        assert!((result.y - 25.0).abs() < 1e-10);
    }

    #[test]
    fn test_transform_composition_matches_sequential_application() {
        let inner = Transform {
            offset: Point::new(3.0, -1.0),
            rotation: 90.0,
            mirror_x: true,
        };
        let outer = Transform {
            offset: Point::new(-7.0, 2.0),
            rotation: 270.0,
            mirror_x: true,
        };
        let p = Point::new(1.5, 4.0);
        let sequential = outer.apply(&inner.apply(&p));
        let composed = inner.then(&outer).apply(&p);
        assert!(sequential.approx_eq(&composed));
        assert!(
            (inner.then(&outer).apply_angle(0.0) - outer.apply_angle(inner.apply_angle(0.0))).abs()
                < 1e-9
        );
    }

    #[test]
    fn test_rejects_odd_rotation() {
        assert_eq!(
            Transform::rotation(45.0),
            Err(LayoutError::UnsupportedRotation(45.0))
        );
    }

    #[test]
    fn test_instance_ports_follow_rotation() {
        let mut inst = CellInstance::new(block("child"));
        inst.rotate(90.0).unwrap();
        let p = inst.port("e3").unwrap();
        assert!(p.center.approx_eq(&Point::new(-2.0, 10.0)));
        assert!((p.orientation - 90.0).abs() < 1e-12);
    }

    #[test]
    fn test_connect_faces_target() {
        let target = Port::new("t", Point::new(50.0, 50.0), 90.0, 4.0, W);
        let mut inst = CellInstance::new(block("child"));
        inst.connect("e3", &target).unwrap();
        let p = inst.port("e3").unwrap();
        assert!(p.center.approx_eq(&target.center));
        assert!((p.orientation - 270.0).abs() < 1e-12);
        // The block now hangs above the target port.
        assert!(inst.bbox().ymin() >= 50.0 - 1e-9);
    }

    #[test]
    fn test_duplicate_port_rejected() {
        let mut cell = Cell::new("c");
        let p = Port::new("e1", Point::new(0.0, 0.0), 180.0, 1.0, W);
        cell.add_port(p.clone()).unwrap();
        assert!(matches!(
            cell.add_port(p),
            Err(LayoutError::DuplicatePort { .. })
        ));
        assert!(cell.port("e9").is_err());
    }

    #[test]
    fn test_content_equality_ignores_id() {
        let a = block("same");
        let b = block("same");
        assert_ne!(a.id, b.id);
        assert_eq!(*a, *b);
    }

    #[test]
    fn test_cell_name_encoding() {
        assert_eq!(
            cell_name("transistor", &[("LM", 50.0), ("LG", 2.5), ("X", -1.0)]),
            "transistor_LM50_LG2p5_Xm1"
        );
    }
}
