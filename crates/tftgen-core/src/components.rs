//! Generic parametric cells that the process-specific cells are built from.

use std::sync::Arc;

use crate::cell::{cell_name, Cell, CellInstance, Port};
use crate::cross_section::CrossSection;
use crate::error::{LayoutError, Result};
use crate::geometry::{GeomPrimitive, Path, Point, Rect};
use crate::LayerId;

fn layer_params(layer: LayerId) -> [(&'static str, f64); 2] {
    [("L", layer.layer as f64), ("D", layer.datatype as f64)]
}

/// Ports `e1`..`e4` on the west, north, east and south edge midpoints of `rect`.
fn edge_ports(cell: &mut Cell, rect: &Rect) -> Result<()> {
    let bb = rect.bbox();
    let c = bb.center();
    let layer = rect.layer_id;
    cell.add_port(Port::new("e1", Point::new(bb.xmin(), c.y), 180.0, bb.height(), layer))?;
    cell.add_port(Port::new("e2", Point::new(c.x, bb.ymax()), 90.0, bb.width(), layer))?;
    cell.add_port(Port::new("e3", Point::new(bb.xmax(), c.y), 0.0, bb.height(), layer))?;
    cell.add_port(Port::new("e4", Point::new(c.x, bb.ymin()), 270.0, bb.width(), layer))?;
    Ok(())
}

fn check_size(component: &str, size: (f64, f64)) -> Result<()> {
    if size.0 <= 0.0 || size.1 <= 0.0 {
        return Err(LayoutError::invalid(
            component,
            format!("size must be positive, got ({}, {})", size.0, size.1),
        ));
    }
    Ok(())
}

/// A `size` rectangle with its lower-left corner at the origin.
pub fn rectangle(size: (f64, f64), layer: LayerId) -> Result<Arc<Cell>> {
    check_size("rectangle", size)?;
    let [l, d] = layer_params(layer);
    let mut cell = Cell::new(&cell_name("rectangle", &[("W", size.0), ("H", size.1), l, d]));
    let rect = Rect::new(layer, 0.0, 0.0, size.0, size.1);
    edge_ports(&mut cell, &rect)?;
    cell.add_rect(rect);
    Ok(Arc::new(cell))
}

/// A `size` rectangle centred on the origin, with an extra `pad` port at its centre.
pub fn pad(size: (f64, f64), layer: LayerId) -> Result<Arc<Cell>> {
    check_size("pad", size)?;
    let [l, d] = layer_params(layer);
    let mut cell = Cell::new(&cell_name("pad", &[("W", size.0), ("H", size.1), l, d]));
    let rect = Rect::centered(layer, Point::new(0.0, 0.0), size.0, size.1);
    edge_ports(&mut cell, &rect)?;
    cell.add_port(Port::new("pad", Point::new(0.0, 0.0), 0.0, size.0, layer))?;
    cell.add_rect(rect);
    Ok(Arc::new(cell))
}

/// A horizontal trace of `length` from the origin eastwards.
pub fn straight(length: f64, xs: &CrossSection) -> Result<Arc<Cell>> {
    check_size("straight", (length, xs.width))?;
    let mut cell = Cell::new(&cell_name(
        &format!("straight_{}", xs.name),
        &[("L", length), ("W", xs.width)],
    ));
    let start = Point::new(0.0, 0.0);
    let end = Point::new(length, 0.0);
    cell.add_geometry(GeomPrimitive::Path(Path::new(xs.layer, vec![start, end], xs.width)));
    cell.add_port(Port::new(&xs.port_names[0], start, 180.0, xs.width, xs.layer))?;
    cell.add_port(Port::new(&xs.port_names[1], end, 0.0, xs.width, xs.layer))?;
    Ok(Arc::new(cell))
}

/// Parameters of a serpentine thin-film resistor between two pads.
#[derive(Debug, Clone, PartialEq)]
pub struct MeanderParams {
    pub pad_size: (f64, f64),
    /// Resistance in squares of the wire.
    pub num_squares: f64,
    /// Wire width.
    pub width: f64,
    pub res_layer: LayerId,
    pub pad_layer: LayerId,
}

/// Serpentine resistor. Rows run at a pitch of twice the wire width and are
/// joined alternately at the right and left ends; the first row leads into
/// the left pad and the last into the right pad.
///
/// The row count is odd so the meander starts and ends on the pads' shared
/// centre line, and is reduced until every row is at least one square long.
pub fn meander(params: &MeanderParams) -> Result<Arc<Cell>> {
    const NAME: &str = "meander";
    let (px, py) = params.pad_size;
    let w = params.width;
    check_size(NAME, params.pad_size)?;
    if w <= 0.0 {
        return Err(LayoutError::invalid(NAME, "wire width must be positive"));
    }
    if w > py {
        return Err(LayoutError::invalid(
            NAME,
            format!("wire width {} exceeds pad height {}", w, py),
        ));
    }
    if params.num_squares <= 0.0 {
        return Err(LayoutError::invalid(NAME, "number of squares must be positive"));
    }

    let total = params.num_squares * w;
    let mut rows = ((py / (2.0 * w)).floor() as i64).max(1);
    if rows % 2 == 0 {
        rows -= 1;
    }
    let row_len = loop {
        let n = rows as f64;
        let len = (total - (n - 1.0) * w - 2.0 * w) / n;
        if len >= w || rows == 1 {
            break len;
        }
        rows -= 2;
    };
    if row_len < w {
        return Err(LayoutError::invalid(
            NAME,
            format!("{} squares are too few for a {} wide wire", params.num_squares, w),
        ));
    }

    let [l, d] = layer_params(params.res_layer);
    let mut cell = Cell::new(&cell_name(
        NAME,
        &[("PX", px), ("PY", py), ("N", params.num_squares), ("W", w), l, d],
    ));

    let span = row_len + 2.0 * w;
    let n = rows as usize;
    let row_y = |i: usize| (n as f64 - 1.0) * w - i as f64 * 2.0 * w;
    for i in 0..n {
        let y = row_y(i);
        let x0 = if i == 0 { 0.0 } else { w };
        let x1 = if i == n - 1 { span } else { w + row_len };
        cell.add_rect(Rect::new(params.res_layer, x0, y - w / 2.0, x1, y + w / 2.0));
        if i + 1 < n {
            let (cx0, cx1) = if i % 2 == 0 {
                (row_len, row_len + w)
            } else {
                (w, 2.0 * w)
            };
            cell.add_rect(Rect::new(
                params.res_layer,
                cx0,
                row_y(i + 1) + w / 2.0,
                cx1,
                y - w / 2.0,
            ));
        }
    }

    cell.add_rect(Rect::new(params.pad_layer, -px, -py / 2.0, 0.0, py / 2.0));
    cell.add_rect(Rect::new(params.pad_layer, span, -py / 2.0, span + px, py / 2.0));
    cell.add_port(Port::new("e1", Point::new(-px, 0.0), 180.0, py, params.pad_layer))?;
    cell.add_port(Port::new("e2", Point::new(span + px, 0.0), 0.0, py, params.pad_layer))?;

    log::debug!("{}: {} rows of {:.3} um", cell.name, rows, row_len);
    Ok(Arc::new(cell))
}

/// `columns` x `rows` references of `cell` at a pitch of its size plus `spacing`.
/// Ports are re-exported as `<port>_<row>_<column>`, counting from 1.
pub fn array(cell: &Arc<Cell>, columns: usize, rows: usize, spacing: (f64, f64)) -> Result<Arc<Cell>> {
    if columns == 0 || rows == 0 {
        return Err(LayoutError::invalid("array", "array needs at least one column and row"));
    }
    let bb = cell
        .bbox()
        .ok_or_else(|| LayoutError::invalid("array", format!("cell '{}' is empty", cell.name)))?;
    let pitch = (bb.width() + spacing.0, bb.height() + spacing.1);

    let prefix = cell_name(
        "array",
        &[
            ("C", columns as f64),
            ("R", rows as f64),
            ("SX", spacing.0),
            ("SY", spacing.1),
        ],
    );
    let mut out = Cell::new(&format!("{}_{}", prefix, cell.name));
    for r in 0..rows {
        for c in 0..columns {
            let mut inst = CellInstance::new(cell.clone());
            inst.translate(
                c as f64 * pitch.0 - bb.xmin(),
                r as f64 * pitch.1 - bb.ymin(),
            );
            for port in inst.ports() {
                let name = format!("{}_{}_{}", port.name, r + 1, c + 1);
                out.add_port(port.renamed(&name))?;
            }
            out.add_instance(inst);
        }
    }
    Ok(Arc::new(out))
}
