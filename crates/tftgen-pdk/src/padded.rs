use std::sync::Arc;

use tftgen_core::cell::cell_name;
use tftgen_core::{Cell, CellInstance, LayoutError, Placeable, Point, Port, Rect};

use crate::error::{PdkError, Result};
use crate::transistor::{transistor, TransistorParams};

pub const DEFAULT_PAD_LENGTH: f64 = 10.0;

/// Extend `port` outward by `length` with a rectangle at least `width` wide.
/// Returns the stub and the port moved to its far end.
fn extend_port(port: &Port, length: f64, width: f64) -> Result<(Rect, Port)> {
    let (dx, dy) = port.direction().ok_or_else(|| {
        LayoutError::Routing(format!(
            "port '{}' has non-Manhattan orientation {}",
            port.name, port.orientation
        ))
    })?;
    let w = port.width.max(width);
    let end = Point::new(port.x() + dx * length, port.y() + dy * length);
    let rect = if port.is_horizontal() {
        Rect::new(port.layer, port.x(), port.y() - w / 2.0, end.x, end.y + w / 2.0)
    } else {
        Rect::new(port.layer, port.x() - w / 2.0, port.y(), end.x + w / 2.0, end.y)
    };
    let moved = Port::new(&port.name, end, port.orientation, width, port.layer);
    Ok((rect, moved))
}

/// A transistor, centred on the origin, whose four ports are widened to
/// `routing_width` by stubs `pad_length` long so full-width traces can land
/// on them.
pub fn padded_transistor(
    params: &TransistorParams,
    routing_width: f64,
    pad_length: f64,
) -> Result<Arc<Cell>> {
    if !(routing_width > 0.0 && pad_length > 0.0) {
        return Err(PdkError::invalid(
            "padded_transistor",
            format!(
                "routing width {} and pad length {} must be positive",
                routing_width, pad_length
            ),
        ));
    }
    let mut t = CellInstance::new(transistor(params)?);
    t.set_center(Point::new(0.0, 0.0));

    let mut name_params = params.name_params().to_vec();
    name_params.push(("RW", routing_width));
    name_params.push(("PL", pad_length));
    let mut c = Cell::new(&cell_name("padded_transistor", &name_params));

    for name in ["g1", "g2", "s", "d"] {
        let (stub, port) = extend_port(&t.port(name)?, pad_length, routing_width)?;
        c.add_rect(stub);
        c.add_port(port)?;
    }
    c.add_instance(t);
    Ok(Arc::new(c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::{NI_CONTACTS, W_GATE};

    #[test]
    fn test_ports_move_out_and_widen() {
        let p = TransistorParams::default();
        let c = padded_transistor(&p, 50.0, 10.0).unwrap();
        // Bare transistor is 16 x 24 centred on the origin.
        let s = c.port("s").unwrap();
        assert!(s.center.approx_eq(&Point::new(-18.0, 0.0)));
        assert!((s.width - 50.0).abs() < 1e-12);
        assert_eq!(s.layer, NI_CONTACTS);
        let g2 = c.port("g2").unwrap();
        assert!(g2.center.approx_eq(&Point::new(0.0, -22.0)));
        assert_eq!(g2.layer, W_GATE);

        // Gate stubs are 50 wide, source/drain stubs reach 18 out.
        let bb = c.bbox().unwrap();
        assert!((bb.width() - 50.0).abs() < 1e-9);
        assert!((c.port("d").unwrap().x() - 18.0).abs() < 1e-9);
        assert!((bb.height() - 50.0).abs() < 1e-9);
        assert_eq!(c.geometry_count(), 4);
    }

    #[test]
    fn test_wide_ports_keep_their_width() {
        let p = TransistorParams::new(50.0, 20.0, 10.0, 80.0);
        let c = padded_transistor(&p, 50.0, 10.0).unwrap();
        let s_stub = c
            .geometries_on_layer(NI_CONTACTS)
            .into_iter()
            .filter_map(|g| g.bbox())
            .next()
            .unwrap();
        // Contact is 84 wide, wider than the routing.
        assert!((s_stub.height() - 84.0).abs() < 1e-9);
        assert!((c.port("s").unwrap().width - 50.0).abs() < 1e-12);
    }
}
