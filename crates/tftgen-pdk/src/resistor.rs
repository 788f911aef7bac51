use std::sync::Arc;

use serde::{Deserialize, Serialize};

use tftgen_core::cell::cell_name;
use tftgen_core::components::{meander, MeanderParams};
use tftgen_core::{Cell, CellInstance, Placeable, Point, Port, Rect};

use crate::error::{PdkError, Result};
use crate::layers::{ITO_CHANNEL, NI_CONTACTS, W_GATE};
use crate::via::{via, DEFAULT_VIA_INSET};

/// Length of the meander's end pads.
const MEANDER_PAD_LENGTH: f64 = 12.0;
/// Wire width of the tungsten meander.
const MEANDER_WIRE_WIDTH: f64 = 2.0;

/// Tungsten meander of `length` squares between two `width` high pads, with
/// a via over each pad so that either metal can contact it.
///
/// Ports: `bot_e1`/`bot_e2` (W) and `top_e1`/`top_e2` (Ni) on the west and
/// east ends, all `width` wide.
pub fn resistor(length: f64, width: f64) -> Result<Arc<Cell>> {
    let pad_size = (MEANDER_PAD_LENGTH, width);
    let res = CellInstance::new(meander(&MeanderParams {
        pad_size,
        num_squares: length,
        width: MEANDER_WIRE_WIDTH,
        res_layer: W_GATE,
        pad_layer: W_GATE,
    })?);
    let bb = Placeable::bbox(&res);

    let pad_via = via(pad_size, DEFAULT_VIA_INSET)?;
    let mut v1 = CellInstance::new(pad_via.clone());
    v1.set_y(bb.center().y).set_xmin(bb.xmin());
    let mut v2 = CellInstance::new(pad_via);
    v2.set_y(bb.center().y).set_xmax(bb.xmax());

    let mut c = Cell::new(&cell_name("resistor", &[("L", length), ("W", width)]));
    let west = Point::new(bb.xmin(), bb.center().y);
    let east = Point::new(bb.xmax(), bb.center().y);
    c.add_port(Port::new("bot_e1", west, 180.0, width, W_GATE))?;
    c.add_port(Port::new("bot_e2", east, 0.0, width, W_GATE))?;
    c.add_port(Port::new("top_e1", west, 180.0, width, NI_CONTACTS))?;
    c.add_port(Port::new("top_e2", east, 0.0, width, NI_CONTACTS))?;

    c.add_instance(res);
    c.add_instance(v1);
    c.add_instance(v2);
    Ok(Arc::new(c))
}

/// Straight ITO film resistor with nickel contacts at both ends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItoResistorParams {
    /// Squares of exposed ITO between the contacts.
    pub length: f64,
    pub width: f64,
    /// Length of each nickel contact.
    pub contact_length: f64,
    /// How far each contact reaches over the ITO strip.
    pub overlap: f64,
}

impl Default for ItoResistorParams {
    fn default() -> Self {
        Self {
            length: 10.0,
            width: 20.0,
            contact_length: 20.0,
            overlap: 4.0,
        }
    }
}

/// ITO strip whose exposed part is `length` squares, covered at each end by
/// a nickel contact that overlaps it by `overlap` and encloses it sideways
/// by the same amount.
///
/// Ports: `top_e1`/`top_e2` (Ni) on the outer contact edges.
pub fn resistor_ito(p: &ItoResistorParams) -> Result<Arc<Cell>> {
    if !(p.length > 0.0 && p.width > 0.0 && p.contact_length > 0.0) {
        return Err(PdkError::invalid(
            "resistor_ito",
            format!(
                "length {}, width {} and contact length {} must be positive",
                p.length, p.width, p.contact_length
            ),
        ));
    }
    if !(p.overlap >= 0.0 && p.overlap <= p.contact_length) {
        return Err(PdkError::invalid(
            "resistor_ito",
            format!(
                "overlap {} must lie within the contact length {}",
                p.overlap, p.contact_length
            ),
        ));
    }

    let exposed = p.length * p.width;
    let contact_h = p.width + 2.0 * p.overlap;
    let mut c = Cell::new(&cell_name(
        "resistor_ito",
        &[
            ("L", p.length),
            ("W", p.width),
            ("CL", p.contact_length),
            ("O", p.overlap),
        ],
    ));
    c.add_rect(Rect::new(
        ITO_CHANNEL,
        -p.overlap,
        -p.width / 2.0,
        exposed + p.overlap,
        p.width / 2.0,
    ));
    let left = Rect::new(NI_CONTACTS, -p.contact_length, -contact_h / 2.0, 0.0, contact_h / 2.0);
    let right = Rect::new(
        NI_CONTACTS,
        exposed,
        -contact_h / 2.0,
        exposed + p.contact_length,
        contact_h / 2.0,
    );
    c.add_port(Port::new(
        "top_e1",
        Point::new(left.lower_left.x, 0.0),
        180.0,
        contact_h,
        NI_CONTACTS,
    ))?;
    c.add_port(Port::new(
        "top_e2",
        Point::new(right.upper_right.x, 0.0),
        0.0,
        contact_h,
        NI_CONTACTS,
    ))?;
    c.add_rect(left);
    c.add_rect(right);
    Ok(Arc::new(c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tftgen_core::geometry::GeomPrimitive;

    #[test]
    fn test_resistor_ports_at_meander_ends() {
        let r = resistor(100.0, 20.0).unwrap();
        let bb = r.bbox().unwrap();
        let e1 = r.port("top_e1").unwrap();
        let e2 = r.port("bot_e2").unwrap();
        assert!((e1.x() - bb.xmin()).abs() < 1e-9);
        assert!((e2.x() - bb.xmax()).abs() < 1e-9);
        assert!((e1.width - 20.0).abs() < 1e-12);
        assert!((bb.height() - 20.0).abs() < 1e-9);
        // One meander and two vias.
        assert_eq!(r.instance_count(), 3);
    }

    #[test]
    fn test_vias_cover_the_pads() {
        let r = resistor(100.0, 50.0).unwrap();
        let meander_bb = Placeable::bbox(&r.instances[0]);
        let v1 = Placeable::bbox(&r.instances[1]);
        let v2 = Placeable::bbox(&r.instances[2]);
        assert!((v1.xmin() - meander_bb.xmin()).abs() < 1e-9);
        assert!((v2.xmax() - meander_bb.xmax()).abs() < 1e-9);
        assert!((v1.width() - 12.0).abs() < 1e-9);
        assert!((v1.height() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_ito_resistor_geometry() {
        let p = ItoResistorParams::default();
        let r = resistor_ito(&p).unwrap();
        let strip = r
            .geometries
            .iter()
            .find(|g| g.layer_id() == ITO_CHANNEL)
            .and_then(GeomPrimitive::bbox)
            .unwrap();
        assert!((strip.width() - (200.0 + 8.0)).abs() < 1e-9);
        let e1 = r.port("top_e1").unwrap();
        let e2 = r.port("top_e2").unwrap();
        assert!((e2.x() - e1.x() - 240.0).abs() < 1e-9);
        assert!((e1.width - 28.0).abs() < 1e-12);
    }

    #[test]
    fn test_ito_resistor_rejects_bad_overlap() {
        let p = ItoResistorParams {
            overlap: 30.0,
            ..Default::default()
        };
        assert!(resistor_ito(&p).is_err());
        let p = ItoResistorParams {
            length: 0.0,
            ..Default::default()
        };
        assert!(resistor_ito(&p).is_err());
    }
}
