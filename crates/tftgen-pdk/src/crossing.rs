use std::sync::Arc;

use tftgen_core::cell::cell_name;
use tftgen_core::components::straight;
use tftgen_core::{Cell, CellInstance, Placeable};

use crate::cross_section::{metal_routing_ni, metal_routing_w};
use crate::error::{PdkError, Result};
use crate::via::{via, DEFAULT_VIA_INSET};

/// Nickel trace crossing over a tungsten underpass.
///
/// ```text
///     |
///     :
/// ==========
///     :
///     |
/// ```
///
/// The north-south signal drops through a via onto a W underpass of length
/// `cross_width + 2 * spacing` and comes back up through a second via; the
/// east-west Ni trace of the same length passes over the middle.
///
/// Ports: `e1`/`e3` (Ni, west/east), `e2`/`e4` (Ni via tops, north/south).
pub fn crossing_ni(cross_width: f64, spacing: f64) -> Result<Arc<Cell>> {
    if !(cross_width > 0.0 && spacing > 0.0) {
        return Err(PdkError::invalid(
            "crossing_ni",
            format!(
                "cross width {} and spacing {} must be positive",
                cross_width, spacing
            ),
        ));
    }
    let length = cross_width + 2.0 * spacing;

    let mut c = Cell::new(&cell_name(
        "crossing_ni",
        &[("CW", cross_width), ("S", spacing)],
    ));

    let mut bot = CellInstance::new(straight(length, &metal_routing_w(cross_width))?);
    bot.rotate(90.0)?;
    let bot_bb = Placeable::bbox(&bot);

    let v = via((cross_width, cross_width), DEFAULT_VIA_INSET)?;
    let mut v1 = CellInstance::new(v.clone());
    v1.set_x(bot_bb.center().x).set_ymin(bot_bb.ymax());
    let mut v2 = CellInstance::new(v);
    v2.set_x(bot_bb.center().x).set_ymax(bot_bb.ymin());

    let mut top = CellInstance::new(straight(length, &metal_routing_ni(cross_width))?);
    top.set_center(bot_bb.center());

    c.add_port(top.port("e1")?)?;
    c.add_port(top.port("e2")?.renamed("e3"))?;
    c.add_port(v1.port("top_e2")?.renamed("e2"))?;
    c.add_port(v2.port("top_e4")?.renamed("e4"))?;

    c.add_instance(bot);
    c.add_instance(v1);
    c.add_instance(v2);
    c.add_instance(top);
    Ok(Arc::new(c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::NI_CONTACTS;
    use tftgen_core::Point;

    #[test]
    fn test_crossing_ports() {
        let c = crossing_ni(20.0, 5.0).unwrap();
        let e1 = c.port("e1").unwrap();
        let e3 = c.port("e3").unwrap();
        assert!(e1.center.approx_eq(&Point::new(-15.0, 15.0)));
        assert!(e3.center.approx_eq(&Point::new(15.0, 15.0)));
        assert!((e3.orientation).abs() < 1e-12);
        let e2 = c.port("e2").unwrap();
        let e4 = c.port("e4").unwrap();
        assert!(e2.center.approx_eq(&Point::new(0.0, 50.0)));
        assert!(e4.center.approx_eq(&Point::new(0.0, -20.0)));
        assert!((e4.orientation - 270.0).abs() < 1e-12);
        assert_eq!(e2.layer, NI_CONTACTS);
    }

    #[test]
    fn test_over_trace_clears_the_vias() {
        let c = crossing_ni(20.0, 5.0).unwrap();
        let ni: Vec<_> = c
            .flatten()
            .into_iter()
            .filter(|g| g.layer_id() == NI_CONTACTS)
            .filter_map(|g| g.bbox())
            .collect();
        // Two via pads and the crossing trace, none touching.
        assert_eq!(ni.len(), 3);
        for (i, a) in ni.iter().enumerate() {
            for b in &ni[i + 1..] {
                assert!(a.gap_to(b) >= 5.0 - 1e-9);
            }
        }
    }
}
