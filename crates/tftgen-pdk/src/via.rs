use std::sync::Arc;

use tftgen_core::cell::cell_name;
use tftgen_core::components::{pad, rectangle};
use tftgen_core::{Cell, CellInstance, Placeable};

use crate::error::{PdkError, Result};
use crate::layers::{AL2O3, NI_CONTACTS, W_GATE};

pub const DEFAULT_VIA_SIZE: (f64, f64) = (20.0, 20.0);
pub const DEFAULT_VIA_INSET: f64 = 2.0;

/// Nickel-to-tungsten via: W pad, an Al2O3 opening `inset` inside it, and a
/// Ni pad of the same size, all centred on the origin.
///
/// Ports: `top_e1`..`top_e4` and `top_pad` on Ni, `bot_e1`..`bot_e4` and
/// `bot_pad` on W.
pub fn via(size: (f64, f64), inset: f64) -> Result<Arc<Cell>> {
    let opening = (size.0 - 2.0 * inset, size.1 - 2.0 * inset);
    if inset < 0.0 || opening.0 <= 0.0 || opening.1 <= 0.0 {
        return Err(PdkError::invalid(
            "via",
            format!("inset {} leaves no opening in a {:?} via", inset, size),
        ));
    }

    let mut c = Cell::new(&cell_name(
        "via",
        &[("W", size.0), ("H", size.1), ("I", inset)],
    ));
    let top = CellInstance::new(pad(size, NI_CONTACTS)?);
    let mut cut = CellInstance::new(rectangle(opening, AL2O3)?);
    let bottom = CellInstance::new(pad(size, W_GATE)?);
    cut.set_center(Placeable::bbox(&top).center());

    c.add_ports_prefixed(top.ports(), "top_")?;
    c.add_ports_prefixed(bottom.ports(), "bot_")?;
    c.add_instance(top);
    c.add_instance(cut);
    c.add_instance(bottom);
    Ok(Arc::new(c))
}

/// Via with the default size and inset.
pub fn default_via() -> Result<Arc<Cell>> {
    via(DEFAULT_VIA_SIZE, DEFAULT_VIA_INSET)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tftgen_core::Point;

    #[test]
    fn test_via_layers_and_ports() {
        let v = default_via().unwrap();
        let bb = v.bbox().unwrap();
        assert!(bb.center().approx_eq(&Point::new(0.0, 0.0)));
        assert!((bb.width() - 20.0).abs() < 1e-12);

        let flat = v.flatten();
        let cut = flat.iter().find(|g| g.layer_id() == AL2O3).unwrap();
        let cut = cut.bbox().unwrap();
        assert!((cut.width() - 16.0).abs() < 1e-12);
        assert!(cut.center().approx_eq(&Point::new(0.0, 0.0)));

        assert_eq!(v.port("top_e2").unwrap().layer, NI_CONTACTS);
        assert_eq!(v.port("bot_e4").unwrap().layer, W_GATE);
        assert!(v.port("bot_e4").unwrap().center.approx_eq(&Point::new(0.0, -10.0)));
    }

    #[test]
    fn test_inset_too_large() {
        assert!(via((4.0, 20.0), 2.0).is_err());
        assert!(via((20.0, 20.0), -1.0).is_err());
    }
}
