use std::sync::Arc;

use serde::{Deserialize, Serialize};

use tftgen_core::cell::cell_name;
use tftgen_core::components::rectangle;
use tftgen_core::{Cell, CellInstance, Placeable};

use crate::error::{PdkError, Result};
use crate::layers::{ITO_CHANNEL, NI_CONTACTS, W_GATE};

/// Bottom-gate ITO transistor geometry, in micrometres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransistorParams {
    /// Length of the ITO mesa along the current path.
    pub l_mesa: f64,
    /// Gap between source and drain.
    pub l_gate: f64,
    /// How far the gate reaches under source and drain.
    pub l_overlap: f64,
    /// Channel width.
    pub w_mesa: f64,
}

impl Default for TransistorParams {
    fn default() -> Self {
        Self {
            l_mesa: 8.0,
            l_gate: 2.0,
            l_overlap: 2.0,
            w_mesa: 12.0,
        }
    }
}

impl TransistorParams {
    pub fn new(l_mesa: f64, l_gate: f64, l_overlap: f64, w_mesa: f64) -> Self {
        Self {
            l_mesa,
            l_gate,
            l_overlap,
            w_mesa,
        }
    }

    /// Length of each source/drain contact.
    pub fn l_sd(&self) -> f64 {
        (self.l_mesa - self.l_gate) / 2.0 + 4.0
    }

    /// Width of the source/drain contacts.
    pub fn w_contact(&self) -> f64 {
        self.w_mesa + 4.0
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(PdkError::invalid("transistor", msg));
        for (name, v) in [
            ("l_mesa", self.l_mesa),
            ("l_gate", self.l_gate),
            ("w_mesa", self.w_mesa),
        ] {
            if !(v > 0.0) {
                return invalid(format!("{} must be positive, got {}", name, v));
            }
        }
        if !(self.l_overlap >= 0.0) {
            return invalid(format!("l_overlap must not be negative, got {}", self.l_overlap));
        }
        if self.l_gate >= self.l_mesa {
            return invalid(format!(
                "gate length {} must be below mesa length {}",
                self.l_gate, self.l_mesa
            ));
        }
        Ok(())
    }

    pub(crate) fn name_params(&self) -> [(&'static str, f64); 4] {
        [
            ("LM", self.l_mesa),
            ("LG", self.l_gate),
            ("LO", self.l_overlap),
            ("WM", self.w_mesa),
        ]
    }
}

/// An ITO transistor: mesa on ITO, gate on W centred under it, and nickel
/// source and drain either side of the gate gap.
///
/// Ports: `g1` (gate north), `g2` (gate south), `s` (source west), `d` (drain east).
pub fn transistor(p: &TransistorParams) -> Result<Arc<Cell>> {
    p.validate()?;
    let l_sd = p.l_sd();
    let w_contact = p.w_contact();

    let mut c = Cell::new(&cell_name("transistor", &p.name_params()));

    let mesa = CellInstance::new(rectangle((p.l_mesa, p.w_mesa), ITO_CHANNEL)?);
    let center = Placeable::bbox(&mesa).center();

    let mut gate = CellInstance::new(rectangle(
        (p.l_gate + 2.0 * p.l_overlap, w_contact + 8.0),
        W_GATE,
    )?);
    gate.set_center(center);

    let contact = rectangle((l_sd, w_contact), NI_CONTACTS)?;
    let mut source = CellInstance::new(contact.clone());
    source.set_center(center).movex(-(l_sd + p.l_gate) / 2.0);
    let mut drain = CellInstance::new(contact);
    drain.set_center(center).movex((l_sd + p.l_gate) / 2.0);

    c.add_port(gate.port("e2")?.renamed("g1"))?;
    c.add_port(gate.port("e4")?.renamed("g2"))?;
    c.add_port(source.port("e1")?.renamed("s"))?;
    c.add_port(drain.port("e3")?.renamed("d"))?;

    c.add_instance(mesa);
    c.add_instance(gate);
    c.add_instance(source);
    c.add_instance(drain);
    Ok(Arc::new(c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tftgen_core::Point;

    #[test]
    fn test_default_transistor_ports() {
        let t = transistor(&TransistorParams::default()).unwrap();
        assert_eq!(t.name, "transistor_LM8_LG2_LO2_WM12");
        // Mesa centre is (4, 6); contacts are 7 long and 16 wide.
        let s = t.port("s").unwrap();
        assert!(s.center.approx_eq(&Point::new(-4.0, 6.0)));
        assert!((s.width - 16.0).abs() < 1e-12);
        assert!((s.orientation - 180.0).abs() < 1e-12);
        let d = t.port("d").unwrap();
        assert!(d.center.approx_eq(&Point::new(12.0, 6.0)));
        let g1 = t.port("g1").unwrap();
        assert!(g1.center.approx_eq(&Point::new(4.0, 18.0)));
        assert!((g1.width - 6.0).abs() < 1e-12);
        let g2 = t.port("g2").unwrap();
        assert!(g2.center.approx_eq(&Point::new(4.0, -6.0)));
        assert_eq!(g2.layer, W_GATE);
    }

    #[test]
    fn test_source_drain_gap_is_gate_length() {
        let p = TransistorParams::new(50.0, 20.0, 10.0, 20.0);
        let t = transistor(&p).unwrap();
        let contacts: Vec<_> = t
            .flatten()
            .into_iter()
            .filter(|g| g.layer_id() == NI_CONTACTS)
            .filter_map(|g| g.bbox())
            .collect();
        assert_eq!(contacts.len(), 2);
        assert!((contacts[0].gap_to(&contacts[1]) - 20.0).abs() < 1e-9);
        assert!((contacts[0].width() - p.l_sd()).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(transistor(&TransistorParams::new(8.0, 8.0, 2.0, 12.0)).is_err());
        assert!(transistor(&TransistorParams::new(8.0, 2.0, -1.0, 12.0)).is_err());
        assert!(transistor(&TransistorParams::new(8.0, 2.0, 2.0, 0.0)).is_err());
        assert!(transistor(&TransistorParams::new(f64::NAN, 2.0, 2.0, 1.0)).is_err());
    }
}
