//! Single devices wired out to probe pads.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use tftgen_core::cell::cell_name;
use tftgen_core::components::pad;
use tftgen_core::routing::{route_channel, route_single, ChannelPin};
use tftgen_core::{Cell, CellInstance, Placeable, Port};

use crate::cross_section::{metal_routing_ni, metal_routing_w, DEFAULT_ROUTING_WIDTH};
use crate::error::{PdkError, Result};
use crate::layers::NI_CONTACTS;
use crate::logic::{inverter, LogicParams};
use crate::padded::{padded_transistor, DEFAULT_PAD_LENGTH};
use crate::resistor::{resistor, resistor_ito, ItoResistorParams};
use crate::transistor::TransistorParams;
use crate::via::{via, DEFAULT_VIA_INSET};

/// Probe pad and fan-out dimensions shared by all test structures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeParams {
    /// Side of the square probe pads.
    pub pad_size: f64,
    pub routing_width: f64,
    /// Length of the stubs widening device ports to the routing width.
    pub pad_length: f64,
}

impl Default for ProbeParams {
    fn default() -> Self {
        Self {
            pad_size: 100.0,
            routing_width: DEFAULT_ROUTING_WIDTH,
            pad_length: DEFAULT_PAD_LENGTH,
        }
    }
}

impl ProbeParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.pad_size > 0.0 && self.routing_width > 0.0 && self.pad_length > 0.0) {
            return Err(PdkError::invalid(
                "probe",
                format!(
                    "pad size {}, routing width {} and pad length {} must be positive",
                    self.pad_size, self.routing_width, self.pad_length
                ),
            ));
        }
        Ok(())
    }

    fn name_params(&self) -> [(&'static str, f64); 3] {
        [
            ("P", self.pad_size),
            ("RW", self.routing_width),
            ("PL", self.pad_length),
        ]
    }

    fn ni_pad(&self) -> Result<Arc<Cell>> {
        Ok(pad((self.pad_size, self.pad_size), NI_CONTACTS)?)
    }
}

/// Ni pad placed `gap` beyond an east or west facing `port`, joined to it by a
/// straight Ni trace. Returns the pad centre port.
fn pad_beside(c: &mut Cell, pad_cell: &Arc<Cell>, port: &Port, gap: f64, width: f64) -> Result<Port> {
    let mut inst = CellInstance::new(pad_cell.clone());
    let landing = if port.orientation < 90.0 {
        inst.set_y(port.y()).set_xmin(port.x() + gap);
        inst.port("e1")?
    } else {
        inst.set_y(port.y()).set_xmax(port.x() - gap);
        inst.port("e3")?
    };
    route_single(c, port, &landing, &metal_routing_ni(width))?;
    let center = inst.port("pad")?;
    c.add_instance(inst);
    Ok(center)
}

/// Padded transistor with source and drain pads west and east and a via
/// pad below the gate.
///
/// Ports: `pad_s`, `pad_d`, `pad_g` at the pad centres.
pub fn transistor_test(params: &TransistorParams, probe: &ProbeParams) -> Result<Arc<Cell>> {
    probe.validate()?;
    let rw = probe.routing_width;
    let p = probe.pad_size;
    let fet = CellInstance::new(padded_transistor(params, rw, probe.pad_length)?);

    let mut name_params = params.name_params().to_vec();
    name_params.extend(probe.name_params());
    let mut c = Cell::new(&cell_name("transistor_test", &name_params));

    let ni_pad = probe.ni_pad()?;
    let pad_s = pad_beside(&mut c, &ni_pad, &fet.port("s")?, rw, rw)?;
    let pad_d = pad_beside(&mut c, &ni_pad, &fet.port("d")?, rw, rw)?;

    let g2 = fet.port("g2")?;
    let mut gate_pad = CellInstance::new(via((p, p), DEFAULT_VIA_INSET)?);
    gate_pad.set_x(g2.x()).set_ymax(g2.y() - rw);
    route_single(&mut c, &g2, &gate_pad.port("bot_e2")?, &metal_routing_w(rw))?;
    let pad_g = gate_pad.port("top_pad")?;

    c.add_port(pad_s.renamed("pad_s"))?;
    c.add_port(pad_d.renamed("pad_d"))?;
    c.add_port(pad_g.renamed("pad_g"))?;
    c.add_instance(fet);
    c.add_instance(gate_pad);
    Ok(Arc::new(c))
}

/// Inverter whose four pins run through a channel to a row of pads below.
///
/// Each pad sits under its own pin when the pad pitch allows, otherwise
/// further east; a pad is never less than a channel column away from its
/// pin without being aligned with it.
///
/// Ports: `pad_gnd`, `pad_in`, `pad_out`, `pad_vdd`.
pub fn inverter_test(logic: &LogicParams, probe: &ProbeParams) -> Result<Arc<Cell>> {
    probe.validate()?;
    let inv = CellInstance::new(inverter(logic)?);

    let mut name_params = logic.name_params();
    name_params.extend(probe.name_params());
    let mut c = Cell::new(&cell_name("inverter_test", &name_params));

    let nets = ["gnd", "in", "out", "vdd"];
    let pins: Vec<Port> = nets
        .iter()
        .map(|net| inv.port(net))
        .collect::<std::result::Result<_, _>>()?;
    let pad_pitch = probe.pad_size + probe.routing_width;
    let column = logic.pin_pitch();
    let mut pad_x: Vec<f64> = Vec::with_capacity(nets.len());
    for pin in &pins {
        let mut x = pad_x.last().map_or(pin.x(), |prev| (prev + pad_pitch).max(pin.x()));
        if x > pin.x() && x - pin.x() < column {
            x = pin.x() + column;
        }
        pad_x.push(x);
    }

    let mut channel_pins = Vec::new();
    for (net, pin) in nets.iter().zip(&pins) {
        channel_pins.push(ChannelPin::top(net, pin)?);
    }
    for (net, &x) in nets.iter().zip(&pad_x) {
        channel_pins.push(ChannelPin::bottom(net, x, NI_CONTACTS));
    }
    let route = route_channel(&mut c, &logic.channel(channel_pins, Vec::new())?)?;

    let ni_pad = probe.ni_pad()?;
    for (net, &x) in nets.iter().zip(&pad_x) {
        let mut inst = CellInstance::new(ni_pad.clone());
        inst.set_x(x).set_ymax(route.bottom);
        c.add_port(inst.port("pad")?.renamed(&format!("pad_{}", net)))?;
        c.add_instance(inst);
    }
    c.add_instance(inv);
    Ok(Arc::new(c))
}

/// Two Ni pads either side of a two-terminal device, joined by straight
/// traces as wide as the device's ports.
fn two_terminal_test(name: &str, device: Arc<Cell>, probe: &ProbeParams) -> Result<Arc<Cell>> {
    probe.validate()?;
    let dev = CellInstance::new(device);
    let e1 = dev.port("top_e1")?;
    let e2 = dev.port("top_e2")?;
    let mut c = Cell::new(name);

    let ni_pad = probe.ni_pad()?;
    let gap = probe.routing_width;
    let pad_1 = pad_beside(&mut c, &ni_pad, &e1, gap, e1.width.min(probe.pad_size))?;
    let pad_2 = pad_beside(&mut c, &ni_pad, &e2, gap, e2.width.min(probe.pad_size))?;
    c.add_port(pad_1.renamed("pad_1"))?;
    c.add_port(pad_2.renamed("pad_2"))?;
    c.add_instance(dev);
    Ok(Arc::new(c))
}

/// Meander resistor between two pads. Ports: `pad_1`, `pad_2`.
pub fn resistor_test(length: f64, width: f64, probe: &ProbeParams) -> Result<Arc<Cell>> {
    let mut name_params = vec![("L", length), ("W", width)];
    name_params.extend(probe.name_params());
    two_terminal_test(
        &cell_name("resistor_test", &name_params),
        resistor(length, width)?,
        probe,
    )
}

/// ITO film resistor between two pads. Ports: `pad_1`, `pad_2`.
pub fn resistor_ito_test(params: &ItoResistorParams, probe: &ProbeParams) -> Result<Arc<Cell>> {
    let mut name_params = vec![
        ("L", params.length),
        ("W", params.width),
        ("CL", params.contact_length),
        ("O", params.overlap),
    ];
    name_params.extend(probe.name_params());
    two_terminal_test(
        &cell_name("resistor_ito_test", &name_params),
        resistor_ito(params)?,
        probe,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::{layer_stack, W_GATE};
    use crate::rules::default_rules;
    use tftgen_core::Point;
    use tftgen_drc::check_cell;

    #[test]
    fn test_transistor_test_pads() {
        let c = transistor_test(&TransistorParams::default(), &ProbeParams::default()).unwrap();
        // Padded transistor ports sit at x = -18 and 18, pads a routing width beyond.
        let s = c.port("pad_s").unwrap();
        assert!(s.center.approx_eq(&Point::new(-118.0, 0.0)));
        let d = c.port("pad_d").unwrap();
        assert!(d.center.approx_eq(&Point::new(118.0, 0.0)));
        // g2 is at y = -22; the via pad hangs 50 below it.
        let g = c.port("pad_g").unwrap();
        assert!(g.center.approx_eq(&Point::new(0.0, -122.0)));
        assert_eq!(c.geometries_on_layer(W_GATE).len(), 1);
    }

    #[test]
    fn test_transistor_test_is_drc_clean() {
        let rules = default_rules().resolve(&layer_stack()).unwrap();
        let c = transistor_test(&TransistorParams::default(), &ProbeParams::default()).unwrap();
        let report = check_cell(&c, &rules);
        assert!(report.is_clean(), "{}", report.summary());
    }

    #[test]
    fn test_inverter_test_pads_below_channel() {
        let c = inverter_test(&LogicParams::default(), &ProbeParams::default()).unwrap();
        let pads: Vec<Port> = ["gnd", "in", "out", "vdd"]
            .iter()
            .map(|n| c.port(&format!("pad_{}", n)).unwrap().clone())
            .collect();
        // The gnd pad sits right under the gnd pin at x = -30.
        assert!((pads[0].x() + 30.0).abs() < 1e-9);
        for w in pads.windows(2) {
            assert!(w[1].x() - w[0].x() >= 150.0 - 1e-9);
            assert!((w[1].y() - w[0].y()).abs() < 1e-9);
        }
        let inv_ymin = c.instances.last().unwrap().bbox().ymin();
        assert!(pads[0].y() + 50.0 < inv_ymin);
    }

    #[test]
    fn test_inverter_test_is_drc_clean() {
        let rules = default_rules().resolve(&layer_stack()).unwrap();
        let c = inverter_test(&LogicParams::default(), &ProbeParams::default()).unwrap();
        let report = check_cell(&c, &rules);
        assert!(report.is_clean(), "{}", report.summary());
    }

    #[test]
    fn test_inverter_test_pad_pitch_follows_routing_width() {
        let probe = ProbeParams {
            routing_width: 80.0,
            ..Default::default()
        };
        let c = inverter_test(&LogicParams::default(), &probe).unwrap();
        let xs: Vec<f64> = ["gnd", "in", "out", "vdd"]
            .iter()
            .map(|n| c.port(&format!("pad_{}", n)).unwrap().x())
            .collect();
        assert!((xs[1] - xs[0] - 180.0).abs() < 1e-9);
        assert!(xs.windows(2).all(|w| w[1] - w[0] >= 180.0 - 1e-9));
        let rules = default_rules().resolve(&layer_stack()).unwrap();
        let report = check_cell(&c, &rules);
        assert!(report.is_clean(), "{}", report.summary());
    }

    #[test]
    fn test_stub_length_is_part_of_the_name() {
        let params = TransistorParams::default();
        let short = transistor_test(&params, &ProbeParams::default()).unwrap();
        let long = transistor_test(
            &params,
            &ProbeParams {
                pad_length: 20.0,
                ..Default::default()
            },
        )
        .unwrap();
        assert!(short.name.ends_with("_PL10"));
        assert_ne!(short.name, long.name);

        let mut top = Cell::new("both");
        top.add_instance(CellInstance::new(short));
        top.add_instance(CellInstance::new(long));
        let lib = tftgen_core::Library::from_top("both", layer_stack(), Arc::new(top)).unwrap();
        assert!(lib.cell_count() > 3);
    }

    #[test]
    fn test_resistor_tests() {
        let probe = ProbeParams::default();
        let r = resistor_test(100.0, 20.0, &probe).unwrap();
        let bb = r.instances.last().unwrap().bbox();
        let p1 = r.port("pad_1").unwrap();
        assert!((p1.x() - (bb.xmin() - 100.0)).abs() < 1e-9);
        assert!((p1.y() - bb.center().y).abs() < 1e-9);

        let ito = resistor_ito_test(&ItoResistorParams::default(), &probe).unwrap();
        let p1 = ito.port("pad_1").unwrap();
        let p2 = ito.port("pad_2").unwrap();
        // Contacts span 240; pad centres sit 100 beyond each end.
        assert!((p2.x() - p1.x() - 440.0).abs() < 1e-9);
        assert_eq!(ito.geometries.len(), 2);
    }

    #[test]
    fn test_bad_probe_params() {
        let probe = ProbeParams {
            pad_size: 0.0,
            ..Default::default()
        };
        assert!(resistor_test(100.0, 20.0, &probe).is_err());
    }
}
