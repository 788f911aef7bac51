//! Resistor-load logic gates.
//!
//! An n-input NAND is n transistors in series between GND and the output,
//! with a meander resistor from the output to VDD. Every terminal is brought
//! down to a south-facing pin on one common row below the gate so a routing
//! channel can pick them up.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use tftgen_core::cell::cell_name;
use tftgen_core::routing::{route_single, Channel, ChannelExit, ChannelPin};
use tftgen_core::{Cell, CellInstance, LayerId, LayoutError, Placeable, Point, Port};

use crate::cross_section::{metal_routing_ni, metal_routing_w};
use crate::error::{PdkError, Result};
use crate::layers::{NI_CONTACTS, W_GATE};
use crate::resistor::resistor;
use crate::transistor::{transistor, TransistorParams};
use crate::via::{via, DEFAULT_VIA_INSET};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogicParams {
    pub transistor: TransistorParams,
    /// Load resistance in squares of meander wire.
    pub load_length: f64,
    /// Width of channel traces, vias and the load resistor.
    pub trace_width: f64,
    /// Clearance between unrelated shapes.
    pub spacing: f64,
}

impl Default for LogicParams {
    fn default() -> Self {
        Self {
            transistor: TransistorParams::default(),
            load_length: 100.0,
            trace_width: 20.0,
            spacing: 10.0,
        }
    }
}

impl LogicParams {
    pub fn validate(&self) -> Result<()> {
        self.transistor.validate()?;
        if !(self.trace_width > 0.0 && self.spacing > 0.0 && self.load_length > 0.0) {
            return Err(PdkError::invalid(
                "logic",
                format!(
                    "trace width {}, spacing {} and load length {} must be positive",
                    self.trace_width, self.spacing, self.load_length
                ),
            ));
        }
        Ok(())
    }

    /// Minimum distance between neighbouring pins.
    pub fn pin_pitch(&self) -> f64 {
        self.trace_width + self.spacing
    }

    pub(crate) fn name_params(&self) -> Vec<(&'static str, f64)> {
        let mut params = self.transistor.name_params().to_vec();
        params.extend([
            ("RL", self.load_length),
            ("T", self.trace_width),
            ("S", self.spacing),
        ]);
        params
    }

    /// Two-layer channel: Ni tracks, W drops, trace-width vias.
    pub fn channel(&self, pins: Vec<ChannelPin>, exits: Vec<ChannelExit>) -> Result<Channel> {
        let t = self.trace_width;
        Ok(Channel {
            horizontal: metal_routing_ni(t),
            vertical: metal_routing_w(t),
            via: via((t, t), DEFAULT_VIA_INSET)?,
            spacing: self.spacing,
            pins,
            exits,
        })
    }
}

/// Landing point on the pin row for a trace coming down from above.
fn pin_target(x: f64, y: f64, width: f64, layer: LayerId) -> Port {
    Port::new("pin", Point::new(x, y), 90.0, width, layer)
}

fn resistor_load_gate(kind: &str, inputs: &[&str], p: &LogicParams) -> Result<Arc<Cell>> {
    p.validate()?;
    let t = p.trace_width;
    let s = p.spacing;
    let pitch = p.pin_pitch();

    let fet = transistor(&p.transistor)?;
    let fet_bb = fet
        .bbox()
        .ok_or_else(|| LayoutError::invalid(kind, "empty transistor"))?;
    let step = fet_bb.width() + t + 2.0 * s;
    let fets: Vec<CellInstance> = (0..inputs.len())
        .map(|i| {
            let mut inst = CellInstance::new(fet.clone());
            inst.set_center(Point::new(i as f64 * step, 0.0));
            inst
        })
        .collect();

    let mut c = Cell::new(&cell_name(kind, &p.name_params()));
    let ni = metal_routing_ni(t);
    let w = metal_routing_w(t);

    // Series chain, drain to next source.
    for pair in fets.windows(2) {
        let d = pair[0].port("d")?;
        route_single(&mut c, &d, &pair[1].port("s")?, &ni.with_width(d.width))?;
    }

    let (Some(first), Some(last)) = (fets.first(), fets.last()) else {
        return Err(PdkError::invalid(kind, "gate needs at least one input"));
    };
    let gnd_s = first.port("s")?;
    let out_d = last.port("d")?;
    let gates: Vec<Port> = fets
        .iter()
        .map(|f| f.port("g2"))
        .collect::<std::result::Result<_, _>>()?;

    let x_gnd = (gnd_s.x() - s - t / 2.0).min(gates[0].x() - pitch);
    let x_out = (out_d.x() + s + t / 2.0).max(gates[gates.len() - 1].x() + pitch);

    let mut load = CellInstance::new(resistor(p.load_length, t)?);
    load.set_y(out_d.y()).set_xmin(x_out + t / 2.0 + s);
    let load_bb = Placeable::bbox(&load);
    let x_vdd = load_bb.xmax() + t / 2.0 + s;

    let lowest = fets
        .iter()
        .map(|f| Placeable::bbox(f).ymin())
        .fold(load_bb.ymin(), f64::min);
    let y_pin = lowest - (t + s);

    let mut pins: Vec<Port> = Vec::new();
    let mut to_pin = |c: &mut Cell, name: &str, from: &Port, x: f64, layer: LayerId| {
        let xs = (if layer == W_GATE { &w } else { &ni }).with_width(from.width);
        route_single(c, from, &pin_target(x, y_pin, from.width, layer), &xs)?;
        pins.push(Port::new(name, Point::new(x, y_pin), 270.0, from.width, layer));
        Ok::<(), LayoutError>(())
    };

    to_pin(&mut c, "gnd", &gnd_s, x_gnd, NI_CONTACTS)?;
    for (name, g) in inputs.iter().zip(&gates) {
        to_pin(&mut c, name, g, g.x(), W_GATE)?;
    }
    route_single(
        &mut c,
        &out_d,
        &load.port("top_e1")?,
        &ni.with_width(out_d.width),
    )?;
    to_pin(&mut c, "out", &out_d, x_out, NI_CONTACTS)?;
    to_pin(&mut c, "vdd", &load.port("top_e2")?, x_vdd, NI_CONTACTS)?;

    for pin in pins {
        c.add_port(pin)?;
    }
    for f in fets {
        c.add_instance(f);
    }
    c.add_instance(load);
    log::debug!("{}: pins on y = {:.3}", c.name, y_pin);
    Ok(Arc::new(c))
}

/// Resistor-load inverter. Pins: `gnd`, `in`, `out`, `vdd`.
pub fn inverter(p: &LogicParams) -> Result<Arc<Cell>> {
    resistor_load_gate("inverter", &["in"], p)
}

/// Resistor-load two-input NAND. Pins: `gnd`, `a`, `b`, `out`, `vdd`.
pub fn nand2(p: &LogicParams) -> Result<Arc<Cell>> {
    resistor_load_gate("nand2", &["a", "b"], p)
}
