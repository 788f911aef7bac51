use std::sync::Arc;

use tftgen_core::cell::cell_name;
use tftgen_core::routing::{route_channel, ChannelExit, ChannelPin, ChannelRoute, Edge};
use tftgen_core::{Cell, CellInstance, LayoutError};

use crate::error::Result;
use crate::logic::{nand2, LogicParams};

/// The nine-NAND full adder as (input a, input b, output) nets, left to right.
const GATES: [(&str, &str, &str); 9] = [
    ("a", "b", "n1"),
    ("a", "n1", "n2"),
    ("b", "n1", "n3"),
    ("n2", "n3", "n4"),
    ("n4", "cin", "n5"),
    ("n4", "n5", "n6"),
    ("cin", "n5", "n7"),
    ("n6", "n7", "s"),
    ("n5", "n1", "cout"),
];

const WEST_EXITS: [&str; 5] = ["a", "b", "cin", "vdd", "gnd"];
const EAST_EXITS: [&str; 2] = ["s", "cout"];

/// One-bit full adder: nine resistor-load NANDs in a row, wired by a
/// two-layer channel underneath.
///
/// Ports: `a`, `b`, `cin`, `vdd`, `gnd` facing west and `s`, `cout` facing
/// east, all on the Ni tracks.
pub fn full_adder(p: &LogicParams) -> Result<Arc<Cell>> {
    let (c, _) = place_and_route(p)?;
    Ok(Arc::new(c))
}

/// The gate row plus the channel wiring it, with the channel's track map.
fn place_and_route(p: &LogicParams) -> Result<(Cell, ChannelRoute)> {
    let gate = nand2(p)?;
    let gate_bb = gate
        .bbox()
        .ok_or_else(|| LayoutError::invalid("full_adder", "empty nand2"))?;
    let pitch = gate_bb.width() + 2.0 * p.spacing;

    let mut c = Cell::new(&cell_name("full_adder", &p.name_params()));
    let mut pins = Vec::new();
    for (i, (a, b, out)) in GATES.iter().enumerate() {
        let mut inst = CellInstance::new(gate.clone());
        inst.translate(i as f64 * pitch, 0.0);
        for (pin, net) in [("gnd", "gnd"), ("a", *a), ("b", *b), ("out", *out), ("vdd", "vdd")] {
            pins.push(ChannelPin::top(net, &inst.port(pin)?)?);
        }
        c.add_instance(inst);
    }

    let row = c
        .bbox()
        .ok_or_else(|| LayoutError::invalid("full_adder", "empty gate row"))?;
    let reach = p.spacing + p.trace_width / 2.0;
    let exits = WEST_EXITS
        .iter()
        .map(|net| (net, Edge::West, row.xmin() - reach))
        .chain(EAST_EXITS.iter().map(|net| (net, Edge::East, row.xmax() + reach)))
        .map(|(net, edge, x)| ChannelExit {
            net: net.to_string(),
            edge,
            x,
        })
        .collect();

    let channel = p.channel(pins, exits)?;
    let route = route_channel(&mut c, &channel)?;
    log::debug!(
        "{}: {} tracks, channel {:.3} deep",
        c.name,
        route.tracks.len(),
        route.top - route.bottom
    );
    for port in &route.ports {
        c.add_port(port.clone())?;
    }
    Ok((c, route))
}
