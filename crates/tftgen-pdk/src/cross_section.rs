use tftgen_core::CrossSection;

use crate::layers::{NI_CONTACTS, W_GATE};

pub const DEFAULT_ROUTING_WIDTH: f64 = 50.0;

/// Bottom-metal trace on the tungsten gate layer.
pub fn metal_routing_w(width: f64) -> CrossSection {
    CrossSection::electrical("metal_routing_w", W_GATE, width)
}

/// Top-metal trace on the nickel contact layer.
pub fn metal_routing_ni(width: f64) -> CrossSection {
    CrossSection::electrical("metal_routing_ni", NI_CONTACTS, width)
}
