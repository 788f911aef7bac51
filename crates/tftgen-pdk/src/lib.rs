//! # tftgen PDK
//!
//! The ITO thin-film transistor process: layer map and stack, routing
//! cross-sections, parametric device cells, logic gates, probe-pad test
//! structures and the default rule deck.

pub mod cross_section;
pub mod crossing;
pub mod error;
pub mod full_adder;
pub mod layers;
pub mod logic;
pub mod padded;
pub mod resistor;
pub mod rules;
pub mod test_structures;
pub mod transistor;
pub mod via;

use tftgen_core::LayerStack;
use tftgen_drc::{Rule, RuleDeck};

pub use cross_section::{metal_routing_ni, metal_routing_w, DEFAULT_ROUTING_WIDTH};
pub use crossing::crossing_ni;
pub use error::{PdkError, Result};
pub use full_adder::full_adder;
pub use logic::{inverter, nand2, LogicParams};
pub use padded::padded_transistor;
pub use resistor::{resistor, resistor_ito, ItoResistorParams};
pub use rules::default_rules;
pub use test_structures::{
    inverter_test, resistor_ito_test, resistor_test, transistor_test, ProbeParams,
};
pub use transistor::{transistor, TransistorParams};
pub use via::{default_via, via};

/// Process description handed to the mask generator.
#[derive(Debug, Clone)]
pub struct Pdk {
    pub name: String,
    pub layer_stack: LayerStack,
    pub rules: RuleDeck,
}

impl Default for Pdk {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

impl Pdk {
    /// The TFT process with `rules` in place of the default deck.
    pub fn new(rules: RuleDeck) -> Self {
        Self {
            name: "tft_pdk".to_string(),
            layer_stack: layers::layer_stack(),
            rules,
        }
    }

    pub fn resolve_rules(&self) -> Result<Vec<Rule>> {
        Ok(self.rules.resolve(&self.layer_stack)?)
    }
}
