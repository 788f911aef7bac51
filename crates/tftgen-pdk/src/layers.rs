use tftgen_core::layer::{Layer, LayerStack};
use tftgen_core::LayerId;

/// Silicon substrate.
pub const SI: LayerId = LayerId::new(0, 0);
/// 300 nm thermal oxide.
pub const SIO2: LayerId = LayerId::new(1, 0);
/// 10 nm tungsten gate and bottom routing metal.
pub const W_GATE: LayerId = LayerId::new(2, 0);
/// 15 nm ALD alumina gate dielectric; drawn shapes are openings through it.
pub const AL2O3: LayerId = LayerId::new(3, 0);
/// 3 nm ITO semiconducting channel.
pub const ITO_CHANNEL: LayerId = LayerId::new(4, 0);
/// 30 nm nickel source/drain and top routing metal.
pub const NI_CONTACTS: LayerId = LayerId::new(5, 0);

/// The process stack, bottom to top.
pub fn layer_stack() -> LayerStack {
    let mut stack = LayerStack::new();
    let levels = [
        (SI, "SI", 500.0, 0.0, "Si", "Silicon substrate"),
        (SIO2, "SIO2", 0.3, 0.0, "SiO2", "Thermal oxide"),
        (W_GATE, "W_GATE", 0.01, 0.3, "W", "Tungsten gate"),
        (AL2O3, "AL2O3", 0.015, 0.31, "Al2O3", "ALD gate dielectric"),
        (ITO_CHANNEL, "ITO_CHANNEL", 0.003, 0.325, "ITO", "ITO channel"),
        (NI_CONTACTS, "NI_CONTACTS", 0.03, 0.328, "Ni", "Nickel source/drain"),
    ];
    for (id, name, thickness, zmin, material, description) in levels {
        stack.add_layer(
            Layer::new(id, name)
                .with_level(thickness, zmin, material)
                .with_description(description),
        );
    }
    stack
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_matches_layer_map() {
        let stack = layer_stack();
        assert_eq!(stack.layer_count(), 6);
        let ni = stack.get_layer_by_name("NI_CONTACTS").unwrap();
        assert_eq!(ni.id, NI_CONTACTS);
        assert!((ni.zmax() - 0.358).abs() < 1e-12);
        assert_eq!(stack.layer_name(AL2O3), "AL2O3");
        // Films above the oxide stack without gaps.
        let w = stack.get_layer(W_GATE).unwrap();
        let ox = stack.get_layer(AL2O3).unwrap();
        assert!((w.zmax() - ox.zmin).abs() < 1e-12);
    }
}
