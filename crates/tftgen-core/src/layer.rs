use std::fmt;

use serde::{Deserialize, Serialize};

/// A GDS layer/datatype pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerId {
    pub layer: u16,
    pub datatype: u16,
}

impl LayerId {
    pub const fn new(layer: u16, datatype: u16) -> Self {
        Self { layer, datatype }
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.layer, self.datatype)
    }
}

/// A process layer: where it lives in GDS and how it sits in the physical stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    /// Film thickness in micrometres.
    pub thickness: f64,
    /// Bottom of the film in micrometres.
    pub zmin: f64,
    pub material: String,
    pub description: String,
}

impl Layer {
    pub fn new(id: LayerId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            thickness: 0.0,
            zmin: 0.0,
            material: String::new(),
            description: String::new(),
        }
    }

    pub fn with_level(mut self, thickness: f64, zmin: f64, material: &str) -> Self {
        self.thickness = thickness;
        self.zmin = zmin;
        self.material = material.to_string();
        self
    }

    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = desc.to_string();
        self
    }

    pub fn zmax(&self) -> f64 {
        self.zmin + self.thickness
    }
}

/// A collection of layers representing a technology stack.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayerStack {
    layers: Vec<Layer>,
}

impl LayerStack {
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    pub fn add_layer(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    pub fn get_layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn get_layer_by_name(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name == name)
    }

    /// Display name for a layer, falling back to `layer/datatype`.
    pub fn layer_name(&self, id: LayerId) -> String {
        self.get_layer(id)
            .map(|l| l.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    pub fn all_layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_name_and_id() {
        let mut stack = LayerStack::new();
        stack.add_layer(Layer::new(LayerId::new(2, 0), "W_GATE").with_level(0.01, 0.3, "W"));
        stack.add_layer(Layer::new(LayerId::new(5, 0), "NI_CONTACTS"));

        assert_eq!(stack.layer_count(), 2);
        assert_eq!(stack.get_layer_by_name("W_GATE").unwrap().id, LayerId::new(2, 0));
        assert_eq!(stack.get_layer(LayerId::new(5, 0)).unwrap().name, "NI_CONTACTS");
        assert!((stack.get_layer(LayerId::new(2, 0)).unwrap().zmax() - 0.31).abs() < 1e-12);
        assert_eq!(stack.layer_name(LayerId::new(9, 1)), "9/1");
    }
}
