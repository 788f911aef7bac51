use crate::LayerId;

/// Width and layer of a routed trace, plus the names given to its two ends.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossSection {
    pub name: String,
    pub layer: LayerId,
    pub width: f64,
    pub port_names: [String; 2],
}

impl CrossSection {
    /// An electrical trace with ports `e1` (input) and `e2` (output).
    pub fn electrical(name: &str, layer: LayerId, width: f64) -> Self {
        Self {
            name: name.to_string(),
            layer,
            width,
            port_names: ["e1".to_string(), "e2".to_string()],
        }
    }

    pub fn with_width(&self, width: f64) -> Self {
        Self {
            width,
            ..self.clone()
        }
    }
}
