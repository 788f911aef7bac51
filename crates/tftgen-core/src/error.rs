use thiserror::Error;

use crate::LayerId;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    #[error("Port '{port}' not found on cell '{cell}'")]
    PortNotFound { cell: String, port: String },

    #[error("Port '{port}' already exists on cell '{cell}'")]
    DuplicatePort { cell: String, port: String },

    #[error("Rotation of {0} degrees is not a multiple of 90")]
    UnsupportedRotation(f64),

    #[error("Invalid geometry in '{component}': {message}")]
    InvalidGeometry { component: String, message: String },

    #[error("Cell name '{0}' is used by two cells with different content")]
    DuplicateCellName(String),

    #[error("Cell '{0}' references itself through its hierarchy")]
    RecursiveCell(String),

    #[error("Port '{port}' on layer {port_layer} cannot be routed on layer {route_layer}")]
    LayerMismatch {
        port: String,
        port_layer: LayerId,
        route_layer: LayerId,
    },

    #[error("Routing failed: {0}")]
    Routing(String),
}

impl LayoutError {
    pub fn invalid(component: &str, message: impl Into<String>) -> Self {
        LayoutError::InvalidGeometry {
            component: component.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LayoutError>;
