use thiserror::Error;

use tftgen_core::LayoutError;
use tftgen_drc::DrcError;

#[derive(Error, Debug)]
pub enum PdkError {
    #[error("Invalid parameters for {component}: {message}")]
    InvalidParameter { component: String, message: String },

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Drc(#[from] DrcError),
}

impl PdkError {
    pub fn invalid(component: &str, message: impl Into<String>) -> Self {
        PdkError::InvalidParameter {
            component: component.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PdkError>;
