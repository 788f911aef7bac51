use thiserror::Error;

use tftgen_core::LayoutError;
use tftgen_drc::DrcError;
use tftgen_io::GdsError;
use tftgen_pdk::PdkError;

#[derive(Error, Debug)]
pub enum MaskError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration parse error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Pdk(#[from] PdkError),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Drc(#[from] DrcError),

    #[error("Design rule check failed: {0}")]
    DrcFailed(String),

    #[error(transparent)]
    Gds(#[from] GdsError),

    #[error("Manifest serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Nothing to place: every variant was rejected")]
    EmptyMask,
}

pub type Result<T> = std::result::Result<T, MaskError>;
