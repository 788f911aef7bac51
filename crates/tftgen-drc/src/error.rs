use thiserror::Error;

#[derive(Error, Debug)]
pub enum DrcError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid rule deck: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Rule '{rule}' references unknown layer '{layer}'")]
    UnknownLayer { rule: String, layer: String },

    #[error("Enclosure rule '{0}' has no outer layer")]
    MissingOuterLayer(String),

    #[error("Rule '{rule}' has invalid value {value}")]
    InvalidValue { rule: String, value: f64 },
}

pub type Result<T> = std::result::Result<T, DrcError>;
