use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use tftgen_io::MaskSettings;
use tftgen_pdk::{LogicParams, ProbeParams};

use crate::error::{MaskError, Result};

/// Everything the sweep driver needs. Every field has a default, so an empty
/// file is a valid configuration.
///
/// ```toml
/// name = "tft_run2"
///
/// [block]
/// columns = 2
///
/// [transistors]
/// l_gate = [2.0, 5.0]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskConfig {
    pub name: String,
    /// Add a full adder to the mask.
    pub full_adder: bool,
    /// TOML rule deck replacing the process defaults.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<PathBuf>,
    pub block: BlockConfig,
    pub probe: ProbeParams,
    pub logic: LogicParams,
    pub transistors: TransistorSweep,
    pub resistors: ResistorSweep,
    pub inverters: InverterSweep,
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            name: "tft_mask".to_string(),
            full_adder: true,
            rules: None,
            block: BlockConfig::default(),
            probe: ProbeParams::default(),
            logic: LogicParams::default(),
            transistors: TransistorSweep::default(),
            resistors: ResistorSweep::default(),
            inverters: InverterSweep::default(),
        }
    }
}

/// Fixed-size blocks the structures are packed into.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockConfig {
    pub width: f64,
    pub height: f64,
    /// Keep-out along every block edge.
    pub margin: f64,
    /// Gap between neighbouring structures.
    pub spacing: f64,
    /// Blocks per row of the mask.
    pub columns: usize,
    /// Draw the block boundary on the substrate layer.
    pub outline: bool,
}

impl Default for BlockConfig {
    fn default() -> Self {
        Self {
            width: 10_000.0,
            height: 10_000.0,
            margin: 200.0,
            spacing: 100.0,
            columns: 4,
            outline: true,
        }
    }
}

impl BlockConfig {
    /// Width and height left for structures.
    pub fn usable(&self) -> (f64, f64) {
        (
            self.width - 2.0 * self.margin,
            self.height - 2.0 * self.margin,
        )
    }
}

/// Copies of one structure placed side by side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArraySpec {
    pub columns: usize,
    pub rows: usize,
    /// Gap between copies.
    pub spacing: f64,
}

impl Default for ArraySpec {
    fn default() -> Self {
        Self {
            columns: 2,
            rows: 2,
            spacing: 50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransistorSweep {
    pub l_mesa: Vec<f64>,
    pub l_gate: Vec<f64>,
    pub l_overlap: Vec<f64>,
    pub w_mesa: Vec<f64>,
    pub array: ArraySpec,
}

impl Default for TransistorSweep {
    fn default() -> Self {
        Self {
            l_mesa: vec![8.0, 20.0, 50.0],
            l_gate: vec![2.0, 5.0, 10.0],
            l_overlap: vec![2.0],
            w_mesa: vec![12.0, 50.0],
            array: ArraySpec {
                columns: 3,
                rows: 2,
                ..Default::default()
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResistorKind {
    /// Tungsten meander with via pads.
    Meander,
    /// Straight ITO strip with nickel contacts.
    Ito,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResistorSweep {
    pub kinds: Vec<ResistorKind>,
    /// Lengths in squares.
    pub lengths: Vec<f64>,
    pub widths: Vec<f64>,
    /// ITO resistors only.
    pub contact_length: f64,
    /// ITO resistors only.
    pub overlap: f64,
    pub array: ArraySpec,
}

impl Default for ResistorSweep {
    fn default() -> Self {
        Self {
            kinds: vec![ResistorKind::Meander, ResistorKind::Ito],
            lengths: vec![10.0, 100.0],
            widths: vec![20.0, 50.0],
            contact_length: 20.0,
            overlap: 4.0,
            array: ArraySpec {
                columns: 2,
                rows: 1,
                ..Default::default()
            },
        }
    }
}

/// Inverters sharing the `[logic]` parameters, one per load length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InverterSweep {
    pub load_lengths: Vec<f64>,
    pub array: ArraySpec,
}

impl Default for InverterSweep {
    fn default() -> Self {
        Self {
            load_lengths: vec![50.0, 100.0],
            array: ArraySpec {
                columns: 1,
                rows: 1,
                ..Default::default()
            },
        }
    }
}

impl MaskConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: MaskConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(MaskError::InvalidConfig(msg));
        if self.name.is_empty() {
            return invalid("mask name must not be empty".to_string());
        }
        let b = &self.block;
        let (uw, uh) = b.usable();
        if !(uw > 0.0 && uh > 0.0) {
            return invalid(format!(
                "block {}x{} leaves no room inside a margin of {}",
                b.width, b.height, b.margin
            ));
        }
        if b.columns == 0 {
            return invalid("block columns must be at least 1".to_string());
        }
        if !(b.spacing >= 0.0 && b.margin >= 0.0) {
            return invalid("block spacing and margin must not be negative".to_string());
        }
        for (what, array) in [
            ("transistors", &self.transistors.array),
            ("resistors", &self.resistors.array),
            ("inverters", &self.inverters.array),
        ] {
            if array.columns == 0 || array.rows == 0 || array.spacing < 0.0 {
                return invalid(format!(
                    "{} array {}x{} with spacing {} is empty or overlapping",
                    what, array.columns, array.rows, array.spacing
                ));
            }
        }
        Ok(())
    }

    /// Block settings as recorded in the manifest.
    pub fn settings(&self) -> MaskSettings {
        MaskSettings {
            block_size: [self.block.width, self.block.height],
            block_margin: self.block.margin,
            blocks_per_row: self.block.columns,
            ..Default::default()
        }
    }
}

pub fn parse_mask_config(path: impl AsRef<Path>) -> Result<MaskConfig> {
    let contents = fs::read_to_string(path)?;
    MaskConfig::from_toml_str(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_the_default() {
        let config = MaskConfig::from_toml_str("").unwrap();
        assert_eq!(config, MaskConfig::default());
    }

    #[test]
    fn test_partial_config() {
        let config = MaskConfig::from_toml_str(
            r#"
name = "run2"
full_adder = false

[block]
columns = 2

[transistors]
l_gate = [2.0, 5.0]

[transistors.array]
rows = 1

[resistors]
kinds = ["ito"]
"#,
        )
        .unwrap();
        assert_eq!(config.name, "run2");
        assert!(!config.full_adder);
        assert_eq!(config.block.columns, 2);
        assert!((config.block.width - 10_000.0).abs() < 1e-12);
        assert_eq!(config.transistors.l_gate, vec![2.0, 5.0]);
        assert_eq!(config.transistors.l_mesa.len(), 3);
        assert_eq!(config.transistors.array.rows, 1);
        assert_eq!(config.transistors.array.columns, 2);
        assert_eq!(config.resistors.kinds, vec![ResistorKind::Ito]);
    }

    #[test]
    fn test_invalid_configs() {
        assert!(matches!(
            MaskConfig::from_toml_str("[block]\nmargin = 6000.0"),
            Err(MaskError::InvalidConfig(_))
        ));
        assert!(matches!(
            MaskConfig::from_toml_str("[inverters.array]\ncolumns = 0"),
            Err(MaskError::InvalidConfig(_))
        ));
        assert!(matches!(
            MaskConfig::from_toml_str("block = 3"),
            Err(MaskError::Config(_))
        ));
    }

    #[test]
    fn test_dumped_defaults_parse_back() {
        let text = MaskConfig::default().to_toml().unwrap();
        assert_eq!(MaskConfig::from_toml_str(&text).unwrap(), MaskConfig::default());
    }

    #[test]
    fn test_settings() {
        let s = MaskConfig::default().settings();
        assert_eq!(s.blocks_per_row, 4);
        assert!((s.db_unit_um - 0.001).abs() < 1e-15);
    }
}
