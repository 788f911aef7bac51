use serde::{Deserialize, Serialize};

/// Machine-readable record of what went onto a mask and what was left off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskManifest {
    pub name: String,
    pub version: String,
    pub pdk: String,
    pub top_cell: Option<String>,
    pub settings: MaskSettings,
    pub blocks: Vec<BlockManifest>,
    #[serde(default)]
    pub rejected: Vec<RejectedVariant>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskSettings {
    /// Database unit in micrometres.
    pub db_unit_um: f64,
    /// Block width and height.
    pub block_size: [f64; 2],
    pub block_margin: f64,
    pub blocks_per_row: usize,
}

impl Default for MaskSettings {
    fn default() -> Self {
        Self {
            db_unit_um: 0.001, // 1nm grid
            block_size: [10_000.0, 10_000.0],
            block_margin: 200.0,
            blocks_per_row: 4,
        }
    }
}

/// One block and the structures placed in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockManifest {
    pub cell: String,
    /// Lower-left corner of the block on the mask.
    pub origin: [f64; 2],
    pub placements: Vec<Placement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub variant: String,
    pub cell: String,
    /// Lower-left corner of the structure inside its block.
    pub origin: [f64; 2],
    pub size: [f64; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedVariant {
    pub variant: String,
    pub reason: String,
}

impl MaskManifest {
    pub fn new(name: &str, pdk: &str) -> Self {
        Self {
            name: name.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            pdk: pdk.to_string(),
            top_cell: None,
            settings: MaskSettings::default(),
            blocks: Vec::new(),
            rejected: Vec::new(),
        }
    }

    pub fn placement_count(&self) -> usize {
        self.blocks.iter().map(|b| b.placements.len()).sum()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
