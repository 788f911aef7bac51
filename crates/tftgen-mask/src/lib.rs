//! # tftgen Mask
//!
//! Turns a sweep configuration into a test mask: enumerate parameter
//! variants, build and rule-check each test structure, shelf-pack the
//! survivors into fixed-size blocks and tile the blocks under one top cell.

pub mod config;
pub mod error;
pub mod mask;
pub mod pack;
pub mod sweep;

pub use config::{parse_mask_config, ArraySpec, BlockConfig, MaskConfig, ResistorKind};
pub use error::{MaskError, Result};
pub use mask::{assemble, block_origin, demo, generate, Mask};
pub use pack::{pack, Packing, Placed};
pub use sweep::{build_variant, enumerate_variants, Structure, Variant};
