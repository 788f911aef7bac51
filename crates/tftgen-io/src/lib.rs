//! # tftgen I/O
//!
//! GDS-II stream reader and writer for tftgen cell libraries, and the JSON
//! manifest that records how a mask was assembled.

pub mod gds;
pub mod manifest;

pub use gds::{read_gds, write_gds, GdsError, GdsReader, GdsWriter};
pub use manifest::{BlockManifest, MaskManifest, MaskSettings, Placement, RejectedVariant};
