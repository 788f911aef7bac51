use std::fs;
use std::path::Path;
use std::sync::Arc;

use log::{info, warn};

use tftgen_core::{Cell, CellInstance, LayerStack, Library, Placeable, Point, Rect};
use tftgen_drc::RuleDeck;
use tftgen_io::{write_gds, BlockManifest, MaskManifest, Placement, RejectedVariant};
use tftgen_pdk::layers::SI;
use tftgen_pdk::{resistor, transistor, Pdk, TransistorParams};

use crate::config::{BlockConfig, MaskConfig};
use crate::error::{MaskError, Result};
use crate::pack::pack;
use crate::sweep::{build_variant, enumerate_variants};

/// Width of the block outline drawn on the substrate layer.
pub const OUTLINE_WIDTH: f64 = 10.0;

/// A generated mask: the top cell and the record of how it was built.
#[derive(Debug, Clone)]
pub struct Mask {
    pub top: Arc<Cell>,
    pub manifest: MaskManifest,
    pub layer_stack: LayerStack,
}

impl Mask {
    pub fn library(&self) -> Result<Library> {
        Ok(Library::from_top(
            &self.manifest.name,
            self.layer_stack.clone(),
            self.top.clone(),
        )?)
    }

    /// Write the GDS stream and, if given, the JSON manifest.
    pub fn write(&self, gds: impl AsRef<Path>, manifest: Option<&Path>) -> Result<()> {
        let lib = self.library()?;
        write_gds(gds.as_ref(), &lib)?;
        info!(
            "wrote {} cells to {}",
            lib.cell_count(),
            gds.as_ref().display()
        );
        if let Some(path) = manifest {
            fs::write(path, self.manifest.to_json()?)?;
            info!("wrote manifest to {}", path.display());
        }
        Ok(())
    }
}

/// Lower-left corner of block `index` when blocks are tiled `columns` per row.
pub fn block_origin(index: usize, block: &BlockConfig) -> Point {
    let columns = block.columns.max(1);
    Point::new(
        (index % columns) as f64 * block.width,
        (index / columns) as f64 * block.height,
    )
}

fn outline(cell: &mut Cell, block: &BlockConfig) {
    let (w, h, t) = (block.width, block.height, OUTLINE_WIDTH);
    cell.add_rect(Rect::new(SI, 0.0, 0.0, w, t));
    cell.add_rect(Rect::new(SI, 0.0, h - t, w, h));
    cell.add_rect(Rect::new(SI, 0.0, t, t, h - t));
    cell.add_rect(Rect::new(SI, w - t, t, w, h - t));
}

/// Tile `blocks` into a top cell named `name`.
pub fn assemble(name: &str, blocks: &[Arc<Cell>], block: &BlockConfig) -> Arc<Cell> {
    let mut top = Cell::new(name);
    for (i, b) in blocks.iter().enumerate() {
        let origin = block_origin(i, block);
        let mut inst = CellInstance::new(b.clone());
        inst.translate(origin.x, origin.y);
        top.add_instance(inst);
    }
    Arc::new(top)
}

fn load_pdk(config: &MaskConfig) -> Result<Pdk> {
    Ok(match &config.rules {
        Some(path) => {
            info!("using rule deck {}", path.display());
            Pdk::new(RuleDeck::from_file(path)?)
        }
        None => Pdk::default(),
    })
}

/// Build, check and pack every variant of `config` into a mask.
pub fn generate(config: &MaskConfig) -> Result<Mask> {
    config.validate()?;
    let pdk = load_pdk(config)?;
    let rules = pdk.resolve_rules()?;

    let mut manifest = MaskManifest::new(&config.name, &pdk.name);
    manifest.settings = config.settings();

    let variants = enumerate_variants(config);
    info!("building {} variants", variants.len());
    let mut built: Vec<(String, Arc<Cell>)> = Vec::new();
    for v in &variants {
        match build_variant(v, &config.probe, &rules) {
            Ok(cell) => built.push((v.name.clone(), cell)),
            Err(e) => {
                warn!("rejected {}: {}", v.name, e);
                manifest.rejected.push(RejectedVariant {
                    variant: v.name.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    let sizes: Vec<(f64, f64)> = built
        .iter()
        .map(|(_, c)| c.bbox().map_or((0.0, 0.0), |bb| (bb.width(), bb.height())))
        .collect();
    let packing = pack(&sizes, &config.block);
    for &i in &packing.oversized {
        let (w, h) = sizes[i];
        let reason = format!("{:.1} x {:.1} does not fit in a block", w, h);
        warn!("rejected {}: {}", built[i].0, reason);
        manifest.rejected.push(RejectedVariant {
            variant: built[i].0.clone(),
            reason,
        });
    }
    if packing.placed.is_empty() {
        return Err(MaskError::EmptyMask);
    }
    info!(
        "packed {} structures into {} blocks, {} rejected",
        packing.placed.len(),
        packing.block_count,
        manifest.rejected.len()
    );

    let mut blocks = Vec::with_capacity(packing.block_count);
    for b in 0..packing.block_count {
        let mut cell = Cell::new(&format!("{}_block{}", config.name, b));
        let mut placements = Vec::new();
        for placed in packing.in_block(b) {
            let (variant, structure) = &built[placed.item];
            let mut inst = CellInstance::new(structure.clone());
            inst.set_xmin(placed.origin.x).set_ymin(placed.origin.y);
            placements.push(Placement {
                variant: variant.clone(),
                cell: structure.name.clone(),
                origin: [placed.origin.x, placed.origin.y],
                size: [sizes[placed.item].0, sizes[placed.item].1],
            });
            cell.add_instance(inst);
        }
        if config.block.outline {
            outline(&mut cell, &config.block);
        }
        let origin = block_origin(b, &config.block);
        manifest.blocks.push(BlockManifest {
            cell: cell.name.clone(),
            origin: [origin.x, origin.y],
            placements,
        });
        blocks.push(Arc::new(cell));
    }

    let top = assemble(&config.name, &blocks, &config.block);
    manifest.top_cell = Some(top.name.clone());
    Ok(Mask {
        top,
        manifest,
        layer_stack: pdk.layer_stack,
    })
}

/// Single die: a meander resistor and two transistors.
pub fn demo() -> Result<Arc<Cell>> {
    let mut c = Cell::new("ito_transistor_test");
    c.add_instance(CellInstance::new(resistor(100.0, 50.0)?));

    let fet = transistor(&TransistorParams::new(50.0, 20.0, 10.0, 20.0))?;
    let mut t1 = CellInstance::new(fet.clone());
    t1.movex(100.0);
    let mut t2 = CellInstance::new(fet);
    t2.movex(100.0).movey(200.0);
    c.add_instance(t1);
    c.add_instance(t2);
    Ok(Arc::new(c))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::config::ResistorKind;
    use tftgen_io::{GdsReader, GdsWriter};
    use tftgen_pdk::layers::layer_stack;

    fn small_config() -> MaskConfig {
        let mut config = MaskConfig::default();
        config.name = "test_mask".to_string();
        config.block.width = 2000.0;
        config.block.height = 2000.0;
        config.block.columns = 2;
        config.transistors.l_mesa = vec![8.0, 50.0];
        config.transistors.l_gate = vec![20.0];
        config.transistors.w_mesa = vec![12.0];
        config.resistors.kinds = vec![ResistorKind::Ito];
        config.resistors.lengths = vec![10.0];
        config.resistors.widths = vec![20.0];
        config.inverters.load_lengths = vec![];
        config.full_adder = false;
        config
    }

    #[test]
    fn test_generate_records_rejections() {
        let mask = generate(&small_config()).unwrap();
        let m = &mask.manifest;
        // l_gate 20 on an 8 long mesa cannot be built.
        assert_eq!(m.rejected.len(), 1);
        assert_eq!(m.rejected[0].variant, "transistor_LM8_LG20_LO2_WM12");
        assert_eq!(m.placement_count(), 2);
        assert_eq!(m.top_cell.as_deref(), Some("test_mask"));
        assert_eq!(mask.top.instance_count(), m.blocks.len());
    }

    #[test]
    fn test_blocks_tile_and_keep_margins() {
        let mask = generate(&small_config()).unwrap();
        let block = &mask.manifest.blocks[0];
        assert!(block.origin[0].abs() < 1e-12 && block.origin[1].abs() < 1e-12);
        for p in &block.placements {
            assert!(p.origin[0] >= 200.0 - 1e-9 && p.origin[1] >= 200.0 - 1e-9);
            assert!(p.origin[0] + p.size[0] <= 1800.0 + 1e-9);
        }
        let b = BlockConfig {
            columns: 2,
            ..Default::default()
        };
        assert!(block_origin(3, &b).approx_eq(&Point::new(10_000.0, 10_000.0)));
    }

    #[test]
    fn test_everything_rejected() {
        let mut config = small_config();
        config.transistors.l_mesa = vec![8.0];
        config.resistors.kinds = vec![];
        assert!(matches!(generate(&config), Err(MaskError::EmptyMask)));
    }

    #[test]
    fn test_mask_gds_round_trip() {
        let mask = generate(&small_config()).unwrap();
        let lib = mask.library().unwrap();
        let mut buf = Vec::new();
        GdsWriter::new(&mut buf).write(&lib).unwrap();
        let back = GdsReader::new(Cursor::new(buf)).read(layer_stack()).unwrap();
        assert_eq!(back.top().unwrap().name, "test_mask");
        assert_eq!(back.cell_count(), lib.cell_count());
        let bb = back.top().unwrap().bbox().unwrap();
        assert!((bb.width() - 2000.0).abs() < 1e-6);
    }

    #[test]
    fn test_logic_variants_are_placed() {
        let mut config = small_config();
        config.block = BlockConfig::default();
        config.full_adder = true;
        config.inverters.load_lengths = vec![100.0];
        let mask = generate(&config).unwrap();
        let m = &mask.manifest;
        let placed: Vec<&str> = m
            .blocks
            .iter()
            .flat_map(|b| b.placements.iter().map(|p| p.variant.as_str()))
            .collect();
        assert!(placed.contains(&"full_adder"));
        assert!(placed.contains(&"inverter_RL100"));
        assert!(m
            .rejected
            .iter()
            .all(|r| r.variant != "full_adder" && !r.variant.starts_with("inverter")));
    }

    #[test]
    fn test_write_gds_and_manifest() {
        let mask = generate(&small_config()).unwrap();
        let dir = std::env::temp_dir().join(format!("tftgen_mask_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let gds = dir.join("test_mask.gds");
        let json = dir.join("test_mask.json");
        mask.write(&gds, Some(json.as_path())).unwrap();

        let back = MaskManifest::from_json(&fs::read_to_string(&json).unwrap()).unwrap();
        assert_eq!(back, mask.manifest);
        let lib = tftgen_io::read_gds(&gds, layer_stack()).unwrap();
        assert_eq!(lib.top().unwrap().name, "test_mask");
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_demo_die() {
        let die = demo().unwrap();
        assert_eq!(die.instance_count(), 3);
        let t2 = &die.instances[2];
        let t1 = &die.instances[1];
        assert!((t2.bbox().ymin() - t1.bbox().ymin() - 200.0).abs() < 1e-9);
    }
}
