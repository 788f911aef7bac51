//! Shelf packing of structures into fixed-size blocks.

use tftgen_core::Point;

use crate::config::BlockConfig;

/// Where one item ended up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placed {
    /// Index into the packed items.
    pub item: usize,
    pub block: usize,
    /// Lower-left corner relative to the block's lower-left corner.
    pub origin: Point,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Packing {
    pub placed: Vec<Placed>,
    /// Items too large for a block.
    pub oversized: Vec<usize>,
    pub block_count: usize,
}

impl Packing {
    pub fn in_block(&self, block: usize) -> impl Iterator<Item = &Placed> {
        self.placed.iter().filter(move |p| p.block == block)
    }
}

/// Pack `sizes` (width, height) into blocks: tallest first, left to right
/// along a shelf, a new shelf above when the row is full and a new block when
/// the shelves reach the top. Items keep `block.spacing` between each other
/// and `block.margin` from the block edges.
pub fn pack(sizes: &[(f64, f64)], block: &BlockConfig) -> Packing {
    let (uw, uh) = block.usable();
    let gap = block.spacing;
    let mut packing = Packing::default();

    let mut order: Vec<usize> = (0..sizes.len()).collect();
    order.sort_by(|&a, &b| sizes[b].1.total_cmp(&sizes[a].1));

    // Cursor within the usable area of the current block.
    let (mut x, mut y, mut shelf_h) = (0.0, 0.0, 0.0);
    let mut block_idx: Option<usize> = None;
    for i in order {
        let (w, h) = sizes[i];
        if w > uw || h > uh {
            log::warn!(
                "item {} ({:.1} x {:.1}) does not fit a {:.1} x {:.1} block area",
                i,
                w,
                h,
                uw,
                uh
            );
            packing.oversized.push(i);
            continue;
        }
        let current = match block_idx {
            Some(b) => {
                if x > 0.0 && x + w > uw {
                    y += shelf_h + gap;
                    x = 0.0;
                    shelf_h = 0.0;
                }
                if y + h > uh {
                    x = 0.0;
                    y = 0.0;
                    shelf_h = 0.0;
                    b + 1
                } else {
                    b
                }
            }
            None => 0,
        };
        block_idx = Some(current);
        packing.placed.push(Placed {
            item: i,
            block: current,
            origin: Point::new(block.margin + x, block.margin + y),
        });
        x += w + gap;
        shelf_h = f64::max(shelf_h, h);
    }
    packing.block_count = block_idx.map_or(0, |b| b + 1);
    packing
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block() -> BlockConfig {
        BlockConfig {
            width: 1000.0,
            height: 1000.0,
            margin: 100.0,
            spacing: 10.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_tallest_first_along_shelves() {
        let sizes = [(300.0, 100.0), (300.0, 200.0), (300.0, 150.0), (300.0, 50.0)];
        let packing = pack(&sizes, &block());
        assert_eq!(packing.block_count, 1);
        let order: Vec<usize> = packing.placed.iter().map(|p| p.item).collect();
        assert_eq!(order, vec![1, 2, 0, 3]);
        // Usable width 800 holds two 300 wide items per shelf.
        assert!(packing.placed[0].origin.approx_eq(&Point::new(100.0, 100.0)));
        assert!(packing.placed[1].origin.approx_eq(&Point::new(410.0, 100.0)));
        assert!(packing.placed[2].origin.approx_eq(&Point::new(100.0, 310.0)));
        assert!(packing.placed[3].origin.approx_eq(&Point::new(410.0, 310.0)));
    }

    #[test]
    fn test_full_block_opens_another() {
        let sizes = vec![(800.0, 500.0); 3];
        let packing = pack(&sizes, &block());
        // Two 500 high shelves do not fit in 800.
        assert_eq!(packing.block_count, 3);
        assert_eq!(packing.in_block(0).count(), 1);
        assert_eq!(packing.in_block(1).count(), 1);
        assert_eq!(packing.in_block(2).count(), 1);
        assert!(packing.placed[2].origin.approx_eq(&Point::new(100.0, 100.0)));
    }

    #[test]
    fn test_oversized_items_are_left_out() {
        let sizes = [(900.0, 10.0), (10.0, 10.0)];
        let packing = pack(&sizes, &block());
        assert_eq!(packing.oversized, vec![0]);
        assert_eq!(packing.placed.len(), 1);
        assert_eq!(packing.block_count, 1);
        assert!(pack(&[], &block()).placed.is_empty());
    }
}
