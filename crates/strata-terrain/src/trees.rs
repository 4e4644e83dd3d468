//! Tree canopy processor: grows leaves around trunk tops after generation.
//!
//! The terrain generator only seeds trunk columns; this processor finds each
//! trunk's top voxel and grows a canopy of custom-block leaves around it,
//! spilling into neighbor chunks where the canopy crosses a border.

use strata_voxel::{ChunkProcessor, ProcessingSchedule, ProcessorContext, Voxel};

/// Grows leaf canopies on trunk-top voxels.
pub struct TreeProcessor {
    /// Sort key within the `AfterGeneration` stage.
    pub order: i32,
    /// Material value identifying trunk voxels.
    pub trunk_value: u8,
    /// Material value written for leaves.
    pub leaves_value: u8,
    /// Leaf color.
    pub leaf_color: [u8; 4],
}

impl Default for TreeProcessor {
    fn default() -> Self {
        Self {
            order: 0,
            trunk_value: 3,
            leaves_value: 8,
            leaf_color: [60, 160, 60, 255],
        }
    }
}

impl ChunkProcessor for TreeProcessor {
    fn schedule(&self) -> ProcessingSchedule {
        ProcessingSchedule::AfterGeneration
    }

    fn order(&self) -> i32 {
        self.order
    }

    fn process(&self, ctx: &mut ProcessorContext<'_>) -> bool {
        let size = ctx.size();

        // Trunk tops: trunk voxels whose cell above is not a trunk. The cell
        // above may live in the upper neighbor; treat absent as open air.
        let mut tops = Vec::new();
        for z in 0..size {
            for y in 0..size {
                for x in 0..size {
                    let voxel = ctx.chunk().voxel_at((x, y, z)).unwrap_or(Voxel::EMPTY);
                    if !voxel.is_active() || voxel.value != self.trunk_value {
                        continue;
                    }
                    let is_top = match ctx.voxel((x, y + 1, z)) {
                        Some(above) => !above.is_active() || above.value != self.trunk_value,
                        None => true,
                    };
                    if is_top {
                        tops.push((x, y, z));
                    }
                }
            }
        }

        let leaves = Voxel::custom(self.leaves_value, 0, self.leaf_color);
        for (tx, ty, tz) in tops {
            // Top cap is tight, the layers below reach out two cells.
            for dy in 0..=3 {
                let radius: i32 = if dy == 0 { 1 } else { 2 };
                for dz in -radius..=radius {
                    for dx in -radius..=radius {
                        // Never replace the trunk itself.
                        if dx == 0 && dz == 0 && dy > 0 {
                            continue;
                        }
                        // Ragged corners keep the canopy from looking boxy.
                        if dx.abs() == radius && dz.abs() == radius && (dx + dy + dz) % 2 == 0 {
                            continue;
                        }
                        let target = (tx + dx, ty - dy + 1, tz + dz);
                        let occupied = ctx.voxel(target).map(|v| v.is_active()).unwrap_or(true);
                        if !occupied {
                            ctx.write_voxel(target, leaves);
                        }
                    }
                }
            }
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use strata_voxel::{Chunk, ChunkKey, ChunkMap};

    use super::*;

    const S: usize = 16;

    fn map_with(keys: &[ChunkKey]) -> ChunkMap {
        let mut map = ChunkMap::default();
        for &key in keys {
            map.insert(key, Chunk::new(key, S));
        }
        map
    }

    fn plant_trunk(chunk: &mut Chunk, x: i32, z: i32, base: i32, height: i32, value: u8) {
        for y in base..base + height {
            chunk.write_generated((x, y, z), Voxel::solid(value, [255; 4]));
        }
    }

    #[test]
    fn test_canopy_grows_around_trunk_top() {
        let mut map = map_with(&[(0, 0, 0)]);
        let processor = TreeProcessor::default();
        plant_trunk(map.get_mut(&(0, 0, 0)).expect("chunk"), 8, 8, 0, 6, processor.trunk_value);

        let mut ctx = ProcessorContext::new(&mut map, (0, 0, 0), S);
        assert!(processor.process(&mut ctx));
        drop(ctx);

        let chunk = &map[&(0, 0, 0)];
        // Leaves beside the top of the trunk (top voxel is at y = 5).
        let side = chunk.voxel_at((9, 5, 8)).expect("in bounds");
        assert!(side.is_active());
        assert!(side.is_custom());
        assert_eq!(side.value, processor.leaves_value);
        // The trunk itself is untouched.
        assert_eq!(
            chunk.voxel_at((8, 4, 8)).expect("in bounds").value,
            processor.trunk_value
        );
    }

    #[test]
    fn test_canopy_spills_into_neighbor_chunk() {
        let mut map = map_with(&[(0, 0, 0), (1, 0, 0)]);
        let processor = TreeProcessor::default();
        // Trunk one cell from the +X border: the canopy reaches across.
        plant_trunk(
            map.get_mut(&(0, 0, 0)).expect("chunk"),
            S as i32 - 1,
            8,
            0,
            6,
            processor.trunk_value,
        );

        let mut ctx = ProcessorContext::new(&mut map, (0, 0, 0), S);
        processor.process(&mut ctx);
        drop(ctx);

        let neighbor = &map[&(1, 0, 0)];
        assert!(neighbor.has_data(), "canopy should spill across the border");
        assert!(neighbor.is_mesh_dirty());
    }

    #[test]
    fn test_missing_neighbor_does_not_panic() {
        let mut map = map_with(&[(0, 0, 0)]);
        let processor = TreeProcessor::default();
        plant_trunk(
            map.get_mut(&(0, 0, 0)).expect("chunk"),
            S as i32 - 1,
            8,
            0,
            6,
            processor.trunk_value,
        );

        let mut ctx = ProcessorContext::new(&mut map, (0, 0, 0), S);
        assert!(processor.process(&mut ctx));
    }

    #[test]
    fn test_no_trunks_is_a_noop() {
        let mut map = map_with(&[(0, 0, 0)]);
        let processor = TreeProcessor::default();
        let mut ctx = ProcessorContext::new(&mut map, (0, 0, 0), S);
        assert!(processor.process(&mut ctx));
        drop(ctx);
        assert!(!map[&(0, 0, 0)].has_data());
    }

    #[test]
    fn test_leaves_do_not_overwrite_solids() {
        let mut map = map_with(&[(0, 0, 0)]);
        let processor = TreeProcessor::default();
        {
            let chunk = map.get_mut(&(0, 0, 0)).expect("chunk");
            plant_trunk(chunk, 8, 8, 0, 6, processor.trunk_value);
            // A stone block inside the canopy volume.
            chunk.write_generated((9, 4, 8), Voxel::solid(1, [255; 4]));
        }

        let mut ctx = ProcessorContext::new(&mut map, (0, 0, 0), S);
        processor.process(&mut ctx);
        drop(ctx);

        assert_eq!(map[&(0, 0, 0)].voxel_at((9, 4, 8)).expect("in bounds").value, 1);
    }
}
