//! # Sunlight Height Task
//!
//! Recomputes the sunlight heights of a set of columns. A column is lit from its top down to
//! the first sun-blocking block, but only when sunlight reaches the chunk's top face, which
//! depends on the bottom of the same column in the chunk above.

use std::sync::Arc;

use cgmath::{Point3, Vector3};
use log::{debug, trace};

use super::{chunks_touching, LIGHT_REACH};
use crate::engine_state::task_management::task::{
    ColumnSet, PipelineContext, Priority, Task, TaskPayload, TaskResult,
};
use crate::engine_state::voxels::block::registry::BlockRegistry;
use crate::engine_state::voxels::chunk::lock_set::{
    lock_chunk, BlockReadSunlightWrite, SunlightRead,
};
use crate::engine_state::voxels::chunk::{BlockArray, Chunk, SunlightHeights, CHUNK_DIMENSION, NO_SUNLIGHT};
use crate::engine_state::voxels::coords::{column_position, ChunkPos};

/// Sunlight height of a column lit from above: one past its topmost sun-blocking block.
pub fn scan_column(blocks: &BlockArray, registry: &BlockRegistry, x: i32, z: i32) -> u8 {
    (0..CHUNK_DIMENSION)
        .rev()
        .find(|&y| registry.properties(blocks.get(Point3::new(x, y, z))).blocks_sunlight)
        .map_or(0, |y| y as u8 + 1)
}

/// A task that recomputes sunlight heights of some columns of a chunk.
#[derive(Debug)]
pub struct SetSunlightTask {
    chunk: Arc<Chunk>,
    /// The chunk directly above, if loaded.
    above: Option<Arc<Chunk>>,
    columns: ColumnSet,
    priority: Priority,
}

impl SetSunlightTask {
    pub fn new(
        chunk: Arc<Chunk>,
        above: Option<Arc<Chunk>>,
        columns: ColumnSet,
        priority: Priority,
    ) -> Self {
        SetSunlightTask {
            chunk,
            above,
            columns,
            priority,
        }
    }

    /// Heights of the chunk above, or `None` when sunlight falls in unobstructed.
    ///
    /// An ungenerated or unloaded chunk above counts as open sky.
    fn heights_above(&self) -> Option<SunlightHeights> {
        let above = self.above.as_ref().filter(|above| above.is_generated())?;
        let locks = lock_chunk::<SunlightRead>(above);
        Some(locks.sunlight(0).clone())
    }
}

impl Task for SetSunlightTask {
    fn position(&self) -> ChunkPos {
        self.chunk.position()
    }

    fn priority(&self) -> Priority {
        self.priority
    }

    /// Updates the heights, then pushes:
    /// 1. SetSunlight on the chunk below for columns whose bottom voxel changed between lit
    ///    and unlit
    /// 2. Mesh on every chunk within light reach of a voxel whose direct sunlight changed
    fn process(self, context: &PipelineContext) -> TaskResult {
        let position = self.position();
        let registry = context.world.registry();
        let above = self.heights_above();

        // (column, old height, new height)
        let mut changed = Vec::new();
        {
            let mut locks = lock_chunk::<BlockReadSunlightWrite>(&self.chunk);
            let (blocks, heights) = locks.blocks_and_sunlight_mut(0);
            for column in self.columns.iter() {
                let (x, z) = column_position(column);
                let shaded = above
                    .as_ref()
                    .is_some_and(|above| above.get_column(column) != 0);
                let height = if shaded {
                    NO_SUNLIGHT
                } else {
                    scan_column(blocks, registry, x, z)
                };
                let old = heights.get_column(column);
                if old != height {
                    heights.set_column(column, height);
                    changed.push((column, old, height));
                }
            }
        }

        let mut result = TaskResult::new();
        if changed.is_empty() {
            trace!("Sunlight of {:?} unchanged over {} columns", position, self.columns.len());
            return result;
        }
        debug!("Sunlight of {:?} changed in {} columns", position, changed.len());

        let persisted: Vec<(usize, u8)> = changed.iter().map(|&(column, _, new)| (column, new)).collect();
        context.world.persistence().sunlight_changed(position, &persisted);

        let mut below = ColumnSet::new();
        for &(column, old, new) in &changed {
            if (old == 0) != (new == 0) {
                below.insert_index(column);
            }
        }
        if !below.is_empty() {
            result.push(
                position - Vector3::unit_y(),
                TaskPayload::SetSunlight(below),
                self.priority,
            );
        }

        let mut min = Point3::new(i32::MAX, i32::MAX, i32::MAX);
        let mut max = Point3::new(i32::MIN, i32::MIN, i32::MIN);
        for &(column, old, new) in &changed {
            let (x, z) = column_position(column);
            min.x = min.x.min(x);
            max.x = max.x.max(x);
            min.z = min.z.min(z);
            max.z = max.z.max(z);
            min.y = min.y.min(old.min(new) as i32);
            max.y = max.y.max(old.max(new) as i32 - 1);
        }
        let reach = Vector3::new(LIGHT_REACH, LIGHT_REACH, LIGHT_REACH);
        for chunk in chunks_touching(position, min - reach, max + reach) {
            result.push(chunk, TaskPayload::Mesh, self.priority);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::block::block_type::BlockType;
    use crate::engine_state::voxels::block::Block;

    #[test]
    fn scan_finds_topmost_sun_blocker() {
        let registry = BlockRegistry::default();
        let mut blocks = BlockArray::default();
        assert_eq!(scan_column(&blocks, &registry, 3, 3), 0);

        blocks.set(Point3::new(3, 2, 3), Block::new(BlockType::STONE));
        blocks.set(Point3::new(3, 9, 3), Block::new(BlockType::GLASS));
        assert_eq!(scan_column(&blocks, &registry, 3, 3), 3);

        blocks.set(Point3::new(3, 15, 3), Block::new(BlockType::LEAVES));
        assert_eq!(scan_column(&blocks, &registry, 3, 3), 16);
    }
}
