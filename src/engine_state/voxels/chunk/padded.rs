//! A chunk's blocks plus a one-voxel shell copied from its neighbors, so the mesher can run
//! without holding any locks.

use cgmath::Point3;

use super::lock_set::{LockMode, LockSet, ReadAccess};
use super::{CHUNK_DIMENSION, CHUNK_DIMENSION_WRAPPED, CHUNK_PLANE_SIZE_WRAPPED, CHUNK_SIZE_WRAPPED};
use crate::engine_state::voxels::block::Block;
use crate::engine_state::voxels::coords::NEIGHBORHOOD_SIZE;

/// 18³ block copy covering `[-1, 17)` on each axis relative to the chunk origin.
#[derive(Clone, Debug)]
pub struct PaddedBlocks {
    blocks: Box<[Block]>,
}

impl PaddedBlocks {
    pub fn new() -> Self {
        PaddedBlocks {
            blocks: vec![Block::AIR; CHUNK_SIZE_WRAPPED].into_boxed_slice(),
        }
    }

    /// Whether `position` lies inside the padded range.
    pub fn contains(position: Point3<i32>) -> bool {
        let range = -1..CHUNK_DIMENSION + 1;
        range.contains(&position.x) && range.contains(&position.y) && range.contains(&position.z)
    }

    fn index(position: Point3<i32>) -> usize {
        debug_assert!(Self::contains(position), "{position:?} is outside the padded range");
        (position.x + 1) as usize
            + CHUNK_DIMENSION_WRAPPED * (position.y + 1) as usize
            + CHUNK_PLANE_SIZE_WRAPPED * (position.z + 1) as usize
    }

    pub fn get(&self, position: Point3<i32>) -> Block {
        self.blocks[Self::index(position)]
    }

    pub fn set(&mut self, position: Point3<i32>, block: Block) {
        self.blocks[Self::index(position)] = block;
    }

    /// Copies the padded region out of a locked neighborhood.
    pub fn copy_from<M: LockMode>(&mut self, locks: &LockSet<'_, M, NEIGHBORHOOD_SIZE>)
    where
        M::Blocks: ReadAccess,
    {
        for z in -1..CHUNK_DIMENSION + 1 {
            for y in -1..CHUNK_DIMENSION + 1 {
                for x in -1..CHUNK_DIMENSION + 1 {
                    let position = Point3::new(x, y, z);
                    self.set(position, locks.block_relative(position));
                }
            }
        }
    }
}

impl Default for PaddedBlocks {
    fn default() -> Self {
        PaddedBlocks::new()
    }
}
