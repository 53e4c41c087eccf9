//! # Chunk Module
//!
//! This module provides the `Chunk` struct and related functionality for managing
//! 16x16x16 blocks of voxel data.
//!
//! ## Storage
//!
//! A chunk owns two independently lockable pieces of state:
//! - `blocks`: a dense [`BlockArray`] of 4096 two-byte blocks, indexed `x + 16y + 256z`
//! - `sunlight`: [`SunlightHeights`], one byte per column giving the lowest local `y` that
//!   receives direct sunlight (16 when none does)
//!
//! Both sit behind their own `parking_lot::RwLock`, so a task that only rewrites heights does
//! not block meshers reading blocks. Locks are never taken directly; tasks go through
//! [`lock_set::acquire_locks`], which enforces a global acquisition order.

use std::sync::atomic::{AtomicBool, Ordering};

use cgmath::Point3;
use parking_lot::RwLock;

use super::block::Block;
use super::coords::{column_index, voxel_index, ChunkPos, InnerPos};

pub mod lock_set;
pub mod neighborhood;
pub mod padded;

/// The dimension (width, height, depth) of a chunk in blocks.
pub const CHUNK_DIMENSION: i32 = 16;
/// The number of blocks in a single 2D plane of a chunk (CHUNK_DIMENSION²).
pub const CHUNK_PLANE_SIZE: i32 = CHUNK_DIMENSION * CHUNK_DIMENSION;
/// The total number of blocks in a chunk (CHUNK_DIMENSION³).
pub const CHUNK_SIZE: i32 = CHUNK_PLANE_SIZE * CHUNK_DIMENSION;
/// The dimension of a chunk including an extra layer of blocks on each side for neighbor lookups.
pub const CHUNK_DIMENSION_WRAPPED: usize = (CHUNK_DIMENSION + 2) as usize;
/// The number of blocks in a wrapped 2D chunk plane.
pub const CHUNK_PLANE_SIZE_WRAPPED: usize = CHUNK_DIMENSION_WRAPPED * CHUNK_DIMENSION_WRAPPED;
/// The total number of blocks in a wrapped chunk.
pub const CHUNK_SIZE_WRAPPED: usize = CHUNK_PLANE_SIZE_WRAPPED * CHUNK_DIMENSION_WRAPPED;

/// Height value of a column that receives no direct sunlight inside the chunk.
pub const NO_SUNLIGHT: u8 = CHUNK_DIMENSION as u8;

/// Dense storage of the blocks of one chunk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockArray {
    blocks: Box<[Block]>,
}

impl BlockArray {
    /// Creates an array where every voxel holds `block`.
    pub fn filled(block: Block) -> Self {
        BlockArray {
            blocks: vec![block; CHUNK_SIZE as usize].into_boxed_slice(),
        }
    }

    /// Gets the block at the specified chunk-relative coordinates.
    ///
    /// # Panics
    /// Panics if the coordinates are out of bounds.
    pub fn get(&self, position: InnerPos) -> Block {
        self.blocks[voxel_index(position)]
    }

    pub fn set(&mut self, position: InnerPos, block: Block) {
        self.blocks[voxel_index(position)] = block;
    }

    pub fn get_index(&self, index: usize) -> Block {
        self.blocks[index]
    }

    pub fn set_index(&mut self, index: usize, block: Block) {
        self.blocks[index] = block;
    }

    pub fn fill(&mut self, block: Block) {
        self.blocks.fill(block);
    }

    /// Returns `true` when every voxel is air.
    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|block| block.is_air())
    }

    /// Iterates over `(index, block)` for every non-air voxel.
    pub fn iter_solid(&self) -> impl Iterator<Item = (usize, Block)> + '_ {
        self.blocks
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, block)| !block.is_air())
    }

    /// Raw view of the array, e.g. for persistence.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.blocks[..])
    }
}

impl Default for BlockArray {
    fn default() -> Self {
        BlockArray::filled(Block::AIR)
    }
}

/// Per-column sunlight heights of one chunk, indexed `x + 16z`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SunlightHeights {
    heights: [u8; CHUNK_PLANE_SIZE as usize],
}

impl SunlightHeights {
    pub fn filled(height: u8) -> Self {
        debug_assert!(height <= NO_SUNLIGHT);
        SunlightHeights {
            heights: [height; CHUNK_PLANE_SIZE as usize],
        }
    }

    pub fn get(&self, x: i32, z: i32) -> u8 {
        self.heights[column_index(x, z)]
    }

    pub fn set(&mut self, x: i32, z: i32, height: u8) {
        self.set_column(column_index(x, z), height);
    }

    pub fn get_column(&self, column: usize) -> u8 {
        self.heights[column]
    }

    pub fn set_column(&mut self, column: usize, height: u8) {
        debug_assert!(height <= NO_SUNLIGHT);
        self.heights[column] = height;
    }

    /// Whether the voxel at local `y` of the column receives direct sunlight.
    pub fn is_sunlit(&self, x: i32, y: i32, z: i32) -> bool {
        y >= self.get(x, z) as i32
    }
}

impl Default for SunlightHeights {
    fn default() -> Self {
        SunlightHeights::filled(0)
    }
}

/// Represents a 16x16x16 collection of voxel blocks in the world.
///
/// Chunks are the fundamental unit of world data and scheduling. Each chunk maintains its
/// position in the world, its lockable block and sunlight state, and whether terrain
/// generation has completed for it.
pub struct Chunk {
    /// The position of this chunk in chunk coordinates (not block coordinates).
    position: ChunkPos,
    blocks: RwLock<BlockArray>,
    sunlight: RwLock<SunlightHeights>,
    generated: AtomicBool,
}

impl Chunk {
    /// Creates a new, completely empty chunk (all blocks are air) that has not been generated.
    ///
    /// # Arguments
    /// * `position` - The chunk coordinates of the new chunk
    pub fn new(position: ChunkPos) -> Self {
        Chunk {
            position,
            blocks: RwLock::new(BlockArray::default()),
            sunlight: RwLock::new(SunlightHeights::default()),
            generated: AtomicBool::new(false),
        }
    }

    /// Creates an already generated chunk from existing data.
    pub fn with_data(position: ChunkPos, blocks: BlockArray, sunlight: SunlightHeights) -> Self {
        Chunk {
            position,
            blocks: RwLock::new(blocks),
            sunlight: RwLock::new(sunlight),
            generated: AtomicBool::new(true),
        }
    }

    pub fn position(&self) -> Point3<i32> {
        self.position
    }

    pub fn is_generated(&self) -> bool {
        self.generated.load(Ordering::Acquire)
    }

    pub(crate) fn mark_generated(&self) {
        self.generated.store(true, Ordering::Release);
    }

    pub(crate) fn block_lock(&self) -> &RwLock<BlockArray> {
        &self.blocks
    }

    pub(crate) fn sunlight_lock(&self) -> &RwLock<SunlightHeights> {
        &self.sunlight
    }
}

impl std::fmt::Debug for Chunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chunk")
            .field("position", &self.position)
            .field("generated", &self.is_generated())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::block::block_type::BlockType;

    #[test]
    fn block_array_tracks_solid_voxels() {
        let mut blocks = BlockArray::default();
        assert!(blocks.is_empty());

        let stone = Block::new(BlockType::STONE);
        blocks.set(Point3::new(3, 4, 5), stone);
        assert!(!blocks.is_empty());
        assert_eq!(blocks.get(Point3::new(3, 4, 5)), stone);
        assert_eq!(
            blocks.iter_solid().collect::<Vec<_>>(),
            vec![(3 + 16 * 4 + 256 * 5, stone)]
        );
        assert_eq!(blocks.as_bytes().len(), 2 * CHUNK_SIZE as usize);
    }

    #[test]
    fn sunlit_test_uses_column_height() {
        let mut heights = SunlightHeights::default();
        heights.set(2, 7, 9);
        assert!(!heights.is_sunlit(2, 8, 7));
        assert!(heights.is_sunlit(2, 9, 7));
        assert!(heights.is_sunlit(0, 0, 0));
    }

    #[test]
    fn chunks_start_ungenerated() {
        let chunk = Chunk::new(Point3::new(1, 2, 3));
        assert!(!chunk.is_generated());
        chunk.mark_generated();
        assert!(chunk.is_generated());
    }
}
