//! A chunk together with its 26 neighbors, and relative lookups across them once locked.

use std::array;
use std::sync::Arc;

use cgmath::Point3;

use super::lock_set::{acquire_locks, LockMode, LockSet, ReadAccess};
use super::Chunk;
use crate::engine_state::voxels::block::Block;
use crate::engine_state::voxels::coords::{
    neighborhood, neighborhood_index, split_relative, ChunkPos, CENTER_INDEX, NEIGHBORHOOD_SIZE,
};
use crate::engine_state::voxels::world::World;

/// Strong references to the 27 chunks around a center chunk, in neighborhood slot order.
#[derive(Clone, Debug)]
pub struct Neighborhood {
    chunks: [Arc<Chunk>; NEIGHBORHOOD_SIZE],
}

impl Neighborhood {
    /// Collects the neighborhood of `center`, or `None` if any of the 27 chunks is not loaded.
    pub fn resolve(world: &World, center: ChunkPos) -> Option<Self> {
        let positions = neighborhood(center);
        let mut chunks: [Option<Arc<Chunk>>; NEIGHBORHOOD_SIZE] = array::from_fn(|_| None);
        for (slot, position) in chunks.iter_mut().zip(positions) {
            *slot = Some(world.get_chunk_at(position)?);
        }
        Some(Neighborhood {
            chunks: chunks.map(|chunk| chunk.unwrap_or_else(|| unreachable!("every slot is filled"))),
        })
    }

    pub fn from_chunks(chunks: [Arc<Chunk>; NEIGHBORHOOD_SIZE]) -> Self {
        Neighborhood { chunks }
    }

    pub fn center(&self) -> &Arc<Chunk> {
        &self.chunks[CENTER_INDEX]
    }

    pub fn position(&self) -> ChunkPos {
        self.center().position()
    }

    pub fn chunk(&self, index: usize) -> &Arc<Chunk> {
        &self.chunks[index]
    }

    /// Whether every chunk of the neighborhood finished terrain generation.
    pub fn is_generated(&self) -> bool {
        self.chunks.iter().all(|chunk| chunk.is_generated())
    }

    /// Locks all 27 chunks in mode `M`. Slot indices of the lock set match the neighborhood.
    pub fn lock<M: LockMode>(&self) -> LockSet<'_, M, NEIGHBORHOOD_SIZE> {
        acquire_locks(array::from_fn(|index| &*self.chunks[index]))
    }
}

impl<M: LockMode> LockSet<'_, M, NEIGHBORHOOD_SIZE>
where
    M::Blocks: ReadAccess,
{
    /// Block at a position relative to the center chunk's origin, in `[-16, 32)` per axis.
    pub fn block_relative(&self, position: Point3<i32>) -> Block {
        let (offset, inner) = split_relative(position);
        self.blocks(neighborhood_index(offset)).get(inner)
    }
}

impl<M: LockMode> LockSet<'_, M, NEIGHBORHOOD_SIZE>
where
    M::Sunlight: ReadAccess,
{
    /// Whether the voxel at a position relative to the center chunk's origin is directly sunlit.
    pub fn is_sunlit_relative(&self, position: Point3<i32>) -> bool {
        let (offset, inner) = split_relative(position);
        self.sunlight(neighborhood_index(offset))
            .is_sunlit(inner.x, inner.y, inner.z)
    }
}
