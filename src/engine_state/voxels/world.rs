//! # World Module
//!
//! This module provides the `World` struct which manages the collection of loaded chunks.
//! It serves as the central registry the scheduler and every task look chunks up in.
//!
//! ## Architecture
//!
//! The world uses a sparse storage approach where only chunks within the load radius of the
//! current center are kept in memory. This allows for effectively infinite world sizes while
//! maintaining reasonable memory usage.
//!
//! ## Thread Safety
//!
//! - Chunks live in a sharded `DashMap`, so lookups from many workers do not contend on one lock
//! - Each chunk is handed out as an `Arc`, so a task keeps its chunks alive even if the chunk is
//!   evicted while the task runs
//! - The map only guards membership; chunk contents are guarded by the chunk's own locks

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;

use super::block::registry::BlockRegistry;
use super::block::Block;
use super::chunk::lock_set::{lock_chunk, BlockRead};
use super::chunk::Chunk;
use super::coords::{split_world, ChunkPos, WorldPos};
use super::generation::TerrainGenerator;
use super::persistence::WorldPersistence;

/// Represents a voxel world composed of multiple chunks.
///
/// # Examples
///
/// ```ignore
/// let world = World::new(registry, generator, persistence);
///
/// // Add a chunk at position (0,0,0)
/// let (chunk, created) = world.add_chunk_at(Point3::new(0, 0, 0));
///
/// // Retrieve the chunk
/// if let Some(chunk) = world.get_chunk_at(Point3::new(0, 0, 0)) {
///     // Use the chunk...
/// }
/// ```
pub struct World {
    /// A mapping from chunk coordinates to chunk data.
    chunks: DashMap<ChunkPos, Arc<Chunk>>,
    registry: Arc<BlockRegistry>,
    generator: Arc<dyn TerrainGenerator>,
    persistence: Arc<dyn WorldPersistence>,
    /// Chunk the load radius is measured from.
    center: RwLock<ChunkPos>,
}

impl World {
    /// Creates a new, empty world.
    ///
    /// # Arguments
    ///
    /// * `registry` - Block behaviors every task consults
    /// * `generator` - Terrain generator run by Generate tasks
    /// * `persistence` - Edit storage consulted after generation and notified of changes
    pub fn new(
        registry: Arc<BlockRegistry>,
        generator: Arc<dyn TerrainGenerator>,
        persistence: Arc<dyn WorldPersistence>,
    ) -> Self {
        World {
            chunks: DashMap::new(),
            registry,
            generator,
            persistence,
            center: RwLock::new(ChunkPos::new(0, 0, 0)),
        }
    }

    /// Adds a new, ungenerated chunk at the specified chunk coordinates if one doesn't
    /// already exist.
    ///
    /// # Returns
    ///
    /// The chunk at `position` and whether this call created it.
    pub fn add_chunk_at(&self, position: ChunkPos) -> (Arc<Chunk>, bool) {
        let mut created = false;
        let chunk = self
            .chunks
            .entry(position)
            .or_insert_with(|| {
                created = true;
                Arc::new(Chunk::new(position))
            })
            .clone();
        (chunk, created)
    }

    /// Inserts an existing chunk, replacing whatever was loaded at its position.
    pub fn insert_chunk(&self, chunk: Arc<Chunk>) {
        self.chunks.insert(chunk.position(), chunk);
    }

    /// Retrieves the chunk at the specified chunk coordinates.
    ///
    /// # Returns
    ///
    /// A clone of the `Arc<Chunk>` if the chunk is loaded, or `None` if not.
    pub fn get_chunk_at(&self, position: ChunkPos) -> Option<Arc<Chunk>> {
        self.chunks.get(&position).map(|entry| entry.value().clone())
    }

    pub fn remove_chunk_at(&self, position: ChunkPos) -> Option<Arc<Chunk>> {
        self.chunks.remove(&position).map(|(_, chunk)| chunk)
    }

    pub fn contains(&self, position: ChunkPos) -> bool {
        self.chunks.contains_key(&position)
    }

    /// Number of loaded chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Positions of every loaded chunk, in no particular order.
    pub fn positions(&self) -> Vec<ChunkPos> {
        self.chunks.iter().map(|entry| *entry.key()).collect()
    }

    pub fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    pub fn generator(&self) -> &dyn TerrainGenerator {
        self.generator.as_ref()
    }

    pub fn persistence(&self) -> &dyn WorldPersistence {
        self.persistence.as_ref()
    }

    pub fn center(&self) -> ChunkPos {
        *self.center.read()
    }

    pub fn set_center(&self, center: ChunkPos) {
        *self.center.write() = center;
    }

    /// Reads the block at a world position, or `None` if its chunk is not loaded.
    pub fn block_at(&self, position: WorldPos) -> Option<Block> {
        let (chunk_position, inner) = split_world(position);
        let chunk = self.get_chunk_at(chunk_position)?;
        let locks = lock_chunk::<BlockRead>(&chunk);
        Some(locks.blocks(0).get(inner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::generation::FlatGenerator;
    use crate::engine_state::voxels::persistence::NullPersistence;
    use cgmath::Point3;

    fn world() -> World {
        World::new(
            Arc::new(BlockRegistry::default()),
            Arc::new(FlatGenerator::new(0)),
            Arc::new(NullPersistence),
        )
    }

    #[test]
    fn adding_twice_keeps_the_first_chunk() {
        let world = world();
        let (first, created) = world.add_chunk_at(Point3::new(1, 0, 0));
        assert!(created);
        let (second, created) = world.add_chunk_at(Point3::new(1, 0, 0));
        assert!(!created);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(world.len(), 1);
    }

    #[test]
    fn block_lookup_needs_a_loaded_chunk() {
        let world = world();
        assert_eq!(world.block_at(Point3::new(-1, 0, 0)), None);
        world.add_chunk_at(Point3::new(-1, 0, 0));
        assert_eq!(world.block_at(Point3::new(-1, 0, 0)), Some(Block::AIR));
        assert!(world.remove_chunk_at(Point3::new(-1, 0, 0)).is_some());
        assert!(!world.contains(Point3::new(-1, 0, 0)));
    }
}
