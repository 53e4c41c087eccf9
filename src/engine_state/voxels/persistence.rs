//! # Persistence Module
//!
//! Hooks through which a host stores edits and restores them when a chunk is regenerated.
//!
//! The pipeline never serializes chunks itself. Instead it asks the persistence layer for
//! *overrides* right after running the terrain generator, and reports every applied block
//! edit and every sunlight-height change afterwards.

use dashmap::DashMap;

use super::block::Block;
use super::coords::{ChunkPos, InnerPos};

/// Edits replayed on top of generated terrain.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChunkOverrides {
    pub blocks: Vec<(InnerPos, Block)>,
    /// `(column index, height)` pairs.
    pub sunlight_heights: Vec<(usize, u8)>,
}

impl ChunkOverrides {
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty() && self.sunlight_heights.is_empty()
    }
}

/// Storage backend notified by the pipeline. Every method has a no-op default.
pub trait WorldPersistence: Send + Sync {
    /// Overrides to apply after generating the chunk at `position`.
    fn overrides(&self, _position: ChunkPos) -> Option<ChunkOverrides> {
        None
    }

    /// Called after a SetBlock task changed blocks of `position`.
    fn blocks_changed(&self, _position: ChunkPos, _changes: &[(InnerPos, Block)]) {}

    /// Called after a SetSunlight task changed heights of `position`.
    fn sunlight_changed(&self, _position: ChunkPos, _columns: &[(usize, u8)]) {}
}

/// Persistence that stores nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullPersistence;

impl WorldPersistence for NullPersistence {}

/// Keeps every block edit in memory so evicted chunks come back edited.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    overrides: DashMap<ChunkPos, ChunkOverrides>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        MemoryPersistence::default()
    }

    /// Stages overrides for a chunk, e.g. edits received before the chunk was loaded.
    pub fn stage(&self, position: ChunkPos, overrides: ChunkOverrides) {
        self.overrides.insert(position, overrides);
    }

    /// Number of chunks with recorded edits.
    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }
}

impl WorldPersistence for MemoryPersistence {
    fn overrides(&self, position: ChunkPos) -> Option<ChunkOverrides> {
        self.overrides.get(&position).map(|entry| entry.clone())
    }

    fn blocks_changed(&self, position: ChunkPos, changes: &[(InnerPos, Block)]) {
        let mut entry = self.overrides.entry(position).or_default();
        for &(inner, block) in changes {
            match entry.blocks.iter_mut().find(|(recorded, _)| *recorded == inner) {
                Some(recorded) => recorded.1 = block,
                None => entry.blocks.push((inner, block)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::block::block_type::BlockType;
    use cgmath::Point3;

    #[test]
    fn later_edits_replace_earlier_ones() {
        let persistence = MemoryPersistence::new();
        let position = Point3::new(0, 1, 0);
        let inner = Point3::new(1, 2, 3);

        persistence.blocks_changed(position, &[(inner, Block::new(BlockType::DIRT))]);
        persistence.blocks_changed(position, &[(inner, Block::AIR)]);

        let overrides = persistence.overrides(position).expect("edits were recorded");
        assert_eq!(overrides.blocks, vec![(inner, Block::AIR)]);
        assert_eq!(persistence.len(), 1);
        assert!(NullPersistence.overrides(position).is_none());
    }
}
