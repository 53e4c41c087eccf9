//! # Block Edit Task
//!
//! Writes a batch of blocks into one chunk and schedules everything the edit invalidates:
//! meshes that can see the changed voxels, sunlight columns whose topmost blocker moved, and
//! tick handlers of blocks next to the change.

use std::sync::Arc;

use cgmath::Vector3;
use log::{debug, trace};

use super::{chunks_touching, LIGHT_REACH};
use crate::engine_state::task_management::task::{
    BlockChanges, ColumnSet, DirtySet, PipelineContext, Priority, Task, TaskPayload, TaskResult,
};
use crate::engine_state::voxels::block::block_side::BlockSide;
use crate::engine_state::voxels::block::Block;
use crate::engine_state::voxels::chunk::lock_set::{lock_chunk, BlockRead, BlockWrite};
use crate::engine_state::voxels::chunk::Chunk;
use crate::engine_state::voxels::coords::{split_relative, ChunkPos, InnerPos};

/// Slot of the edited chunk itself in per-chunk tables indexed by [`BlockSide`].
const SELF_SLOT: usize = 6;

/// A task that applies block changes to one chunk.
#[derive(Debug)]
pub struct SetBlockTask {
    chunk: Arc<Chunk>,
    /// Face neighbors indexed by [`BlockSide`], when loaded.
    face_neighbors: [Option<Arc<Chunk>>; 6],
    changes: BlockChanges,
    priority: Priority,
}

impl SetBlockTask {
    /// Creates a new block edit task.
    ///
    /// # Arguments
    /// * `chunk` - The chunk the changes apply to
    /// * `face_neighbors` - The six face-adjacent chunks, used to find tickable blocks next to
    ///   edits on the chunk border
    /// * `changes` - Blocks to write, by inner position
    /// * `priority` - Queue tier follow-ups are pushed with
    pub fn new(
        chunk: Arc<Chunk>,
        face_neighbors: [Option<Arc<Chunk>>; 6],
        changes: BlockChanges,
        priority: Priority,
    ) -> Self {
        SetBlockTask {
            chunk,
            face_neighbors,
            changes,
            priority,
        }
    }

    fn slot_chunk(&self, slot: usize) -> Option<&Arc<Chunk>> {
        if slot == SELF_SLOT {
            Some(&self.chunk)
        } else {
            self.face_neighbors[slot].as_ref()
        }
    }
}

impl Task for SetBlockTask {
    fn position(&self) -> ChunkPos {
        self.chunk.position()
    }

    fn priority(&self) -> Priority {
        self.priority
    }

    /// Applies the changes, skipping voxels that already hold the requested block, then
    /// pushes:
    /// 1. Mesh on every chunk whose box lies within reach of a changed voxel (one voxel, or
    ///    the full light range when the voxel's emitted light or light permeability changed)
    /// 2. SetSunlight on this chunk for columns where a sun-blocking block appeared or vanished
    /// 3. UpdateBlock on the chunks owning tickable blocks at or next to a changed voxel
    fn process(self, context: &PipelineContext) -> TaskResult {
        let position = self.position();
        let registry = context.world.registry();

        let mut applied: Vec<(InnerPos, Block)> = Vec::new();
        let mut columns = ColumnSet::new();
        let mut mesh_targets: Vec<ChunkPos> = Vec::new();
        {
            let mut locks = lock_chunk::<BlockWrite>(&self.chunk);
            let blocks = locks.blocks_mut(0);
            for (inner, block) in self.changes.iter() {
                let old = blocks.get(inner);
                if old == block {
                    continue;
                }
                blocks.set(inner, block);
                applied.push((inner, block));

                let (before, after) = (registry.properties(old), registry.properties(block));
                if before.blocks_sunlight != after.blocks_sunlight {
                    columns.insert(inner.x, inner.z);
                }
                let reach = if before.light_level != after.light_level
                    || before.passes_light != after.passes_light
                {
                    LIGHT_REACH
                } else {
                    1
                };
                let reach = Vector3::new(reach, reach, reach);
                for target in chunks_touching(position, inner - reach, inner + reach) {
                    if !mesh_targets.contains(&target) {
                        mesh_targets.push(target);
                    }
                }
            }
        }

        let mut result = TaskResult::new();
        if applied.is_empty() {
            trace!("No block of {:?} changed", position);
            return result;
        }
        debug!("Applied {} block changes to {:?}", applied.len(), position);
        context.world.persistence().blocks_changed(position, &applied);

        for target in mesh_targets {
            result.push(target, TaskPayload::Mesh, self.priority);
        }
        if !columns.is_empty() {
            result.push(position, TaskPayload::SetSunlight(columns), self.priority);
        }

        // Candidates for ticking: the changed voxels and their face neighbors, grouped by the
        // chunk that owns them.
        let mut candidates: [Vec<InnerPos>; 7] = Default::default();
        for &(inner, _) in &applied {
            let around = BlockSide::all().map(|side| inner + side.normal());
            for relative in std::iter::once(inner).chain(around) {
                let (offset, owner_inner) = split_relative(relative);
                let slot = match BlockSide::from_normal(offset) {
                    Some(side) => side as usize,
                    None => SELF_SLOT,
                };
                candidates[slot].push(owner_inner);
            }
        }

        for (slot, inners) in candidates.iter().enumerate() {
            if inners.is_empty() {
                continue;
            }
            let Some(chunk) = self.slot_chunk(slot) else {
                continue;
            };
            let mut dirty = DirtySet::new();
            {
                let locks = lock_chunk::<BlockRead>(chunk);
                let blocks = locks.blocks(0);
                for &owner_inner in inners {
                    if registry.is_tickable(blocks.get(owner_inner)) {
                        dirty.insert(owner_inner);
                    }
                }
            }
            if !dirty.is_empty() {
                result.push(chunk.position(), TaskPayload::UpdateBlock(dirty), Priority::Low);
            }
        }
        result
    }
}

