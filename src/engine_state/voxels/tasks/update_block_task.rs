//! # Block Tick Task
//!
//! Runs the tick handlers of dirty blocks. Handlers see the chunk and its 26 neighbors through
//! positions relative to the ticking chunk's origin and answer with block writes, which are
//! routed to the chunks that own them as SetBlock tasks.

use std::collections::BTreeMap;

use cgmath::Point3;
use log::trace;

use crate::engine_state::task_management::task::{
    BlockChanges, DirtySet, PipelineContext, Priority, Task, TaskPayload, TaskResult,
};
use crate::engine_state::voxels::block::registry::TickContext;
use crate::engine_state::voxels::block::Block;
use crate::engine_state::voxels::chunk::lock_set::BlockRead;
use crate::engine_state::voxels::chunk::neighborhood::Neighborhood;
use crate::engine_state::voxels::chunk::CHUNK_DIMENSION;
use crate::engine_state::voxels::coords::{
    is_neighbor_offset, neighborhood_index, split_relative, ChunkPos, CENTER_INDEX,
};

/// A task that ticks the dirty blocks of a chunk.
#[derive(Debug)]
pub struct UpdateBlockTask {
    neighborhood: Neighborhood,
    dirty: DirtySet,
    priority: Priority,
}

impl UpdateBlockTask {
    pub fn new(neighborhood: Neighborhood, dirty: DirtySet, priority: Priority) -> Self {
        UpdateBlockTask {
            neighborhood,
            dirty,
            priority,
        }
    }
}

impl Task for UpdateBlockTask {
    fn position(&self) -> ChunkPos {
        self.neighborhood.position()
    }

    fn priority(&self) -> Priority {
        self.priority
    }

    /// Ticks every dirty block that still has a handler.
    ///
    /// Writes aimed outside the neighborhood are dropped. When several handlers write the same
    /// voxel, the one ticked last wins.
    fn process(self, context: &PipelineContext) -> TaskResult {
        let position = self.position();
        let registry = context.world.registry();

        // Changes keyed by neighborhood slot.
        let mut routed: BTreeMap<usize, BlockChanges> = BTreeMap::new();
        {
            let locks = self.neighborhood.lock::<BlockRead>();
            let reachable = -CHUNK_DIMENSION..2 * CHUNK_DIMENSION;
            let lookup = |relative: Point3<i32>| {
                if reachable.contains(&relative.x)
                    && reachable.contains(&relative.y)
                    && reachable.contains(&relative.z)
                {
                    locks.block_relative(relative)
                } else {
                    Block::AIR
                }
            };

            for inner in self.dirty.iter() {
                let block = locks.blocks(CENTER_INDEX).get(inner);
                let Some(tick) = registry.tick_handler(block) else {
                    continue;
                };
                let tick_context = TickContext {
                    position: inner,
                    block,
                    registry,
                    lookup: &lookup,
                };
                for (relative, written) in tick(&tick_context) {
                    let (offset, owner_inner) = split_relative(relative);
                    if !is_neighbor_offset(offset) {
                        continue;
                    }
                    routed
                        .entry(neighborhood_index(offset))
                        .or_default()
                        .insert(owner_inner, written);
                }
            }
        }

        let mut result = TaskResult::new();
        trace!(
            "Ticked {} blocks of {:?}, writing into {} chunks",
            self.dirty.len(),
            position,
            routed.len()
        );
        for (slot, changes) in routed {
            let owner = self.neighborhood.chunk(slot).position();
            result.push(owner, TaskPayload::SetBlock(changes), self.priority);
        }
        result
    }
}
