//! # Chunk Generation Task
//!
//! Runs the terrain generator for a freshly created chunk, replays persisted edits on top of
//! the result and schedules the work that depends on the new contents.

use std::sync::Arc;

use cgmath::Vector3;
use log::{debug, trace};
use web_time::Instant;

use crate::engine_state::task_management::task::{
    ColumnSet, PipelineContext, Priority, Task, TaskPayload, TaskResult,
};
use crate::engine_state::voxels::chunk::lock_set::{lock_chunk, BlockWriteSunlightWrite};
use crate::engine_state::voxels::chunk::{Chunk, NO_SUNLIGHT};
use crate::engine_state::voxels::coords::ChunkPos;

/// A task that generates the contents of one chunk.
///
/// Once done it pushes:
/// 1. A Mesh task for the chunk itself
/// 2. A SetSunlight task over every column of the chunk, correcting the open-sky assumption
///    of the generator once the chunk above is known
/// 3. A SetSunlight task over every column of the chunk below, whose light now depends on
///    this chunk
#[derive(Debug)]
pub struct GenerateTask {
    /// The chunk to fill. Its position determines the generated terrain.
    chunk: Arc<Chunk>,
    priority: Priority,
}

impl GenerateTask {
    /// Creates a new chunk generation task.
    ///
    /// # Arguments
    /// * `chunk` - The chunk to generate
    /// * `priority` - Queue tier follow-ups are pushed with
    pub fn new(chunk: Arc<Chunk>, priority: Priority) -> Self {
        GenerateTask { chunk, priority }
    }
}

impl Task for GenerateTask {
    fn position(&self) -> ChunkPos {
        self.chunk.position()
    }

    fn priority(&self) -> Priority {
        self.priority
    }

    fn process(self, context: &PipelineContext) -> TaskResult {
        let position = self.position();
        let start = Instant::now();

        {
            let mut locks = lock_chunk::<BlockWriteSunlightWrite>(&self.chunk);
            let (blocks, heights) = locks.split_mut(0);
            context.world.generator().generate(position, blocks, heights);

            if let Some(overrides) = context.world.persistence().overrides(position) {
                trace!(
                    "Replaying {} block and {} sunlight overrides on {:?}",
                    overrides.blocks.len(),
                    overrides.sunlight_heights.len(),
                    position
                );
                for (inner, block) in overrides.blocks {
                    blocks.set(inner, block);
                }
                for (column, height) in overrides.sunlight_heights {
                    heights.set_column(column, height.min(NO_SUNLIGHT));
                }
            }
        }
        self.chunk.mark_generated();
        debug!("Generated chunk {:?} in {:?}", position, start.elapsed());

        let mut result = TaskResult::new();
        result.push(position, TaskPayload::Mesh, self.priority);
        result.push(
            position,
            TaskPayload::SetSunlight(ColumnSet::all()),
            self.priority,
        );
        result.push(
            position - Vector3::unit_y(),
            TaskPayload::SetSunlight(ColumnSet::all()),
            self.priority,
        );
        result
    }
}
