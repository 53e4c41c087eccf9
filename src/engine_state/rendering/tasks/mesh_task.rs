//! Task for generating mesh data for chunks in a background thread.
//!
//! The task locks the chunk and its 26 neighbors just long enough to copy the padded blocks
//! and flood the extended light volume, then releases every lock before running the mesher.

use std::cell::RefCell;

use log::{debug, trace};
use web_time::Instant;

use crate::engine_state::rendering::meshing::{generate_mesh, MeshInput, MeshScratch};
use crate::engine_state::task_management::task::{PipelineContext, Priority, Task, TaskResult};
use crate::engine_state::voxels::chunk::lock_set::BlockReadSunlightRead;
use crate::engine_state::voxels::chunk::neighborhood::Neighborhood;
use crate::engine_state::voxels::coords::{ChunkPos, CENTER_INDEX};

thread_local! {
    static SCRATCH: RefCell<MeshScratch> = RefCell::new(MeshScratch::default());
}

/// A task that rebuilds the mesh of a chunk.
#[derive(Debug)]
pub struct MeshTask {
    /// The chunk being meshed and its 26 neighbors.
    neighborhood: Neighborhood,
    priority: Priority,
}

impl MeshTask {
    /// Creates a new mesh task.
    ///
    /// # Arguments
    /// * `neighborhood` - The chunk to mesh together with its neighbors
    /// * `priority` - Queue tier follow-ups are pushed with
    pub fn new(neighborhood: Neighborhood, priority: Priority) -> Self {
        MeshTask {
            neighborhood,
            priority,
        }
    }
}

impl Task for MeshTask {
    fn position(&self) -> ChunkPos {
        self.neighborhood.position()
    }

    fn priority(&self) -> Priority {
        self.priority
    }

    /// Meshes the chunk and uploads the result.
    ///
    /// An all-air chunk, or one whose faces are all hidden, has its geometry torn down
    /// instead. Meshing never produces follow-ups.
    fn process(self, context: &PipelineContext) -> TaskResult {
        let position = self.position();
        let registry = context.world.registry();
        let start = Instant::now();

        let mesh = SCRATCH.with(|scratch| {
            let mut scratch = scratch.borrow_mut();
            let MeshScratch { blocks, light } = &mut *scratch;
            {
                let locks = self.neighborhood.lock::<BlockReadSunlightRead>();
                if locks.blocks(CENTER_INDEX).is_empty() {
                    return None;
                }
                blocks.copy_from(&locks);
                light.compute(&locks, registry);
            }
            trace!("Copied neighborhood of {:?} in {:?}", position, start.elapsed());

            let input = MeshInput {
                blocks,
                light,
                registry,
            };
            Some(generate_mesh(&input, context.max_vertices))
        });

        match mesh {
            Some(mesh) if !mesh.is_empty() => {
                debug!(
                    "Meshed chunk {:?}: {} vertices in {} buffers, {:?}",
                    position,
                    mesh.vertex_count(),
                    mesh.buffers.len(),
                    start.elapsed()
                );
                context.sink.upload(position, mesh);
            }
            _ => {
                trace!("Chunk {:?} has no visible faces", position);
                context.sink.teardown(position);
            }
        }

        TaskResult::new()
    }
}
