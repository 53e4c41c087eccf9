//! # Engine State Module
//!
//! The core engine module that owns the chunk pipeline.
//!
//! ## Key Components
//!
//! * `EngineState` - The main state container: world, task pool and worker threads
//! * `rendering` - Mesh generation and the sink meshes are handed to
//! * `task_management` - The task pool, its dependency table and the worker threads
//! * `voxels` - Blocks, chunks, lighting, terrain generation and the voxel tasks
//!
//! ## Architecture
//!
//! The host drives the engine through a handful of calls: move the load center with
//! [`EngineState::set_center`], edit blocks with [`EngineState::set_block`], and receive
//! geometry through its [`MeshSink`]. Everything else (generation, sunlight, ticks, meshing)
//! happens on the worker threads as the scheduler's dependency table allows.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, info};
use rendering::MeshSink;
use task_management::scheduler::{PoolStats, ProducerLimits, TaskPool};
use task_management::task::{BlockChanges, PipelineContext, Priority, TaskPayload};
use task_management::TaskManager;
use voxels::block::registry::BlockRegistry;
use voxels::block::Block;
use voxels::coords::{chunk_distance, position_key, split_world, ChunkPos, WorldPos};
use voxels::generation::{generator_from_config, TerrainGenerator};
use voxels::persistence::{NullPersistence, WorldPersistence};
use voxels::world::World;

use crate::core::config::EngineConfig;

pub mod rendering;
pub mod task_management;
pub mod voxels;

/// The external collaborators of the pipeline.
#[derive(Clone)]
pub struct EngineServices {
    pub registry: Arc<BlockRegistry>,
    pub generator: Arc<dyn TerrainGenerator>,
    pub sink: Arc<dyn MeshSink>,
    pub persistence: Arc<dyn WorldPersistence>,
}

impl EngineServices {
    /// The built-in block set and the configured generator, without persistence.
    pub fn from_config(config: &EngineConfig, sink: Arc<dyn MeshSink>) -> Self {
        EngineServices {
            registry: Arc::new(BlockRegistry::default()),
            generator: generator_from_config(&config.generator),
            sink,
            persistence: Arc::new(NullPersistence),
        }
    }
}

/// The main state container for the voxel engine
///
/// This struct owns the world, the task pool and the worker threads, and translates host
/// requests into pushes.
///
/// # Examples
///
/// ```ignore
/// let store = Arc::new(MeshStore::new());
/// let config = EngineConfig::default();
/// let mut engine = EngineState::new(config.clone(), EngineServices::from_config(&config, store.clone()));
/// engine.start();
/// engine.set_center(Point3::new(0, 0, 0));
/// engine.set_block(Point3::new(3, 20, 7), Block::new(BlockType::TORCH));
/// ```
pub struct EngineState {
    config: EngineConfig,
    world: Arc<World>,
    pool: Arc<TaskPool>,
    task_manager: TaskManager,
}

impl EngineState {
    /// Creates a new engine with an empty world. No thread is started.
    ///
    /// # Arguments
    /// * `config` - Pipeline tunables; normalized before use
    /// * `services` - Registry, generator, mesh sink and persistence
    pub fn new(config: EngineConfig, services: EngineServices) -> Self {
        let config = config.normalized();
        let world = Arc::new(World::new(
            services.registry,
            services.generator,
            services.persistence,
        ));
        let context = PipelineContext {
            world: world.clone(),
            sink: services.sink,
            max_vertices: config.max_vertices_per_mesh,
        };
        let limits = ProducerLimits {
            batch_limit: config.batch_limit,
            scan_window: config.scan_window,
            unload_radius: config.unload_radius,
        };
        let pool = Arc::new(TaskPool::new(context, limits));
        let task_manager = TaskManager::new(pool.clone(), config.worker_count, config.dequeue_timeout());

        info!(
            "Engine created: load radius {}, unload radius {}, {} workers",
            config.load_radius, config.unload_radius, config.worker_count
        );
        EngineState {
            config,
            world,
            pool,
            task_manager,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn world(&self) -> &Arc<World> {
        &self.world
    }

    pub fn pool(&self) -> &Arc<TaskPool> {
        &self.pool
    }

    /// Moves the load center.
    ///
    /// Creates every missing chunk within the load radius, nearest first, queues their
    /// generation, and evicts idle chunks beyond the unload radius.
    ///
    /// # Returns
    /// The number of chunks created.
    pub fn set_center(&self, center: ChunkPos) -> usize {
        self.world.set_center(center);

        let radius = self.config.load_radius;
        let mut positions = Vec::new();
        for x in -radius..=radius {
            for y in -radius..=radius {
                for z in -radius..=radius {
                    positions.push(ChunkPos::new(center.x + x, center.y + y, center.z + z));
                }
            }
        }
        positions.sort_by_key(|&position| (chunk_distance(position, center), position_key(position)));

        let mut created = 0;
        for position in positions {
            let (_, is_new) = self.world.add_chunk_at(position);
            if is_new {
                self.pool.push(position, TaskPayload::Generate, Priority::Low);
                created += 1;
            }
        }
        let evicted = self.pool.evict();
        debug!(
            "Center moved to {:?}: {} chunks created, {} evicted",
            center, created, evicted
        );
        self.task_manager.notify();
        created
    }

    /// Queues a single block edit with high priority.
    ///
    /// # Returns
    /// `false` if the block's chunk is not loaded.
    pub fn set_block(&self, position: WorldPos, block: Block) -> bool {
        self.set_blocks([(position, block)]) == 1
    }

    /// Queues block edits with high priority, one SetBlock push per affected chunk.
    ///
    /// # Returns
    /// The number of chunks that accepted edits.
    pub fn set_blocks(&self, changes: impl IntoIterator<Item = (WorldPos, Block)>) -> usize {
        let mut per_chunk: BTreeMap<(i32, i32, i32), (ChunkPos, BlockChanges)> = BTreeMap::new();
        for (position, block) in changes {
            let (chunk, inner) = split_world(position);
            per_chunk
                .entry(position_key(chunk))
                .or_insert_with(|| (chunk, BlockChanges::new()))
                .1
                .insert(inner, block);
        }

        let accepted = per_chunk
            .into_values()
            .map(|(chunk, changes)| {
                self.pool
                    .push(chunk, TaskPayload::SetBlock(changes), Priority::High)
            })
            .filter(|&accepted| accepted)
            .count();
        self.task_manager.notify();
        accepted
    }

    /// Reads the block at a world position, or `None` if its chunk is not loaded.
    pub fn block_at(&self, position: WorldPos) -> Option<Block> {
        self.world.block_at(position)
    }

    /// Starts the worker threads.
    pub fn start(&mut self) {
        self.task_manager.start();
    }

    /// Stops and joins the worker threads.
    pub fn stop(&mut self) {
        self.task_manager.stop();
    }

    /// Processes work until nothing more can become ready. See [`TaskManager::run_until_idle`].
    pub fn run_until_idle(&self) -> usize {
        self.task_manager.run_until_idle()
    }

    pub fn stats(&self) -> PoolStats {
        self.pool.stats()
    }
}
