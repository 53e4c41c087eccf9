//! End-to-end scenarios of the chunk pipeline: scheduling, sunlight maintenance, ticks,
//! persistence and meshing working together.

use std::sync::Arc;
use std::time::Duration;

use cgmath::Point3;
use voxel_pipeline::engine_state::task_management::scheduler::{ProducerLimits, TaskPool};
use voxel_pipeline::engine_state::task_management::task::{
    BlockChanges, PipelineContext, Priority, TaskPayload, TaskType,
};
use voxel_pipeline::engine_state::task_management::TaskManager;
use voxel_pipeline::engine_state::voxels::block::block_side::BlockSide;
use voxel_pipeline::engine_state::voxels::chunk::{BlockArray, SunlightHeights};
use voxel_pipeline::engine_state::voxels::coords::{chunk_distance, neighborhood, ChunkPos};
use voxel_pipeline::engine_state::voxels::generation::{FlatGenerator, TerrainGenerator};
use voxel_pipeline::engine_state::voxels::persistence::{MemoryPersistence, NullPersistence};
use voxel_pipeline::engine_state::voxels::world::World;
use voxel_pipeline::{
    Block, BlockRegistry, BlockType, EngineConfig, EngineServices, EngineState, GeneratorConfig,
    MeshStore,
};

struct Pipeline {
    pool: Arc<TaskPool>,
    store: Arc<MeshStore>,
    manager: TaskManager,
}

/// A pool over every chunk within `radius` of the origin, with Generate queued everywhere.
fn pipeline(generator: Arc<dyn TerrainGenerator>, radius: i32) -> Pipeline {
    let store = Arc::new(MeshStore::new());
    let world = Arc::new(World::new(
        Arc::new(BlockRegistry::default()),
        generator,
        Arc::new(NullPersistence),
    ));
    let context = PipelineContext {
        world: world.clone(),
        sink: store.clone(),
        max_vertices: 65536,
    };
    let pool = Arc::new(TaskPool::new(context, ProducerLimits::default()));
    for x in -radius..=radius {
        for y in -radius..=radius {
            for z in -radius..=radius {
                let position = Point3::new(x, y, z);
                world.add_chunk_at(position);
                assert!(pool.push(position, TaskPayload::Generate, Priority::Low));
            }
        }
    }
    let manager = TaskManager::new(pool.clone(), 1, Duration::from_millis(1));
    Pipeline {
        pool,
        store,
        manager,
    }
}

fn origin() -> ChunkPos {
    Point3::new(0, 0, 0)
}

fn single_stone(position: ChunkPos, blocks: &mut BlockArray, heights: &mut SunlightHeights) {
    if position == origin() {
        blocks.set(Point3::new(0, 0, 0), Block::new(BlockType::STONE));
        heights.set(0, 0, 16);
    }
}

fn stone_on_top(position: ChunkPos, blocks: &mut BlockArray, heights: &mut SunlightHeights) {
    if position == origin() {
        blocks.set(Point3::new(8, 15, 8), Block::new(BlockType::STONE));
        heights.set(8, 8, 16);
    }
}

#[test]
fn single_stone_meshes_into_one_buffer() {
    let Pipeline {
        pool,
        store,
        manager,
    } = pipeline(Arc::new(single_stone), 1);
    manager.run_until_idle();

    let mesh = store.get(origin()).expect("the stone chunk was meshed");
    assert_eq!(mesh.buffers.len(), 1);
    assert_eq!(mesh.stats.cubic_faces, 6);
    assert_eq!(mesh.stats.custom_faces, 0);
    assert!(!mesh.buffers[0].indices.is_empty());
    assert!(mesh.buffers[0].vertices.iter().all(|vertex| vertex.ao() == 3));

    // Air chunks never hold geometry; chunks on the edge are still waiting for neighbors.
    assert_eq!(store.len(), 1);
    assert!(pool.is_queued(Point3::new(1, 1, 1), TaskType::Mesh));
    assert_eq!(pool.stats().in_flight, 0);
}

#[test]
fn border_edit_meshes_the_chunk_across_the_face() {
    let Pipeline {
        pool, manager, ..
    } = pipeline(Arc::new(FlatGenerator::new(4)), 2);
    manager.run_until_idle();
    for position in neighborhood(origin()) {
        assert!(!pool.task_state(position, TaskType::Mesh).is_queued());
    }

    // Leaves let light through, so only the faces next to the edit change.
    let mut changes = BlockChanges::new();
    changes.insert(Point3::new(15, 8, 8), Block::new(BlockType::LEAVES));
    assert!(pool.push(origin(), TaskPayload::SetBlock(changes), Priority::High));

    let batch = pool.pop_ready();
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].task_type(), TaskType::SetBlock);
    for runner in batch {
        pool.execute(runner);
    }

    let east = Point3::new(1, 0, 0);
    for position in neighborhood(origin()) {
        let expected = position == origin() || position == east;
        assert_eq!(
            pool.is_queued(position, TaskType::Mesh),
            expected,
            "mesh queued state of {position:?}"
        );
    }
    assert!(pool.is_queued(origin(), TaskType::SetSunlight));
    assert!(!pool.is_queued(origin(), TaskType::UpdateBlock));
}

fn torch_behind_a_roof(position: ChunkPos, blocks: &mut BlockArray, _: &mut SunlightHeights) {
    if position == origin() {
        blocks.set(Point3::new(10, 8, 8), Block::new(BlockType::TORCH));
        blocks.set(Point3::new(12, 15, 8), Block::new(BlockType::STONE));
    } else if position == Point3::new(1, 0, 0) {
        blocks.set(Point3::new(0, 8, 8), Block::new(BlockType::STONE));
    }
}

/// Summed torchlight of the faces of one side in a chunk's mesh.
fn torchlight_of_side(store: &MeshStore, position: ChunkPos, side: BlockSide) -> u32 {
    let mesh = store.get(position).expect("chunk was meshed");
    mesh.buffers
        .iter()
        .flat_map(|buffer| buffer.vertices.iter())
        .filter(|vertex| vertex.side() == side as u8)
        .map(|vertex| vertex.torchlight() as u32)
        .sum()
}

#[test]
fn walls_that_block_light_remesh_across_the_light_range() {
    let Pipeline {
        pool,
        store,
        manager,
    } = pipeline(Arc::new(torch_behind_a_roof), 2);
    manager.run_until_idle();
    let east = Point3::new(1, 0, 0);
    let lit = torchlight_of_side(&store, east, BlockSide::LEFT);
    assert!(lit > 0);

    // The roof keeps the column's sunlight height unchanged, so only the edit itself can
    // remesh the chunk across the face.
    let mut changes = BlockChanges::new();
    changes.insert(Point3::new(12, 8, 8), Block::new(BlockType::STONE));
    pool.push(origin(), TaskPayload::SetBlock(changes), Priority::High);
    let batch = pool.pop_ready();
    assert_eq!(batch.len(), 1);
    for runner in batch {
        pool.execute(runner);
    }
    assert!(pool.is_queued(east, TaskType::Mesh));

    manager.run_until_idle();
    assert!(torchlight_of_side(&store, east, BlockSide::LEFT) < lit);
}

#[test]
fn opening_a_column_to_the_sky_remeshes_everything_in_reach() {
    let Pipeline {
        pool, manager, ..
    } = pipeline(Arc::new(stone_on_top), 2);
    manager.run_until_idle();

    let below = Point3::new(0, -1, 0);
    let mut changes = BlockChanges::new();
    changes.insert(Point3::new(8, 15, 8), Block::AIR);
    pool.push(origin(), TaskPayload::SetBlock(changes), Priority::High);
    for runner in pool.pop_ready() {
        pool.execute(runner);
    }

    // Every Mesh task around the origin waits for the sunlight update.
    let batch = pool.pop_ready();
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].task_type(), TaskType::SetSunlight);
    for runner in batch {
        pool.execute(runner);
    }

    // Height 16 -> 0 changes direct sunlight over the whole column; widened by the light
    // reach, that span touches every chunk of the neighborhood.
    for position in neighborhood(origin()) {
        assert!(pool.is_queued(position, TaskType::Mesh), "{position:?} not remeshed");
    }
    assert!(pool.is_queued(below, TaskType::SetSunlight));

    manager.run_until_idle();
    let world = pool.world();
    let heights = |position: ChunkPos| {
        use voxel_pipeline::engine_state::voxels::chunk::lock_set::{lock_chunk, SunlightRead};
        let chunk = world.get_chunk_at(position).expect("chunk is loaded");
        let locks = lock_chunk::<SunlightRead>(&chunk);
        locks.sunlight(0).get(8, 8)
    };
    assert_eq!(heights(origin()), 0);
    assert_eq!(heights(below), 0);
}

#[test]
fn meshes_never_materialize_next_to_pending_writes() {
    let Pipeline { pool, .. } = pipeline(Arc::new(FlatGenerator::new(4)), 2);
    let mut rng = fastrand::Rng::with_seed(7);
    let writers = [TaskType::Generate, TaskType::SetBlock, TaskType::SetSunlight];

    for step in 0..10_000 {
        if step < 40 && step % 4 == 0 {
            let mut changes = BlockChanges::new();
            changes.insert(
                Point3::new(rng.i32(0..16), rng.i32(0..16), rng.i32(0..16)),
                Block::new(BlockType::GLASS),
            );
            let target = Point3::new(rng.i32(-1..=1), rng.i32(-1..=1), rng.i32(-1..=1));
            pool.push(target, TaskPayload::SetBlock(changes), Priority::High);
        }

        let batch = pool.pop_ready();
        if batch.is_empty() && step >= 40 {
            break;
        }
        for (index, runner) in batch.iter().enumerate() {
            if runner.task_type() != TaskType::Mesh {
                continue;
            }
            for position in neighborhood(runner.position()) {
                for writer in writers {
                    let state = pool.task_state(position, writer);
                    assert!(!state.is_queued(), "{writer:?} queued next to a mesh of {position:?}");
                    if state.running {
                        // Materialized after the mesh within the same pass.
                        assert!(batch[index + 1..]
                            .iter()
                            .any(|later| later.position() == position && later.task_type() == writer));
                    }
                }
            }
        }
        for runner in batch {
            pool.execute(runner);
        }
    }
    assert!(pool.stats().executed[TaskType::Mesh as usize] > 0);
}

fn flat_engine(
    load_radius: i32,
    persistence: Option<Arc<MemoryPersistence>>,
) -> (EngineState, Arc<MeshStore>) {
    let config = EngineConfig {
        worker_count: 2,
        load_radius,
        unload_radius: load_radius,
        generator: GeneratorConfig::Flat { ground_level: 4 },
        ..EngineConfig::default()
    };
    let store = Arc::new(MeshStore::new());
    let mut services = EngineServices::from_config(&config, store.clone());
    if let Some(persistence) = persistence {
        services.persistence = persistence;
    }
    (EngineState::new(config, services), store)
}

#[test]
fn sand_falls_to_the_ground() {
    let (mut engine, _store) = flat_engine(2, None);
    engine.start();
    engine.set_center(origin());
    engine.run_until_idle();

    assert!(engine.set_block(Point3::new(5, 9, 5), Block::new(BlockType::SAND)));
    engine.run_until_idle();
    engine.stop();

    assert_eq!(engine.block_at(Point3::new(5, 9, 5)), Some(Block::AIR));
    assert_eq!(engine.block_at(Point3::new(5, 4, 5)), Some(Block::new(BlockType::SAND)));
    assert_eq!(engine.block_at(Point3::new(5, 3, 5)), Some(Block::new(BlockType::GRASS)));
}

#[test]
fn torches_light_up_nearby_geometry() {
    let (mut engine, store) = flat_engine(2, None);
    engine.start();
    engine.set_center(origin());
    engine.run_until_idle();
    let lit = |store: &MeshStore| {
        store.get(origin()).is_some_and(|mesh| {
            mesh.buffers
                .iter()
                .flat_map(|buffer| buffer.vertices.iter())
                .any(|vertex| vertex.torchlight() > 0)
        })
    };
    assert!(!lit(&*store));

    engine.set_block(Point3::new(8, 4, 8), Block::new(BlockType::TORCH));
    engine.run_until_idle();
    engine.stop();
    assert!(lit(&*store));
    assert!(engine.stats().executed[TaskType::Mesh as usize] > 27);
}

#[test]
fn edits_survive_eviction() {
    let persistence = Arc::new(MemoryPersistence::new());
    let (engine, store) = flat_engine(1, Some(persistence.clone()));
    let edited = Point3::new(3, 10, 3);

    engine.set_center(origin());
    engine.run_until_idle();
    engine.set_block(edited, Block::new(BlockType::STONE));
    engine.run_until_idle();
    assert_eq!(persistence.len(), 1);

    // The first move queues the far chunks; pending edge work is dropped while they run, so
    // the origin is released on the next move.
    let far = Point3::new(10, 0, 0);
    assert!(chunk_distance(origin(), far) > engine.config().unload_radius);
    engine.set_center(far);
    engine.run_until_idle();
    engine.set_center(far);
    assert!(!engine.world().contains(origin()));
    assert!(!store.contains(origin()));
    assert!(engine.block_at(edited).is_none());

    engine.set_center(origin());
    engine.run_until_idle();
    assert_eq!(engine.block_at(edited), Some(Block::new(BlockType::STONE)));
}
