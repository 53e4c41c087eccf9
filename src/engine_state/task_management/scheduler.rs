//! # Task Pool
//!
//! Keyed storage of queued work plus the producer that turns it into runnable tasks.
//!
//! ## Storage
//! Every chunk position has one slot per [`TaskType`]. A slot is *queued* while it holds a
//! payload and *running* while a materialized task for it executes; both can be true at once.
//! Pushing to a queued slot merges payloads, so a chunk never has two queued tasks of one type.
//!
//! ## Production
//! The producer scans the positions with queued work, closest to the world center first, and
//! materializes every task whose dependencies are satisfied. A task is ready when:
//! - its own slot is queued and not running
//! - none of the types in [`TaskType::self_dependencies`] is queued or running on the chunk
//! - for neighborhood tasks, all 26 neighbors are loaded, generated, and have none of the types
//!   in [`TaskType::neighbor_dependencies`] queued or running
//!
//! Materialized tasks wait in one of two lock-free queues. Workers always drain the high
//! priority queue first.
//!
//! ## Consistency
//! Readiness checks and the queued → running transition happen under the producer mutex and
//! the exclusive side of the snapshot lock. Pushes take the shared side, so they never
//! interleave with a readiness check.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use cgmath::Vector3;
use crossbeam::queue::SegQueue;
use dashmap::DashMap;
use log::{debug, trace};
use parking_lot::{Mutex, RwLock};

use super::task::{ChunkTasks, PipelineContext, Priority, TaskPayload, TaskRunner, TaskState, TaskType};
use crate::engine_state::rendering::tasks::mesh_task::MeshTask;
use crate::engine_state::voxels::block::block_side::BlockSide;
use crate::engine_state::voxels::chunk::neighborhood::Neighborhood;
use crate::engine_state::voxels::chunk::Chunk;
use crate::engine_state::voxels::coords::{
    chunk_distance, neighborhood, position_key, ChunkPos, CENTER_INDEX,
};
use crate::engine_state::voxels::tasks::generate_task::GenerateTask;
use crate::engine_state::voxels::tasks::set_block_task::SetBlockTask;
use crate::engine_state::voxels::tasks::set_sunlight_task::SetSunlightTask;
use crate::engine_state::voxels::tasks::update_block_task::UpdateBlockTask;
use crate::engine_state::voxels::world::World;

/// Limits of a single production pass.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ProducerLimits {
    /// Most tasks materialized per pass.
    pub batch_limit: usize,
    /// Most positions inspected per pass.
    pub scan_window: usize,
    /// Chebyshev distance from the world center past which chunks are unloaded.
    pub unload_radius: i32,
}

impl Default for ProducerLimits {
    fn default() -> Self {
        ProducerLimits {
            batch_limit: 64,
            scan_window: 256,
            unload_radius: i32::MAX,
        }
    }
}

/// Counters of the pool, per task type.
#[derive(Debug, Default)]
struct PoolCounters {
    executed: [AtomicUsize; TaskType::COUNT],
    dropped: [AtomicUsize; TaskType::COUNT],
    evicted: AtomicUsize,
}

/// A snapshot of the pool's counters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Tasks that finished, by [`TaskType::index`].
    pub executed: [usize; TaskType::COUNT],
    /// Queued tasks discarded because their chunk was gone.
    pub dropped: [usize; TaskType::COUNT],
    /// Chunks unloaded by eviction.
    pub evicted: usize,
    /// Tasks materialized but not yet finished.
    pub in_flight: usize,
}

impl PoolStats {
    pub fn executed_total(&self) -> usize {
        self.executed.iter().sum()
    }
}

/// Positions still to inspect in the current sweep.
#[derive(Debug, Default)]
struct ProducerCursor {
    positions: Vec<ChunkPos>,
    next: usize,
}

/// Clears the running flag of a task when execution ends, including by panic.
struct RunningGuard<'a> {
    pool: &'a TaskPool,
    position: ChunkPos,
    task_type: TaskType,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        if let Some(mut tasks) = self.pool.states.get_mut(&self.position) {
            tasks.state_mut(self.task_type).running = false;
        }
        self.pool.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Queued and materialized work of the whole pipeline.
pub struct TaskPool {
    context: PipelineContext,
    limits: ProducerLimits,
    states: DashMap<ChunkPos, ChunkTasks>,
    high: SegQueue<TaskRunner>,
    low: SegQueue<TaskRunner>,
    producer: Mutex<ProducerCursor>,
    snapshot: RwLock<()>,
    in_flight: AtomicUsize,
    counters: PoolCounters,
}

impl TaskPool {
    /// Creates an empty pool.
    ///
    /// # Arguments
    /// * `context` - World, mesh sink and limits every task runs against
    /// * `limits` - Bounds of a single production pass
    pub fn new(context: PipelineContext, limits: ProducerLimits) -> Self {
        TaskPool {
            context,
            limits: ProducerLimits {
                batch_limit: limits.batch_limit.max(1),
                scan_window: limits.scan_window.max(1),
                unload_radius: limits.unload_radius.max(0),
            },
            states: DashMap::new(),
            high: SegQueue::new(),
            low: SegQueue::new(),
            producer: Mutex::new(ProducerCursor::default()),
            snapshot: RwLock::new(()),
            in_flight: AtomicUsize::new(0),
            counters: PoolCounters::default(),
        }
    }

    pub fn context(&self) -> &PipelineContext {
        &self.context
    }

    pub fn world(&self) -> &Arc<World> {
        &self.context.world
    }

    /// Queues work for the chunk at `position`, merging with what is already queued.
    ///
    /// # Returns
    /// `false` if no chunk is loaded at `position`; the push is then ignored.
    pub fn push(&self, position: ChunkPos, payload: TaskPayload, priority: Priority) -> bool {
        if !self.context.world.contains(position) {
            trace!("Ignoring {:?} push to unloaded chunk {:?}", payload.task_type(), position);
            return false;
        }
        let _snapshot = self.snapshot.read();
        let mut tasks = self.states.entry(position).or_default();
        let state = tasks.state_mut(payload.task_type());
        match &mut state.payload {
            Some(queued) => queued.merge(payload),
            None => state.payload = Some(payload),
        }
        state.priority = state.priority.max(priority);
        true
    }

    /// A copy of the scheduling state of one slot.
    pub fn task_state(&self, position: ChunkPos, task_type: TaskType) -> TaskState {
        self.states
            .get(&position)
            .map(|tasks| tasks.state(task_type).clone())
            .unwrap_or_default()
    }

    pub fn is_queued(&self, position: ChunkPos, task_type: TaskType) -> bool {
        self.states
            .get(&position)
            .is_some_and(|tasks| tasks.state(task_type).is_queued())
    }

    /// Whether any slot of the pool is queued.
    pub fn has_queued(&self) -> bool {
        self.states.iter().any(|entry| entry.value().has_queued())
    }

    /// Number of materialized tasks waiting in the queues or executing.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> PoolStats {
        let load = |counters: &[AtomicUsize; TaskType::COUNT]| -> [usize; TaskType::COUNT] {
            std::array::from_fn(|index| counters[index].load(Ordering::Relaxed))
        };
        PoolStats {
            executed: load(&self.counters.executed),
            dropped: load(&self.counters.dropped),
            evicted: self.counters.evicted.load(Ordering::Relaxed),
            in_flight: self.in_flight(),
        }
    }

    /// Takes the next materialized task, high priority first.
    pub fn next_runner(&self) -> Option<TaskRunner> {
        self.high.pop().or_else(|| self.low.pop())
    }

    /// Runs one production pass if no other thread is producing.
    ///
    /// # Returns
    /// The number of tasks moved into the queues.
    pub fn produce(&self) -> usize {
        let Some(mut cursor) = self.producer.try_lock() else {
            return 0;
        };
        let runners = self.collect_ready(&mut cursor, self.limits.scan_window, self.limits.batch_limit);
        drop(cursor);
        self.enqueue(runners)
    }

    /// Materializes every ready task of the pool, scanning all positions once.
    ///
    /// The tasks are returned to the caller instead of being queued, and each of them must be
    /// passed to [`TaskPool::execute`]: their slots stay marked running until then.
    pub fn pop_ready(&self) -> Vec<TaskRunner> {
        let mut cursor = self.producer.lock();
        cursor.positions.clear();
        cursor.next = 0;
        let runners = self.collect_ready(&mut cursor, usize::MAX, usize::MAX);
        cursor.positions.clear();
        cursor.next = 0;
        runners
    }

    /// Materializes every ready task into the queues.
    ///
    /// # Returns
    /// The number of tasks moved into the queues.
    pub fn sweep(&self) -> usize {
        let runners = self.pop_ready();
        self.enqueue(runners)
    }

    fn enqueue(&self, runners: Vec<TaskRunner>) -> usize {
        let count = runners.len();
        for runner in runners {
            match runner.priority() {
                Priority::High => self.high.push(runner),
                Priority::Low => self.low.push(runner),
            }
        }
        count
    }

    /// Executes a materialized task and pushes its follow-ups.
    pub fn execute(&self, runner: TaskRunner) {
        let task_type = runner.task_type();
        let _running = RunningGuard {
            pool: self,
            position: runner.position(),
            task_type,
        };
        let result = runner.process(&self.context);
        for follow_up in result.follow_ups {
            self.push(follow_up.position, follow_up.payload, follow_up.priority);
        }
        self.counters.executed[task_type.index()].fetch_add(1, Ordering::Relaxed);
    }

    /// Unloads every idle chunk beyond the unload radius around the world center.
    ///
    /// Chunks with queued or running work stay loaded until a later pass. Evicted chunks have
    /// their geometry torn down; tasks already holding them keep them alive until they finish.
    ///
    /// # Returns
    /// The number of evicted chunks.
    pub fn evict(&self) -> usize {
        let center = self.context.world.center();
        let mut evicted = 0;
        for position in self.context.world.positions() {
            if !self.is_beyond_unload_radius(position, center) {
                continue;
            }
            let busy = self
                .states
                .get(&position)
                .is_some_and(|tasks| !tasks.is_idle());
            if busy {
                continue;
            }
            self.states.remove_if(&position, |_, tasks| tasks.is_idle());
            if self.context.world.remove_chunk_at(position).is_some() {
                self.context.sink.teardown(position);
                evicted += 1;
            }
        }
        if evicted > 0 {
            debug!("Evicted {} chunks around {:?}", evicted, center);
            self.counters.evicted.fetch_add(evicted, Ordering::Relaxed);
        }
        evicted
    }

    fn collect_ready(&self, cursor: &mut ProducerCursor, window: usize, limit: usize) -> Vec<TaskRunner> {
        let _snapshot = self.snapshot.write();
        if cursor.next >= cursor.positions.len() {
            self.refill(cursor);
        }

        let mut runners = Vec::new();
        let mut inspected = 0;
        while cursor.next < cursor.positions.len() && inspected < window && runners.len() < limit {
            let position = cursor.positions[cursor.next];
            cursor.next += 1;
            inspected += 1;
            for task_type in TaskType::all() {
                if runners.len() >= limit {
                    break;
                }
                if let Some(runner) = self.try_materialize(position, task_type) {
                    runners.push(runner);
                }
            }
        }
        if !runners.is_empty() {
            trace!("Materialized {} tasks after inspecting {} positions", runners.len(), inspected);
        }
        runners
    }

    /// Starts a new sweep over the positions with queued work, closest to the center first.
    fn refill(&self, cursor: &mut ProducerCursor) {
        let center = self.context.world.center();
        cursor.positions.clear();
        cursor.positions.extend(
            self.states
                .iter()
                .filter(|entry| entry.value().has_queued())
                .map(|entry| *entry.key()),
        );
        cursor
            .positions
            .sort_by_key(|&position| (chunk_distance(position, center), position_key(position)));
        cursor.next = 0;
    }

    fn is_beyond_unload_radius(&self, position: ChunkPos, center: ChunkPos) -> bool {
        chunk_distance(position, center) > self.limits.unload_radius
    }

    /// Discards the queued payload of one slot.
    fn drop_queued(&self, position: ChunkPos, task_type: TaskType, reason: &str) {
        if let Some(mut tasks) = self.states.get_mut(&position) {
            tasks.state_mut(task_type).payload = None;
        }
        self.counters.dropped[task_type.index()].fetch_add(1, Ordering::Relaxed);
        debug!("Dropped {:?} for {:?}: {}", task_type, position, reason);
    }

    fn dependencies_busy(&self, position: ChunkPos, task_types: &[TaskType]) -> bool {
        self.states
            .get(&position)
            .is_some_and(|tasks| tasks.any_busy(task_types))
    }

    /// Turns the queued payload of one slot into a runner if the slot is ready.
    fn try_materialize(&self, position: ChunkPos, task_type: TaskType) -> Option<TaskRunner> {
        {
            let tasks = self.states.get(&position)?;
            let state = tasks.state(task_type);
            if !state.is_queued() || state.running {
                return None;
            }
            if tasks.any_busy(task_type.self_dependencies()) {
                return None;
            }
        }

        let world = &self.context.world;
        let Some(chunk) = world.get_chunk_at(position) else {
            self.drop_queued(position, task_type, "chunk unloaded");
            return None;
        };

        let neighbors = if task_type.needs_neighborhood() {
            let positions = neighborhood(position);
            let blocked = positions
                .iter()
                .enumerate()
                .filter(|&(index, _)| index != CENTER_INDEX)
                .any(|(_, &neighbor)| {
                    self.dependencies_busy(neighbor, task_type.neighbor_dependencies())
                });
            if blocked {
                return None;
            }
            let Some(neighbors) = Neighborhood::resolve(world, position) else {
                // Missing neighbors are not loaded this far out; the payload would pin the chunk.
                if self.is_beyond_unload_radius(position, world.center()) {
                    self.drop_queued(position, task_type, "neighborhood out of range");
                }
                return None;
            };
            if !neighbors.is_generated() {
                return None;
            }
            Some(neighbors)
        } else {
            None
        };

        let (payload, priority) = {
            let mut tasks = self.states.get_mut(&position)?;
            let state = tasks.state_mut(task_type);
            let payload = state.payload.take()?;
            let priority = std::mem::take(&mut state.priority);
            state.running = true;
            (payload, priority)
        };
        self.in_flight.fetch_add(1, Ordering::AcqRel);

        let runner = match (payload, neighbors) {
            (TaskPayload::Generate, _) => TaskRunner::Generate(GenerateTask::new(chunk, priority)),
            (TaskPayload::SetBlock(changes), _) => {
                let face_neighbors = self.face_neighbors(position);
                TaskRunner::SetBlock(SetBlockTask::new(chunk, face_neighbors, changes, priority))
            }
            (TaskPayload::SetSunlight(columns), _) => {
                let above = world.get_chunk_at(position + Vector3::unit_y());
                TaskRunner::SetSunlight(SetSunlightTask::new(chunk, above, columns, priority))
            }
            (TaskPayload::UpdateBlock(dirty), Some(neighbors)) => {
                TaskRunner::UpdateBlock(UpdateBlockTask::new(neighbors, dirty, priority))
            }
            (TaskPayload::Mesh, Some(neighbors)) => TaskRunner::Mesh(MeshTask::new(neighbors, priority)),
            (TaskPayload::UpdateBlock(_) | TaskPayload::Mesh, None) => {
                unreachable!("neighborhood tasks always resolve their neighbors")
            }
        };
        trace!("Materialized {:?} for {:?}", task_type, position);
        Some(runner)
    }

    fn face_neighbors(&self, position: ChunkPos) -> [Option<Arc<Chunk>>; 6] {
        BlockSide::all().map(|side| self.context.world.get_chunk_at(position + side.normal()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::rendering::MeshStore;
    use crate::engine_state::task_management::task::{BlockChanges, DirtySet};
    use crate::engine_state::voxels::block::block_type::BlockType;
    use crate::engine_state::voxels::block::registry::BlockRegistry;
    use crate::engine_state::voxels::block::Block;
    use crate::engine_state::voxels::generation::FlatGenerator;
    use crate::engine_state::voxels::persistence::NullPersistence;
    use cgmath::Point3;

    fn pool_with(limits: ProducerLimits, positions: &[ChunkPos]) -> TaskPool {
        let world = Arc::new(World::new(
            Arc::new(BlockRegistry::default()),
            Arc::new(FlatGenerator::new(4)),
            Arc::new(NullPersistence),
        ));
        for &position in positions {
            world.add_chunk_at(position);
        }
        let context = PipelineContext {
            world,
            sink: Arc::new(MeshStore::new()),
            max_vertices: 65536,
        };
        TaskPool::new(context, limits)
    }

    fn cube(radius: i32) -> Vec<ChunkPos> {
        let mut positions = Vec::new();
        for x in -radius..=radius {
            for y in -radius..=radius {
                for z in -radius..=radius {
                    positions.push(Point3::new(x, y, z));
                }
            }
        }
        positions
    }

    /// Executes ready work until nothing more materializes.
    fn settle(pool: &TaskPool) {
        loop {
            let batch = pool.pop_ready();
            if batch.is_empty() {
                return;
            }
            for runner in batch {
                pool.execute(runner);
            }
        }
    }

    #[test]
    fn high_priority_runners_are_taken_first() {
        let near = Point3::new(0, 0, 0);
        let far = Point3::new(5, 0, 0);
        let pool = pool_with(ProducerLimits::default(), &[near, far]);
        pool.push(near, TaskPayload::Generate, Priority::Low);
        pool.push(far, TaskPayload::Generate, Priority::High);

        assert_eq!(pool.sweep(), 2);
        let first = pool.next_runner().expect("two runners were queued");
        let second = pool.next_runner().expect("two runners were queued");
        assert_eq!((first.position(), first.priority()), (far, Priority::High));
        assert_eq!((second.position(), second.priority()), (near, Priority::Low));
        assert!(pool.next_runner().is_none());

        pool.execute(first);
        pool.execute(second);
        assert_eq!(pool.in_flight(), 0);
        assert_eq!(pool.stats().executed[TaskType::Generate.index()], 2);
    }

    #[test]
    fn pushes_to_a_running_slot_wait_for_it() {
        let position = Point3::new(0, 0, 0);
        let pool = pool_with(ProducerLimits::default(), &[position]);
        pool.push(position, TaskPayload::Generate, Priority::Low);
        let mut batch = pool.pop_ready();
        assert_eq!(batch.len(), 1);
        let running = batch.remove(0);

        pool.push(position, TaskPayload::Generate, Priority::High);
        let state = pool.task_state(position, TaskType::Generate);
        assert!(state.is_queued() && state.running);
        assert!(pool.pop_ready().is_empty());

        pool.execute(running);
        let batch = pool.pop_ready();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].task_type(), TaskType::Generate);
        assert_eq!(batch[0].priority(), Priority::High);
        for runner in batch {
            pool.execute(runner);
        }
    }

    #[test]
    fn update_block_waits_for_neighbor_writes() {
        let center = Point3::new(0, 0, 0);
        let east = Point3::new(1, 0, 0);
        let above = Point3::new(0, 1, 0);
        let pool = pool_with(ProducerLimits::default(), &cube(1));
        for position in cube(1) {
            pool.push(position, TaskPayload::Generate, Priority::Low);
        }
        settle(&pool);

        let mut dirty = DirtySet::new();
        dirty.insert(Point3::new(8, 8, 8));
        pool.push(center, TaskPayload::UpdateBlock(dirty), Priority::Low);
        let mut changes = BlockChanges::new();
        changes.insert(Point3::new(8, 8, 8), Block::new(BlockType::STONE));
        pool.push(east, TaskPayload::SetBlock(changes), Priority::High);
        pool.push(above, TaskPayload::Generate, Priority::Low);

        let batch = pool.pop_ready();
        let materialized: Vec<_> = batch
            .iter()
            .map(|runner| (runner.position(), runner.task_type()))
            .collect();
        assert!(materialized.contains(&(east, TaskType::SetBlock)));
        assert!(materialized.contains(&(above, TaskType::Generate)));
        assert!(!materialized.contains(&(center, TaskType::UpdateBlock)));
        assert!(pool.is_queued(center, TaskType::UpdateBlock));
        for runner in batch {
            pool.execute(runner);
        }

        let batch = pool.pop_ready();
        assert!(batch
            .iter()
            .any(|runner| runner.position() == center && runner.task_type() == TaskType::UpdateBlock));
        for runner in batch {
            pool.execute(runner);
        }
    }

    #[test]
    fn work_for_missing_chunks_is_dropped() {
        let gone = Point3::new(0, 0, 0);
        let edge = Point3::new(3, 0, 0);
        let limits = ProducerLimits {
            unload_radius: 1,
            ..ProducerLimits::default()
        };
        let pool = pool_with(limits, &[gone, edge]);
        pool.push(gone, TaskPayload::Generate, Priority::Low);
        pool.push(edge, TaskPayload::Mesh, Priority::Low);
        pool.world().remove_chunk_at(gone);

        assert!(pool.pop_ready().is_empty());
        assert!(!pool.is_queued(gone, TaskType::Generate));
        assert!(!pool.is_queued(edge, TaskType::Mesh));
        let stats = pool.stats();
        assert_eq!(stats.dropped[TaskType::Generate.index()], 1);
        assert_eq!(stats.dropped[TaskType::Mesh.index()], 1);
        assert_eq!(stats.in_flight, 0);

        // Pushes to chunks that are not loaded are refused outright.
        assert!(!pool.push(gone, TaskPayload::Generate, Priority::Low));
    }

    #[test]
    fn production_respects_batch_limit_and_scan_window() {
        let row: Vec<ChunkPos> = (0..10).map(|x| Point3::new(x, 0, 0)).collect();

        let limited = ProducerLimits {
            batch_limit: 3,
            ..ProducerLimits::default()
        };
        let pool = pool_with(limited, &row);
        for &position in &row {
            pool.push(position, TaskPayload::Generate, Priority::Low);
        }
        let produced: Vec<usize> = (0..5).map(|_| pool.produce()).collect();
        assert_eq!(produced, vec![3, 3, 3, 1, 0]);
        assert_eq!(pool.in_flight(), 10);
        // Nearest to the center first.
        let order: Vec<i32> = std::iter::from_fn(|| pool.next_runner())
            .map(|runner| runner.position().x)
            .collect();
        assert_eq!(order, (0..10).collect::<Vec<_>>());

        let windowed = ProducerLimits {
            scan_window: 4,
            ..ProducerLimits::default()
        };
        let pool = pool_with(windowed, &row);
        for &position in &row {
            pool.push(position, TaskPayload::Generate, Priority::Low);
        }
        let produced: Vec<usize> = (0..4).map(|_| pool.produce()).collect();
        assert_eq!(produced, vec![4, 4, 2, 0]);
    }
}
