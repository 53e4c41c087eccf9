//! # Task System Core Types
//!
//! This module defines the fundamental building blocks of the chunk pipeline's task system.
//!
//! ## Core Components
//! - [`TaskType`]: The five kinds of per-chunk work and their dependency rules
//! - [`TaskPayload`]: What is queued for a `(position, type)` pair; repeated pushes merge
//! - [`TaskRunner`]: A materialized, ready-to-run task holding every chunk it touches
//! - [`TaskResult`]: Follow-up pushes produced by a finished task
//!
//! ## Task Lifecycle
//! 1. A payload is pushed for a chunk position via `TaskPool::push()`
//! 2. The producer checks the dependency table and turns the payload into a `TaskRunner`
//! 3. A worker calls the runner's `process()` method
//! 4. The returned follow-ups are pushed back into the pool
//!
//! ## Thread Safety
//! - Runners own strong references to their chunks, so eviction never frees a chunk in use
//! - All chunk data is accessed through lock sets taken inside `process()`

use std::collections::BTreeMap;
use std::sync::Arc;

use bitvec::prelude::BitVec;
use num_derive::FromPrimitive;

use crate::engine_state::rendering::tasks::mesh_task::MeshTask;
use crate::engine_state::rendering::MeshSink;
use crate::engine_state::voxels::block::Block;
use crate::engine_state::voxels::chunk::{CHUNK_PLANE_SIZE, CHUNK_SIZE};
use crate::engine_state::voxels::coords::{
    column_index, voxel_index, voxel_position, ChunkPos, InnerPos,
};
use crate::engine_state::voxels::tasks::generate_task::GenerateTask;
use crate::engine_state::voxels::tasks::set_block_task::SetBlockTask;
use crate::engine_state::voxels::tasks::set_sunlight_task::SetSunlightTask;
use crate::engine_state::voxels::tasks::update_block_task::UpdateBlockTask;
use crate::engine_state::voxels::world::World;

/// The kinds of work the pipeline schedules per chunk position.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, FromPrimitive)]
pub enum TaskType {
    /// Run the terrain generator and apply persisted overrides.
    Generate = 0,
    /// Write blocks.
    SetBlock = 1,
    /// Recompute sunlight heights of some columns.
    SetSunlight = 2,
    /// Run tick handlers of dirty blocks.
    UpdateBlock = 3,
    /// Rebuild the chunk's mesh.
    Mesh = 4,
}

impl TaskType {
    /// Number of task types.
    pub const COUNT: usize = 5;

    pub fn all() -> [TaskType; TaskType::COUNT] {
        [
            TaskType::Generate,
            TaskType::SetBlock,
            TaskType::SetSunlight,
            TaskType::UpdateBlock,
            TaskType::Mesh,
        ]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<TaskType> {
        num_traits::FromPrimitive::from_usize(index)
    }

    /// Task types that must be neither queued nor running on the task's own chunk.
    pub fn self_dependencies(self) -> &'static [TaskType] {
        match self {
            TaskType::Generate => &[],
            TaskType::SetBlock | TaskType::SetSunlight => &[TaskType::Generate],
            TaskType::UpdateBlock => &[TaskType::Generate, TaskType::SetBlock],
            TaskType::Mesh => &[TaskType::Generate, TaskType::SetBlock, TaskType::SetSunlight],
        }
    }

    /// Task types that must be neither queued nor running on any of the 26 neighbors.
    pub fn neighbor_dependencies(self) -> &'static [TaskType] {
        match self {
            TaskType::Generate | TaskType::SetBlock | TaskType::SetSunlight => &[],
            TaskType::UpdateBlock => &[TaskType::Generate, TaskType::SetBlock],
            TaskType::Mesh => &[TaskType::Generate, TaskType::SetBlock, TaskType::SetSunlight],
        }
    }

    /// Whether the task reads all 27 chunks around its position.
    pub fn needs_neighborhood(self) -> bool {
        matches!(self, TaskType::UpdateBlock | TaskType::Mesh)
    }
}

/// Queue tier a task is materialized into.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Priority {
    #[default]
    Low,
    High,
}

/// Block writes to one chunk, keyed by voxel index. Later writes to a voxel win.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockChanges {
    changes: BTreeMap<u16, Block>,
}

impl BlockChanges {
    pub fn new() -> Self {
        BlockChanges::default()
    }

    pub fn insert(&mut self, position: InnerPos, block: Block) {
        self.changes.insert(voxel_index(position) as u16, block);
    }

    pub fn get(&self, position: InnerPos) -> Option<Block> {
        self.changes.get(&(voxel_index(position) as u16)).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (InnerPos, Block)> + '_ {
        self.changes
            .iter()
            .map(|(&index, &block)| (voxel_position(index as usize), block))
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Applies `later` on top of these changes.
    pub fn merge(&mut self, later: BlockChanges) {
        self.changes.extend(later.changes);
    }
}

impl FromIterator<(InnerPos, Block)> for BlockChanges {
    fn from_iter<I: IntoIterator<Item = (InnerPos, Block)>>(iter: I) -> Self {
        let mut changes = BlockChanges::new();
        for (position, block) in iter {
            changes.insert(position, block);
        }
        changes
    }
}

/// A set of columns of one chunk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnSet {
    columns: BitVec,
}

impl ColumnSet {
    pub fn new() -> Self {
        ColumnSet {
            columns: BitVec::repeat(false, CHUNK_PLANE_SIZE as usize),
        }
    }

    /// Every column of the chunk.
    pub fn all() -> Self {
        ColumnSet {
            columns: BitVec::repeat(true, CHUNK_PLANE_SIZE as usize),
        }
    }

    pub fn insert(&mut self, x: i32, z: i32) {
        self.insert_index(column_index(x, z));
    }

    pub fn insert_index(&mut self, column: usize) {
        self.columns.set(column, true);
    }

    pub fn contains(&self, x: i32, z: i32) -> bool {
        self.columns[column_index(x, z)]
    }

    /// Column indices in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.columns.iter_ones()
    }

    pub fn len(&self) -> usize {
        self.columns.count_ones()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.not_any()
    }

    pub fn merge(&mut self, other: ColumnSet) {
        self.columns |= other.columns;
    }
}

impl Default for ColumnSet {
    fn default() -> Self {
        ColumnSet::new()
    }
}

/// Voxels of one chunk whose tick handlers have to run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirtySet {
    voxels: BitVec,
}

impl DirtySet {
    pub fn new() -> Self {
        DirtySet {
            voxels: BitVec::repeat(false, CHUNK_SIZE as usize),
        }
    }

    pub fn insert(&mut self, position: InnerPos) {
        self.voxels.set(voxel_index(position), true);
    }

    pub fn contains(&self, position: InnerPos) -> bool {
        self.voxels[voxel_index(position)]
    }

    pub fn iter(&self) -> impl Iterator<Item = InnerPos> + '_ {
        self.voxels.iter_ones().map(voxel_position)
    }

    pub fn len(&self) -> usize {
        self.voxels.count_ones()
    }

    pub fn is_empty(&self) -> bool {
        self.voxels.not_any()
    }

    pub fn merge(&mut self, other: DirtySet) {
        self.voxels |= other.voxels;
    }
}

impl Default for DirtySet {
    fn default() -> Self {
        DirtySet::new()
    }
}

/// What is queued for one `(position, task type)` pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskPayload {
    Generate,
    SetBlock(BlockChanges),
    SetSunlight(ColumnSet),
    UpdateBlock(DirtySet),
    Mesh,
}

impl TaskPayload {
    pub fn task_type(&self) -> TaskType {
        match self {
            TaskPayload::Generate => TaskType::Generate,
            TaskPayload::SetBlock(_) => TaskType::SetBlock,
            TaskPayload::SetSunlight(_) => TaskType::SetSunlight,
            TaskPayload::UpdateBlock(_) => TaskType::UpdateBlock,
            TaskPayload::Mesh => TaskType::Mesh,
        }
    }

    /// Folds a later push of the same type into this payload.
    pub fn merge(&mut self, later: TaskPayload) {
        debug_assert_eq!(self.task_type(), later.task_type());
        match (self, later) {
            (TaskPayload::SetBlock(changes), TaskPayload::SetBlock(later)) => changes.merge(later),
            (TaskPayload::SetSunlight(columns), TaskPayload::SetSunlight(later)) => {
                columns.merge(later)
            }
            (TaskPayload::UpdateBlock(dirty), TaskPayload::UpdateBlock(later)) => dirty.merge(later),
            _ => {}
        }
    }
}

/// Scheduling state of one task type at one position.
#[derive(Clone, Debug, Default)]
pub struct TaskState {
    /// Present while the task is queued.
    pub payload: Option<TaskPayload>,
    pub priority: Priority,
    pub running: bool,
}

impl TaskState {
    pub fn is_queued(&self) -> bool {
        self.payload.is_some()
    }

    /// Queued or running.
    pub fn is_busy(&self) -> bool {
        self.payload.is_some() || self.running
    }
}

/// Scheduling state of every task type at one position.
#[derive(Clone, Debug, Default)]
pub struct ChunkTasks {
    states: [TaskState; TaskType::COUNT],
}

impl ChunkTasks {
    pub fn state(&self, task_type: TaskType) -> &TaskState {
        &self.states[task_type.index()]
    }

    pub fn state_mut(&mut self, task_type: TaskType) -> &mut TaskState {
        &mut self.states[task_type.index()]
    }

    pub fn is_busy(&self, task_type: TaskType) -> bool {
        self.state(task_type).is_busy()
    }

    pub fn any_busy(&self, task_types: &[TaskType]) -> bool {
        task_types.iter().any(|&task_type| self.is_busy(task_type))
    }

    pub fn has_queued(&self) -> bool {
        self.states.iter().any(TaskState::is_queued)
    }

    /// No task type is queued or running.
    pub fn is_idle(&self) -> bool {
        !self.states.iter().any(TaskState::is_busy)
    }
}

/// A push requested by a finished task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FollowUp {
    pub position: ChunkPos,
    pub payload: TaskPayload,
    pub priority: Priority,
}

/// The outcome of processing a task.
#[derive(Debug, Default)]
pub struct TaskResult {
    pub follow_ups: Vec<FollowUp>,
}

impl TaskResult {
    pub fn new() -> Self {
        TaskResult::default()
    }

    pub fn push(&mut self, position: ChunkPos, payload: TaskPayload, priority: Priority) {
        self.follow_ups.push(FollowUp {
            position,
            payload,
            priority,
        });
    }
}

/// Shared services every task runs against.
#[derive(Clone)]
pub struct PipelineContext {
    pub world: Arc<World>,
    pub sink: Arc<dyn MeshSink>,
    /// Vertex limit of a single mesh buffer.
    pub max_vertices: usize,
}

/// A unit of work that can be executed on any worker thread.
///
/// Implementors own strong references to every chunk they touch and take all of their
/// locks through one lock set at a time.
pub trait Task: Send {
    /// Position of the chunk the task was scheduled for.
    fn position(&self) -> ChunkPos;

    fn priority(&self) -> Priority;

    /// Runs the task.
    ///
    /// # Returns
    /// The follow-up pushes to apply once the task is done.
    fn process(self, context: &PipelineContext) -> TaskResult;
}

/// A materialized task of any type.
#[derive(Debug)]
pub enum TaskRunner {
    Generate(GenerateTask),
    SetBlock(SetBlockTask),
    SetSunlight(SetSunlightTask),
    UpdateBlock(UpdateBlockTask),
    Mesh(MeshTask),
}

impl TaskRunner {
    pub fn task_type(&self) -> TaskType {
        match self {
            TaskRunner::Generate(_) => TaskType::Generate,
            TaskRunner::SetBlock(_) => TaskType::SetBlock,
            TaskRunner::SetSunlight(_) => TaskType::SetSunlight,
            TaskRunner::UpdateBlock(_) => TaskType::UpdateBlock,
            TaskRunner::Mesh(_) => TaskType::Mesh,
        }
    }

    pub fn position(&self) -> ChunkPos {
        match self {
            TaskRunner::Generate(task) => task.position(),
            TaskRunner::SetBlock(task) => task.position(),
            TaskRunner::SetSunlight(task) => task.position(),
            TaskRunner::UpdateBlock(task) => task.position(),
            TaskRunner::Mesh(task) => task.position(),
        }
    }

    pub fn priority(&self) -> Priority {
        match self {
            TaskRunner::Generate(task) => task.priority(),
            TaskRunner::SetBlock(task) => task.priority(),
            TaskRunner::SetSunlight(task) => task.priority(),
            TaskRunner::UpdateBlock(task) => task.priority(),
            TaskRunner::Mesh(task) => task.priority(),
        }
    }

    pub fn process(self, context: &PipelineContext) -> TaskResult {
        match self {
            TaskRunner::Generate(task) => task.process(context),
            TaskRunner::SetBlock(task) => task.process(context),
            TaskRunner::SetSunlight(task) => task.process(context),
            TaskRunner::UpdateBlock(task) => task.process(context),
            TaskRunner::Mesh(task) => task.process(context),
        }
    }
}
