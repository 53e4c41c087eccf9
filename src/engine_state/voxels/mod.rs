//! # Voxel Engine Core
//!
//! This module contains the voxel data the pipeline processes and the tasks that write it.
//!
//! ## Architecture
//!
//! The voxel system is organized into several key components:
//!
//! * **Block**: Packed voxel values, light values and the block registry
//! * **Chunk**: 16³ block grids with per-column sunlight heights and independent locks
//! * **Coords**: Conversions between world, chunk and inner positions
//! * **Lighting**: Sunlight and torchlight flood fill around a chunk
//! * **Generation**: Terrain generators run by Generate tasks
//! * **Persistence**: Hooks that replay and record edits
//! * **World**: The map of loaded chunks and the shared collaborators
//! * **Tasks**: Generate, SetBlock, SetSunlight and UpdateBlock
//!
//! ## Data Flow
//!
//! 1. The scheduler creates a chunk and queues its generation
//! 2. Generation fills blocks and sunlight heights, then queues sunlight fixes and a mesh
//! 3. Edits and ticks rewrite blocks and queue the meshes and columns they invalidate
//! 4. Mesh tasks read the chunk and its neighbors and hand geometry to the renderer
//!
//! ## Thread Safety
//!
//! * Block and sunlight data of a chunk sit behind two independent read-write locks
//! * Tasks take all the locks they need in one composed, globally ordered acquisition
//! * The scheduler keeps conflicting tasks from being materialized together

pub mod block;
pub mod chunk;
pub mod coords;
pub mod generation;
pub mod lighting;
pub mod persistence;
pub mod tasks;
pub mod world;
