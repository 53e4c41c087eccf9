//! Mesh generation for voxel rendering.
//!
//! This module handles the conversion of voxel data into GPU-friendly meshes. The key goals
//! are:
//! 1. Minimize vertex count with greedy face merging
//! 2. Keep the shading of merged faces exact (ambient occlusion and light take part in
//!    the merge key)
//! 3. Separate opaque from translucent geometry so they can be drawn in separate passes
//!
//! # Architecture
//! - `mesh/`: Contains the mesh generation algorithms and data structures
//! - [`MeshScratch`]: per-thread buffers a mesh task fills before generating

use crate::engine_state::voxels::chunk::padded::PaddedBlocks;
use crate::engine_state::voxels::lighting::extended::ExtendedLight;

/// Core mesh generation algorithms and data structures.
///
/// This module contains the implementation of greedy meshing, custom block templates and
/// the buffer types the renderer receives.
mod mesh;

// Re-export the mesh module's public interface for external use
pub use mesh::*;

/// Reusable per-thread input buffers of the mesher.
///
/// Both buffers are large (the light buffer covers 46³ cells per channel), so each worker
/// keeps one set around instead of allocating per task.
#[derive(Default)]
pub struct MeshScratch {
    pub blocks: PaddedBlocks,
    pub light: ExtendedLight,
}
