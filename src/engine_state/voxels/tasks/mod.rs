//! # Voxel Task System
//!
//! Tasks that write chunk data: terrain generation, block edits, sunlight height updates
//! and block ticks. Each one runs on a worker thread, takes its chunk locks through a single
//! lock set at a time and reports the work it unlocks as follow-ups.

use cgmath::{Point3, Vector3};

use super::chunk::CHUNK_DIMENSION;
use super::coords::{neighborhood_offset, ChunkPos, NEIGHBORHOOD_SIZE};

pub mod generate_task;
pub mod set_block_task;
pub mod set_sunlight_task;
pub mod update_block_task;

/// Light can travel 15 voxels from a change, and meshes sample one voxel past their chunk.
pub const LIGHT_REACH: i32 = 16;

/// Chunks of the neighborhood of `center` whose box intersects the inclusive region
/// `min..=max`, given relative to the origin of `center`.
pub fn chunks_touching(center: ChunkPos, min: Point3<i32>, max: Point3<i32>) -> Vec<ChunkPos> {
    let overlaps = |offset: i32, low: i32, high: i32| {
        let start = offset * CHUNK_DIMENSION;
        start <= high && start + CHUNK_DIMENSION - 1 >= low
    };
    (0..NEIGHBORHOOD_SIZE)
        .map(neighborhood_offset)
        .filter(|offset: &Vector3<i32>| {
            overlaps(offset.x, min.x, max.x)
                && overlaps(offset.y, min.y, max.y)
                && overlaps(offset.z, min.z, max.z)
        })
        .map(|offset| center + offset)
        .collect()
}
