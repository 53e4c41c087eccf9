//! # Coordinates Module
//!
//! Conversions between the three coordinate spaces the pipeline works in:
//!
//! * **World** positions address single voxels anywhere.
//! * **Chunk** positions address 16³ chunks (`world.div_euclid(16)`).
//! * **Inner** positions address a voxel inside its chunk (`world.rem_euclid(16)`).
//!
//! Positions *relative* to a chunk origin may leave `[0, 16)` and then name a voxel of one of
//! the 26 neighbors; [`split_relative`] resolves them.

use std::array;

use cgmath::{Point3, Vector3};

use super::chunk::{CHUNK_DIMENSION, CHUNK_PLANE_SIZE, CHUNK_SIZE};

/// Position of a chunk in chunk coordinates.
pub type ChunkPos = Point3<i32>;
/// Position of a voxel in world coordinates.
pub type WorldPos = Point3<i32>;
/// Position of a voxel inside its chunk, each component in `[0, 16)`.
pub type InnerPos = Point3<i32>;

/// A chunk and its 26 neighbors.
pub const NEIGHBORHOOD_SIZE: usize = 27;
/// Index of the center chunk inside a neighborhood.
pub const CENTER_INDEX: usize = 13;

/// Offset of the neighborhood slot `index`; slot `(dx+1) + 3(dy+1) + 9(dz+1)`.
pub fn neighborhood_offset(index: usize) -> Vector3<i32> {
    let index = index as i32;
    Vector3::new(index % 3 - 1, (index / 3) % 3 - 1, index / 9 - 1)
}

/// Slot of a neighborhood offset with every component in `[-1, 1]`.
pub fn neighborhood_index(offset: Vector3<i32>) -> usize {
    debug_assert!(is_neighbor_offset(offset), "{offset:?} is outside the neighborhood");
    ((offset.x + 1) + 3 * (offset.y + 1) + 9 * (offset.z + 1)) as usize
}

pub fn is_neighbor_offset(offset: Vector3<i32>) -> bool {
    (-1..=1).contains(&offset.x) && (-1..=1).contains(&offset.y) && (-1..=1).contains(&offset.z)
}

/// Positions of the 27 chunks around (and including) `center`, in slot order.
pub fn neighborhood(center: ChunkPos) -> [ChunkPos; NEIGHBORHOOD_SIZE] {
    array::from_fn(|index| center + neighborhood_offset(index))
}

/// Linear index of an inner position: `x + 16y + 256z`.
pub fn voxel_index(position: InnerPos) -> usize {
    debug_assert!(is_inner(position), "{position:?} is not an inner position");
    (position.x + CHUNK_DIMENSION * position.y + CHUNK_PLANE_SIZE * position.z) as usize
}

/// Inverse of [`voxel_index`].
pub fn voxel_position(index: usize) -> InnerPos {
    debug_assert!(index < CHUNK_SIZE as usize);
    let index = index as i32;
    Point3::new(
        index % CHUNK_DIMENSION,
        (index / CHUNK_DIMENSION) % CHUNK_DIMENSION,
        index / CHUNK_PLANE_SIZE,
    )
}

/// Index of the column `(x, z)`: `x + 16z`.
pub fn column_index(x: i32, z: i32) -> usize {
    (x + CHUNK_DIMENSION * z) as usize
}

/// Inverse of [`column_index`], as `(x, z)`.
pub fn column_position(index: usize) -> (i32, i32) {
    let index = index as i32;
    (index % CHUNK_DIMENSION, index / CHUNK_DIMENSION)
}

pub fn is_inner(position: Point3<i32>) -> bool {
    (0..CHUNK_DIMENSION).contains(&position.x)
        && (0..CHUNK_DIMENSION).contains(&position.y)
        && (0..CHUNK_DIMENSION).contains(&position.z)
}

/// Splits a world position into its chunk and inner position.
pub fn split_world(position: WorldPos) -> (ChunkPos, InnerPos) {
    (
        Point3::new(
            position.x.div_euclid(CHUNK_DIMENSION),
            position.y.div_euclid(CHUNK_DIMENSION),
            position.z.div_euclid(CHUNK_DIMENSION),
        ),
        Point3::new(
            position.x.rem_euclid(CHUNK_DIMENSION),
            position.y.rem_euclid(CHUNK_DIMENSION),
            position.z.rem_euclid(CHUNK_DIMENSION),
        ),
    )
}

/// Splits a position relative to some chunk origin into the chunk offset and inner position.
pub fn split_relative(position: Point3<i32>) -> (Vector3<i32>, InnerPos) {
    let (chunk, inner) = split_world(position);
    (Vector3::new(chunk.x, chunk.y, chunk.z), inner)
}

/// World position of a chunk's `(0, 0, 0)` voxel.
pub fn chunk_origin(position: ChunkPos) -> WorldPos {
    Point3::new(
        position.x * CHUNK_DIMENSION,
        position.y * CHUNK_DIMENSION,
        position.z * CHUNK_DIMENSION,
    )
}

/// Chebyshev distance between two chunk positions.
pub fn chunk_distance(a: ChunkPos, b: ChunkPos) -> i32 {
    (a.x - b.x)
        .abs()
        .max((a.y - b.y).abs())
        .max((a.z - b.z).abs())
}

/// Total order on chunk positions used for lock acquisition and deterministic scans.
pub fn position_key(position: ChunkPos) -> (i32, i32, i32) {
    (position.x, position.y, position.z)
}
