//! Mesh generation for voxel rendering.
//!
//! This module converts a chunk's blocks and light into GPU-friendly vertex and index
//! buffers. Generation runs in two passes over the same [`MeshBuilder`]:
//!
//! 1. [`custom_meshes`] instantiates the template of every block with a custom mesh
//! 2. [`greedy`] merges the visible faces of full cubes into maximal rectangles
//!
//! # Architecture
//! - [`MeshInput`]: padded blocks, extended light and registry of the chunk being meshed
//! - [`MeshBuilder`]: accumulates quads, picks their triangulation and splits buffers
//! - [`ChunkMesh`]: the finished replacement geometry of one chunk
//!
//! # Usage
//! ```ignore
//! let input = MeshInput { blocks: &padded, light: &light, registry: &registry };
//! let mesh = generate_mesh(&input, 65536);
//! ```

mod custom;
mod face;
mod greedy;
mod mesh;

pub use custom::custom_meshes;
pub use face::{face_visible, shade_face, vertex_ao, FaceShading, MeshInput};
pub use greedy::greedy;
pub use mesh::*;

/// Builds the complete mesh of a chunk from scratch.
///
/// # Arguments
/// * `input` - Blocks, light and registry of the chunk
/// * `max_vertices` - Vertex limit of a single buffer
///
/// # Returns
/// The chunk's buffers; empty if nothing in the chunk is visible.
pub fn generate_mesh(input: &MeshInput, max_vertices: usize) -> ChunkMesh {
    let mut builder = MeshBuilder::new(max_vertices);
    custom_meshes(input, &mut builder);
    greedy(input, &mut builder);
    builder.finish()
}

#[cfg(test)]
mod tests {
    use std::array;
    use std::sync::Arc;

    use cgmath::Point3;

    use super::*;
    use crate::engine_state::voxels::block::block_type::BlockType;
    use crate::engine_state::voxels::block::registry::BlockRegistry;
    use crate::engine_state::voxels::block::Block;
    use crate::engine_state::voxels::chunk::lock_set::BlockReadSunlightRead;
    use crate::engine_state::voxels::chunk::neighborhood::Neighborhood;
    use crate::engine_state::voxels::chunk::padded::PaddedBlocks;
    use crate::engine_state::voxels::chunk::{BlockArray, Chunk, SunlightHeights, NO_SUNLIGHT};
    use crate::engine_state::voxels::coords::{neighborhood_offset, CENTER_INDEX};
    use crate::engine_state::voxels::lighting::extended::ExtendedLight;

    /// Meshes `center` surrounded by open-sky air chunks.
    fn mesh_in_open_air(center: BlockArray, heights: SunlightHeights) -> ChunkMesh {
        let mut center = Some((center, heights));
        let chunks = Neighborhood::from_chunks(array::from_fn(|index| {
            let offset = neighborhood_offset(index);
            let position = Point3::new(offset.x, offset.y, offset.z);
            let (blocks, heights) = if index == CENTER_INDEX {
                center.take().unwrap_or_default()
            } else {
                (BlockArray::default(), SunlightHeights::filled(0))
            };
            Arc::new(Chunk::with_data(position, blocks, heights))
        }));

        let registry = BlockRegistry::default();
        let mut blocks = PaddedBlocks::new();
        let mut light = ExtendedLight::new();
        {
            let locks = chunks.lock::<BlockReadSunlightRead>();
            blocks.copy_from(&locks);
            light.compute(&locks, &registry);
        }
        let input = MeshInput {
            blocks: &blocks,
            light: &light,
            registry: &registry,
        };
        generate_mesh(&input, 65536)
    }

    #[test]
    fn uniform_chunk_collapses_to_six_quads() {
        let mesh = mesh_in_open_air(
            BlockArray::filled(Block::new(BlockType::STONE)),
            SunlightHeights::filled(NO_SUNLIGHT),
        );
        assert_eq!(mesh.stats.cubic_faces, 6);
        assert_eq!(mesh.stats.custom_faces, 0);
        assert_eq!(mesh.buffers.len(), 1);
        assert_eq!(mesh.buffers[0].indices.len(), 36);
        assert_eq!(mesh.buffers[0].aabb.min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(mesh.buffers[0].aabb.max, Point3::new(16.0, 16.0, 16.0));
    }

    #[test]
    fn lone_block_is_unoccluded_and_fully_lit() {
        let mut blocks = BlockArray::default();
        blocks.set(Point3::new(4, 4, 4), Block::new(BlockType::STONE));
        let mut heights = SunlightHeights::filled(0);
        heights.set(4, 4, 5);
        let mesh = mesh_in_open_air(blocks, heights);

        assert_eq!(mesh.stats.cubic_faces, 6);
        let vertices = &mesh.buffers[0].vertices;
        assert_eq!(vertices.len(), 24);
        assert!(vertices.iter().all(|vertex| vertex.ao() == 3));
        // Everything around the block is open to the sky except the cell under it, which
        // still gets 14 from its neighbors.
        let top: Vec<_> = vertices.iter().filter(|vertex| vertex.side() == 3).collect();
        assert!(top.iter().all(|vertex| vertex.sunlight() == 60));
        let bottom: Vec<_> = vertices.iter().filter(|vertex| vertex.side() == 2).collect();
        assert!(bottom.iter().all(|vertex| vertex.sunlight() < 60));
    }

    #[test]
    fn corners_against_a_wall_are_darkened() {
        // A floor with a single block on it: the floor's top face gets darker next to it.
        let mut blocks = BlockArray::default();
        for z in 0..16 {
            for x in 0..16 {
                blocks.set(Point3::new(x, 0, z), Block::new(BlockType::STONE));
            }
        }
        blocks.set(Point3::new(8, 1, 8), Block::new(BlockType::STONE));
        let mut heights = SunlightHeights::filled(1);
        heights.set(8, 8, 2);
        let mesh = mesh_in_open_air(blocks, heights);

        let vertices = &mesh.buffers[0].vertices;
        assert!(vertices.iter().any(|vertex| vertex.ao() < 3));
        // The floor no longer collapses into a single quad.
        assert!(mesh.stats.cubic_faces > 6);
    }

    #[test]
    fn glass_walls_share_no_inner_faces() {
        let mut blocks = BlockArray::default();
        blocks.set(Point3::new(2, 2, 2), Block::new(BlockType::GLASS));
        blocks.set(Point3::new(3, 2, 2), Block::new(BlockType::GLASS));
        let mesh = mesh_in_open_air(blocks, SunlightHeights::filled(0));

        assert_eq!(mesh.buffers.len(), 1);
        assert!(mesh.buffers[0].transparent);
        // Top, bottom, front and back merge across both blocks; two end caps.
        assert_eq!(mesh.stats.cubic_faces, 6);
    }

    #[test]
    fn custom_templates() {
        let mut blocks = BlockArray::default();
        blocks.set(Point3::new(1, 1, 1), Block::new(BlockType::TALL_GRASS));
        blocks.set(Point3::new(5, 1, 5), Block::new(BlockType::SLAB));
        blocks.set(Point3::new(9, 1, 9), Block::new(BlockType::WATER));
        let mesh = mesh_in_open_air(blocks, SunlightHeights::filled(0));

        // Cross: 2 planes, double sided. Slab: 6 sides. Water: 6 sides.
        assert_eq!(mesh.stats.custom_faces, 4 + 6 + 6);
        assert_eq!(mesh.stats.cubic_faces, 0);

        let water = mesh.buffers.iter().find(|buffer| buffer.transparent);
        let water = water.map(|buffer| buffer.aabb.max.y);
        assert_eq!(water, Some(1.0 + 8.0 / 9.0));
    }

    #[test]
    fn empty_chunk_has_no_buffers() {
        let mesh = mesh_in_open_air(BlockArray::default(), SunlightHeights::filled(0));
        assert!(mesh.is_empty());
    }
}
