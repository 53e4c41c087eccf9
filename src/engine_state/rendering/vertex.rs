//! Vertex data structures for voxel meshes.
//!
//! This module defines the vertex format the mesher emits. Renderers upload the vertex
//! slices as-is, so the layout is fixed and `Pod`.

use cgmath::Point3;

/// A vertex of a chunk mesh.
///
/// Positions are relative to the chunk origin; custom meshes place vertices at sub-voxel
/// offsets, so they are stored as floats.
///
/// # Memory Layout
/// - Position: [f32; 3] (12 bytes)
/// - Texture Coordinates: [f32; 2] (8 bytes)
/// - Texture Index: u32 (4 bytes)
/// - Shading: [u8; 4] (4 bytes): sunlight ×4, torchlight ×4, ambient occlusion, side
///
/// Total size: 28 bytes
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// Position relative to the chunk origin
    pub position: [f32; 3],
    /// Texture coordinates in blocks; greedy quads repeat the texture across their size
    pub tex_coords: [f32; 2],
    /// Index of the texture in the texture array
    pub texture_index: u32,
    shading: [u8; 4],
}

impl Vertex {
    /// Creates a new vertex.
    ///
    /// # Arguments
    /// * `position` - Position relative to the chunk origin
    /// * `tex_coords` - Texture coordinates
    /// * `texture_index` - Index of the texture in the texture array
    /// * `light` - Sunlight and torchlight in ×4 fixed point (0-60)
    /// * `ao` - Ambient occlusion level (0 = fully occluded, 3 = open)
    /// * `side` - Index of the block side the vertex belongs to
    ///
    /// # Returns
    /// A new `Vertex` instance
    pub fn new(
        position: Point3<f32>,
        tex_coords: [f32; 2],
        texture_index: u16,
        light: [u8; 2],
        ao: u8,
        side: u8,
    ) -> Self {
        Vertex {
            position: [position.x, position.y, position.z],
            tex_coords,
            texture_index: texture_index as u32,
            shading: [light[0], light[1], ao, side],
        }
    }

    /// Sunlight in ×4 fixed point.
    pub fn sunlight(&self) -> u8 {
        self.shading[0]
    }

    /// Torchlight in ×4 fixed point.
    pub fn torchlight(&self) -> u8 {
        self.shading[1]
    }

    pub fn ao(&self) -> u8 {
        self.shading[2]
    }

    pub fn side(&self) -> u8 {
        self.shading[3]
    }
}
