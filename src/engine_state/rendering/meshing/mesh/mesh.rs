//! Mesh data structures for voxel rendering.
//!
//! A chunk's geometry ends up in one or more [`MeshBuffer`]s. Opaque and translucent quads go
//! into separate buffers so the renderer can draw them in separate passes, and a buffer is
//! closed as soon as one more quad would push it past the per-mesh vertex limit.

use cgmath::Point3;

use crate::engine_state::rendering::Vertex;
use crate::engine_state::voxels::block::block_side::BlockSide;

/// Axis-aligned bounding box of a mesh buffer, relative to the chunk origin.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Aabb {
    /// A box that contains nothing; growing it by any point yields that point.
    pub fn empty() -> Self {
        Aabb {
            min: Point3::new(f32::MAX, f32::MAX, f32::MAX),
            max: Point3::new(f32::MIN, f32::MIN, f32::MIN),
        }
    }

    pub fn grow(&mut self, point: Point3<f32>) {
        self.min = Point3::new(
            self.min.x.min(point.x),
            self.min.y.min(point.y),
            self.min.z.min(point.z),
        );
        self.max = Point3::new(
            self.max.x.max(point.x),
            self.max.y.max(point.y),
            self.max.z.max(point.z),
        );
    }
}

/// One drawable buffer of a chunk mesh.
#[derive(Clone, Debug)]
pub struct MeshBuffer {
    /// The vertex data for this buffer
    pub vertices: Vec<Vertex>,
    /// Triangle indices into `vertices`
    pub indices: Vec<u32>,
    pub aabb: Aabb,
    /// Whether the buffer holds translucent geometry (drawn after opaque buffers)
    pub transparent: bool,
}

impl MeshBuffer {
    fn new(transparent: bool) -> Self {
        MeshBuffer {
            vertices: Vec::new(),
            indices: Vec::new(),
            aabb: Aabb::empty(),
            transparent,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Number of quads in the buffer.
    pub fn quad_count(&self) -> usize {
        self.vertices.len() / 4
    }
}

/// Face counts of a generated mesh.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MeshStats {
    /// Greedy-merged quads of full cubes
    pub cubic_faces: usize,
    /// Quads instantiated from custom mesh templates
    pub custom_faces: usize,
}

/// The complete replacement geometry of one chunk.
#[derive(Clone, Debug, Default)]
pub struct ChunkMesh {
    pub buffers: Vec<MeshBuffer>,
    pub stats: MeshStats,
}

impl ChunkMesh {
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.buffers.iter().map(|buffer| buffer.vertices.len()).sum()
    }
}

/// A quad corner as produced by the mesher, before it is packed into a [`Vertex`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct QuadCorner {
    pub position: Point3<f32>,
    pub tex_coords: [f32; 2],
    /// Sunlight and torchlight, ×4 fixed point
    pub light: [u8; 2],
    pub ao: u8,
}

impl QuadCorner {
    /// Weight used to choose the triangulation diagonal.
    fn shade_weight(&self) -> i32 {
        (self.ao as i32 + 1) * (self.light[0] as i32 + self.light[1] as i32 + 1)
    }
}

/// Picks the diagonal whose end points are shaded most alike, so interpolation across the
/// quad does not produce a visible seam.
///
/// # Returns
/// The six indices (relative to the quad's first vertex) of the two triangles.
pub fn quad_indices(corners: &[QuadCorner; 4]) -> [u32; 6] {
    let weights = corners.map(|corner| corner.shade_weight());
    if (weights[0] - weights[2]).abs() <= (weights[1] - weights[3]).abs() {
        [0, 1, 2, 0, 2, 3]
    } else {
        [1, 2, 3, 1, 3, 0]
    }
}

/// Accumulates quads into vertex-limited opaque and translucent buffers.
pub struct MeshBuilder {
    max_vertices: usize,
    opaque: MeshBuffer,
    transparent: MeshBuffer,
    finished: Vec<MeshBuffer>,
    stats: MeshStats,
}

impl MeshBuilder {
    /// # Arguments
    /// * `max_vertices` - Largest number of vertices a single buffer may hold (at least 4)
    pub fn new(max_vertices: usize) -> Self {
        MeshBuilder {
            max_vertices: max_vertices.max(4),
            opaque: MeshBuffer::new(false),
            transparent: MeshBuffer::new(true),
            finished: Vec::new(),
            stats: MeshStats::default(),
        }
    }

    /// Appends one quad.
    ///
    /// # Arguments
    /// * `transparent` - Whether the quad goes into the translucent buffer
    /// * `texture` - Texture index of the quad
    /// * `side` - The block side the quad faces, stored on every vertex
    /// * `corners` - The four corners, counter-clockwise as seen from the front
    /// * `custom` - Whether the quad comes from a custom mesh template
    pub fn push_quad(
        &mut self,
        transparent: bool,
        texture: u16,
        side: BlockSide,
        corners: [QuadCorner; 4],
        custom: bool,
    ) {
        let max_vertices = self.max_vertices;
        let buffer = if transparent {
            &mut self.transparent
        } else {
            &mut self.opaque
        };
        if buffer.vertices.len() + 4 > max_vertices {
            let full = std::mem::replace(buffer, MeshBuffer::new(transparent));
            self.finished.push(full);
        }

        let base = buffer.vertices.len() as u32;
        buffer
            .indices
            .extend(quad_indices(&corners).map(|index| base + index));
        for corner in corners {
            buffer.aabb.grow(corner.position);
            buffer.vertices.push(Vertex::new(
                corner.position,
                corner.tex_coords,
                texture,
                corner.light,
                corner.ao,
                side as u8,
            ));
        }

        if custom {
            self.stats.custom_faces += 1;
        } else {
            self.stats.cubic_faces += 1;
        }
    }

    pub fn stats(&self) -> MeshStats {
        self.stats
    }

    /// Closes the open buffers. Empty buffers are dropped.
    pub fn finish(self) -> ChunkMesh {
        let mut buffers = self.finished;
        buffers.extend(
            [self.opaque, self.transparent]
                .into_iter()
                .filter(|buffer| !buffer.is_empty()),
        );
        ChunkMesh {
            buffers,
            stats: self.stats,
        }
    }
}
