use cgmath::{Point3, Vector3};

use crate::engine_state::voxels::block::block_side::BlockSide;
use crate::engine_state::voxels::block::registry::{BlockProperties, BlockRegistry, Transparency};
use crate::engine_state::voxels::block::Block;
use crate::engine_state::voxels::chunk::padded::PaddedBlocks;
use crate::engine_state::voxels::lighting::extended::ExtendedLight;

/// Everything the mesher reads: the chunk's blocks with a one-voxel shell, the light around
/// it and the registry that gives both meaning.
pub struct MeshInput<'a> {
    pub blocks: &'a PaddedBlocks,
    pub light: &'a ExtendedLight,
    pub registry: &'a BlockRegistry,
}

impl MeshInput<'_> {
    pub fn block(&self, position: Point3<i32>) -> Block {
        self.blocks.get(position)
    }

    pub fn properties(&self, position: Point3<i32>) -> BlockProperties {
        self.registry.properties(self.blocks.get(position))
    }

    /// Whether the block at `position` darkens corners next to it.
    pub fn occludes(&self, position: Point3<i32>) -> bool {
        self.properties(position).occludes()
    }
}

/// Whether the cube face of `block` towards `neighbor` has to be drawn.
///
/// Blocks with a custom mesh never produce cube faces. A face is hidden behind occluding
/// neighbors, and between two translucent blocks of the same id (glass panes, water bodies).
pub fn face_visible(registry: &BlockRegistry, block: Block, neighbor: Block) -> bool {
    let properties = registry.properties(block);
    if properties.transparency == Transparency::Invisible || properties.custom_mesh.is_some() {
        return false;
    }
    if registry.properties(neighbor).occludes() {
        return false;
    }
    !(neighbor.id == block.id && properties.is_translucent())
}

/// In-plane corner offsets `(u, v)` of a quad, counter-clockwise as seen from the front.
pub fn corner_order(side: BlockSide) -> [(i32, i32); 4] {
    if side.is_positive() {
        [(0, 0), (1, 0), (1, 1), (0, 1)]
    } else {
        [(0, 0), (0, 1), (1, 1), (1, 0)]
    }
}

/// Unit vector along `axis`.
pub fn unit(axis: usize) -> Vector3<i32> {
    let mut vector = Vector3::new(0, 0, 0);
    vector[axis] = 1;
    vector
}

/// Ambient occlusion and light of the four corners of a unit face.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FaceShading {
    /// Per corner, in [`corner_order`].
    pub ao: [u8; 4],
    /// Per corner sunlight and torchlight, ×4 fixed point.
    pub light: [[u8; 2]; 4],
}

/// Ambient occlusion of one corner given its two side cells, the diagonal cell between them
/// and the cell directly in front of the face.
pub fn vertex_ao(side1: bool, side2: bool, corner: bool, front: bool) -> u8 {
    if side1 && side2 {
        return 0;
    }
    3u8.saturating_sub(side1 as u8 + side2 as u8 + corner as u8 + front as u8)
}

/// Shades the face of the cell at `position` that points to `side`.
pub fn shade_face(input: &MeshInput, position: Point3<i32>, side: BlockSide) -> FaceShading {
    let (_, u, v) = side.axes();
    let front = position + side.normal();
    let front_occludes = input.occludes(front);
    let front_light = input.light.light_at(front);

    let mut shading = FaceShading {
        ao: [0; 4],
        light: [[0; 2]; 4],
    };
    for (corner, (cu, cv)) in corner_order(side).into_iter().enumerate() {
        let du = unit(u) * (2 * cu - 1);
        let dv = unit(v) * (2 * cv - 1);
        let side1 = front + du;
        let side2 = front + dv;
        let diagonal = front + du + dv;

        shading.ao[corner] = vertex_ao(
            input.occludes(side1),
            input.occludes(side2),
            input.occludes(diagonal),
            front_occludes,
        );

        let mut sum = [front_light.sunlight() as u32, front_light.torchlight() as u32];
        let mut count = 1;
        for sample in [side1, side2, diagonal] {
            if input.light.passes_at(sample) {
                let light = input.light.light_at(sample);
                sum[0] += light.sunlight() as u32;
                sum[1] += light.torchlight() as u32;
                count += 1;
            }
        }
        shading.light[corner] = sum.map(|channel| (channel * 4 / count) as u8);
    }
    shading
}
