//! Greedy meshing implementation for voxel rendering.
//!
//! This module implements the greedy meshing algorithm which combines adjacent coplanar
//! faces with the same appearance into larger quads, significantly reducing the number of
//! vertices needed to render a chunk.
//!
//! For every side, the chunk is cut into 16 slices perpendicular to the side's normal. Each
//! slice gets a 16x16 mask holding the appearance of the visible face of every cell (or
//! nothing). Rectangles are then grown from the first unclaimed cell: first along `u` while
//! the run continues unbroken, then along `v` while every cell of the next row still matches.

use cgmath::Point3;

use crate::engine_state::voxels::block::block_side::BlockSide;
use crate::engine_state::voxels::chunk::CHUNK_DIMENSION;

use super::face::{corner_order, face_visible, shade_face, FaceShading, MeshInput};
use super::mesh::{MeshBuilder, QuadCorner};

const SLICE_SIZE: usize = (CHUNK_DIMENSION * CHUNK_DIMENSION) as usize;

/// Everything that has to match for two unit faces to merge.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
struct FaceKey {
    texture: u16,
    transparent: bool,
    shading: FaceShading,
}

/// Cell position of mask entry `(i, j)` in slice `slice` of a side with axes `(d, u, v)`.
fn cell(axes: (usize, usize, usize), slice: i32, i: i32, j: i32) -> Point3<i32> {
    let (d, u, v) = axes;
    let mut position = Point3::new(0, 0, 0);
    position[d] = slice;
    position[u] = i;
    position[v] = j;
    position
}

fn fill_mask(
    input: &MeshInput,
    side: BlockSide,
    slice: i32,
    mask: &mut [Option<FaceKey>; SLICE_SIZE],
) {
    let axes = side.axes();
    for j in 0..CHUNK_DIMENSION {
        for i in 0..CHUNK_DIMENSION {
            let position = cell(axes, slice, i, j);
            let block = input.block(position);
            let neighbor = input.block(position + side.normal());
            mask[(i + CHUNK_DIMENSION * j) as usize] =
                face_visible(input.registry, block, neighbor).then(|| FaceKey {
                    texture: input.registry.texture(block, side),
                    transparent: input.registry.properties(block).is_translucent(),
                    shading: shade_face(input, position, side),
                });
        }
    }
}

fn emit_quad(
    builder: &mut MeshBuilder,
    side: BlockSide,
    slice: i32,
    origin: (i32, i32),
    size: (i32, i32),
    key: FaceKey,
) {
    let (d, u, v) = side.axes();
    let plane = if side.is_positive() { slice + 1 } else { slice };
    let corners = corner_order(side);
    let quad = std::array::from_fn(|corner| {
        let (cu, cv) = corners[corner];
        let mut position = Point3::new(0.0, 0.0, 0.0);
        position[d] = plane as f32;
        position[u] = (origin.0 + cu * size.0) as f32;
        position[v] = (origin.1 + cv * size.1) as f32;
        QuadCorner {
            position,
            tex_coords: [(cu * size.0) as f32, (cv * size.1) as f32],
            light: key.shading.light[corner],
            ao: key.shading.ao[corner],
        }
    });
    builder.push_quad(key.transparent, key.texture, side, quad, false);
}

/// Emits the merged cube faces of the chunk into `builder`.
///
/// # Arguments
/// * `input` - Blocks, light and registry of the chunk being meshed
/// * `builder` - Destination of the quads
///
/// # Performance
/// Every cell of every slice is shaded once; merging itself is linear in the mask size.
pub fn greedy(input: &MeshInput, builder: &mut MeshBuilder) {
    let mut mask = [None; SLICE_SIZE];
    let dimension = CHUNK_DIMENSION;

    for side in BlockSide::all() {
        for slice in 0..dimension {
            fill_mask(input, side, slice, &mut mask);

            for j in 0..dimension {
                let mut i = 0;
                while i < dimension {
                    let Some(key) = mask[(i + dimension * j) as usize] else {
                        i += 1;
                        continue;
                    };

                    let mut width = 1;
                    while i + width < dimension
                        && mask[(i + width + dimension * j) as usize] == Some(key)
                    {
                        width += 1;
                    }

                    let mut height = 1;
                    'rows: while j + height < dimension {
                        for k in i..i + width {
                            if mask[(k + dimension * (j + height)) as usize] != Some(key) {
                                break 'rows;
                            }
                        }
                        height += 1;
                    }

                    for row in j..j + height {
                        for k in i..i + width {
                            mask[(k + dimension * row) as usize] = None;
                        }
                    }

                    emit_quad(builder, side, slice, (i, j), (width, height), key);
                    i += width;
                }
            }
        }
    }
}
