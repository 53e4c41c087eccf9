//! Geometry of blocks that are not full cubes.
//!
//! Three templates exist: crossed foliage quads, axis-aligned cuboids (slabs, torches) and
//! liquid volumes whose top surface follows the flow level. Their vertices sit at sub-voxel
//! positions, so light is interpolated from the surrounding cells instead of being taken
//! from the face's front cell.

use cgmath::{Point3, Vector3};

use crate::engine_state::voxels::block::block_side::BlockSide;
use crate::engine_state::voxels::block::registry::CustomMesh;
use crate::engine_state::voxels::block::Block;
use crate::engine_state::voxels::chunk::CHUNK_DIMENSION;

use super::face::{corner_order, unit, MeshInput};
use super::mesh::{MeshBuilder, QuadCorner};

/// Flow levels a liquid block can take, from full (0) to thinnest.
const LIQUID_LEVELS: f32 = 9.0;

/// Offset along the normal used when sampling light for a face vertex.
const LIGHT_SAMPLE_OFFSET: f32 = 0.25;

/// Light at a sub-voxel point, ×4 fixed point.
///
/// Trilinear interpolation between the centers of the eight cells around `point`; cells that
/// block light drop out and the remaining weights are renormalized. If every cell blocks
/// light, the cell containing `point` is used.
fn sample_light(input: &MeshInput, point: Point3<f32>) -> [u8; 2] {
    let shifted = point - Vector3::new(0.5, 0.5, 0.5);
    let base = Point3::new(
        shifted.x.floor() as i32,
        shifted.y.floor() as i32,
        shifted.z.floor() as i32,
    );
    let fraction = Vector3::new(
        shifted.x - base.x as f32,
        shifted.y - base.y as f32,
        shifted.z - base.z as f32,
    );

    let mut weight_sum = 0.0;
    let mut light_sum = [0.0f32; 2];
    for corner in 0..8 {
        let offset = Vector3::new(corner & 1, (corner >> 1) & 1, (corner >> 2) & 1);
        let cell = base + offset;
        if !input.light.passes_at(cell) {
            continue;
        }
        let weight = (if offset.x == 1 { fraction.x } else { 1.0 - fraction.x })
            * (if offset.y == 1 { fraction.y } else { 1.0 - fraction.y })
            * (if offset.z == 1 { fraction.z } else { 1.0 - fraction.z });
        let light = input.light.light_at(cell);
        light_sum[0] += weight * light.sunlight() as f32;
        light_sum[1] += weight * light.torchlight() as f32;
        weight_sum += weight;
    }

    if weight_sum <= f32::EPSILON {
        let cell = Point3::new(
            point.x.floor() as i32,
            point.y.floor() as i32,
            point.z.floor() as i32,
        );
        let light = input.light.light_at(cell);
        return [light.sunlight() * 4, light.torchlight() * 4];
    }
    light_sum.map(|channel| (channel / weight_sum * 4.0).round() as u8)
}

/// Ambient occlusion of a custom vertex: the four cells touching the nearest lattice point
/// on the front side of the face, counted like cube corners without the side rule.
fn sample_ao(input: &MeshInput, point: Point3<f32>, side: BlockSide) -> u8 {
    let (d, u, v) = side.axes();
    let lattice = Point3::new(point.x.round() as i32, point.y.round() as i32, point.z.round() as i32);
    let mut front = lattice;
    if !side.is_positive() {
        front[d] -= 1;
    }
    let occluders = [(0, 0), (1, 0), (0, 1), (1, 1)]
        .into_iter()
        .filter(|&(du, dv)| input.occludes(front - unit(u) * du - unit(v) * dv))
        .count();
    3 - occluders.min(3) as u8
}

fn corner(
    input: &MeshInput,
    position: Point3<f32>,
    side: BlockSide,
    normal: Vector3<f32>,
    tex_coords: [f32; 2],
) -> QuadCorner {
    QuadCorner {
        position,
        tex_coords,
        light: sample_light(input, position + normal * LIGHT_SAMPLE_OFFSET),
        ao: sample_ao(input, position, side),
    }
}

fn to_f32(position: Point3<i32>) -> Point3<f32> {
    Point3::new(position.x as f32, position.y as f32, position.z as f32)
}

/// The quad of box side `side`, where `box_corner` maps a unit-cube corner to its offset
/// from the cell origin `origin`.
fn box_face(
    input: &MeshInput,
    side: BlockSide,
    origin: Point3<f32>,
    box_corner: impl Fn([i32; 3]) -> Vector3<f32>,
) -> [QuadCorner; 4] {
    let (d, u, v) = side.axes();
    let normal = side.normal();
    let normal = Vector3::new(normal.x as f32, normal.y as f32, normal.z as f32);
    let corners = corner_order(side);
    std::array::from_fn(|index| {
        let (cu, cv) = corners[index];
        let mut unit_corner = [0; 3];
        unit_corner[d] = side.is_positive() as i32;
        unit_corner[u] = cu;
        unit_corner[v] = cv;
        let offset = box_corner(unit_corner);
        let tex_coords = [offset[u], 1.0 - offset[v]];
        corner(input, origin + offset, side, normal, tex_coords)
    })
}

fn mesh_cross(input: &MeshInput, builder: &mut MeshBuilder, position: Point3<i32>, block: Block) {
    let origin = to_f32(position);
    let texture = input.registry.texture(block, BlockSide::FRONT);
    let transparent = input.registry.properties(block).is_translucent();
    let up = Vector3::new(0.0, 1.0, 0.0);
    let in_place = Vector3::new(0.0, 0.0, 0.0);

    for (start, end) in [
        (Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 1.0)),
        (Vector3::new(0.0, 0.0, 1.0), Vector3::new(1.0, 0.0, 0.0)),
    ] {
        let positions = [origin + start, origin + end, origin + end + up, origin + start + up];
        let tex_coords = [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];
        let front: [QuadCorner; 4] = std::array::from_fn(|index| {
            corner(input, positions[index], BlockSide::TOP, in_place, tex_coords[index])
        });
        let mut back = front;
        back.reverse();

        builder.push_quad(transparent, texture, BlockSide::FRONT, front, true);
        builder.push_quad(transparent, texture, BlockSide::BACK, back, true);
    }
}

fn mesh_cuboid(
    input: &MeshInput,
    builder: &mut MeshBuilder,
    position: Point3<i32>,
    block: Block,
    min: [u8; 3],
    max: [u8; 3],
) {
    let origin = to_f32(position);
    let transparent = input.registry.properties(block).is_translucent();
    let sixteenths = |value: u8| value as f32 / 16.0;

    for side in BlockSide::all() {
        let d = side.axis();
        let flush = if side.is_positive() {
            max[d] == 16
        } else {
            min[d] == 0
        };
        if flush && input.occludes(position + side.normal()) {
            continue;
        }

        let quad = box_face(input, side, origin, |unit_corner| {
            let bounds: [f32; 3] = std::array::from_fn(|axis| {
                sixteenths(if unit_corner[axis] == 1 { max[axis] } else { min[axis] })
            });
            Vector3::from(bounds)
        });
        builder.push_quad(transparent, input.registry.texture(block, side), side, quad, true);
    }
}

/// Surface height of a liquid cell in `[0, 1]`.
fn liquid_height(input: &MeshInput, position: Point3<i32>, block: Block) -> Option<f32> {
    let here = input.block(position);
    if here.id != block.id {
        return None;
    }
    if input.block(position + Vector3::unit_y()).id == block.id {
        return Some(1.0);
    }
    let level = input.registry.variant(here) as f32;
    Some((LIQUID_LEVELS - 1.0 - level) / LIQUID_LEVELS)
}

fn mesh_liquid(input: &MeshInput, builder: &mut MeshBuilder, position: Point3<i32>, block: Block) {
    let origin = to_f32(position);

    // Top corner heights, indexed [x][z], averaged over the liquid cells sharing the corner.
    let mut heights = [[0.0f32; 2]; 2];
    for (cx, column) in heights.iter_mut().enumerate() {
        for (cz, height) in column.iter_mut().enumerate() {
            let mut sum = 0.0;
            let mut count = 0.0;
            for dx in [cx as i32 - 1, cx as i32] {
                for dz in [cz as i32 - 1, cz as i32] {
                    let cell = position + Vector3::new(dx, 0, dz);
                    if let Some(cell_height) = liquid_height(input, cell, block) {
                        sum += cell_height;
                        count += 1.0;
                    }
                }
            }
            *height = sum / count;
        }
    }

    for side in BlockSide::all() {
        let neighbor = input.block(position + side.normal());
        if neighbor.id == block.id || input.occludes(position + side.normal()) {
            continue;
        }
        let quad = box_face(input, side, origin, |unit_corner| {
            let y = if unit_corner[1] == 1 {
                heights[unit_corner[0] as usize][unit_corner[2] as usize]
            } else {
                0.0
            };
            Vector3::new(unit_corner[0] as f32, y, unit_corner[2] as f32)
        });
        builder.push_quad(true, input.registry.texture(block, side), side, quad, true);
    }
}

/// Instantiates the custom templates of every block of the chunk that has one.
pub fn custom_meshes(input: &MeshInput, builder: &mut MeshBuilder) {
    for z in 0..CHUNK_DIMENSION {
        for y in 0..CHUNK_DIMENSION {
            for x in 0..CHUNK_DIMENSION {
                let position = Point3::new(x, y, z);
                let block = input.block(position);
                if block.is_air() {
                    continue;
                }
                match input.registry.properties(block).custom_mesh {
                    None => {}
                    Some(CustomMesh::Cross) => mesh_cross(input, builder, position, block),
                    Some(CustomMesh::Cuboid { min, max }) => {
                        mesh_cuboid(input, builder, position, block, min, max)
                    }
                    Some(CustomMesh::Liquid) => mesh_liquid(input, builder, position, block),
                }
            }
        }
    }
}
