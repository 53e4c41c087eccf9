//! # Block Side Module
//!
//! This module defines the different faces/sides of a voxel block, together with the
//! axis bookkeeping the mesher and the light propagator need to walk across them.

use cgmath::Vector3;
use num_derive::FromPrimitive;

/// Represents the six possible faces of a voxel block.
///
/// Each variant is assigned a unique integer value so it can index per-side tables
/// (textures, face-neighbor arrays).
///
/// The order is: [FRONT, BACK, BOTTOM, TOP, LEFT, RIGHT]
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug, FromPrimitive)]
pub enum BlockSide {
    /// The front face (facing positive Z)
    FRONT = 0,

    /// The back face (facing negative Z)
    BACK = 1,

    /// The bottom face (facing negative Y)
    BOTTOM = 2,

    /// The top face (facing positive Y)
    TOP = 3,

    /// The left face (facing negative X)
    LEFT = 4,

    /// The right face (facing positive X)
    RIGHT = 5,
}

impl BlockSide {
    /// Returns an array containing all six block faces in a consistent order.
    pub fn all() -> [BlockSide; 6] {
        [
            BlockSide::FRONT,
            BlockSide::BACK,
            BlockSide::BOTTOM,
            BlockSide::TOP,
            BlockSide::LEFT,
            BlockSide::RIGHT,
        ]
    }

    /// The axis this side is perpendicular to (0 = x, 1 = y, 2 = z).
    pub fn axis(self) -> usize {
        match self {
            BlockSide::LEFT | BlockSide::RIGHT => 0,
            BlockSide::BOTTOM | BlockSide::TOP => 1,
            BlockSide::BACK | BlockSide::FRONT => 2,
        }
    }

    /// Whether the outward normal points along the positive axis.
    pub fn is_positive(self) -> bool {
        matches!(self, BlockSide::RIGHT | BlockSide::TOP | BlockSide::FRONT)
    }

    /// Normal axis followed by the two in-plane axes `(d, u, v)`.
    ///
    /// The in-plane axes are cyclic so that `e_u × e_v = e_d`, which keeps quad winding
    /// consistent for every side.
    pub fn axes(self) -> (usize, usize, usize) {
        let d = self.axis();
        (d, (d + 1) % 3, (d + 2) % 3)
    }

    /// Unit outward normal.
    pub fn normal(self) -> Vector3<i32> {
        let mut normal = [0; 3];
        normal[self.axis()] = if self.is_positive() { 1 } else { -1 };
        Vector3::new(normal[0], normal[1], normal[2])
    }

    /// The side facing the opposite way.
    pub fn opposite(self) -> BlockSide {
        match self {
            BlockSide::FRONT => BlockSide::BACK,
            BlockSide::BACK => BlockSide::FRONT,
            BlockSide::BOTTOM => BlockSide::TOP,
            BlockSide::TOP => BlockSide::BOTTOM,
            BlockSide::LEFT => BlockSide::RIGHT,
            BlockSide::RIGHT => BlockSide::LEFT,
        }
    }

    /// Maps a unit axis offset back to the side it points through.
    pub fn from_normal(normal: Vector3<i32>) -> Option<BlockSide> {
        BlockSide::all()
            .into_iter()
            .find(|side| side.normal() == normal)
    }

    /// Converts a table index back into a side.
    pub fn from_index(index: usize) -> Option<BlockSide> {
        num_traits::FromPrimitive::from_usize(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Zero;

    #[test]
    fn in_plane_axes_are_right_handed() {
        for side in BlockSide::all() {
            let (d, u, v) = side.axes();
            let mut e_u = Vector3::zero();
            let mut e_v = Vector3::zero();
            e_u[u] = 1;
            e_v[v] = 1;
            let mut e_d = Vector3::zero();
            e_d[d] = 1;
            assert_eq!(e_u.cross(e_v), e_d, "{side:?}");
        }
    }

    #[test]
    fn normals_round_trip() {
        for side in BlockSide::all() {
            assert_eq!(BlockSide::from_normal(side.normal()), Some(side));
            assert_eq!(side.opposite().normal(), -side.normal());
            assert_eq!(BlockSide::from_index(side as usize), Some(side));
        }
    }
}
