//! # Block Type Module
//!
//! Ids of the blocks the default registry ships with. Custom registries are free to use
//! any other ids; these exist so terrain generators, tick handlers and tests can name the
//! built-in blocks.

use num_derive::FromPrimitive;

use super::BlockTypeSize;

/// Enumerates the block types of the default registry.
///
/// The `FromPrimitive` derive allows conversion back from a raw block id.
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, FromPrimitive)]
pub enum BlockType {
    /// An air block, which is non-solid and invisible.
    AIR,
    /// Plain opaque rock.
    STONE,
    /// A basic dirt block.
    DIRT,
    /// A grass block with different textures on top and sides.
    GRASS,
    /// Opaque, but falls when the block below is air or liquid.
    SAND,
    /// A transparent cube; faces between two glass blocks are culled.
    GLASS,
    /// Liquid whose variant bits hold the flow level (0 = full, 7 = thinnest).
    WATER,
    /// Transparent foliage cube that still casts a sunlight shadow.
    LEAVES,
    /// Thin emissive pillar.
    TORCH,
    /// Cross-shaped foliage.
    TALL_GRASS,
    /// Lower half cuboid.
    SLAB,
}

impl BlockType {
    /// Number of built-in block types.
    pub const COUNT: usize = 11;

    /// Converts a raw id back into a built-in block type, if it is one.
    pub fn from_id(id: BlockTypeSize) -> Option<Self> {
        num_traits::FromPrimitive::from_u8(id)
    }

    /// Returns the raw id of this block type.
    pub fn id(self) -> BlockTypeSize {
        self as BlockTypeSize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_through_from_primitive() {
        assert_eq!(BlockType::from_id(BlockType::TORCH.id()), Some(BlockType::TORCH));
        assert_eq!(BlockType::from_id(BlockType::TALL_GRASS.id()), Some(BlockType::TALL_GRASS));
        assert_eq!(BlockType::from_id(BlockType::COUNT as u8), None);
    }
}
