//! # Block Module
//!
//! Packed voxel values and the runtime block registry.
//!
//! A [`Block`] is two bytes: an id into the [`registry::BlockRegistry`] and a `meta` byte the
//! registry splits into *variant* bits (low bits) and *transform* bits (the rest), with the
//! split chosen per id. A [`Light`] packs the sunlight and torchlight channels into one byte.

use block_type::BlockType;

pub mod block_side;
pub mod block_type;
pub mod registry;
mod ticks;

/// The underlying integer type used to represent block ids in memory.
pub type BlockTypeSize = u8;

/// Represents a single voxel block in the world.
///
/// This is a lightweight structure that stores only the essential block data.
/// The actual block properties are looked up from the registry by id.
///
/// # Memory Layout
/// The `#[repr(C)]` attribute keeps the layout stable so block arrays can be copied as bytes
/// by persistence layers.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Block {
    /// Registry id of this block.
    pub id: BlockTypeSize,
    /// Variant and transform bits, interpreted per id by the registry.
    pub meta: u8,
}

impl Block {
    /// The empty block. Every chunk starts out filled with it.
    pub const AIR: Block = Block { id: 0, meta: 0 };

    /// Creates a new block of the specified type with zeroed meta bits.
    pub fn new(block_type: BlockType) -> Self {
        Block {
            id: block_type as BlockTypeSize,
            meta: 0,
        }
    }

    /// Creates a block of the specified type carrying the given meta byte.
    pub fn with_meta(block_type: BlockType, meta: u8) -> Self {
        Block {
            id: block_type as BlockTypeSize,
            meta,
        }
    }

    /// Returns `true` for the empty block.
    pub fn is_air(self) -> bool {
        self.id == Block::AIR.id
    }
}

/// A packed light value: sunlight in the high nibble, torchlight in the low nibble.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Light(pub u8);

impl Light {
    /// Highest level either channel can hold.
    pub const MAX_LEVEL: u8 = 15;

    /// Packs the two channels. Levels above [`Light::MAX_LEVEL`] are clamped.
    pub fn new(sunlight: u8, torchlight: u8) -> Self {
        let sunlight = sunlight.min(Self::MAX_LEVEL);
        let torchlight = torchlight.min(Self::MAX_LEVEL);
        Light((sunlight << 4) | torchlight)
    }

    /// Sky light level in `[0, 15]`.
    pub fn sunlight(self) -> u8 {
        self.0 >> 4
    }

    /// Block-emitted light level in `[0, 15]`.
    pub fn torchlight(self) -> u8 {
        self.0 & 0x0F
    }
}
