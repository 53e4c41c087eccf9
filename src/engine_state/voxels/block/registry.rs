//! # Block Registry Module
//!
//! Runtime table mapping block ids to their behavior. Each entry is a small set of function
//! pointers so a host can register new blocks without touching the pipeline: property lookup,
//! per-side texture lookup and an optional tick handler.

use cgmath::Point3;

use super::block_side::BlockSide;
use super::block_type::BlockType;
use super::ticks;
use super::{Block, BlockTypeSize, Light};

/// How a block participates in rendering and face culling.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Transparency {
    /// Never rendered (air).
    Invisible,
    /// Rendered into the opaque buffer and hides neighboring faces.
    Opaque,
    /// Rendered into the transparent buffer; hides faces of the same id only.
    Transparent,
    /// Rendered into the transparent buffer with the liquid template.
    Liquid,
}

/// Non-cube geometry templates. Cuboid bounds are in sixteenths of a block.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CustomMesh {
    /// Two diagonal double-sided quads.
    Cross,
    /// Axis-aligned box inside the cell.
    Cuboid { min: [u8; 3], max: [u8; 3] },
    /// Liquid surface with corner heights derived from the flow level.
    Liquid,
}

/// Physical and optical properties of a block variant.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BlockProperties {
    pub transparency: Transparency,
    /// Bitmask of collision layers. Zero means passable.
    pub collision_mask: u8,
    /// Emitted torchlight level.
    pub light_level: u8,
    /// Whether indirect light may flood through this block.
    pub passes_light: bool,
    /// Whether this block stops direct sunlight in its column.
    pub blocks_sunlight: bool,
    pub custom_mesh: Option<CustomMesh>,
}

impl BlockProperties {
    /// Properties of the empty block.
    pub const AIR: BlockProperties = BlockProperties {
        transparency: Transparency::Invisible,
        collision_mask: 0,
        light_level: 0,
        passes_light: true,
        blocks_sunlight: false,
        custom_mesh: None,
    };

    /// A plain solid cube.
    pub const SOLID: BlockProperties = BlockProperties {
        transparency: Transparency::Opaque,
        collision_mask: 1,
        light_level: 0,
        passes_light: false,
        blocks_sunlight: true,
        custom_mesh: None,
    };

    /// Whether this block fully hides the faces behind it and counts for ambient occlusion.
    pub fn occludes(&self) -> bool {
        self.transparency == Transparency::Opaque && self.custom_mesh.is_none()
    }

    /// Whether geometry of this block goes into the transparent buffer.
    pub fn is_translucent(&self) -> bool {
        matches!(
            self.transparency,
            Transparency::Transparent | Transparency::Liquid
        )
    }
}

/// Read access to blocks around a ticking block, addressed relative to the origin of the
/// chunk that owns it.
pub struct TickContext<'a> {
    /// Position of the ticking block relative to its chunk origin.
    pub position: Point3<i32>,
    pub block: Block,
    pub registry: &'a BlockRegistry,
    pub lookup: &'a dyn Fn(Point3<i32>) -> Block,
}

impl TickContext<'_> {
    /// Block at a position relative to the ticking chunk's origin.
    pub fn block_at(&self, position: Point3<i32>) -> Block {
        (self.lookup)(position)
    }
}

pub type PropertiesFn = fn(variant: u8) -> BlockProperties;
pub type TextureFn = fn(variant: u8, side: BlockSide) -> u16;
/// Returns the blocks to write, as positions relative to the ticking chunk's origin.
pub type TickFn = fn(context: &TickContext) -> Vec<(Point3<i32>, Block)>;

/// Everything the pipeline needs to know about one block id.
#[derive(Copy, Clone)]
pub struct BlockBehavior {
    pub name: &'static str,
    /// How many low bits of `meta` select the variant; the rest are transform bits.
    pub variant_bits: u8,
    pub properties: PropertiesFn,
    pub texture: TextureFn,
    pub tick: Option<TickFn>,
}

impl BlockBehavior {
    /// A behavior with constant properties, one texture on every side and no tick.
    pub const fn simple(
        name: &'static str,
        properties: PropertiesFn,
        texture: TextureFn,
    ) -> Self {
        BlockBehavior {
            name,
            variant_bits: 0,
            properties,
            texture,
            tick: None,
        }
    }
}

impl std::fmt::Debug for BlockBehavior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockBehavior")
            .field("name", &self.name)
            .field("variant_bits", &self.variant_bits)
            .field("ticks", &self.tick.is_some())
            .finish()
    }
}

/// Id-indexed block behaviors. Unregistered ids behave like air.
#[derive(Debug, Clone)]
pub struct BlockRegistry {
    behaviors: Vec<Option<BlockBehavior>>,
}

fn air_properties(_variant: u8) -> BlockProperties {
    BlockProperties::AIR
}

fn no_texture(_variant: u8, _side: BlockSide) -> u16 {
    0
}

const AIR_BEHAVIOR: BlockBehavior = BlockBehavior::simple("air", air_properties, no_texture);

impl BlockRegistry {
    /// Creates a registry that only knows air at id 0.
    pub fn new() -> Self {
        let mut registry = BlockRegistry {
            behaviors: vec![None; BlockTypeSize::MAX as usize + 1],
        };
        registry.register(Block::AIR.id, AIR_BEHAVIOR);
        registry
    }

    /// Registers (or replaces) the behavior of an id.
    pub fn register(&mut self, id: BlockTypeSize, behavior: BlockBehavior) {
        self.behaviors[id as usize] = Some(behavior);
    }

    pub fn behavior(&self, block: Block) -> &BlockBehavior {
        self.behaviors[block.id as usize]
            .as_ref()
            .unwrap_or(&AIR_BEHAVIOR)
    }

    /// Extracts the variant bits of a block's meta byte.
    pub fn variant(&self, block: Block) -> u8 {
        let bits = self.behavior(block).variant_bits;
        if bits >= 8 {
            block.meta
        } else {
            block.meta & ((1u8 << bits) - 1)
        }
    }

    /// Extracts the transform bits of a block's meta byte.
    pub fn transform(&self, block: Block) -> u8 {
        let bits = self.behavior(block).variant_bits;
        if bits >= 8 {
            0
        } else {
            block.meta >> bits
        }
    }

    pub fn properties(&self, block: Block) -> BlockProperties {
        (self.behavior(block).properties)(self.variant(block))
    }

    pub fn texture(&self, block: Block, side: BlockSide) -> u16 {
        (self.behavior(block).texture)(self.variant(block), side)
    }

    pub fn tick_handler(&self, block: Block) -> Option<TickFn> {
        self.behavior(block).tick
    }

    pub fn is_tickable(&self, block: Block) -> bool {
        self.tick_handler(block).is_some()
    }

    /// The light a block emits, as a packed torchlight value.
    pub fn emitted_light(&self, block: Block) -> Light {
        Light::new(0, self.properties(block).light_level)
    }
}

impl Default for BlockRegistry {
    /// The built-in block set, indexed by [`BlockType`].
    fn default() -> Self {
        let mut registry = BlockRegistry::new();
        for (block_type, behavior) in default_behaviors() {
            registry.register(block_type.id(), behavior);
        }
        registry
    }
}

/// Texture indices of the built-in atlas.
pub mod textures {
    pub const STONE: u16 = 0;
    pub const DIRT: u16 = 1;
    pub const GRASS_SIDE: u16 = 2;
    pub const GRASS_TOP: u16 = 3;
    pub const SAND: u16 = 4;
    pub const GLASS: u16 = 5;
    pub const WATER: u16 = 6;
    pub const LEAVES: u16 = 7;
    pub const TORCH: u16 = 8;
    pub const TALL_GRASS: u16 = 9;
    pub const SLAB_SIDE: u16 = 10;
    pub const SLAB_TOP: u16 = 11;
}

fn default_behaviors() -> [(BlockType, BlockBehavior); BlockType::COUNT - 1] {
    [
        (
            BlockType::STONE,
            BlockBehavior::simple("stone", |_| BlockProperties::SOLID, |_, _| textures::STONE),
        ),
        (
            BlockType::DIRT,
            BlockBehavior::simple("dirt", |_| BlockProperties::SOLID, |_, _| textures::DIRT),
        ),
        (
            BlockType::GRASS,
            BlockBehavior::simple(
                "grass",
                |_| BlockProperties::SOLID,
                |_, side| match side {
                    BlockSide::TOP => textures::GRASS_TOP,
                    BlockSide::BOTTOM => textures::DIRT,
                    _ => textures::GRASS_SIDE,
                },
            ),
        ),
        (
            BlockType::SAND,
            BlockBehavior {
                tick: Some(ticks::falling_block),
                ..BlockBehavior::simple("sand", |_| BlockProperties::SOLID, |_, _| textures::SAND)
            },
        ),
        (
            BlockType::GLASS,
            BlockBehavior::simple(
                "glass",
                |_| BlockProperties {
                    transparency: Transparency::Transparent,
                    passes_light: true,
                    blocks_sunlight: false,
                    ..BlockProperties::SOLID
                },
                |_, _| textures::GLASS,
            ),
        ),
        (
            BlockType::WATER,
            BlockBehavior {
                name: "water",
                variant_bits: 3,
                properties: |_| BlockProperties {
                    transparency: Transparency::Liquid,
                    collision_mask: 0,
                    light_level: 0,
                    passes_light: true,
                    blocks_sunlight: false,
                    custom_mesh: Some(CustomMesh::Liquid),
                },
                texture: |_, _| textures::WATER,
                tick: Some(ticks::flowing_liquid),
            },
        ),
        (
            BlockType::LEAVES,
            BlockBehavior::simple(
                "leaves",
                |_| BlockProperties {
                    transparency: Transparency::Transparent,
                    passes_light: true,
                    ..BlockProperties::SOLID
                },
                |_, _| textures::LEAVES,
            ),
        ),
        (
            BlockType::TORCH,
            BlockBehavior::simple(
                "torch",
                |_| BlockProperties {
                    transparency: Transparency::Opaque,
                    collision_mask: 0,
                    light_level: 14,
                    passes_light: true,
                    blocks_sunlight: false,
                    custom_mesh: Some(CustomMesh::Cuboid {
                        min: [7, 0, 7],
                        max: [9, 10, 9],
                    }),
                },
                |_, _| textures::TORCH,
            ),
        ),
        (
            BlockType::TALL_GRASS,
            BlockBehavior::simple(
                "tall_grass",
                |_| BlockProperties {
                    transparency: Transparency::Opaque,
                    collision_mask: 0,
                    light_level: 0,
                    passes_light: true,
                    blocks_sunlight: false,
                    custom_mesh: Some(CustomMesh::Cross),
                },
                |_, _| textures::TALL_GRASS,
            ),
        ),
        (
            BlockType::SLAB,
            BlockBehavior::simple(
                "slab",
                |_| BlockProperties {
                    passes_light: true,
                    custom_mesh: Some(CustomMesh::Cuboid {
                        min: [0, 0, 0],
                        max: [16, 8, 16],
                    }),
                    ..BlockProperties::SOLID
                },
                |_, side| match side {
                    BlockSide::TOP | BlockSide::BOTTOM => textures::SLAB_TOP,
                    _ => textures::SLAB_SIDE,
                },
            ),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_ids_behave_like_air() {
        let registry = BlockRegistry::default();
        let unknown = Block { id: 200, meta: 0 };
        assert_eq!(registry.properties(unknown), BlockProperties::AIR);
        assert!(!registry.is_tickable(unknown));
    }

    #[test]
    fn meta_splits_into_variant_and_transform() {
        let registry = BlockRegistry::default();
        let water = Block::with_meta(BlockType::WATER, 0b1010_1101);
        assert_eq!(registry.variant(water), 0b101);
        assert_eq!(registry.transform(water), 0b1_0101);

        let stone = Block::with_meta(BlockType::STONE, 0b11);
        assert_eq!(registry.variant(stone), 0);
        assert_eq!(registry.transform(stone), 0b11);
    }

    #[test]
    fn built_in_optics() {
        let registry = BlockRegistry::default();
        let props = |block_type| registry.properties(Block::new(block_type));

        assert!(props(BlockType::STONE).occludes());
        assert!(!props(BlockType::GLASS).occludes());
        assert!(props(BlockType::GLASS).passes_light);
        assert!(props(BlockType::LEAVES).blocks_sunlight);
        assert!(!props(BlockType::TALL_GRASS).occludes());
        assert_eq!(props(BlockType::TORCH).light_level, 14);
        assert!(registry.is_tickable(Block::new(BlockType::SAND)));
        assert_eq!(
            registry.texture(Block::new(BlockType::GRASS), BlockSide::TOP),
            textures::GRASS_TOP
        );
    }

    #[test]
    fn registering_replaces_behavior() {
        let mut registry = BlockRegistry::default();
        registry.register(
            BlockType::STONE.id(),
            BlockBehavior::simple(
                "glowstone",
                |_| BlockProperties {
                    light_level: 15,
                    ..BlockProperties::SOLID
                },
                |_, _| 42,
            ),
        );
        let stone = Block::new(BlockType::STONE);
        assert_eq!(registry.emitted_light(stone).torchlight(), 15);
        assert_eq!(registry.texture(stone, BlockSide::LEFT), 42);
    }
}
