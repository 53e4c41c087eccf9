//! # Terrain Generation Module
//!
//! Fills freshly created chunks with blocks and initial sunlight heights.
//!
//! Generators are pure functions of the chunk position: the pipeline may call them from any
//! worker thread, in any order, and expects the same output every time. Heights written here
//! assume open sky above the chunk's topmost voxel; the pipeline corrects them once the chunk
//! above is known.

use std::sync::Arc;

use noise::{NoiseFn, Perlin};

use super::block::block_type::BlockType;
use super::block::Block;
use super::chunk::{BlockArray, SunlightHeights, CHUNK_DIMENSION, NO_SUNLIGHT};
use super::coords::{chunk_origin, ChunkPos};
use crate::core::config::GeneratorConfig;

/// Produces the initial contents of a chunk.
pub trait TerrainGenerator: Send + Sync {
    /// Writes the blocks and sunlight heights of the chunk at `position`.
    ///
    /// # Arguments
    /// * `position` - Chunk coordinates of the chunk being generated
    /// * `blocks` - All-air block storage to fill
    /// * `heights` - Sunlight heights to fill, one per column
    fn generate(&self, position: ChunkPos, blocks: &mut BlockArray, heights: &mut SunlightHeights);
}

impl<F> TerrainGenerator for F
where
    F: Fn(ChunkPos, &mut BlockArray, &mut SunlightHeights) + Send + Sync,
{
    fn generate(&self, position: ChunkPos, blocks: &mut BlockArray, heights: &mut SunlightHeights) {
        self(position, blocks, heights)
    }
}

/// Local sunlight height of a column whose topmost sun-blocking voxel sits at world `y =
/// surface - 1`.
fn local_height(surface: i32, origin_y: i32) -> u8 {
    (surface - origin_y).clamp(0, NO_SUNLIGHT as i32) as u8
}

/// Flat layers: grass at `ground_level - 1`, three dirt layers below, then stone.
#[derive(Clone, Debug)]
pub struct FlatGenerator {
    pub ground_level: i32,
}

impl FlatGenerator {
    pub fn new(ground_level: i32) -> Self {
        FlatGenerator { ground_level }
    }

    fn block_at(&self, y: i32) -> Block {
        let depth = self.ground_level - 1 - y;
        match depth {
            d if d < 0 => Block::AIR,
            0 => Block::new(BlockType::GRASS),
            1..=3 => Block::new(BlockType::DIRT),
            _ => Block::new(BlockType::STONE),
        }
    }
}

impl TerrainGenerator for FlatGenerator {
    fn generate(&self, position: ChunkPos, blocks: &mut BlockArray, heights: &mut SunlightHeights) {
        let origin = chunk_origin(position);
        for y in 0..CHUNK_DIMENSION {
            let block = self.block_at(origin.y + y);
            if block.is_air() {
                continue;
            }
            for z in 0..CHUNK_DIMENSION {
                for x in 0..CHUNK_DIMENSION {
                    blocks.set(cgmath::Point3::new(x, y, z), block);
                }
            }
        }
        *heights = SunlightHeights::filled(local_height(self.ground_level, origin.y));
    }
}

/// Perlin heightmap terrain with water up to `sea_level` and scattered tall grass.
pub struct NoiseGenerator {
    perlin: Perlin,
    seed: u32,
    base_height: i32,
    amplitude: f64,
    scale: f64,
    sea_level: i32,
}

impl NoiseGenerator {
    pub fn new(seed: u32, base_height: i32, amplitude: f64, scale: f64, sea_level: i32) -> Self {
        NoiseGenerator {
            perlin: Perlin::new(seed),
            seed,
            base_height,
            amplitude,
            scale,
            sea_level,
        }
    }

    /// World `y` of the first air voxel above the terrain surface of column `(x, z)`.
    pub fn surface_height(&self, x: i32, z: i32) -> i32 {
        let sample = self.perlin.get([x as f64 * self.scale, z as f64 * self.scale]);
        self.base_height + (sample * self.amplitude).round() as i32
    }

    fn column_rng(&self, x: i32, z: i32) -> fastrand::Rng {
        let hash = (x as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
            ^ (z as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F)
            ^ self.seed as u64;
        fastrand::Rng::with_seed(hash)
    }

    fn block_at(&self, y: i32, surface: i32, decorated: bool) -> Block {
        let top = surface - 1;
        let beach = top <= self.sea_level;
        if y > top {
            return if y < self.sea_level {
                Block::new(BlockType::WATER)
            } else if y == surface && decorated && !beach {
                Block::new(BlockType::TALL_GRASS)
            } else {
                Block::AIR
            };
        }
        match top - y {
            0 if beach => Block::new(BlockType::SAND),
            0 => Block::new(BlockType::GRASS),
            1..=3 if beach => Block::new(BlockType::SAND),
            1..=3 => Block::new(BlockType::DIRT),
            _ => Block::new(BlockType::STONE),
        }
    }
}

impl TerrainGenerator for NoiseGenerator {
    fn generate(&self, position: ChunkPos, blocks: &mut BlockArray, heights: &mut SunlightHeights) {
        let origin = chunk_origin(position);
        for z in 0..CHUNK_DIMENSION {
            for x in 0..CHUNK_DIMENSION {
                let world_x = origin.x + x;
                let world_z = origin.z + z;
                let surface = self.surface_height(world_x, world_z);
                let decorated = self.column_rng(world_x, world_z).u8(..) < 24;
                for y in 0..CHUNK_DIMENSION {
                    let block = self.block_at(origin.y + y, surface, decorated);
                    if !block.is_air() {
                        blocks.set(cgmath::Point3::new(x, y, z), block);
                    }
                }
                heights.set(x, z, local_height(surface, origin.y));
            }
        }
    }
}

/// Builds the generator a configuration names.
pub fn generator_from_config(config: &GeneratorConfig) -> Arc<dyn TerrainGenerator> {
    match *config {
        GeneratorConfig::Flat { ground_level } => Arc::new(FlatGenerator::new(ground_level)),
        GeneratorConfig::Noise {
            seed,
            base_height,
            amplitude,
            scale,
            sea_level,
        } => Arc::new(NoiseGenerator::new(seed, base_height, amplitude, scale, sea_level)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Point3;

    #[test]
    fn flat_generator_layers() {
        let generator = FlatGenerator::new(4);
        let mut blocks = BlockArray::default();
        let mut heights = SunlightHeights::default();
        generator.generate(Point3::new(0, 0, 0), &mut blocks, &mut heights);

        assert_eq!(blocks.get(Point3::new(0, 3, 0)), Block::new(BlockType::GRASS));
        assert_eq!(blocks.get(Point3::new(5, 0, 5)), Block::new(BlockType::DIRT));
        assert!(blocks.get(Point3::new(0, 4, 0)).is_air());
        assert_eq!(heights.get(7, 7), 4);

        let mut below = BlockArray::default();
        generator.generate(Point3::new(0, -1, 0), &mut below, &mut heights);
        assert_eq!(below.get(Point3::new(0, 15, 0)), Block::new(BlockType::STONE));
        assert_eq!(heights.get(0, 0), NO_SUNLIGHT);

        let mut above = BlockArray::default();
        generator.generate(Point3::new(0, 1, 0), &mut above, &mut heights);
        assert!(above.is_empty());
        assert_eq!(heights.get(0, 0), 0);
    }

    #[test]
    fn noise_generator_is_deterministic() {
        let generator = NoiseGenerator::new(7, 8, 6.0, 0.05, 4);
        let position = Point3::new(3, 0, -2);

        let mut first = BlockArray::default();
        let mut first_heights = SunlightHeights::default();
        generator.generate(position, &mut first, &mut first_heights);

        let mut second = BlockArray::default();
        let mut second_heights = SunlightHeights::default();
        generator.generate(position, &mut second, &mut second_heights);

        assert_eq!(first, second);
        assert_eq!(first_heights, second_heights);
    }

    #[test]
    fn closures_are_generators() {
        let generator = |_: ChunkPos, blocks: &mut BlockArray, heights: &mut SunlightHeights| {
            blocks.fill(Block::new(BlockType::STONE));
            *heights = SunlightHeights::filled(NO_SUNLIGHT);
        };
        let mut blocks = BlockArray::default();
        let mut heights = SunlightHeights::default();
        generator.generate(Point3::new(0, 0, 0), &mut blocks, &mut heights);
        assert!(!blocks.is_empty());
        assert_eq!(heights.get(3, 3), NO_SUNLIGHT);
    }
}
