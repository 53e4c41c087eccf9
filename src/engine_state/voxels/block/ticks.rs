//! Tick handlers of the built-in blocks.

use cgmath::{Point3, Vector3};

use super::block_type::BlockType;
use super::registry::{TickContext, Transparency};
use super::Block;

/// Deepest flow level a liquid spreads to sideways.
pub const MAX_FLOW_LEVEL: u8 = 7;

fn horizontal_offsets() -> [Vector3<i32>; 4] {
    [
        Vector3::new(1, 0, 0),
        Vector3::new(-1, 0, 0),
        Vector3::new(0, 0, 1),
        Vector3::new(0, 0, -1),
    ]
}

fn is_displaceable(context: &TickContext, block: Block) -> bool {
    block.is_air()
        || context.registry.properties(block).transparency == Transparency::Liquid
}

/// Swaps the block with the one below while that one is air or liquid.
pub fn falling_block(context: &TickContext) -> Vec<(Point3<i32>, Block)> {
    let below = context.position - Vector3::unit_y();
    let under = context.block_at(below);
    if is_displaceable(context, under) {
        vec![(context.position, under), (below, context.block)]
    } else {
        Vec::new()
    }
}

/// Flows down into air, otherwise spreads sideways one level thinner.
pub fn flowing_liquid(context: &TickContext) -> Vec<(Point3<i32>, Block)> {
    let level = context.registry.variant(context.block);
    let below = context.position - Vector3::unit_y();
    if context.block_at(below).is_air() {
        return vec![(below, context.block)];
    }
    if level >= MAX_FLOW_LEVEL {
        return Vec::new();
    }

    let thinner = Block::with_meta(BlockType::WATER, level + 1);
    horizontal_offsets()
        .into_iter()
        .map(|offset| context.position + offset)
        .filter(|position| context.block_at(*position).is_air())
        .map(|position| (position, thinner))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::block::registry::BlockRegistry;
    use std::collections::HashMap;

    fn run(
        handler: fn(&TickContext) -> Vec<(Point3<i32>, Block)>,
        position: Point3<i32>,
        world: &HashMap<Point3<i32>, Block>,
    ) -> Vec<(Point3<i32>, Block)> {
        let registry = BlockRegistry::default();
        let lookup = |p: Point3<i32>| world.get(&p).copied().unwrap_or(Block::AIR);
        let context = TickContext {
            position,
            block: lookup(position),
            registry: &registry,
            lookup: &lookup,
        };
        handler(&context)
    }

    #[test]
    fn sand_falls_into_air_and_sinks_through_water() {
        let sand = Block::new(BlockType::SAND);
        let water = Block::new(BlockType::WATER);
        let at = Point3::new(4, 4, 4);
        let below = Point3::new(4, 3, 4);

        let world = HashMap::from([(at, sand)]);
        assert_eq!(
            run(falling_block, at, &world),
            vec![(at, Block::AIR), (below, sand)]
        );

        let world = HashMap::from([(at, sand), (below, water)]);
        assert_eq!(run(falling_block, at, &world), vec![(at, water), (below, sand)]);

        let world = HashMap::from([(at, sand), (below, Block::new(BlockType::STONE))]);
        assert!(run(falling_block, at, &world).is_empty());
    }

    #[test]
    fn water_spreads_until_the_last_level() {
        let at = Point3::new(1, 1, 1);
        let floor = Point3::new(1, 0, 1);
        let stone = Block::new(BlockType::STONE);

        let world = HashMap::from([(at, Block::new(BlockType::WATER)), (floor, stone)]);
        let flows = run(flowing_liquid, at, &world);
        assert_eq!(flows.len(), 4);
        assert!(flows
            .iter()
            .all(|(_, block)| *block == Block::with_meta(BlockType::WATER, 1)));

        let world = HashMap::from([
            (at, Block::with_meta(BlockType::WATER, MAX_FLOW_LEVEL)),
            (floor, stone),
        ]);
        assert!(run(flowing_liquid, at, &world).is_empty());
    }
}
