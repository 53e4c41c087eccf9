//! Light buffer covering a chunk and its 15-voxel border, computed from a locked
//! 27-chunk neighborhood.

use bitvec::prelude::BitVec;
use cgmath::Point3;

use super::{face_directions, LightAccess, LightPropagator, LightRegion, LIGHT_BORDER, MAX_LIGHT_LEVEL};
use crate::engine_state::voxels::block::registry::BlockRegistry;
use crate::engine_state::voxels::block::Light;
use crate::engine_state::voxels::chunk::lock_set::{LockMode, LockSet, ReadAccess};
use crate::engine_state::voxels::chunk::CHUNK_DIMENSION;
use crate::engine_state::voxels::coords::NEIGHBORHOOD_SIZE;

/// Edge length of the extended buffer.
pub const EXTENDED_DIMENSION: i32 = CHUNK_DIMENSION + 2 * LIGHT_BORDER;
const EXTENDED_VOLUME: usize = (EXTENDED_DIMENSION * EXTENDED_DIMENSION * EXTENDED_DIMENSION) as usize;

fn extended_index(position: Point3<i32>) -> Option<usize> {
    let x = position.x + LIGHT_BORDER;
    let y = position.y + LIGHT_BORDER;
    let z = position.z + LIGHT_BORDER;
    let range = 0..EXTENDED_DIMENSION;
    if range.contains(&x) && range.contains(&y) && range.contains(&z) {
        Some((x + EXTENDED_DIMENSION * (y + EXTENDED_DIMENSION * z)) as usize)
    } else {
        None
    }
}

/// One light channel over `[-15, 31)³`, addressed relative to the chunk origin.
/// Positions outside read as dark.
#[derive(Clone, Debug)]
pub struct LightChannel {
    levels: Box<[u8]>,
}

impl LightChannel {
    pub fn new() -> Self {
        LightChannel {
            levels: vec![0; EXTENDED_VOLUME].into_boxed_slice(),
        }
    }

    pub fn clear(&mut self) {
        self.levels.fill(0);
    }
}

impl Default for LightChannel {
    fn default() -> Self {
        LightChannel::new()
    }
}

impl LightAccess for LightChannel {
    fn get(&self, position: Point3<i32>) -> u8 {
        extended_index(position).map_or(0, |index| self.levels[index])
    }

    fn set(&mut self, position: Point3<i32>, level: u8) {
        match extended_index(position) {
            Some(index) => self.levels[index] = level,
            None => debug_assert!(false, "{position:?} is outside the light buffer"),
        }
    }
}

/// Sunlight and torchlight around one chunk, plus the scratch state used to compute them.
pub struct ExtendedLight {
    pub sunlight: LightChannel,
    pub torchlight: LightChannel,
    passes: BitVec,
    sun_propagator: LightPropagator,
    torch_propagator: LightPropagator,
}

impl ExtendedLight {
    pub fn new() -> Self {
        let region = LightRegion::around_chunk();
        ExtendedLight {
            sunlight: LightChannel::new(),
            torchlight: LightChannel::new(),
            passes: BitVec::repeat(false, EXTENDED_VOLUME),
            sun_propagator: LightPropagator::new(region),
            torch_propagator: LightPropagator::new(region),
        }
    }

    /// Packed light at a position relative to the chunk origin.
    pub fn light_at(&self, position: Point3<i32>) -> Light {
        Light::new(self.sunlight.get(position), self.torchlight.get(position))
    }

    /// Whether indirect light passes the block at `position`, as of the last computation.
    pub fn passes_at(&self, position: Point3<i32>) -> bool {
        extended_index(position).is_some_and(|index| self.passes[index])
    }

    /// Recomputes both channels for the center chunk of a locked neighborhood.
    ///
    /// Sunlit cells (at or above their column's sunlight height) that let light through start
    /// at full brightness. Only the ones bordering darker passable cells are queued, since the
    /// flood from any other sunlit cell would be rejected everywhere. Emitting blocks seed
    /// torchlight at their own position.
    ///
    /// # Returns
    /// The number of BFS nodes processed over both channels.
    pub fn compute<M: LockMode>(
        &mut self,
        locks: &LockSet<'_, M, NEIGHBORHOOD_SIZE>,
        registry: &BlockRegistry,
    ) -> usize
    where
        M::Blocks: ReadAccess,
        M::Sunlight: ReadAccess,
    {
        self.sunlight.clear();
        self.torchlight.clear();
        self.sun_propagator.clear();
        self.torch_propagator.clear();

        let region = LightRegion::around_chunk();
        for position in region.positions() {
            let block = locks.block_relative(position);
            let properties = registry.properties(block);
            let index = extended_index(position).unwrap_or_else(|| unreachable!());
            self.passes.set(index, properties.passes_light);

            if properties.light_level > 0 {
                self.torch_propagator
                    .seed(&mut self.torchlight, position, properties.light_level);
            }
            if properties.passes_light && locks.is_sunlit_relative(position) {
                self.sunlight.set(position, MAX_LIGHT_LEVEL);
            }
        }

        for position in region.positions() {
            if self.sunlight.get(position) < MAX_LIGHT_LEVEL {
                continue;
            }
            let borders_shade = face_directions().into_iter().any(|direction| {
                let neighbor = position + direction;
                self.passes_at(neighbor) && self.sunlight.get(neighbor) < MAX_LIGHT_LEVEL
            });
            if borders_shade {
                self.sun_propagator.enqueue(position);
            }
        }

        let passes = &self.passes;
        let passes_at =
            |position: Point3<i32>| extended_index(position).is_some_and(|index| passes[index]);
        self.sun_propagator.propagate(&mut self.sunlight, passes_at)
            + self.torch_propagator.propagate(&mut self.torchlight, passes_at)
    }
}

impl Default for ExtendedLight {
    fn default() -> Self {
        ExtendedLight::new()
    }
}
