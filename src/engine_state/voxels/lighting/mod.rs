//! # Lighting Module
//!
//! Breadth-first flood fill of the two 4-bit light channels.
//!
//! ## Algorithm
//!
//! [`LightPropagator`] is a multi-source BFS. Every queued node `(p, level)` offers
//! `level - 1` to its six face neighbors; a neighbor accepts when it lies in the working
//! region, the offered level can still reach the region of interest, the neighbor lets light
//! through and the offered level beats what it stores. Accepted neighbors are queued again
//! until levels run out.
//!
//! Light storage and block permeability are caller-provided ([`LightAccess`] and a closure),
//! so the same propagator runs over the mesher's extended chunk buffer and over plain test
//! grids.
//!
//! ## Regions
//!
//! Meshing a chunk needs correct light on the chunk and on its one-voxel sampling shell.
//! Light from up to 15 voxels away can reach that shell, so the working region is the chunk
//! grown by a 15-voxel border ([`LightRegion::around_chunk`]). Propagation into the border
//! that could no longer reach the shell is cut short.

use std::collections::VecDeque;

use bitvec::prelude::BitVec;
use cgmath::{Point3, Vector3};

use super::block::Light;
use super::chunk::CHUNK_DIMENSION;

pub mod extended;

/// Maximum light level (0-15 range).
pub const MAX_LIGHT_LEVEL: u8 = Light::MAX_LEVEL;
/// Distance the working region extends past the chunk.
pub const LIGHT_BORDER: i32 = MAX_LIGHT_LEVEL as i32;
/// Distance the region of interest extends past the chunk.
pub const SAMPLING_SHELL: i32 = 1;

/// The six face directions, in `BlockSide` order.
pub fn face_directions() -> [Vector3<i32>; 6] {
    [
        Vector3::new(0, 0, 1),
        Vector3::new(0, 0, -1),
        Vector3::new(0, -1, 0),
        Vector3::new(0, 1, 0),
        Vector3::new(-1, 0, 0),
        Vector3::new(1, 0, 0),
    ]
}

/// Get/set access to one light channel.
pub trait LightAccess {
    fn get(&self, position: Point3<i32>) -> u8;
    fn set(&mut self, position: Point3<i32>, level: u8);
}

/// Working region of a propagation plus the box whose light the caller actually needs.
/// Both boxes are half-open.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LightRegion {
    min: Point3<i32>,
    max: Point3<i32>,
    interest_min: Point3<i32>,
    interest_max: Point3<i32>,
}

impl LightRegion {
    /// A region that is entirely of interest.
    pub fn new(min: Point3<i32>, max: Point3<i32>) -> Self {
        LightRegion {
            min,
            max,
            interest_min: min,
            interest_max: max,
        }
    }

    /// Restricts the region of interest. It must lie inside the working region.
    pub fn with_interest(self, interest_min: Point3<i32>, interest_max: Point3<i32>) -> Self {
        LightRegion {
            interest_min,
            interest_max,
            ..self
        }
    }

    /// `[-15, 31)³` with the sampling shell `[-1, 17)³` as the region of interest.
    pub fn around_chunk() -> Self {
        let low = -LIGHT_BORDER;
        let high = CHUNK_DIMENSION + LIGHT_BORDER;
        let shell_low = -SAMPLING_SHELL;
        let shell_high = CHUNK_DIMENSION + SAMPLING_SHELL;
        LightRegion::new(Point3::new(low, low, low), Point3::new(high, high, high)).with_interest(
            Point3::new(shell_low, shell_low, shell_low),
            Point3::new(shell_high, shell_high, shell_high),
        )
    }

    pub fn min(&self) -> Point3<i32> {
        self.min
    }

    pub fn max(&self) -> Point3<i32> {
        self.max
    }

    pub fn contains(&self, position: Point3<i32>) -> bool {
        (0..3).all(|axis| self.min[axis] <= position[axis] && position[axis] < self.max[axis])
    }

    /// Number of cells in the working region.
    pub fn volume(&self) -> usize {
        (0..3)
            .map(|axis| (self.max[axis] - self.min[axis]).max(0) as usize)
            .product()
    }

    /// Dense index of a position inside the working region, x fastest.
    pub fn index(&self, position: Point3<i32>) -> Option<usize> {
        if !self.contains(position) {
            return None;
        }
        let size_x = (self.max.x - self.min.x) as usize;
        let size_y = (self.max.y - self.min.y) as usize;
        let x = (position.x - self.min.x) as usize;
        let y = (position.y - self.min.y) as usize;
        let z = (position.z - self.min.z) as usize;
        Some(x + size_x * (y + size_y * z))
    }

    /// Manhattan distance from `position` to the region of interest; zero inside it.
    pub fn interest_distance(&self, position: Point3<i32>) -> i32 {
        (0..3)
            .map(|axis| {
                let below = self.interest_min[axis] - position[axis];
                let above = position[axis] - (self.interest_max[axis] - 1);
                below.max(above).max(0)
            })
            .sum()
    }

    /// Every position of the working region, x fastest.
    pub fn positions(&self) -> impl Iterator<Item = Point3<i32>> {
        let (min, max) = (self.min, self.max);
        (min.z..max.z).flat_map(move |z| {
            (min.y..max.y).flat_map(move |y| (min.x..max.x).map(move |x| Point3::new(x, y, z)))
        })
    }
}

/// Bounded BFS queue for light propagation within a region.
///
/// A position is queued at most once at a time and spreads whatever level is stored for it
/// when it is popped. The queue therefore never holds more nodes than the region has cells,
/// and its storage is allocated once at that size.
#[derive(Debug)]
pub struct LightPropagator {
    region: LightRegion,
    queue: VecDeque<Point3<i32>>,
    queued: BitVec,
}

impl LightPropagator {
    pub fn new(region: LightRegion) -> Self {
        let volume = region.volume();
        LightPropagator {
            region,
            queue: VecDeque::with_capacity(volume),
            queued: BitVec::repeat(false, volume),
        }
    }

    /// Most nodes the queue can hold.
    pub fn capacity(&self) -> usize {
        self.queued.len()
    }

    /// Number of queued nodes.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn region(&self) -> LightRegion {
        self.region
    }

    /// Stores `level` at `position` and queues it, if it beats the stored level.
    ///
    /// # Returns
    /// `true` if the seed was accepted.
    pub fn seed<A: LightAccess + ?Sized>(
        &mut self,
        light: &mut A,
        position: Point3<i32>,
        level: u8,
    ) -> bool {
        if level <= light.get(position) {
            return false;
        }
        light.set(position, level);
        self.enqueue(position);
        true
    }

    /// Queues a position whose level is already stored. Positions outside the working region
    /// and positions already queued are ignored.
    pub fn enqueue(&mut self, position: Point3<i32>) {
        let Some(index) = self.region.index(position) else {
            debug_assert!(false, "{position:?} is outside the light region");
            return;
        };
        if self.queued.replace(index, true) {
            return;
        }
        self.queue.push_back(position);
        debug_assert!(self.queue.len() <= self.capacity());
    }

    /// Drops every queued node.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.queued.fill(false);
    }

    /// Floods all queued light through positions for which `passes` holds.
    ///
    /// # Returns
    /// The number of nodes processed.
    pub fn propagate<A, F>(&mut self, light: &mut A, passes: F) -> usize
    where
        A: LightAccess + ?Sized,
        F: Fn(Point3<i32>) -> bool,
    {
        let directions = face_directions();
        let mut processed = 0;

        while let Some(position) = self.queue.pop_front() {
            if let Some(index) = self.region.index(position) {
                self.queued.set(index, false);
            }
            processed += 1;
            let level = light.get(position);
            if level <= 1 {
                continue;
            }
            let candidate = level - 1;

            for direction in directions {
                let neighbor = position + direction;
                if !self.region.contains(neighbor)
                    || candidate as i32 <= self.region.interest_distance(neighbor)
                    || !passes(neighbor)
                    || candidate <= light.get(neighbor)
                {
                    continue;
                }
                light.set(neighbor, candidate);
                if candidate > 1 {
                    self.enqueue(neighbor);
                }
            }
        }

        processed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: i32 = 12;

    /// Dense light grid over `[0, SIZE)³`.
    struct Grid {
        levels: Vec<u8>,
    }

    impl Grid {
        fn new() -> Self {
            Grid {
                levels: vec![0; (SIZE * SIZE * SIZE) as usize],
            }
        }

        fn index(position: Point3<i32>) -> usize {
            (position.x + SIZE * position.y + SIZE * SIZE * position.z) as usize
        }
    }

    impl LightAccess for Grid {
        fn get(&self, position: Point3<i32>) -> u8 {
            self.levels[Grid::index(position)]
        }

        fn set(&mut self, position: Point3<i32>, level: u8) {
            self.levels[Grid::index(position)] = level;
        }
    }

    fn region() -> LightRegion {
        LightRegion::new(Point3::new(0, 0, 0), Point3::new(SIZE, SIZE, SIZE))
    }

    /// Reference result: per seed, a plain BFS over path lengths.
    fn reference(seeds: &[(Point3<i32>, u8)], passes: &dyn Fn(Point3<i32>) -> bool) -> Vec<u8> {
        let region = region();
        let mut expected = Grid::new().levels;
        for &(seed, level) in seeds {
            let mut distance = vec![i32::MAX; expected.len()];
            let mut queue = VecDeque::from([seed]);
            distance[Grid::index(seed)] = 0;
            while let Some(position) = queue.pop_front() {
                let here = distance[Grid::index(position)];
                let value = level as i32 - here;
                if value <= 0 {
                    continue;
                }
                let slot = &mut expected[Grid::index(position)];
                *slot = (*slot).max(value as u8);
                for direction in face_directions() {
                    let next = position + direction;
                    if region.contains(next)
                        && passes(next)
                        && distance[Grid::index(next)] == i32::MAX
                    {
                        distance[Grid::index(next)] = here + 1;
                        queue.push_back(next);
                    }
                }
            }
        }
        expected
    }

    fn random_seeds(rng: &mut fastrand::Rng, count: usize) -> Vec<(Point3<i32>, u8)> {
        (0..count)
            .map(|_| {
                let position = Point3::new(rng.i32(0..SIZE), rng.i32(0..SIZE), rng.i32(0..SIZE));
                (position, rng.u8(2..=15))
            })
            .collect()
    }

    #[test]
    fn single_seed_decays_by_one_per_step() {
        let mut grid = Grid::new();
        let mut propagator = LightPropagator::new(region());
        assert!(propagator.seed(&mut grid, Point3::new(0, 0, 0), 5));
        propagator.propagate(&mut grid, |_| true);

        assert_eq!(grid.get(Point3::new(1, 0, 0)), 4);
        assert_eq!(grid.get(Point3::new(1, 1, 1)), 2);
        assert_eq!(grid.get(Point3::new(4, 0, 0)), 1);
        assert_eq!(grid.get(Point3::new(5, 0, 0)), 0);
    }

    #[test]
    fn walls_stop_light() {
        let mut grid = Grid::new();
        let mut propagator = LightPropagator::new(region());
        propagator.seed(&mut grid, Point3::new(2, 2, 2), 15);
        propagator.propagate(&mut grid, |p| p.x != 3);
        assert!((0..SIZE).all(|y| (0..SIZE).all(|z| grid.get(Point3::new(4, y, z)) == 0)));
    }

    #[test]
    fn weaker_seeds_are_rejected() {
        let mut grid = Grid::new();
        grid.set(Point3::new(1, 1, 1), 9);
        let mut propagator = LightPropagator::new(region());
        assert!(!propagator.seed(&mut grid, Point3::new(1, 1, 1), 9));
        assert_eq!(propagator.propagate(&mut grid, |_| true), 0);
    }

    #[test]
    fn queue_never_outgrows_the_region() {
        let mut rng = fastrand::Rng::with_seed(11);
        let mut grid = Grid::new();
        let mut propagator = LightPropagator::new(region());
        assert_eq!(propagator.capacity(), (SIZE * SIZE * SIZE) as usize);

        // Raising a queued cell again does not queue it twice.
        propagator.seed(&mut grid, Point3::new(4, 4, 4), 3);
        propagator.seed(&mut grid, Point3::new(4, 4, 4), 9);
        assert_eq!(propagator.pending(), 1);

        for level in 2..=15 {
            for position in region().positions() {
                if rng.bool() {
                    propagator.seed(&mut grid, position, level);
                }
            }
        }
        assert!(propagator.pending() <= propagator.capacity());
        propagator.propagate(&mut grid, |_| true);
        assert_eq!(propagator.pending(), 0);
        assert!(grid.get(Point3::new(4, 4, 4)) >= 9);
    }

    #[test]
    fn interest_border_cuts_hopeless_paths() {
        let region = LightRegion::new(Point3::new(0, 0, 0), Point3::new(SIZE, SIZE, SIZE))
            .with_interest(Point3::new(0, 0, 0), Point3::new(1, SIZE, SIZE));
        let mut grid = Grid::new();
        let mut propagator = LightPropagator::new(region);
        propagator.seed(&mut grid, Point3::new(3, 5, 5), 5);
        propagator.propagate(&mut grid, |_| true);

        // Moving away from the interest slab is pointless.
        assert_eq!(grid.get(Point3::new(4, 5, 5)), 0);
        // Moving towards it is kept, and reaches it.
        assert_eq!(grid.get(Point3::new(2, 5, 5)), 4);
        assert_eq!(grid.get(Point3::new(0, 5, 5)), 2);
        assert_eq!(region.interest_distance(Point3::new(3, 0, 0)), 3);
    }

    #[test]
    fn matches_reference_flood_on_random_grids() {
        let mut rng = fastrand::Rng::with_seed(0x5EED);
        for _ in 0..20 {
            let solid: Vec<bool> = (0..SIZE * SIZE * SIZE).map(|_| rng.u8(..) < 70).collect();
            let passes = |p: Point3<i32>| !solid[Grid::index(p)];
            let old_seeds = random_seeds(&mut rng, 3);
            let new_seeds = random_seeds(&mut rng, 3);

            let mut grid = Grid::new();
            let mut propagator = LightPropagator::new(region());
            for &(position, level) in &old_seeds {
                propagator.seed(&mut grid, position, level);
            }
            propagator.propagate(&mut grid, passes);
            let before = grid.levels.clone();

            for &(position, level) in &new_seeds {
                propagator.seed(&mut grid, position, level);
            }
            propagator.propagate(&mut grid, passes);

            let all_seeds: Vec<_> = old_seeds.iter().chain(&new_seeds).copied().collect();
            assert_eq!(grid.levels, reference(&all_seeds, &passes));
            assert!(grid.levels.iter().zip(&before).all(|(after, before)| after >= before));

            // Without new seeds another pass changes nothing.
            let settled = grid.levels.clone();
            for &(position, level) in &all_seeds {
                assert!(!propagator.seed(&mut grid, position, level));
            }
            propagator.propagate(&mut grid, passes);
            assert_eq!(grid.levels, settled);
        }
    }
}
