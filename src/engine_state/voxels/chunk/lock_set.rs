//! # Lock Set Module
//!
//! Statically typed, deadlock-free acquisition of chunk locks.
//!
//! A task declares *what* it needs through a [`LockMode`] (shared or exclusive access to the
//! blocks and/or sunlight heights) and *which* chunks through a fixed-size array. The
//! composer then acquires every block lock in ascending chunk-position order followed by
//! every sunlight lock in the same order. Because every task in the pipeline goes through
//! this one function, all threads agree on a single global lock order and no wait cycle can
//! form.
//!
//! Access is checked at compile time: `blocks_mut` only exists on lock sets whose mode holds
//! the block locks exclusively, `sunlight` only on modes that lock sunlight at all, and so on.
//!
//! ```ignore
//! let mut locks = acquire_locks::<BlockReadSunlightWrite, 2>([&chunk, &above]);
//! let height = locks.sunlight(1).get(0, 0);
//! locks.sunlight_mut(0).set(0, 0, height);
//! ```

use std::array;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{BlockArray, Chunk, SunlightHeights};
use crate::engine_state::voxels::coords::position_key;

/// How a single lock of a [`LockMode`] is held.
pub trait LockAccess {
    type Guard<'a, T: 'a>;

    fn acquire<'a, T: 'a>(lock: &'a RwLock<T>) -> Self::Guard<'a, T>;
}

/// Lock modes whose guard can be read through.
pub trait ReadAccess: LockAccess {
    fn view<'g, 'a: 'g, T: 'a>(guard: &'g Self::Guard<'a, T>) -> &'g T;
}

/// Lock modes whose guard can be written through.
pub trait WriteAccess: ReadAccess {
    fn view_mut<'g, 'a: 'g, T: 'a>(guard: &'g mut Self::Guard<'a, T>) -> &'g mut T;
}

/// The lock is not taken at all.
pub struct Unlocked;
/// The lock is held for reading.
pub struct Shared;
/// The lock is held for writing.
pub struct Exclusive;

impl LockAccess for Unlocked {
    type Guard<'a, T: 'a> = ();

    fn acquire<'a, T: 'a>(_lock: &'a RwLock<T>) -> Self::Guard<'a, T> {}
}

impl LockAccess for Shared {
    type Guard<'a, T: 'a> = RwLockReadGuard<'a, T>;

    fn acquire<'a, T: 'a>(lock: &'a RwLock<T>) -> Self::Guard<'a, T> {
        lock.read()
    }
}

impl ReadAccess for Shared {
    fn view<'g, 'a: 'g, T: 'a>(guard: &'g Self::Guard<'a, T>) -> &'g T {
        guard
    }
}

impl LockAccess for Exclusive {
    type Guard<'a, T: 'a> = RwLockWriteGuard<'a, T>;

    fn acquire<'a, T: 'a>(lock: &'a RwLock<T>) -> Self::Guard<'a, T> {
        lock.write()
    }
}

impl ReadAccess for Exclusive {
    fn view<'g, 'a: 'g, T: 'a>(guard: &'g Self::Guard<'a, T>) -> &'g T {
        guard
    }
}

impl WriteAccess for Exclusive {
    fn view_mut<'g, 'a: 'g, T: 'a>(guard: &'g mut Self::Guard<'a, T>) -> &'g mut T {
        guard
    }
}

/// Which chunk locks a task holds, and how.
pub trait LockMode {
    type Blocks: LockAccess;
    type Sunlight: LockAccess;
}

macro_rules! lock_modes {
    ($($(#[$doc:meta])* $name:ident => ($blocks:ty, $sunlight:ty);)*) => {
        $(
            $(#[$doc])*
            pub struct $name;

            impl LockMode for $name {
                type Blocks = $blocks;
                type Sunlight = $sunlight;
            }
        )*
    };
}

lock_modes! {
    /// Shared block access.
    BlockRead => (Shared, Unlocked);
    /// Exclusive block access.
    BlockWrite => (Exclusive, Unlocked);
    /// Shared sunlight access.
    SunlightRead => (Unlocked, Shared);
    /// Shared block and sunlight access.
    BlockReadSunlightRead => (Shared, Shared);
    /// Shared block access, exclusive sunlight access.
    BlockReadSunlightWrite => (Shared, Exclusive);
    /// Exclusive access to both.
    BlockWriteSunlightWrite => (Exclusive, Exclusive);
}

type BlockGuard<'a, M> = <<M as LockMode>::Blocks as LockAccess>::Guard<'a, BlockArray>;
type SunlightGuard<'a, M> = <<M as LockMode>::Sunlight as LockAccess>::Guard<'a, SunlightHeights>;

/// Guards over `N` chunks, held in the mode `M`. Dropping the set releases every lock.
pub struct LockSet<'a, M: LockMode, const N: usize> {
    chunks: [&'a Chunk; N],
    blocks: [BlockGuard<'a, M>; N],
    sunlight: [SunlightGuard<'a, M>; N],
}

/// Acquires the locks of `M` on every chunk of `chunks`.
///
/// Block locks are taken first, in ascending chunk-position order, then sunlight locks in the
/// same order. Guards are returned in the caller's order so index `i` of the set refers to
/// `chunks[i]`. The chunks must be pairwise distinct.
pub fn acquire_locks<'a, M: LockMode, const N: usize>(chunks: [&'a Chunk; N]) -> LockSet<'a, M, N> {
    let mut order: [usize; N] = array::from_fn(|index| index);
    order.sort_unstable_by_key(|&index| position_key(chunks[index].position()));
    debug_assert!(
        order
            .windows(2)
            .all(|pair| chunks[pair[0]].position() != chunks[pair[1]].position()),
        "a lock set may not contain the same chunk twice"
    );

    let mut blocks: [Option<BlockGuard<'a, M>>; N] = array::from_fn(|_| None);
    for &index in &order {
        blocks[index] = Some(M::Blocks::acquire(chunks[index].block_lock()));
    }
    let mut sunlight: [Option<SunlightGuard<'a, M>>; N] = array::from_fn(|_| None);
    for &index in &order {
        sunlight[index] = Some(M::Sunlight::acquire(chunks[index].sunlight_lock()));
    }

    LockSet {
        chunks,
        blocks: blocks.map(|guard| guard.unwrap_or_else(|| unreachable!("every slot is filled"))),
        sunlight: sunlight
            .map(|guard| guard.unwrap_or_else(|| unreachable!("every slot is filled"))),
    }
}

/// Single-chunk form of [`acquire_locks`].
pub fn lock_chunk<M: LockMode>(chunk: &Chunk) -> LockSet<'_, M, 1> {
    acquire_locks([chunk])
}

impl<'a, M: LockMode, const N: usize> LockSet<'a, M, N> {
    pub fn chunk(&self, index: usize) -> &'a Chunk {
        self.chunks[index]
    }

    pub fn len(&self) -> usize {
        N
    }

    pub fn is_empty(&self) -> bool {
        N == 0
    }
}

impl<M: LockMode, const N: usize> LockSet<'_, M, N>
where
    M::Blocks: ReadAccess,
{
    pub fn blocks(&self, index: usize) -> &BlockArray {
        M::Blocks::view(&self.blocks[index])
    }
}

impl<M: LockMode, const N: usize> LockSet<'_, M, N>
where
    M::Blocks: WriteAccess,
{
    pub fn blocks_mut(&mut self, index: usize) -> &mut BlockArray {
        M::Blocks::view_mut(&mut self.blocks[index])
    }
}

impl<M: LockMode, const N: usize> LockSet<'_, M, N>
where
    M::Sunlight: ReadAccess,
{
    pub fn sunlight(&self, index: usize) -> &SunlightHeights {
        M::Sunlight::view(&self.sunlight[index])
    }
}

impl<M: LockMode, const N: usize> LockSet<'_, M, N>
where
    M::Sunlight: WriteAccess,
{
    pub fn sunlight_mut(&mut self, index: usize) -> &mut SunlightHeights {
        M::Sunlight::view_mut(&mut self.sunlight[index])
    }
}

impl<M: LockMode, const N: usize> LockSet<'_, M, N>
where
    M::Blocks: ReadAccess,
    M::Sunlight: WriteAccess,
{
    /// Blocks and sunlight heights of the same chunk at once.
    pub fn blocks_and_sunlight_mut(&mut self, index: usize) -> (&BlockArray, &mut SunlightHeights) {
        (
            M::Blocks::view(&self.blocks[index]),
            M::Sunlight::view_mut(&mut self.sunlight[index]),
        )
    }
}

impl<M: LockMode, const N: usize> LockSet<'_, M, N>
where
    M::Blocks: WriteAccess,
    M::Sunlight: WriteAccess,
{
    /// Mutable blocks and sunlight heights of the same chunk at once.
    pub fn split_mut(&mut self, index: usize) -> (&mut BlockArray, &mut SunlightHeights) {
        (
            M::Blocks::view_mut(&mut self.blocks[index]),
            M::Sunlight::view_mut(&mut self.sunlight[index]),
        )
    }
}
