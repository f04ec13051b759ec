use std::num::NonZero;

use foldhash::{HashMap, HashMapExt};
use tracing::debug;

use crate::{BlockLayout, BlockPool, DropPolicy, Error, POINTER_WIDTH, Result};

/// Owns one [`BlockPool`] per size class, creating pools on demand.
///
/// A size class is a block size in bytes. Requests smaller than a pointer are served from the
/// pointer-sized class because every block must be able to hold a free list link while free
/// (see [`size_class_of()`][Self::size_class_of]).
///
/// Pools are created either explicitly through [`ensure_pool()`][Self::ensure_pool] or by the
/// allocator on the first allocation of a new size. They are never removed individually; all of
/// them are released when the registry is dropped.
///
/// Looking up a pool to free a block never creates one. Freeing a block of a size class that
/// has no pool is reported as [`Error::UnknownSizeClass`].
///
/// # Thread safety
///
/// The registry is thread-mobile ([`Send`]) but not thread-safe ([`Sync`]).
#[derive(Debug)]
pub struct SizeClassRegistry {
    /// Pools keyed by block size.
    /// We use foldhash for better performance with small hash tables.
    pools: HashMap<usize, BlockPool>,

    /// Number of blocks reserved for every new pool.
    blocks_per_pool: NonZero<usize>,

    /// Applied to every pool the registry creates.
    drop_policy: DropPolicy,
}

impl SizeClassRegistry {
    /// Creates an empty registry whose pools will each hold `blocks_per_pool` blocks.
    #[must_use]
    pub fn new(blocks_per_pool: NonZero<usize>, drop_policy: DropPolicy) -> Self {
        Self {
            pools: HashMap::new(),
            blocks_per_pool,
            drop_policy,
        }
    }

    /// The size class that serves requests of `size` bytes.
    ///
    /// This is `size` itself, unless `size` is smaller than a pointer, in which case it is the
    /// size of a pointer.
    ///
    /// # Examples
    ///
    /// ```
    /// use class_pool::SizeClassRegistry;
    ///
    /// assert_eq!(SizeClassRegistry::size_class_of(24).get(), 24);
    /// assert_eq!(
    ///     SizeClassRegistry::size_class_of(1).get(),
    ///     size_of::<usize>()
    /// );
    /// ```
    #[must_use]
    pub fn size_class_of(size: usize) -> NonZero<usize> {
        NonZero::new(size.max(POINTER_WIDTH)).expect("pointer width is never zero")
    }

    /// Number of blocks reserved for every pool.
    #[must_use]
    pub fn blocks_per_pool(&self) -> NonZero<usize> {
        self.blocks_per_pool
    }

    /// Returns the pool serving `size`, creating it first if the size class has no pool yet.
    pub fn ensure_pool(&mut self, size: usize) -> &mut BlockPool {
        let size_class = Self::size_class_of(size);
        let blocks_per_pool = self.blocks_per_pool;
        let drop_policy = self.drop_policy;

        self.pools.entry(size_class.get()).or_insert_with(|| {
            debug!(
                size_class = size_class.get(),
                requested_size = size,
                "first use of size class"
            );

            BlockPool::new(BlockLayout::new(size_class, blocks_per_pool), drop_policy)
        })
    }

    /// Returns the existing pool serving `size`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSizeClass`] if no pool was ever created for the size class. The
    /// registry is not modified.
    pub fn lookup_pool(&mut self, size: usize) -> Result<&mut BlockPool> {
        let size_class = Self::size_class_of(size).get();

        self.pools
            .get_mut(&size_class)
            .ok_or(Error::UnknownSizeClass { size: size_class })
    }

    /// Returns the existing pool serving `size`, if there is one.
    #[must_use]
    pub fn pool(&self, size: usize) -> Option<&BlockPool> {
        self.pools.get(&Self::size_class_of(size).get())
    }

    /// The size classes that currently have a pool, in ascending order.
    #[must_use]
    pub fn size_classes(&self) -> Vec<usize> {
        let mut size_classes = self.pools.keys().copied().collect::<Vec<_>>();
        size_classes.sort_unstable();
        size_classes
    }

    /// Number of pools in the registry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pools.len()
    }

    /// Whether the registry has no pools.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Total number of allocated blocks across all pools.
    #[must_use]
    pub fn allocated_blocks(&self) -> usize {
        self.pools.values().map(BlockPool::len).sum()
    }

    /// Runs [`BlockPool::integrity_check()`] on every pool.
    ///
    /// # Panics
    ///
    /// Panics if the bookkeeping of any pool is inconsistent.
    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    pub fn integrity_check(&self) {
        for pool in self.pools.values() {
            pool.integrity_check();
        }
    }
}
