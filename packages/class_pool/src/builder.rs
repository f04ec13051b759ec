use std::cell::Cell;
use std::marker::PhantomData;
use std::num::NonZero;

use new_zealand::nz;

use crate::{DropPolicy, PoolAllocator};

/// Number of blocks in every pool unless configured otherwise.
pub(crate) const DEFAULT_BLOCKS_PER_POOL: NonZero<usize> = nz!(10);

/// Size classes that get a pool as soon as the allocator is built: 8, 16 and 32 bytes.
pub(crate) const DEFAULT_SIZE_CLASSES: [usize; 3] = [8, 16, 32];

/// Builder for creating an instance of [`PoolAllocator`].
///
/// You only need to use this builder if you want to customize the allocator configuration.
/// The default configuration used by [`PoolAllocator::new()`][1] reserves 10 blocks per pool and
/// creates pools for the 8, 16 and 32 byte size classes up front.
///
/// # Examples
///
/// ```
/// use class_pool::{DropPolicy, PoolAllocator};
/// use new_zealand::nz;
///
/// let allocator = PoolAllocator::builder()
///     .blocks_per_pool(nz!(1000))
///     .default_size_classes([16, 24, 48])
///     .drop_policy(DropPolicy::MustNotDropAllocatedBlocks)
///     .build();
///
/// assert_eq!(allocator.registry().size_classes(), vec![16, 24, 48]);
/// ```
///
/// # Thread safety
///
/// The builder is thread-mobile ([`Send`]) and can be safely transferred between threads,
/// allowing allocator configuration to happen on different threads than where it is used.
/// However, it is not thread-safe ([`Sync`]) as it contains mutable configuration state.
///
/// [1]: PoolAllocator::new
#[derive(Debug)]
#[must_use]
pub struct PoolAllocatorBuilder {
    blocks_per_pool: NonZero<usize>,
    default_size_classes: Vec<usize>,
    drop_policy: DropPolicy,

    // Prevents Sync while allowing Send - builders are thread-mobile but not thread-safe
    _not_sync: PhantomData<Cell<()>>,
}

impl PoolAllocatorBuilder {
    #[inline]
    pub(crate) fn new() -> Self {
        Self {
            blocks_per_pool: DEFAULT_BLOCKS_PER_POOL,
            default_size_classes: DEFAULT_SIZE_CLASSES.to_vec(),
            drop_policy: DropPolicy::default(),
            _not_sync: PhantomData,
        }
    }

    /// Sets the number of blocks reserved for every pool, including pools created later on
    /// first use of a new size class. Pools never grow beyond this.
    ///
    /// # Examples
    ///
    /// ```
    /// use class_pool::PoolAllocator;
    /// use new_zealand::nz;
    ///
    /// let allocator = PoolAllocator::builder().blocks_per_pool(nz!(100)).build();
    /// ```
    #[inline]
    pub fn blocks_per_pool(mut self, blocks_per_pool: NonZero<usize>) -> Self {
        self.blocks_per_pool = blocks_per_pool;
        self
    }

    /// Sets the size classes whose pools are created when the allocator is built. Any other
    /// size class gets its pool on first allocation.
    ///
    /// Sizes smaller than a pointer are rounded up to the pointer size. Passing an empty list
    /// means no pool is created up front.
    ///
    /// # Examples
    ///
    /// ```
    /// use class_pool::PoolAllocator;
    ///
    /// let allocator = PoolAllocator::builder()
    ///     .default_size_classes([])
    ///     .build();
    ///
    /// assert!(allocator.registry().is_empty());
    /// ```
    #[inline]
    pub fn default_size_classes(mut self, sizes: impl IntoIterator<Item = usize>) -> Self {
        self.default_size_classes = sizes.into_iter().collect();
        self
    }

    /// Sets the [drop policy][DropPolicy] for every pool. This governs how to treat blocks
    /// that are still allocated when the allocator is dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use class_pool::{DropPolicy, PoolAllocator};
    ///
    /// let allocator = PoolAllocator::builder()
    ///     .drop_policy(DropPolicy::MustNotDropAllocatedBlocks)
    ///     .build();
    /// ```
    #[inline]
    pub fn drop_policy(mut self, policy: DropPolicy) -> Self {
        self.drop_policy = policy;
        self
    }

    /// Builds the allocator, creating the pools for the default size classes.
    ///
    /// # Examples
    ///
    /// ```
    /// use class_pool::PoolAllocator;
    ///
    /// let allocator = PoolAllocator::builder().build();
    ///
    /// assert_eq!(allocator.registry().size_classes(), vec![8, 16, 32]);
    /// ```
    #[inline]
    #[must_use]
    pub fn build(self) -> PoolAllocator {
        PoolAllocator::new_inner(
            self.blocks_per_pool,
            &self.default_size_classes,
            self.drop_policy,
        )
    }
}
