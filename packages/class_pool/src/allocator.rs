use std::any::type_name;
use std::num::NonZero;
use std::ptr::NonNull;

use tracing::debug;

use crate::{BlockPool, DropPolicy, Error, PoolAllocatorBuilder, Result, SizeClassRegistry};

/// Serves typed allocations from fixed-capacity pools, one pool per size class.
///
/// The size class of a type is its size in bytes (rounded up to the size of a pointer for
/// smaller types). Each size class is served by a [`BlockPool`] with a fixed number of blocks
/// that is reserved in one piece when the pool is created and never grows. Allocating and freeing
/// are constant time: they push and pop a free list stored inside the free blocks themselves.
///
/// Pools for the default size classes exist from the start. Any other size class gets its pool
/// the first time a type of that size is allocated.
///
/// # Pooling by size
///
/// Pools are keyed by size, not by type. All types of the same size share a pool, so a block
/// allocated as one type may be freed as another type of the same size.
///
/// # Invalidation on free
///
/// [`free()`][Self::free] takes the caller's pointer by `&mut Option<NonNull<T>>` and sets it to
/// `None` once the block is back in the pool, so a stale pointer cannot be freed again through
/// the same variable. Copies of the pointer are not affected; freeing such a copy is reported as
/// [`Error::DoubleFree`].
///
/// # Example
///
/// ```
/// use class_pool::{Error, PoolAllocator};
/// use new_zealand::nz;
///
/// let mut allocator = PoolAllocator::with_blocks_per_pool(nz!(2));
///
/// let first = allocator.allocate::<u64>().unwrap();
/// let _second = allocator.allocate::<u64>().unwrap();
///
/// // SAFETY: The block is allocated to us and sized and aligned for a u64.
/// unsafe { first.write(42) };
///
/// assert!(matches!(
///     allocator.allocate::<u64>(),
///     Err(Error::PoolExhausted { .. })
/// ));
///
/// let mut first = Some(first);
/// allocator.free(&mut first).unwrap();
/// assert!(first.is_none());
/// ```
///
/// # Thread safety
///
/// The allocator is thread-mobile ([`Send`]) but not thread-safe ([`Sync`]). To share one
/// allocator between threads, guard it with a mutex.
#[derive(Debug)]
pub struct PoolAllocator {
    registry: SizeClassRegistry,
}

impl PoolAllocator {
    /// Creates an allocator with the default configuration: 10 blocks per pool and pools for
    /// the 8, 16 and 32 byte size classes.
    ///
    /// For custom configuration, use [`PoolAllocator::builder()`].
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates an allocator with the default size classes, reserving `blocks_per_pool` blocks
    /// for every pool.
    ///
    /// # Example
    ///
    /// ```
    /// use class_pool::PoolAllocator;
    /// use new_zealand::nz;
    ///
    /// let allocator = PoolAllocator::with_blocks_per_pool(nz!(100));
    ///
    /// assert_eq!(allocator.registry().pool(16).unwrap().capacity(), 100);
    /// ```
    #[must_use]
    pub fn with_blocks_per_pool(blocks_per_pool: NonZero<usize>) -> Self {
        Self::builder().blocks_per_pool(blocks_per_pool).build()
    }

    /// Creates a builder for configuring and constructing a [`PoolAllocator`].
    pub fn builder() -> PoolAllocatorBuilder {
        PoolAllocatorBuilder::new()
    }

    #[must_use]
    pub(crate) fn new_inner(
        blocks_per_pool: NonZero<usize>,
        default_size_classes: &[usize],
        drop_policy: DropPolicy,
    ) -> Self {
        let mut registry = SizeClassRegistry::new(blocks_per_pool, drop_policy);

        for &size in default_size_classes {
            _ = registry.ensure_pool(size);
        }

        Self { registry }
    }

    /// The size class that serves allocations of `T`.
    ///
    /// This is the size of `T`, raised to the alignment of `T` (which only matters for
    /// zero-sized types) and then to the size of a pointer.
    ///
    /// # Example
    ///
    /// ```
    /// use class_pool::PoolAllocator;
    ///
    /// assert_eq!(PoolAllocator::size_class_of::<[u64; 3]>(), 24);
    /// assert_eq!(PoolAllocator::size_class_of::<u8>(), size_of::<usize>());
    ///
    /// #[repr(align(64))]
    /// struct Marker;
    ///
    /// assert_eq!(PoolAllocator::size_class_of::<Marker>(), 64);
    /// ```
    #[must_use]
    pub fn size_class_of<T>() -> usize {
        SizeClassRegistry::size_class_of(request_size::<T>()).get()
    }

    /// Reserves a block for a value of type `T` and returns a pointer to it.
    ///
    /// The block is uninitialized as far as `T` is concerned: write a value before reading one.
    /// The block is aligned for `T` and has room for exactly one `T`. Nothing placed in the block
    /// is ever dropped by the allocator.
    ///
    /// If no pool serves the size class of `T` yet, one is created.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PoolExhausted`] if every block of the pool for the size class is
    /// allocated. Nothing is modified in that case.
    pub fn allocate<T>(&mut self) -> Result<NonNull<T>> {
        let block = self
            .registry
            .ensure_pool(request_size::<T>())
            .allocate()?
            .cast::<T>();

        // Regions are aligned to the lowest set bit of the block size, which is a multiple of
        // the alignment of T because the request size is.
        debug_assert!(
            block.is_aligned(),
            "block {block:?} is not aligned for {}",
            type_name::<T>()
        );

        Ok(block)
    }

    /// Returns the block pointed to by `slot` to its pool and sets `slot` to `None`.
    ///
    /// The block is routed by the size class of `T`, which must be the same size class the
    /// block was allocated with. `slot` is left unchanged if an error is returned.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidPointer`] if `slot` is `None` or points into the middle of a block.
    /// * [`Error::UnknownSizeClass`] if no pool exists for the size class of `T`.
    /// * [`Error::OutOfRangePointer`] if the pointer is not within the pool for the size class
    ///   of `T`.
    /// * [`Error::DoubleFree`] if the block is not currently allocated.
    ///
    /// Nothing is modified when an error is returned.
    pub fn free<T>(&mut self, slot: &mut Option<NonNull<T>>) -> Result<()> {
        let Some(block) = *slot else {
            debug!(type_name = type_name::<T>(), "rejected free of null pointer");
            return Err(Error::InvalidPointer { address: 0 });
        };

        let pool = self
            .registry
            .lookup_pool(request_size::<T>())
            .inspect_err(|error| {
                debug!(type_name = type_name::<T>(), %error, "rejected free");
            })?;

        pool.free(block.cast::<u8>())?;

        *slot = None;
        Ok(())
    }

    /// The pool serving the size class of `T`, if one exists.
    #[must_use]
    pub fn pool_for<T>(&self) -> Option<&BlockPool> {
        self.registry.pool(request_size::<T>())
    }

    /// The registry holding the pools of this allocator.
    #[must_use]
    pub fn registry(&self) -> &SizeClassRegistry {
        &self.registry
    }

    /// Total number of blocks currently allocated across all size classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.allocated_blocks()
    }

    /// Whether no blocks are currently allocated in any size class.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Number of bytes a block must have to hold a `T` at an address aligned for `T`.
///
/// The size of a type is always a multiple of its alignment, so this is the size itself unless
/// `T` is zero-sized, in which case it is the alignment.
fn request_size<T>() -> usize {
    size_of::<T>().max(align_of::<T>())
}

impl Default for PoolAllocator {
    fn default() -> Self {
        Self::new()
    }
}
