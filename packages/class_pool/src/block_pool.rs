use std::alloc::{alloc, dealloc};
use std::iter;
use std::ptr::NonNull;
use std::{slice, thread};

use tracing::{debug, trace};

use crate::{BitLocation, BlockLayout, BlockPosition, DropPolicy, Error, Result};

/// Free list link value that terminates the list.
const NO_FREE_BLOCK: usize = usize::MAX;

/// A fixed number of equally sized memory blocks in one contiguous region.
///
/// The pool is the storage behind one size class of a [`PoolAllocator`][crate::PoolAllocator].
/// All of its bookkeeping lives in the region itself, after the blocks (see [`BlockLayout`]):
///
/// * Free blocks form a stack. Each free block stores the index of the next free block in its
///   first pointer-width bytes and the index of the top of the stack is kept in a slot right
///   after the last block. Freeing pushes onto the stack and allocating pops from it, so the most
///   recently freed block is always the next one handed out.
/// * An allocation bitmap holds one bit per block (set while allocated). It is consulted on every
///   free to reject double frees without walking the free list.
///
/// Both structures are only ever updated together, after all validation for an operation has
/// passed, so a rejected operation leaves the pool exactly as it was.
///
/// # Out of band access
///
/// The pool never creates references to the blocks it hands out. Callers own the memory of an
/// allocated block until they free it and may access it through the returned pointer. The
/// allocator neither initializes blocks nor drops anything placed in them.
///
/// # Thread safety
///
/// The pool is thread-mobile ([`Send`]) but not thread-safe ([`Sync`]).
#[derive(Debug)]
pub struct BlockPool {
    layout: BlockLayout,

    /// Start of the region described by `layout`.
    region: NonNull<u8>,

    /// Number of blocks currently allocated. Always equal to the number of set bitmap bits.
    allocated: usize,

    drop_policy: DropPolicy,
}

impl BlockPool {
    /// Reserves the region for a pool with the given layout, with every block free.
    ///
    /// The blocks start out linked in ascending order, so a fresh pool hands them out starting
    /// from the lowest address.
    #[must_use]
    pub fn new(layout: BlockLayout, drop_policy: DropPolicy) -> Self {
        // SAFETY: The region layout is never zero-sized because it always contains at least one
        // block of non-zero size.
        let region = NonNull::new(unsafe { alloc(layout.region_layout()) }).expect(
            "we do not intend to handle allocation failure as a real possibility - OOM is panic",
        );

        let mut pool = Self {
            layout,
            region,
            allocated: 0,
            drop_policy,
        };

        // Cannot wrap because the block count is non-zero.
        let last_index = layout.block_count().get().wrapping_sub(1);

        for index in 0..last_index {
            // Cannot wrap because index < last_index < usize::MAX.
            pool.write_link(index, index.wrapping_add(1));
        }

        pool.write_link(last_index, NO_FREE_BLOCK);
        pool.write_head(0);

        // SAFETY: The bitmap lies entirely within the region we just allocated.
        unsafe {
            pool.bitmap_ptr().write_bytes(0, layout.bitmap_len());
        }

        debug!(
            block_size = layout.block_size().get(),
            block_count = layout.block_count().get(),
            region_bytes = layout.region_layout().size(),
            "created pool"
        );

        pool
    }

    /// The layout of the region backing this pool.
    #[must_use]
    pub fn layout(&self) -> &BlockLayout {
        &self.layout
    }

    /// Size in bytes of every block in the pool.
    #[must_use]
    pub fn block_size(&self) -> usize {
        self.layout.block_size().get()
    }

    /// Total number of blocks in the pool, allocated or not.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.layout.block_count().get()
    }

    /// Number of blocks currently allocated.
    #[must_use]
    #[cfg_attr(test, mutants::skip)] // Can be mutated to loop forever in tests that drain the pool.
    pub fn len(&self) -> usize {
        self.allocated
    }

    /// Whether no blocks are currently allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.allocated == 0
    }

    /// Whether every block is allocated, so the next [`allocate()`][Self::allocate] would fail.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.read_head() == NO_FREE_BLOCK
    }

    /// Takes the most recently freed block (or the lowest-index never-used block) off the free
    /// list and marks it allocated.
    ///
    /// The contents of the block are left as they are, except that its first pointer-width bytes
    /// hold free list bookkeeping from while it was free.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PoolExhausted`] if every block is already allocated. The pool is not
    /// modified in that case.
    ///
    /// # Panics
    ///
    /// Panics if the free list and the bitmap disagree. This can only be caused by memory
    /// corruption, such as writing to a block after freeing it.
    pub fn allocate(&mut self) -> Result<NonNull<u8>> {
        let index = self.read_head();

        if index == NO_FREE_BLOCK {
            debug!(
                block_size = self.block_size(),
                block_count = self.capacity(),
                "pool exhausted"
            );

            return Err(Error::PoolExhausted {
                block_size: self.block_size(),
                block_count: self.capacity(),
            });
        }

        let bit = self.layout.bit_location(index);

        assert!(
            !self.is_bit_set(bit),
            "free list head {index} is marked allocated in pool of {}-byte blocks",
            self.block_size()
        );

        let next_index = self.read_link(index);

        assert!(
            next_index == NO_FREE_BLOCK || next_index < self.capacity(),
            "free block {index} links to out of bounds block {next_index} in pool of {}-byte blocks",
            self.block_size()
        );

        self.set_bit(bit);
        self.write_head(next_index);

        // Cannot wrap because it is bounded by the block count.
        self.allocated = self.allocated.wrapping_add(1);

        let block = self.block_ptr(index);

        trace!(
            block_size = self.block_size(),
            index,
            address = ?block,
            next_free = ?self.free_list_head(),
            "allocated block"
        );

        Ok(block)
    }

    /// Returns a block to the pool, making it the next block to be allocated.
    ///
    /// # Errors
    ///
    /// * [`Error::OutOfRangePointer`] if `block` is not within the blocks of this pool.
    /// * [`Error::InvalidPointer`] if `block` points into the middle of a block.
    /// * [`Error::DoubleFree`] if the block is not currently allocated.
    ///
    /// The pool is not modified when an error is returned.
    pub fn free(&mut self, block: NonNull<u8>) -> Result<()> {
        let index = self.index_of(block).inspect_err(|error| {
            debug!(block_size = self.block_size(), %error, "rejected free");
        })?;

        let bit = self.layout.bit_location(index);

        if !self.is_bit_set(bit) {
            let error = Error::DoubleFree {
                block_size: self.block_size(),
                index,
            };

            debug!(block_size = self.block_size(), %error, "rejected free");
            return Err(error);
        }

        let previous_head = self.read_head();

        self.clear_bit(bit);
        self.write_link(index, previous_head);
        self.write_head(index);

        self.allocated = self
            .allocated
            .checked_sub(1)
            .expect("the block was marked allocated so the count must be non-zero");

        trace!(
            block_size = self.block_size(),
            index,
            address = ?block,
            "freed block"
        );

        Ok(())
    }

    /// Resolves a pointer to the index of the block it starts.
    ///
    /// # Errors
    ///
    /// * [`Error::OutOfRangePointer`] if `block` is not within the blocks of this pool.
    /// * [`Error::InvalidPointer`] if `block` points into the middle of a block.
    pub fn index_of(&self, block: NonNull<u8>) -> Result<usize> {
        let address = block.addr().get();

        let out_of_range = Error::OutOfRangePointer {
            address,
            block_size: self.block_size(),
        };

        let Some(offset) = address.checked_sub(self.region.addr().get()) else {
            return Err(out_of_range);
        };

        match self.layout.position_of(offset) {
            BlockPosition::Start(index) => Ok(index),
            BlockPosition::Interior(_) => Err(Error::InvalidPointer { address }),
            BlockPosition::Outside => Err(out_of_range),
        }
    }

    /// Whether `ptr` points anywhere inside the blocks of this pool.
    #[must_use]
    pub fn contains(&self, ptr: NonNull<u8>) -> bool {
        ptr.addr()
            .get()
            .checked_sub(self.region.addr().get())
            .is_some_and(|offset| offset < self.layout.head_slot_offset())
    }

    /// Whether the block with the given index is currently allocated.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not less than the capacity.
    #[must_use]
    pub fn is_allocated(&self, index: usize) -> bool {
        self.is_bit_set(self.layout.bit_location(index))
    }

    /// Index of the block the next [`allocate()`][Self::allocate] will return, if any.
    #[must_use]
    pub fn free_list_head(&self) -> Option<usize> {
        match self.read_head() {
            NO_FREE_BLOCK => None,
            index => Some(index),
        }
    }

    /// Indices of the free blocks, in the order they will be allocated.
    ///
    /// This walks the free list and is meant for diagnostics, not for hot paths.
    pub fn free_blocks(&self) -> impl Iterator<Item = usize> + '_ {
        iter::successors(self.free_list_head(), |&index| {
            match self.read_link(index) {
                NO_FREE_BLOCK => None,
                next_index => Some(next_index),
            }
        })
        // A corrupted list may contain a cycle. It can never hold more than every block.
        .take(self.capacity())
    }

    /// The allocation bitmap. Bit `i`, counting from the most significant bit of the first byte,
    /// is set while block `i` is allocated.
    #[must_use]
    pub fn bitmap(&self) -> &[u8] {
        // SAFETY: The bitmap lies within our region, was initialized in the ctor and is only
        // written through `&mut self`, so it cannot change while this borrow is alive.
        unsafe { slice::from_raw_parts(self.bitmap_ptr().as_ptr(), self.layout.bitmap_len()) }
    }

    /// Verifies that the free list, the bitmap and the allocated count all agree.
    ///
    /// This walks the entire pool.
    ///
    /// # Panics
    ///
    /// Panics if any of the bookkeeping structures disagree.
    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    pub fn integrity_check(&self) {
        let mut seen_on_free_list = vec![false; self.capacity()];
        let mut free_count: usize = 0;

        for index in self.free_blocks() {
            let seen = seen_on_free_list.get_mut(index).unwrap_or_else(|| {
                panic!(
                    "free list contains out of bounds block {index} in pool of {}-byte blocks",
                    self.block_size()
                )
            });

            assert!(
                !*seen,
                "free list visits block {index} twice in pool of {}-byte blocks",
                self.block_size()
            );
            *seen = true;

            assert!(
                !self.is_allocated(index),
                "block {index} is on the free list but marked allocated in pool of {}-byte blocks",
                self.block_size()
            );

            free_count = free_count
                .checked_add(1)
                .expect("bounded by the capacity of the pool");
        }

        let set_bits = self
            .bitmap()
            .iter()
            .map(|byte| usize::try_from(byte.count_ones()).expect("a byte has at most 8 set bits"))
            .fold(0_usize, |total, bits| {
                total.checked_add(bits).expect("bounded by the bitmap size")
            });

        assert_eq!(
            set_bits,
            self.allocated,
            "bitmap has {set_bits} set bits but {} blocks are allocated in pool of {}-byte blocks",
            self.allocated,
            self.block_size()
        );

        assert_eq!(
            free_count.checked_add(self.allocated),
            Some(self.capacity()),
            "{free_count} free and {} allocated blocks do not add up to {} in pool of {}-byte blocks",
            self.allocated,
            self.capacity(),
            self.block_size()
        );
    }

    fn block_ptr(&self, index: usize) -> NonNull<u8> {
        let offset = self.layout.block_offset(index);

        // SAFETY: block_offset() checks the index against the block count, so the offset is
        // within our region.
        unsafe { self.region.add(offset) }
    }

    fn read_link(&self, index: usize) -> usize {
        let link = self.block_ptr(index).cast::<usize>();

        // SAFETY: Every block has room for a usize (guaranteed by BlockLayout) and links are only
        // read from blocks on the free list, which we initialized. Blocks need not be aligned for
        // usize, hence the unaligned read.
        unsafe { link.read_unaligned() }
    }

    fn write_link(&mut self, index: usize, next_index: usize) {
        let link = self.block_ptr(index).cast::<usize>();

        // SAFETY: Every block has room for a usize (guaranteed by BlockLayout) and we have
        // exclusive access to the region. Blocks need not be aligned for usize.
        unsafe {
            link.write_unaligned(next_index);
        }
    }

    fn head_slot_ptr(&self) -> NonNull<usize> {
        // SAFETY: The head slot lies within our region, right after the last block.
        unsafe { self.region.add(self.layout.head_slot_offset()) }.cast::<usize>()
    }

    fn read_head(&self) -> usize {
        // SAFETY: The head slot is initialized in the ctor. It need not be aligned for usize.
        unsafe { self.head_slot_ptr().read_unaligned() }
    }

    fn write_head(&mut self, index: usize) {
        // SAFETY: The head slot lies within our region and we have exclusive access to it.
        unsafe {
            self.head_slot_ptr().write_unaligned(index);
        }
    }

    fn bitmap_ptr(&self) -> NonNull<u8> {
        // SAFETY: The bitmap lies within our region, right after the head slot.
        unsafe { self.region.add(self.layout.bitmap_offset()) }
    }

    fn bitmap_byte_ptr(&self, bit: BitLocation) -> NonNull<u8> {
        debug_assert!(bit.byte_index() < self.layout.bitmap_len());

        // SAFETY: BitLocation is only created by BlockLayout::bit_location(), which checks the
        // block index, so the byte is within the bitmap.
        unsafe { self.bitmap_ptr().add(bit.byte_index()) }
    }

    fn is_bit_set(&self, bit: BitLocation) -> bool {
        // SAFETY: The byte is within the bitmap, which is initialized in the ctor.
        let byte = unsafe { self.bitmap_byte_ptr(bit).read() };

        byte & bit.mask() != 0
    }

    fn set_bit(&mut self, bit: BitLocation) {
        let mut byte = self.bitmap_byte_ptr(bit);

        // SAFETY: The byte is within the bitmap and we have exclusive access to the region.
        unsafe {
            *byte.as_mut() |= bit.mask();
        }
    }

    fn clear_bit(&mut self, bit: BitLocation) {
        let mut byte = self.bitmap_byte_ptr(bit);

        // SAFETY: The byte is within the bitmap and we have exclusive access to the region.
        unsafe {
            *byte.as_mut() &= !bit.mask();
        }
    }
}

impl Drop for BlockPool {
    fn drop(&mut self) {
        let still_allocated = self.allocated;

        // SAFETY: The layout is the same one we allocated the region with.
        unsafe {
            dealloc(self.region.as_ptr(), self.layout.region_layout());
        }

        debug!(
            block_size = self.block_size(),
            still_allocated, "released pool"
        );

        // We check this after releasing the memory, so a failed check does not also leak.
        //
        // If we are already panicking, we do not want to panic again because that will
        // simply obscure whatever the original panic was, leading to debug difficulties.
        if self.drop_policy == DropPolicy::MustNotDropAllocatedBlocks && !thread::panicking() {
            assert!(
                still_allocated == 0,
                "dropped a pool of {}-byte blocks with {still_allocated} blocks still allocated with a policy that says all blocks must be freed first",
                self.block_size()
            );
        }
    }
}

// SAFETY: The raw pointer refers to memory exclusively owned by the pool and nothing about it is
// tied to the thread that created it, so the pool may move between threads.
unsafe impl Send for BlockPool {}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::fmt::Debug;
    use std::num::NonZero;

    use new_zealand::nz;
    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;

    assert_impl_all!(BlockPool: Send, Debug);
    assert_not_impl_any!(BlockPool: Sync);

    fn pool(block_size: NonZero<usize>, block_count: NonZero<usize>) -> BlockPool {
        BlockPool::new(
            BlockLayout::new(block_size, block_count),
            DropPolicy::MayDropAllocatedBlocks,
        )
    }

    #[test]
    fn fresh_pool_is_all_free() {
        let pool = pool(nz!(16), nz!(10));

        assert_eq!(pool.len(), 0);
        assert!(pool.is_empty());
        assert!(!pool.is_full());
        assert_eq!(pool.capacity(), 10);
        assert_eq!(pool.block_size(), 16);
        assert_eq!(pool.free_list_head(), Some(0));
        assert_eq!(pool.free_blocks().collect::<Vec<_>>(), (0..10).collect::<Vec<_>>());
        assert_eq!(pool.bitmap(), &[0, 0]);

        pool.integrity_check();
    }

    #[test]
    fn exhaustion_after_capacity_allocations() {
        let mut pool = pool(nz!(16), nz!(10));

        let blocks = (0..10)
            .map(|_| pool.allocate().unwrap())
            .collect::<Vec<_>>();

        for (i, a) in blocks.iter().enumerate() {
            for b in blocks.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }

        assert!(pool.is_full());
        assert_eq!(pool.len(), 10);
        assert_eq!(pool.bitmap(), &[0xFF, 0xC0]);

        assert_eq!(
            pool.allocate(),
            Err(Error::PoolExhausted {
                block_size: 16,
                block_count: 10
            })
        );

        // Failed allocation changes nothing.
        assert_eq!(pool.len(), 10);
        assert_eq!(pool.bitmap(), &[0xFF, 0xC0]);
        assert_eq!(pool.free_list_head(), None);

        pool.integrity_check();
    }

    #[test]
    fn fresh_pool_allocates_ascending_addresses() {
        let mut pool = pool(nz!(24), nz!(4));

        let first = pool.allocate().unwrap();

        for index in 1..4 {
            let block = pool.allocate().unwrap();
            assert_eq!(block.addr().get() - first.addr().get(), index * 24);
            assert_eq!(pool.index_of(block), Ok(index));
        }
    }

    #[test]
    fn free_then_allocate_reuses_last_freed_block() {
        let mut pool = pool(nz!(8), nz!(5));

        let blocks = (0..5)
            .map(|_| pool.allocate().unwrap())
            .collect::<Vec<_>>();

        pool.free(blocks[1]).unwrap();
        pool.free(blocks[3]).unwrap();

        assert_eq!(pool.free_blocks().collect::<Vec<_>>(), vec![3, 1]);

        assert_eq!(pool.allocate().unwrap(), blocks[3]);
        assert_eq!(pool.allocate().unwrap(), blocks[1]);
        assert!(pool.is_full());

        pool.integrity_check();
    }

    #[test]
    fn allocated_bits_are_most_significant_first() {
        let mut pool = pool(nz!(8), nz!(10));

        _ = pool.allocate().unwrap();
        assert_eq!(pool.bitmap(), &[0x80, 0x00]);
        assert!(pool.is_allocated(0));
        assert!(!pool.is_allocated(1));

        _ = pool.allocate().unwrap();
        assert_eq!(pool.bitmap(), &[0xC0, 0x00]);
    }

    #[test]
    fn double_free_changes_nothing() {
        let mut pool = pool(nz!(16), nz!(6));

        let a = pool.allocate().unwrap();
        let b = pool.allocate().unwrap();
        _ = pool.allocate().unwrap();

        pool.free(a).unwrap();

        let bitmap_before = pool.bitmap().to_vec();
        let free_list_before = pool.free_blocks().collect::<Vec<_>>();

        assert_eq!(
            pool.free(a),
            Err(Error::DoubleFree {
                block_size: 16,
                index: 0
            })
        );

        assert_eq!(pool.bitmap(), bitmap_before.as_slice());
        assert_eq!(pool.free_blocks().collect::<Vec<_>>(), free_list_before);
        assert_eq!(pool.len(), 2);

        pool.free(b).unwrap();
        pool.integrity_check();
    }

    #[test]
    fn never_allocated_block_is_double_free() {
        let mut pool = pool(nz!(8), nz!(4));

        let a = pool.allocate().unwrap();
        // SAFETY: Block 2 is within the region.
        let never_allocated = unsafe { a.add(16) };

        assert_eq!(
            pool.free(never_allocated),
            Err(Error::DoubleFree {
                block_size: 8,
                index: 2
            })
        );
    }

    #[test]
    fn foreign_pointer_is_out_of_range() {
        let mut pool = pool(nz!(8), nz!(4));
        let mut other = self::pool(nz!(8), nz!(4));

        let foreign = other.allocate().unwrap();

        assert!(matches!(
            pool.free(foreign),
            Err(Error::OutOfRangePointer { block_size: 8, .. })
        ));
        assert!(!pool.contains(foreign));
        assert!(pool.is_empty());
    }

    #[test]
    fn pointer_into_trailer_is_out_of_range() {
        let mut pool = pool(nz!(8), nz!(4));

        let first = pool.allocate().unwrap();
        // SAFETY: The head slot is within the region.
        let head_slot = unsafe { first.add(pool.layout().head_slot_offset()) };
        // SAFETY: The bitmap is within the region.
        let bitmap = unsafe { first.add(pool.layout().bitmap_offset()) };

        assert!(matches!(
            pool.free(head_slot),
            Err(Error::OutOfRangePointer { .. })
        ));
        assert!(matches!(
            pool.free(bitmap),
            Err(Error::OutOfRangePointer { .. })
        ));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn interior_pointer_is_invalid() {
        let mut pool = pool(nz!(16), nz!(4));

        let block = pool.allocate().unwrap();
        // SAFETY: Still within the first block.
        let interior = unsafe { block.add(4) };

        assert_eq!(
            pool.free(interior),
            Err(Error::InvalidPointer {
                address: interior.addr().get()
            })
        );
        assert!(pool.contains(interior));
        assert!(pool.is_allocated(0));

        pool.free(block).unwrap();
    }

    #[test]
    fn allocated_blocks_are_writable_without_disturbing_others() {
        let mut pool = pool(nz!(8), nz!(16));

        let blocks = (0..16)
            .map(|_| pool.allocate().unwrap().cast::<u64>())
            .collect::<Vec<_>>();

        for (value, block) in (100_u64..).zip(&blocks) {
            // SAFETY: The block is allocated to us and sized and aligned for a u64.
            unsafe {
                block.write(value);
            }
        }

        for (value, block) in (100_u64..).zip(&blocks) {
            // SAFETY: We wrote the value above.
            assert_eq!(unsafe { block.read() }, value);
        }

        pool.integrity_check();
    }

    #[test]
    fn free_only_overwrites_link_bytes() {
        let mut pool = pool(nz!(16), nz!(2));

        let block = pool.allocate().unwrap();

        // SAFETY: The block is allocated to us and is 16 bytes long.
        unsafe {
            block.write_bytes(0xAB, 16);
        }

        pool.free(block).unwrap();
        assert_eq!(pool.allocate().unwrap(), block);

        // SAFETY: The block is allocated to us and is 16 bytes long.
        let tail = unsafe { slice::from_raw_parts(block.as_ptr().add(8), 8) };
        assert_eq!(tail, &[0xAB; 8]);
    }

    #[test]
    fn block_size_not_multiple_of_pointer_width() {
        let mut pool = pool(nz!(12), nz!(9));

        let blocks = (0..9)
            .map(|_| pool.allocate().unwrap())
            .collect::<Vec<_>>();

        assert!(pool.is_full());

        for block in blocks.iter().rev() {
            pool.free(*block).unwrap();
        }

        assert_eq!(pool.free_blocks().collect::<Vec<_>>(), (0..9).collect::<Vec<_>>());
        pool.integrity_check();
    }

    #[test]
    fn single_block_pool() {
        let mut pool = pool(nz!(8), nz!(1));

        let block = pool.allocate().unwrap();
        assert!(pool.allocate().is_err());

        pool.free(block).unwrap();
        assert_eq!(pool.allocate().unwrap(), block);
    }

    #[test]
    #[should_panic]
    fn write_after_free_corrupting_link_panics_on_allocate() {
        let mut pool = pool(nz!(8), nz!(4));

        let block = pool.allocate().unwrap();
        pool.free(block).unwrap();

        // SAFETY: The memory is still part of the live region, we just no longer own it. This
        // overwrites the free list link with garbage.
        unsafe {
            block.cast::<usize>().write(12345);
        }

        // Pops the corrupted block, whose link is out of bounds.
        _ = pool.allocate();
    }

    #[test]
    #[should_panic]
    fn drop_with_allocated_blocks_under_strict_policy_panics() {
        let mut pool = BlockPool::new(
            BlockLayout::new(nz!(8), nz!(4)),
            DropPolicy::MustNotDropAllocatedBlocks,
        );

        _ = pool.allocate().unwrap();
    }

    #[test]
    fn drop_empty_under_strict_policy_ok() {
        let mut pool = BlockPool::new(
            BlockLayout::new(nz!(8), nz!(4)),
            DropPolicy::MustNotDropAllocatedBlocks,
        );

        let block = pool.allocate().unwrap();
        pool.free(block).unwrap();

        drop(pool);
    }

    #[test]
    fn drop_with_allocated_blocks_under_default_policy_ok() {
        let mut pool = pool(nz!(8), nz!(4));
        _ = pool.allocate().unwrap();

        drop(pool);
    }

    #[test]
    fn moves_between_threads() {
        let mut pool = pool(nz!(8), nz!(4));
        let block = pool.allocate().unwrap();
        let index = pool.index_of(block).unwrap();

        let pool = thread::spawn(move || {
            assert!(pool.is_allocated(index));
            pool
        })
        .join()
        .unwrap();

        assert_eq!(pool.len(), 1);
    }
}
