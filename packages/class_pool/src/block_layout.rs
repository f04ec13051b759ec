use std::alloc::Layout;
use std::num::NonZero;

use num_integer::Integer;

/// Width of the free list link stored inside every free block.
pub(crate) const POINTER_WIDTH: usize = size_of::<usize>();

const BITS_PER_BYTE: usize = u8::BITS as usize;

/// Bit masks for positions 0..8 within a bitmap byte, most significant bit first.
const MSB_FIRST_MASKS: [u8; BITS_PER_BYTE] = [0x80, 0x40, 0x20, 0x10, 0x08, 0x04, 0x02, 0x01];

/// Precalculated layout of the memory region backing one pool.
///
/// A region consists of three consecutive parts:
///
/// ```text
/// [block 0][block 1]...[block N-1][free list head][allocation bitmap]
///  \______ N * block_size _____/  \_ ptr width _/  \_ ceil(N / 8) _/
/// ```
///
/// The layout is pure arithmetic. It translates block indices into byte offsets from the start
/// of the region and back, and tells where the allocation bit of each block lives.
///
/// The region is aligned to the largest power of two that divides the block size. Since the
/// alignment of a Rust type always divides its size, every block is suitably aligned for any
/// type whose size equals the block size.
///
/// # Examples
///
/// ```
/// use std::num::NonZero;
///
/// use class_pool::BlockLayout;
///
/// let layout = BlockLayout::new(NonZero::new(16).unwrap(), NonZero::new(10).unwrap());
///
/// assert_eq!(layout.block_offset(3), 48);
/// assert_eq!(layout.head_slot_offset(), 160);
/// assert_eq!(layout.bitmap_len(), 2);
/// assert_eq!(layout.region_layout().align(), 16);
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BlockLayout {
    block_size: NonZero<usize>,
    block_count: NonZero<usize>,

    /// Byte offset of the slot holding the index of the first free block. This is also the
    /// total size of the block array.
    head_slot_offset: usize,

    /// Byte offset of the first bitmap byte.
    bitmap_offset: usize,

    /// Number of bitmap bytes, one bit per block.
    bitmap_len: usize,

    region_layout: Layout,
}

/// Location of the allocation bit of one block within the bitmap.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct BitLocation {
    /// Index of the byte within the bitmap (not within the region).
    byte_index: usize,

    /// Mask selecting the bit within that byte.
    mask: u8,
}

impl BitLocation {
    #[must_use]
    pub(crate) fn byte_index(&self) -> usize {
        self.byte_index
    }

    #[must_use]
    pub(crate) fn mask(&self) -> u8 {
        self.mask
    }
}

/// Where a byte offset from the start of a region lands.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum BlockPosition {
    /// The offset is the first byte of the block with this index.
    Start(usize),

    /// The offset is somewhere inside the block with this index, past its first byte.
    Interior(usize),

    /// The offset is past the end of the block array.
    Outside,
}

impl BlockLayout {
    /// Calculates the region layout for `block_count` blocks of `block_size` bytes each.
    ///
    /// # Panics
    ///
    /// Panics if `block_size` is smaller than the width of a pointer, as every free block must
    /// be able to hold a free list link.
    ///
    /// Panics if the region would exceed `isize::MAX` bytes.
    #[must_use]
    pub fn new(block_size: NonZero<usize>, block_count: NonZero<usize>) -> Self {
        assert!(
            block_size.get() >= POINTER_WIDTH,
            "block size {block_size} is smaller than the {POINTER_WIDTH}-byte free list link"
        );

        // Blocks are at least a pointer wide, so a block count large enough to reach usize::MAX
        // (the free list sentinel) as an index overflows here.
        let head_slot_offset = block_size
            .get()
            .checked_mul(block_count.get())
            .expect("block array of the pool region would exceed virtual memory");

        let bitmap_offset = head_slot_offset
            .checked_add(POINTER_WIDTH)
            .expect("pool region would exceed virtual memory");

        let bitmap_len = block_count.get().div_ceil(BITS_PER_BYTE);

        let region_size = bitmap_offset
            .checked_add(bitmap_len)
            .expect("pool region would exceed virtual memory");

        let region_align = 1_usize
            .checked_shl(block_size.trailing_zeros())
            .expect("lowest set bit of a usize is always representable in a usize");

        let region_layout = Layout::from_size_align(region_size, region_align)
            .expect("pool region must not exceed isize::MAX bytes");

        Self {
            block_size,
            block_count,
            head_slot_offset,
            bitmap_offset,
            bitmap_len,
            region_layout,
        }
    }

    /// Size in bytes of every block.
    #[must_use]
    pub fn block_size(&self) -> NonZero<usize> {
        self.block_size
    }

    /// Number of blocks in the region.
    #[must_use]
    pub fn block_count(&self) -> NonZero<usize> {
        self.block_count
    }

    /// Byte offset of the slot holding the free list head.
    #[must_use]
    pub fn head_slot_offset(&self) -> usize {
        self.head_slot_offset
    }

    /// Byte offset of the allocation bitmap.
    #[must_use]
    pub fn bitmap_offset(&self) -> usize {
        self.bitmap_offset
    }

    /// Number of bytes in the allocation bitmap.
    #[must_use]
    pub fn bitmap_len(&self) -> usize {
        self.bitmap_len
    }

    /// Memory layout of the entire region, including the free list head and the bitmap.
    #[must_use]
    pub fn region_layout(&self) -> Layout {
        self.region_layout
    }

    /// Byte offset of the block with the given index.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not less than the block count.
    #[must_use]
    pub fn block_offset(&self, index: usize) -> usize {
        self.assert_in_bounds(index);

        // Cannot wrap, the product for block_count was checked in the ctor.
        index.wrapping_mul(self.block_size.get())
    }

    /// # Panics
    ///
    /// Panics if `index` is not less than the block count.
    #[must_use]
    pub(crate) fn bit_location(&self, index: usize) -> BitLocation {
        self.assert_in_bounds(index);

        let (byte_index, bit_in_byte) = index.div_mod_floor(&BITS_PER_BYTE);

        BitLocation {
            byte_index,
            mask: *MSB_FIRST_MASKS
                .get(bit_in_byte)
                .expect("remainder of division by 8 is always less than 8"),
        }
    }

    /// Classifies a byte offset from the start of the region.
    #[must_use]
    pub(crate) fn position_of(&self, offset: usize) -> BlockPosition {
        if offset >= self.head_slot_offset {
            return BlockPosition::Outside;
        }

        match offset.div_mod_floor(&self.block_size.get()) {
            (index, 0) => BlockPosition::Start(index),
            (index, _) => BlockPosition::Interior(index),
        }
    }

    fn assert_in_bounds(&self, index: usize) {
        assert!(
            index < self.block_count.get(),
            "block {index} index out of bounds in pool of {} blocks",
            self.block_count
        );
    }
}
