use thiserror::Error;

/// Errors reported by the allocator when a request cannot be satisfied or a free is rejected.
///
/// A rejected operation never modifies the bookkeeping of any pool, so the allocator remains
/// fully usable after returning any of these.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// Every block of the pool serving the size class is currently allocated.
    ///
    /// Pools never grow, so the request can only succeed after a block of the same size class
    /// has been freed.
    #[error("pool for {block_size}-byte blocks is exhausted, all {block_count} blocks are allocated")]
    PoolExhausted {
        /// Block size of the exhausted pool.
        block_size: usize,

        /// Number of blocks in the exhausted pool.
        block_count: usize,
    },

    /// The block is already free. This signals a programming error in the caller.
    #[error("block {index} in pool for {block_size}-byte blocks is already free")]
    DoubleFree {
        /// Block size of the pool the block belongs to.
        block_size: usize,

        /// Index of the block within its pool.
        index: usize,
    },

    /// A null pointer or a pointer into the middle of a block was passed to free.
    #[error("pointer {address:#x} is not the start of an allocated block")]
    InvalidPointer {
        /// The rejected address. Zero for a null pointer.
        address: usize,
    },

    /// The pointer does not fall within the blocks of the pool serving its size class.
    #[error("pointer {address:#x} is outside the pool for {block_size}-byte blocks")]
    OutOfRangePointer {
        /// The rejected address.
        address: usize,

        /// Block size of the pool that was consulted.
        block_size: usize,
    },

    /// No pool was ever created for the size class, so nothing of that size can be freed.
    #[error("no pool exists for size class of {size} bytes")]
    UnknownSizeClass {
        /// The size class that was looked up.
        size: usize,
    },
}

/// A specialized `Result` type for allocator operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;
