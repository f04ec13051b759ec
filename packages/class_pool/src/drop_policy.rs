/// Determines what happens when a pool is dropped while some of its blocks are still allocated.
///
/// The allocator hands out raw memory and never runs destructors for values placed in blocks,
/// so dropping a pool with allocated blocks silently discards whatever those blocks contain.
///
/// # Examples
///
/// ```
/// use class_pool::{DropPolicy, PoolAllocator};
///
/// // The drop policy is set at allocator creation time and applies to every pool.
/// let allocator = PoolAllocator::builder()
///     .drop_policy(DropPolicy::MustNotDropAllocatedBlocks)
///     .build();
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum DropPolicy {
    /// Pools release their memory when dropped, even if blocks are still allocated.
    /// This is the default.
    #[default]
    MayDropAllocatedBlocks,

    /// A pool panics when dropped if any of its blocks are still allocated.
    ///
    /// This is a leak check: every block handed out must have been freed before teardown.
    /// The memory is released before the panic is raised.
    MustNotDropAllocatedBlocks,
}
