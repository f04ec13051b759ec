#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! A pool allocator for workloads dominated by many short-lived objects of a few sizes.
//!
//! This package provides [`PoolAllocator`], which serves typed allocations from one
//! fixed-capacity [`BlockPool`] per size class. Each pool reserves all of its memory in one
//! contiguous region when it is created and never grows, so allocation and free take constant
//! time and never call into the global allocator once the pool exists.
//!
//! # Key Features
//!
//! - **Constant time operations**: Allocation pops and free pushes a free list stored inside the
//!   free blocks themselves
//! - **Most recently freed first**: The last block freed is the first block reused, which keeps
//!   the working set warm in cache
//! - **Checked frees**: An allocation bitmap rejects double frees, pointers from other pools and
//!   pointers into the middle of blocks without modifying anything
//! - **Pointer invalidation**: A successful free clears the caller's pointer
//! - **Lazy size classes**: Pools for sizes beyond the defaults are created on first use
//! - **Leak detection**: Optionally panic if blocks are still allocated when the allocator is
//!   dropped (see [`DropPolicy`])
//!
//! # Memory layout
//!
//! Every pool is a single region holding its blocks followed by its bookkeeping:
//!
//! ```text
//! [block 0][block 1]...[block N-1][free list head][allocation bitmap]
//! ```
//!
//! See [`BlockLayout`] for the details.
//!
//! # Example
//!
//! ```rust
//! use class_pool::{Error, PoolAllocator};
//! use new_zealand::nz;
//!
//! struct Particle {
//!     count: u64,
//!     value: f64,
//! }
//!
//! let mut allocator = PoolAllocator::with_blocks_per_pool(nz!(100));
//!
//! let particle = allocator.allocate::<Particle>()?;
//!
//! // SAFETY: The block is allocated to us and sized and aligned for a Particle.
//! unsafe {
//!     particle.write(Particle {
//!         count: 1,
//!         value: 0.5,
//!     });
//! }
//!
//! // SAFETY: We initialized the block above.
//! assert_eq!(unsafe { particle.as_ref() }.count, 1);
//!
//! let mut particle = Some(particle);
//! allocator.free(&mut particle)?;
//! assert!(particle.is_none());
//!
//! // Freeing again is rejected without touching the pool.
//! assert!(matches!(
//!     allocator.free(&mut particle),
//!     Err(Error::InvalidPointer { .. })
//! ));
//! # Ok::<(), Error>(())
//! ```
//!
//! # Thread safety
//!
//! The allocator has no internal synchronization. It can be moved between threads ([`Send`])
//! but not shared between them ([`Sync`]). Use one allocator per thread or guard a shared one
//! with a mutex.
//!
//! # Logging
//!
//! Pool creation, release and rejected operations are logged at `debug` level via [`tracing`],
//! every successful allocation and free at `trace` level.

mod allocator;
mod block_layout;
mod block_pool;
mod builder;
mod drop_policy;
mod error;
mod registry;

pub use allocator::*;
pub use block_layout::BlockLayout;
pub(crate) use block_layout::{BitLocation, BlockPosition, POINTER_WIDTH};
pub use block_pool::*;
pub use builder::PoolAllocatorBuilder;
pub use drop_policy::*;
pub use error::*;
pub use registry::*;
