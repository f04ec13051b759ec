//! Basic usage of the `class_pool` crate:
//!
//! * Creating an allocator with a fixed number of blocks per pool.
//! * Allocating past the capacity of a pool.
//! * Freeing blocks and reusing them.
//! * Rejected frees: double frees and pointers that were already invalidated.
//!
//! Logging is enabled at `trace` level, so every allocation and free shows up in the output
//! along with the reason for every rejected operation.

use std::ptr::NonNull;

use class_pool::PoolAllocator;
use new_zealand::nz;
use rand::Rng;
use tracing::Level;

#[derive(Debug)]
struct Particle {
    count: u64,
    value: f64,
}

const BLOCKS_PER_POOL: usize = 100;

fn main() {
    tracing_subscriber::fmt().with_max_level(Level::TRACE).init();

    let mut allocator = PoolAllocator::with_blocks_per_pool(nz!(100));
    let mut rng = rand::rng();

    // Allocating past the limit fails for the last two requests and leaves the pool untouched.
    let mut particles: Vec<Option<NonNull<Particle>>> = (0..BLOCKS_PER_POOL + 2)
        .map(|index| match allocator.allocate::<Particle>() {
            Ok(block) => {
                // SAFETY: The block is allocated to us and sized and aligned for a Particle.
                unsafe {
                    block.write(Particle {
                        count: u64::try_from(index).expect("index fits in u64"),
                        value: 0.5,
                    });
                }

                Some(block)
            }
            Err(error) => {
                println!("Allocation {index} failed: {error}");
                None
            }
        })
        .collect();

    // Free a fifth of the blocks at random. Picking the same index twice is rejected because the
    // first free cleared the pointer.
    for _ in 0..BLOCKS_PER_POOL / 5 {
        let index = rng.random_range(0..BLOCKS_PER_POOL);

        let slot = particles.get_mut(index).expect("index is within the first round");

        if let Err(error) = allocator.free(slot) {
            println!("Freeing particle {index} failed: {error}");
        }
    }

    println!("{} blocks allocated after random frees", allocator.len());

    // Reallocation hands out the most recently freed blocks first. At least one of these fails
    // because there are more requests than freed blocks.
    for _ in 0..21 {
        match allocator.allocate::<Particle>() {
            Ok(block) => particles.push(Some(block)),
            Err(error) => println!("Reallocation failed: {error}"),
        }
    }

    // Double frees through a copy of a pointer are detected.
    let index = particles
        .iter()
        .position(Option::is_some)
        .expect("some particles are still allocated");

    let particle = particles
        .get(index)
        .copied()
        .flatten()
        .expect("position() found an allocated particle");

    // SAFETY: Blocks from the first round were initialized right after allocation.
    let stored = unsafe { particle.as_ref() };
    println!(
        "Particle {index} holds count {} and value {}",
        stored.count, stored.value
    );

    let mut copy = Some(particle);
    allocator
        .free(&mut copy)
        .expect("block is allocated, so the first free succeeds");

    if let Err(error) = allocator.free(&mut copy) {
        println!("Freeing the cleared copy failed: {error}");
    }

    let original = particles.get_mut(index).expect("index was found above");

    if let Err(error) = allocator.free(original) {
        println!("Freeing the original pointer failed: {error}");
    }

    println!("{} blocks still allocated at exit", allocator.len());
}
