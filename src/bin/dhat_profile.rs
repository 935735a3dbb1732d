//! DHAT heap profiler for softcache.
//!
//! Run with: cargo run --bin dhat_profile --release --features dhat-heap
//! View results: Open dhat-heap.json in <https://nnethercote.github.io/dh_view/dh_view.html>

#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use softcache::builder::SoftCacheBuilder;
use softcache::cache::SoftCache;
use softcache::policy::pressure::MemoryPressure;
use softcache::policy::reclaim::{Manual, SoftLimit};

const OPERATIONS: usize = 100_000;
const UNIVERSE: u64 = 16_384;

/// Simple XorShift64 RNG for deterministic workloads.
struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }
}

/// Hotset workload: 90% of accesses hit 10% of keys. Misses are refilled
/// with a 256-byte tile.
fn hotset_workload(cache: &SoftCache<u64, Vec<u8>>, operations: usize, seed: u64) {
    let mut rng = XorShift64::new(seed);
    let hot_size = UNIVERSE / 10;

    for _ in 0..operations {
        let key = if rng.next_u64() % 10 < 9 {
            rng.next_u64() % hot_size
        } else {
            hot_size + (rng.next_u64() % (UNIVERSE - hot_size))
        };
        cache.get_or_insert_with(key, || vec![0u8; 256]);
    }
}

fn profile_soft_limit() {
    println!("=== Profiling SoftLimit(4096) ===");
    let cache = SoftCacheBuilder::new()
        .pin_capacity(64)
        .strategy(SoftLimit::new(4_096))
        .build();

    hotset_workload(&cache, OPERATIONS, 42);
    println!("  Final size: {}", cache.len());
}

fn profile_pressure() {
    println!("=== Profiling OnPressure with periodic raises ===");
    let pressure = MemoryPressure::new();
    let cache = SoftCacheBuilder::new()
        .pin_capacity(64)
        .pressure(pressure.clone())
        .build();

    for round in 0..10 {
        hotset_workload(&cache, OPERATIONS / 10, round);
        pressure.raise();
    }
    cache.get(&0);
    println!("  Final size: {}", cache.len());
}

fn profile_manual_release() {
    println!("=== Profiling Manual + release_unpinned ===");
    let cache = SoftCacheBuilder::new()
        .pin_capacity(64)
        .strategy(Manual)
        .build();

    hotset_workload(&cache, OPERATIONS, 7);
    let released = cache.release_unpinned();
    println!("  Released: {}", released);
    println!("  Final size: {}", cache.len());
}

fn main() {
    let _profiler = dhat::Profiler::new_heap();

    println!("softcache DHAT Heap Profiling");
    println!("=============================\n");

    profile_soft_limit();
    profile_pressure();
    profile_manual_release();

    println!("\n=============================");
    println!("Profile written to dhat-heap.json");
}
