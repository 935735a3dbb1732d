//! Tile cache walkthrough.
//!
//! Run with: `cargo run --example basic_soft_cache`
//!
//! Decoded raster tiles are expensive to produce and large to keep. The cache
//! pins the few most recently used tiles and lets the rest go when the host
//! signals memory pressure; a released tile reads as a miss and is decoded
//! again on demand.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use softcache::builder::SoftCacheBuilder;
use softcache::error::CleanupError;
use softcache::policy::pressure::MemoryPressure;

type TileId = (u32, u32);

fn decode(id: TileId) -> Vec<u8> {
    vec![(id.0 ^ id.1) as u8; 4096]
}

fn main() {
    let pressure = MemoryPressure::new();
    let released = Arc::new(AtomicUsize::new(0));

    let tiles = SoftCacheBuilder::<TileId, Vec<u8>>::new()
        .pin_capacity(4)
        .pressure(pressure.clone())
        .cleaner({
            let released = released.clone();
            move |id: &TileId, _tile: &Vec<u8>| -> Result<(), CleanupError> {
                println!("  released tile {:?}", id);
                released.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
        })
        .build();

    println!("Decoding a 4x4 grid of tiles...");
    for x in 0..4 {
        for y in 0..4 {
            tiles.get_or_insert_with((x, y), || decode((x, y)));
        }
    }
    println!("  cached: {}, pinned: {}", tiles.len(), tiles.pinned_len());

    println!("Host signals memory pressure...");
    pressure.raise();
    let hit = tiles.get(&(3, 3)).is_some();
    println!(
        "  (3, 3) still cached: {}, cached: {}, released: {}",
        hit,
        tiles.len(),
        released.load(Ordering::Relaxed)
    );

    println!("Released tiles are decoded again on demand...");
    let tile = tiles.get_or_insert_with((0, 0), || decode((0, 0)));
    println!("  (0, 0) -> {} bytes", tile.len());

    #[cfg(feature = "metrics")]
    {
        let metrics = tiles.metrics();
        println!(
            "Hit rate: {:.2} ({} hits, {} misses, {} reclaimed)",
            metrics.hit_rate(),
            metrics.get_hits,
            metrics.get_misses,
            metrics.reclaimed
        );
    }
}
