#![no_main]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use libfuzzer_sys::fuzz_target;
use softcache::ds::pin_ring::{PinRing, PinTarget};

struct Counted {
    pins: AtomicUsize,
}

impl PinTarget for Counted {
    fn acquire_pin(&self) {
        self.pins.fetch_add(1, Ordering::Relaxed);
    }

    fn release_pin(&self) {
        self.pins.fetch_sub(1, Ordering::Relaxed);
    }
}

// Fuzz arbitrary pin/clear sequences on PinRing
//
// After every operation the ring must respect its capacity and every item's
// counter must equal its number of occurrences in the ring.
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    // First byte picks the capacity (0-31)
    let capacity = (data[0] as usize) % 32;
    let ring = PinRing::new(capacity);
    let items: Vec<Arc<Counted>> = (0..16)
        .map(|_| {
            Arc::new(Counted {
                pins: AtomicUsize::new(0),
            })
        })
        .collect();

    for &byte in &data[1..] {
        if byte == u8::MAX {
            ring.clear();
        } else {
            let len = ring.pin(items[(byte as usize) % items.len()].clone());
            assert!(len <= capacity);
        }

        ring.debug_validate_invariants();
        let pinned: usize = items.iter().map(|i| i.pins.load(Ordering::Relaxed)).sum();
        assert_eq!(pinned, ring.len());
    }

    ring.clear();
    assert!(items.iter().all(|i| i.pins.load(Ordering::Relaxed) == 0));
});
