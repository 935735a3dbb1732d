#![no_main]

use std::collections::HashMap;

use libfuzzer_sys::fuzz_target;
use softcache::builder::SoftCacheBuilder;
use softcache::cache::SoftCache;
use softcache::policy::reclaim::Manual;

// Fuzz arbitrary operation sequences on SoftCache against a HashMap model
//
// The Manual strategy releases nothing on its own, so the model only changes
// through the operations applied here; `reclaim` counts as a removal.
fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }

    let pin_capacity = (data[0] as usize % 16) + 1;
    let shards = (data[1] as usize % 8) + 1;
    let cache: SoftCache<u8, u32> = SoftCacheBuilder::new()
        .pin_capacity(pin_capacity)
        .shards(shards)
        .strategy(Manual)
        .build();
    let mut model: HashMap<u8, u32> = HashMap::new();

    for (step, pair) in data[2..].chunks_exact(2).enumerate() {
        let key = pair[1] % 64;
        match pair[0] % 8 {
            0 | 1 => {
                let value = step as u32;
                assert_eq!(cache.insert(key, value).map(|v| *v), model.insert(key, value));
            },
            2 | 3 => {
                assert_eq!(cache.get(&key).map(|v| *v), model.get(&key).copied());
            },
            4 => {
                assert_eq!(cache.remove(&key).map(|v| *v), model.remove(&key));
            },
            5 => {
                assert_eq!(cache.reclaim(&key), model.remove(&key).is_some());
            },
            6 => {
                cache.release_unpinned();
                model.retain(|k, _| cache.contains_key(k));
            },
            7 => {
                cache.clear();
                model.clear();
            },
            _ => unreachable!(),
        }

        assert!(cache.pinned_len() <= pin_capacity);
        if let Err(err) = cache.check_invariants() {
            panic!("invariant violated: {}", err);
        }
    }

    let mut live: Vec<_> = cache.iter().map(|(k, v)| (k, *v)).collect();
    live.sort_unstable();
    let mut expected: Vec<_> = model.into_iter().collect();
    expected.sort_unstable();
    assert_eq!(live, expected);
});
