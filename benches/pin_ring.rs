//! Pin ring micro-benchmarks.
//!
//! Run with: `cargo bench --bench pin_ring`

use std::hint::black_box;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use softcache::ds::pin_ring::{PinRing, PinTarget};

const OPS: u64 = 100_000;

#[derive(Default)]
struct Handle {
    pins: AtomicUsize,
}

impl PinTarget for Handle {
    fn acquire_pin(&self) {
        self.pins.fetch_add(1, Ordering::AcqRel);
    }

    fn release_pin(&self) {
        self.pins.fetch_sub(1, Ordering::AcqRel);
    }
}

fn handles(count: usize) -> Vec<Arc<Handle>> {
    (0..count).map(|_| Arc::new(Handle::default())).collect()
}

fn bench_pin(c: &mut Criterion) {
    let mut group = c.benchmark_group("pin_ns");
    group.throughput(Throughput::Elements(OPS));

    for capacity in [1usize, 20, 1_024] {
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &capacity, |b, &capacity| {
            let ring = PinRing::new(capacity);
            let items = handles(256);
            b.iter(|| {
                for i in 0..OPS as usize {
                    black_box(ring.pin(items[i % items.len()].clone()));
                }
            })
        });
    }
    group.finish();
}

fn bench_contended_pin(c: &mut Criterion) {
    let mut group = c.benchmark_group("pin_contended");
    let per_thread = 20_000usize;

    for threads in [2usize, 8] {
        group.throughput(Throughput::Elements((per_thread * threads) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            let ring = Arc::new(PinRing::new(20));
            let items = Arc::new(handles(256));
            b.iter(|| {
                let workers: Vec<_> = (0..threads)
                    .map(|t| {
                        let ring = ring.clone();
                        let items = items.clone();
                        thread::spawn(move || {
                            for i in 0..per_thread {
                                ring.pin(items[(i + t * 7) % items.len()].clone());
                            }
                        })
                    })
                    .collect();
                for worker in workers {
                    worker.join().unwrap();
                }
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_pin, bench_contended_pin);
criterion_main!(benches);
